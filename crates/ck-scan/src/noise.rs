//! Random perturbation of sample points.

use ck_core::RngHandle;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::space::SamplePoint;

/// Distribution of the per-coordinate shift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NoiseKind {
    /// Normal with standard deviation `sigma`.
    Gauss {
        /// Standard deviation.
        sigma: f64,
    },
    /// Uniform on `[-half_width, half_width]`.
    Uniform {
        /// Half the support width.
        half_width: f64,
    },
}

/// Whether the shift is added as is or scaled by the coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoiseMode {
    /// `x + ε`
    #[default]
    Absolute,
    /// `x · (1 + ε)`
    Relative,
}

/// Noise applied to every coordinate of every point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Noise {
    /// Shift distribution.
    pub kind: NoiseKind,
    /// How the shift is applied.
    #[serde(default)]
    pub mode: NoiseMode,
}

impl Noise {
    /// Perturbed copy of `points` for repetition `repetition` of `seed`.
    ///
    /// The same `(seed, repetition)` pair always yields the same points.
    pub fn apply(&self, points: &[SamplePoint], seed: u64, repetition: u64) -> Vec<SamplePoint> {
        let mut rng = RngHandle::substream(seed, repetition);
        points
            .iter()
            .map(|point| {
                let values = point
                    .values()
                    .iter()
                    .map(|&x| {
                        let eps = self.draw(&mut rng);
                        match self.mode {
                            NoiseMode::Absolute => x + eps,
                            NoiseMode::Relative => x * (1.0 + eps),
                        }
                    })
                    .collect();
                point.with_values(values)
            })
            .collect()
    }

    fn draw(&self, rng: &mut RngHandle) -> f64 {
        match self.kind {
            NoiseKind::Gauss { sigma } => {
                let z: f64 = rng.sample(StandardNormal);
                sigma * z
            }
            NoiseKind::Uniform { half_width } => {
                if half_width > 0.0 {
                    rng.gen_range(-half_width..=half_width)
                } else {
                    0.0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> Vec<SamplePoint> {
        (0..5)
            .map(|i| {
                SamplePoint::new([("a".to_string(), i as f64), ("b".to_string(), 1.0)]).unwrap()
            })
            .collect()
    }

    #[test]
    fn same_seed_same_perturbation() {
        let noise = Noise {
            kind: NoiseKind::Gauss { sigma: 0.1 },
            mode: NoiseMode::Absolute,
        };
        assert_eq!(noise.apply(&points(), 7, 1), noise.apply(&points(), 7, 1));
        assert_ne!(noise.apply(&points(), 7, 1), noise.apply(&points(), 7, 2));
    }

    #[test]
    fn zero_width_is_identity() {
        for kind in [
            NoiseKind::Gauss { sigma: 0.0 },
            NoiseKind::Uniform { half_width: 0.0 },
        ] {
            for mode in [NoiseMode::Absolute, NoiseMode::Relative] {
                let noise = Noise { kind, mode };
                assert_eq!(noise.apply(&points(), 3, 0), points());
            }
        }
    }

    #[test]
    fn uniform_noise_stays_in_range() {
        let noise = Noise {
            kind: NoiseKind::Uniform { half_width: 0.25 },
            mode: NoiseMode::Absolute,
        };
        for (orig, noisy) in points().iter().zip(noise.apply(&points(), 11, 4)) {
            for (x, y) in orig.values().iter().zip(noisy.values()) {
                assert!((x - y).abs() <= 0.25);
            }
        }
    }
}
