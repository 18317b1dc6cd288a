//! Sample points and the parameter spaces they are drawn from.

use std::collections::BTreeMap;
use std::fmt;

use ck_core::errors::{CkError, ErrorInfo};
use ck_core::{RangeSpec, Sampling, SpointsMetadata};
use ck_data::linspace;
use serde::{Deserialize, Serialize};

use crate::noise::Noise;

/// Named parameter values, ordered by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    names: Vec<String>,
    values: Vec<f64>,
}

impl SamplePoint {
    /// Builds a point from `(name, value)` pairs; names are sorted.
    pub fn new(pairs: impl IntoIterator<Item = (String, f64)>) -> Result<Self, CkError> {
        let mut sorted: BTreeMap<String, f64> = BTreeMap::new();
        for (name, value) in pairs {
            if sorted.insert(name.clone(), value).is_some() {
                return Err(CkError::Configuration(
                    ErrorInfo::new("point-duplicate-name", "parameter given twice")
                        .with_context("param", name),
                ));
            }
        }
        let (names, values) = sorted.into_iter().unzip();
        Ok(Self { names, values })
    }

    /// Parameter names in sorted order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Values in the order of [`SamplePoint::names`].
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of `name`, if present.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .binary_search_by(|probe| probe.as_str().cmp(name))
            .ok()
            .map(|pos| self.values[pos])
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a point without parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Same names with replaced values.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.names.len());
        Self {
            names: self.names.clone(),
            values,
        }
    }
}

impl fmt::Display for SamplePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (idx, (name, value)) in self.names.iter().zip(&self.values).enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}

/// Per-parameter value lists whose cartesian product is scanned.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpace {
    values: BTreeMap<String, Vec<f64>>,
    sampling: Sampling,
    ranges: Option<BTreeMap<String, RangeSpec>>,
}

impl ParameterSpace {
    /// Space from explicit value lists.
    pub fn grid(values: BTreeMap<String, Vec<f64>>) -> Self {
        Self {
            values,
            sampling: Sampling::Grid,
            ranges: None,
        }
    }

    /// Space of `linspace(min, max, count)` per parameter.
    pub fn equidistant(ranges: BTreeMap<String, RangeSpec>) -> Self {
        let values = ranges
            .iter()
            .map(|(name, range)| (name.clone(), linspace(range.min, range.max, range.count)))
            .collect();
        Self {
            values,
            sampling: Sampling::Equidistant,
            ranges: Some(ranges),
        }
    }

    /// Parameter names in sorted order.
    pub fn coeffs(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Value lists per parameter.
    pub fn values(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.values
    }

    /// Sampling scheme the space was built with.
    pub fn sampling(&self) -> Sampling {
        self.sampling
    }

    /// Number of points in the product.
    pub fn len(&self) -> usize {
        if self.values.is_empty() {
            return 0;
        }
        self.values.values().map(Vec::len).product()
    }

    /// True if the product is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full cartesian product; the last parameter varies fastest.
    pub fn points(&self) -> Vec<SamplePoint> {
        if self.is_empty() {
            return Vec::new();
        }
        let names: Vec<String> = self.coeffs();
        let lists: Vec<&Vec<f64>> = self.values.values().collect();
        let mut outputs = Vec::with_capacity(self.len());
        expand(&names, &lists, 0, Vec::with_capacity(names.len()), &mut outputs);
        outputs
    }

    /// [`ParameterSpace::points`] perturbed by `noise` for `repetition` of `seed`.
    pub fn perturbed_points(&self, noise: &Noise, seed: u64, repetition: u64) -> Vec<SamplePoint> {
        noise.apply(&self.points(), seed, repetition)
    }

    /// Metadata describing this space.
    pub fn metadata(
        &self,
        scale: Option<f64>,
        eft: Option<String>,
        basis: Option<String>,
    ) -> SpointsMetadata {
        SpointsMetadata {
            coeffs: self.coeffs(),
            values: self.values.clone(),
            scale,
            eft,
            basis,
            sampling: self.sampling,
            ranges: self.ranges.clone(),
            noise: None,
        }
    }

    /// Rejects spaces without parameters or with empty value lists.
    pub fn validate(&self) -> Result<(), CkError> {
        if self.values.is_empty() {
            return Err(CkError::Configuration(ErrorInfo::new(
                "space-no-parameters",
                "parameter space has no parameters",
            )));
        }
        for (name, values) in &self.values {
            if values.is_empty() {
                return Err(CkError::Configuration(
                    ErrorInfo::new("space-empty-values", "parameter has no values")
                        .with_context("param", name.clone()),
                ));
            }
            if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
                return Err(CkError::Configuration(
                    ErrorInfo::new("space-non-finite", "parameter value is not finite")
                        .with_context("param", name.clone())
                        .with_context("value", bad.to_string()),
                ));
            }
        }
        Ok(())
    }
}

fn expand(
    names: &[String],
    lists: &[&Vec<f64>],
    idx: usize,
    current: Vec<f64>,
    outputs: &mut Vec<SamplePoint>,
) {
    if idx == lists.len() {
        outputs.push(SamplePoint {
            names: names.to_vec(),
            values: current,
        });
        return;
    }
    for &value in lists[idx].iter() {
        let mut next = current.clone();
        next.push(value);
        expand(names, lists, idx + 1, next, outputs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(entries: &[(&str, &[f64])]) -> ParameterSpace {
        ParameterSpace::grid(
            entries
                .iter()
                .map(|(name, values)| (name.to_string(), values.to_vec()))
                .collect(),
        )
    }

    #[test]
    fn last_parameter_varies_fastest() {
        let points = space(&[("b", &[1.0, 2.0]), ("a", &[0.0, 5.0])]).points();
        let values: Vec<Vec<f64>> = points.iter().map(|p| p.values().to_vec()).collect();
        assert_eq!(
            values,
            vec![vec![0.0, 1.0], vec![0.0, 2.0], vec![5.0, 1.0], vec![5.0, 2.0]]
        );
        assert_eq!(points[0].names(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn empty_list_empties_the_product() {
        let space = space(&[("a", &[1.0]), ("b", &[])]);
        assert!(space.points().is_empty());
        assert!(matches!(space.validate(), Err(CkError::Configuration(_))));
    }

    #[test]
    fn perturbed_points_keep_names_and_order() {
        use crate::noise::{NoiseKind, NoiseMode};

        let space = space(&[("a", &[1.0, 2.0]), ("b", &[-1.0])]);
        let noise = Noise {
            kind: NoiseKind::Uniform { half_width: 0.1 },
            mode: NoiseMode::Absolute,
        };
        let perturbed = space.perturbed_points(&noise, 5, 1);
        assert_eq!(perturbed, space.perturbed_points(&noise, 5, 1));
        for (point, original) in perturbed.iter().zip(space.points()) {
            assert_eq!(point.names(), original.names());
            for (x, y) in point.values().iter().zip(original.values()) {
                assert!((x - y).abs() <= 0.1);
            }
        }
    }

    #[test]
    fn equidistant_records_ranges() {
        let mut ranges = BTreeMap::new();
        ranges.insert(
            "x".to_string(),
            RangeSpec {
                min: -1.0,
                max: 1.0,
                count: 5,
            },
        );
        let space = ParameterSpace::equidistant(ranges);
        assert_eq!(space.values()["x"], vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        let md = space.metadata(Some(5.0), None, None);
        assert_eq!(md.sampling, Sampling::Equidistant);
        assert!(md.ranges.is_some());
    }

    #[test]
    fn point_lookup_by_name() {
        let point =
            SamplePoint::new([("z".to_string(), 3.0), ("a".to_string(), 1.0)]).unwrap();
        assert_eq!(point.names(), &["a".to_string(), "z".to_string()]);
        assert_eq!(point.get("z"), Some(3.0));
        assert_eq!(point.get("m"), None);
        assert_eq!(point.to_string(), "{a=1, z=3}");
    }
}
