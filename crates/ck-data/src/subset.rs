//! Row subsetting: fixing parameters to nearest values and thinning the sample.

use std::collections::BTreeMap;

use ck_core::errors::{CkError, ErrorInfo};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::container::DataContainer;

/// Default column holding the benchmark flags written by a cluster engine.
pub const DEFAULT_BPOINT_COLUMN: &str = "cluster_bp";

const RTOL: f64 = 1e-5;
const ATOL: f64 = 1e-8;

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= ATOL + RTOL * b.abs()
}

/// Options shared by [`DataContainer::fix_param`] and [`DataContainer::sample_param`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOptions {
    /// Keep benchmark rows regardless of the parameter selection.
    pub bpoints: bool,
    /// Column with the benchmark flags.
    pub bpoint_column: String,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            bpoints: false,
            bpoint_column: DEFAULT_BPOINT_COLUMN.to_string(),
        }
    }
}

impl FixOptions {
    /// Options retaining the benchmark rows of [`DEFAULT_BPOINT_COLUMN`].
    pub fn keep_bpoints() -> Self {
        Self {
            bpoints: true,
            ..Self::default()
        }
    }
}

/// How many points of one parameter [`DataContainer::sample_param`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleSpec {
    /// `count` targets between `min` and `max`.
    Range {
        /// Lower end.
        min: f64,
        /// Upper end.
        max: f64,
        /// Number of targets.
        count: usize,
    },
    /// `count` targets spanning the values present in the column.
    Count(usize),
}

/// `count` equidistant values from `min` to `max` inclusive.
pub fn linspace(min: f64, max: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (count - 1) as f64;
            (0..count)
                .map(|i| if i + 1 == count { max } else { min + step * i as f64 })
                .collect()
        }
    }
}

impl DataContainer {
    /// Returns a new container restricted to rows whose parameter values are the
    /// nearest available values to the requested targets.
    ///
    /// For every parameter each target selects the rows carrying the value
    /// closest to it; selections of different parameters are intersected.
    /// With `opts.bpoints` benchmark rows are always kept.
    pub fn fix_param(
        &self,
        targets: &BTreeMap<String, Vec<f64>>,
        opts: &FixOptions,
    ) -> Result<DataContainer, CkError> {
        let mut copy = self.clone();
        copy.fix_param_in_place(targets, opts)?;
        Ok(copy)
    }

    /// In-place variant of [`DataContainer::fix_param`].
    pub fn fix_param_in_place(
        &mut self,
        targets: &BTreeMap<String, Vec<f64>>,
        opts: &FixOptions,
    ) -> Result<(), CkError> {
        let n = self.n();
        let mut selector = vec![true; n];
        for (param, values) in targets {
            let column = self.table().floats(param).map_err(|_| {
                CkError::Configuration(
                    ErrorInfo::new("fix-param-unknown", "no such parameter column")
                        .with_context("param", param.clone()),
                )
            })?;
            let mut param_selector = vec![false; n];
            for &target in values {
                let Some(nearest) = nearest_value(column, target) else {
                    continue;
                };
                debug!(param = %param, target, nearest, "fixing parameter");
                for (keep, &value) in param_selector.iter_mut().zip(column) {
                    *keep |= is_close(value, nearest);
                }
            }
            for (keep, param_keep) in selector.iter_mut().zip(param_selector) {
                *keep &= param_keep;
            }
        }

        if opts.bpoints {
            match self.table().bools(&opts.bpoint_column) {
                Ok(flags) => {
                    for (keep, &flag) in selector.iter_mut().zip(flags) {
                        *keep |= flag;
                    }
                }
                Err(err) => warn!(%err, "benchmark column unavailable, not retaining benchmarks"),
            }
        }

        let filtered = self.table().filter(&selector);
        self.set_table(filtered);
        Ok(())
    }

    /// Returns a new container keeping about `count` values per listed parameter.
    ///
    /// Targets are `linspace(min, max, count)`; for [`SampleSpec::Count`] the
    /// range is taken from the column. The selection is then done by
    /// [`DataContainer::fix_param`]. Parameters not listed are untouched.
    /// Thinning usually keeps the benchmarks, see [`FixOptions::keep_bpoints`].
    pub fn sample_param(
        &self,
        specs: &BTreeMap<String, SampleSpec>,
        opts: &FixOptions,
    ) -> Result<DataContainer, CkError> {
        let mut copy = self.clone();
        copy.sample_param_in_place(specs, opts)?;
        Ok(copy)
    }

    /// In-place variant of [`DataContainer::sample_param`].
    pub fn sample_param_in_place(
        &mut self,
        specs: &BTreeMap<String, SampleSpec>,
        opts: &FixOptions,
    ) -> Result<(), CkError> {
        let mut targets = BTreeMap::new();
        for (param, spec) in specs {
            let values = match *spec {
                SampleSpec::Range { min, max, count } => linspace(min, max, count),
                SampleSpec::Count(count) => {
                    let column = self.table().floats(param).map_err(|_| {
                        CkError::Configuration(
                            ErrorInfo::new("sample-param-unknown", "no such parameter column")
                                .with_context("param", param.clone()),
                        )
                    })?;
                    let min = column.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    if column.is_empty() {
                        Vec::new()
                    } else {
                        linspace(min, max, count)
                    }
                }
            };
            targets.insert(param.clone(), values);
        }
        self.fix_param_in_place(&targets, opts)
    }

    /// Returns a new container holding only the benchmark rows of `column`.
    pub fn only_bpoints(&self, column: &str) -> Result<DataContainer, CkError> {
        let mut copy = self.clone();
        copy.only_bpoints_in_place(column)?;
        Ok(copy)
    }

    /// In-place variant of [`DataContainer::only_bpoints`].
    pub fn only_bpoints_in_place(&mut self, column: &str) -> Result<(), CkError> {
        let mask = self.table().bools(column)?.to_vec();
        let filtered = self.table().filter(&mask);
        self.set_table(filtered);
        Ok(())
    }
}

fn nearest_value(column: &[f64], target: f64) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for &value in column {
        let distance = (value - target).abs();
        match best {
            Some((best_distance, _)) if distance >= best_distance => {}
            _ => best = Some((distance, value)),
        }
    }
    best.map(|(_, value)| value)
}
