//! Benchmark (representative) point selection.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ck_core::errors::{CkError, ErrorInfo};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::assignment::ClusterAssignment;
use crate::kmeans::select_representative;
use crate::metric::CondensedMatrix;

/// Everything a selector may look at.
pub struct SelectionInput<'a> {
    /// Normalised distributions per row; may be empty for [`BenchmarkPolicy::Medoid`].
    pub distributions: &'a [Vec<f64>],
    /// Distances of the clustering metric.
    pub distances: &'a CondensedMatrix,
    /// Clustering to select from.
    pub assignment: &'a ClusterAssignment,
}

/// Custom benchmark selection.
pub trait BenchmarkSelector: Send + Sync {
    /// Name recorded in the metadata.
    fn name(&self) -> &str;

    /// Parameters recorded in the metadata.
    fn args(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    /// One flag per row.
    fn select(&self, input: &SelectionInput<'_>) -> Result<Vec<bool>, CkError>;
}

/// How benchmark points are chosen within each cluster.
#[derive(Clone)]
pub enum BenchmarkPolicy {
    /// Rows with the smallest summed distance to the other members.
    Medoid {
        /// Benchmarks per cluster.
        count: usize,
    },
    /// Rows closest to the mean distribution of the cluster.
    Centroid {
        /// Benchmarks per cluster.
        count: usize,
    },
    /// User supplied selection.
    Custom(Arc<dyn BenchmarkSelector>),
}

impl Default for BenchmarkPolicy {
    fn default() -> Self {
        BenchmarkPolicy::Medoid { count: 1 }
    }
}

impl fmt::Debug for BenchmarkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchmarkPolicy::Medoid { count } => {
                f.debug_struct("Medoid").field("count", count).finish()
            }
            BenchmarkPolicy::Centroid { count } => {
                f.debug_struct("Centroid").field("count", count).finish()
            }
            BenchmarkPolicy::Custom(selector) => {
                f.debug_tuple("Custom").field(&selector.name()).finish()
            }
        }
    }
}

/// Serializable form of the built-in policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BenchmarkSpec {
    /// See [`BenchmarkPolicy::Medoid`].
    Medoid {
        /// Benchmarks per cluster.
        #[serde(default = "default_count")]
        count: usize,
    },
    /// See [`BenchmarkPolicy::Centroid`].
    Centroid {
        /// Benchmarks per cluster.
        #[serde(default = "default_count")]
        count: usize,
    },
}

fn default_count() -> usize {
    1
}

impl From<BenchmarkSpec> for BenchmarkPolicy {
    fn from(spec: BenchmarkSpec) -> Self {
        match spec {
            BenchmarkSpec::Medoid { count } => BenchmarkPolicy::Medoid { count },
            BenchmarkSpec::Centroid { count } => BenchmarkPolicy::Centroid { count },
        }
    }
}

impl BenchmarkPolicy {
    /// Arguments recorded as `select_bpoints_args`.
    pub fn args(&self) -> BTreeMap<String, Value> {
        let mut args = BTreeMap::new();
        match self {
            BenchmarkPolicy::Medoid { count } => {
                args.insert("policy".to_string(), json!("medoid"));
                args.insert("count".to_string(), json!(count));
            }
            BenchmarkPolicy::Centroid { count } => {
                args.insert("policy".to_string(), json!("centroid"));
                args.insert("count".to_string(), json!(count));
            }
            BenchmarkPolicy::Custom(selector) => {
                args = selector.args();
                args.insert("policy".to_string(), json!(selector.name()));
            }
        }
        args
    }

    /// True if the policy reads the normalised distributions.
    pub fn uses_distributions(&self) -> bool {
        !matches!(self, BenchmarkPolicy::Medoid { .. })
    }

    /// Flags at most `count` rows per cluster.
    pub fn select(&self, input: &SelectionInput<'_>) -> Result<Vec<bool>, CkError> {
        let rows = input.assignment.len();
        let distributions_missing =
            self.uses_distributions() && input.distributions.len() != rows;
        if input.distances.n() != rows || distributions_missing {
            return Err(CkError::Schema(
                ErrorInfo::new("bpoints-size-mismatch", "inputs cover different rows")
                    .with_context("assignment", rows.to_string())
                    .with_context("distances", input.distances.n().to_string())
                    .with_context("distributions", input.distributions.len().to_string()),
            ));
        }
        let mut flags = vec![false; rows];
        match self {
            BenchmarkPolicy::Medoid { count } => {
                for members in input.assignment.members() {
                    let mut scored: Vec<(f64, usize)> = members
                        .iter()
                        .map(|&row| {
                            let total: f64 = members
                                .iter()
                                .map(|&other| input.distances.get(row, other))
                                .sum();
                            (total, row)
                        })
                        .collect();
                    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                    for (_, row) in scored.into_iter().take(*count) {
                        flags[row] = true;
                    }
                }
            }
            BenchmarkPolicy::Centroid { count } => {
                for mut members in input.assignment.members() {
                    let centroid = mean(&members, input.distributions);
                    for _ in 0..(*count).min(members.len()) {
                        let row = select_representative(&members, input.distributions, &centroid);
                        flags[row] = true;
                        members.retain(|&m| m != row);
                    }
                }
            }
            BenchmarkPolicy::Custom(selector) => {
                flags = selector.select(input)?;
                if flags.len() != rows {
                    return Err(CkError::Schema(
                        ErrorInfo::new(
                            "bpoints-custom-length",
                            "selector returned wrong number of flags",
                        )
                            .with_context("selector", selector.name())
                            .with_context("expected", rows.to_string())
                            .with_context("found", flags.len().to_string()),
                    ));
                }
            }
        }
        Ok(flags)
    }
}

fn mean(members: &[usize], rows: &[Vec<f64>]) -> Vec<f64> {
    let width = members.first().map_or(0, |&m| rows[m].len());
    let mut sum = vec![0.0; width];
    for &member in members {
        for (slot, value) in sum.iter_mut().zip(&rows[member]) {
            *slot += value;
        }
    }
    let denom = members.len().max(1) as f64;
    sum.iter_mut().for_each(|v| *v /= denom);
    sum
}
