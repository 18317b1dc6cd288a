//! Clustering state machine writing results back into a data container.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ck_core::errors::{CkError, ErrorInfo};
use ck_core::{timestamp, ClusterMetadata};
use ck_data::{Column, DataContainer, DataWithErrors, Rename};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::assignment::ClusterAssignment;
use crate::benchmarks::{BenchmarkPolicy, SelectionInput};
use crate::hierarchy::{Criterion, Dendrogram, Linkage};
use crate::kmeans::kmeans;
use crate::metric::{CondensedMatrix, Metric};

/// Everything a clustering algorithm may look at.
pub struct ClusterInput<'a> {
    /// Distributions with their uncertainties.
    pub data: &'a DataWithErrors,
    /// Normalised distributions per row; empty for built-in methods that
    /// work on distances only.
    pub distributions: &'a [Vec<f64>],
    /// Distances of [`ClusterAlgorithm::metric`].
    pub distances: &'a CondensedMatrix,
}

/// User supplied clustering algorithm.
pub trait ClusterAlgorithm: Send + Sync {
    /// Name recorded in the metadata.
    fn name(&self) -> &str;

    /// Parameters recorded in the metadata.
    fn args(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    /// Metric whose distances are passed in.
    fn metric(&self) -> Metric {
        Metric::Chi2
    }

    /// One label per row; labels are canonicalised afterwards.
    fn cluster(&self, input: &ClusterInput<'_>) -> Result<Vec<i64>, CkError>;
}

/// Tag of a [`ClusterMethod`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterKind {
    /// Agglomerative clustering.
    Hierarchical,
    /// Lloyd's k-means.
    KMeans,
    /// User supplied algorithm.
    Custom,
}

impl ClusterKind {
    /// Tag recorded in the metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterKind::Hierarchical => "hierarchical",
            ClusterKind::KMeans => "kmeans",
            ClusterKind::Custom => "custom",
        }
    }
}

/// Clustering algorithm and its parameters.
#[derive(Clone)]
pub enum ClusterMethod {
    /// Agglomerative clustering cut by `criterion`.
    Hierarchical {
        /// Inter-cluster distance.
        linkage: Linkage,
        /// Cut rule.
        criterion: Criterion,
        /// Pairwise distance.
        metric: Metric,
    },
    /// k-means on the normalised distributions.
    KMeans {
        /// Number of clusters.
        k: usize,
        /// Iteration cap.
        max_iterations: usize,
        /// Seed of the initial centroid choice.
        seed: u64,
    },
    /// User supplied algorithm.
    Custom(Arc<dyn ClusterAlgorithm>),
}

impl fmt::Debug for ClusterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterMethod")
            .field("kind", &self.kind())
            .field("args", &self.args())
            .finish()
    }
}

impl ClusterMethod {
    /// Tag of this method.
    pub fn kind(&self) -> ClusterKind {
        match self {
            ClusterMethod::Hierarchical { .. } => ClusterKind::Hierarchical,
            ClusterMethod::KMeans { .. } => ClusterKind::KMeans,
            ClusterMethod::Custom(_) => ClusterKind::Custom,
        }
    }

    /// Metric used for clustering and medoid benchmarks.
    pub fn metric(&self) -> Metric {
        match self {
            ClusterMethod::Hierarchical { metric, .. } => *metric,
            ClusterMethod::KMeans { .. } => Metric::Euclidean,
            ClusterMethod::Custom(algorithm) => algorithm.metric(),
        }
    }

    /// True if the method reads the normalised distributions.
    pub fn uses_distributions(&self) -> bool {
        !matches!(self, ClusterMethod::Hierarchical { .. })
    }

    /// Arguments recorded as `cluster_args`.
    pub fn args(&self) -> BTreeMap<String, Value> {
        let mut args = BTreeMap::new();
        match self {
            ClusterMethod::Hierarchical {
                linkage,
                criterion,
                metric,
            } => {
                args.insert("linkage".to_string(), json!(linkage));
                args.insert("criterion".to_string(), json!(criterion));
                args.insert("metric".to_string(), json!(metric));
            }
            ClusterMethod::KMeans {
                k,
                max_iterations,
                seed,
            } => {
                args.insert("k".to_string(), json!(k));
                args.insert("max_iterations".to_string(), json!(max_iterations));
                args.insert("seed".to_string(), json!(seed));
            }
            ClusterMethod::Custom(algorithm) => {
                args = algorithm.args();
                args.insert("name".to_string(), json!(algorithm.name()));
            }
        }
        args
    }

    fn run(&self, input: &ClusterInput<'_>) -> Result<Vec<i64>, CkError> {
        match self {
            ClusterMethod::Hierarchical {
                linkage, criterion, ..
            } => Ok(Dendrogram::build(input.distances, *linkage).fcluster(*criterion)),
            ClusterMethod::KMeans {
                k,
                max_iterations,
                seed,
            } => {
                let fit = kmeans(input.distributions, *k, *max_iterations, *seed);
                debug!(iterations = fit.iterations, "k-means converged");
                Ok(fit.assignments.into_iter().map(|slot| slot as i64).collect())
            }
            ClusterMethod::Custom(algorithm) => algorithm.cluster(input),
        }
    }
}

/// Externally visible engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStage {
    /// Nothing computed yet.
    Unclustered,
    /// Assignment available.
    Clustered,
    /// Assignment and benchmark flags available.
    BenchmarksSelected,
    /// Results written; the engine is spent.
    Written,
}

enum State {
    Unclustered,
    Clustered {
        assignment: ClusterAssignment,
        // kept as a result: zero-sum rows only matter to stages that normalise
        distributions: Result<Vec<Vec<f64>>, CkError>,
        distances: CondensedMatrix,
    },
    BenchmarksSelected {
        assignment: ClusterAssignment,
        flags: Vec<bool>,
    },
    Written,
}

/// Clusters one dataset and writes the result into it.
///
/// `cluster` → optional `select_benchmarks` → `write`; the engine cannot be
/// reused afterwards, use [`ClusterEngine::spawn`] for the next dataset.
pub struct ClusterEngine {
    method: ClusterMethod,
    policy: BenchmarkPolicy,
    state: State,
}

impl fmt::Debug for ClusterEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterEngine")
            .field("method", &self.method)
            .field("policy", &self.policy)
            .field("stage", &self.stage())
            .finish()
    }
}

fn out_of_order(code: &str, message: &str, stage: EngineStage) -> CkError {
    CkError::Configuration(
        ErrorInfo::new(code, message).with_context("stage", format!("{stage:?}")),
    )
}

impl ClusterEngine {
    /// Unclustered engine with the default benchmark policy.
    pub fn new(method: ClusterMethod) -> Self {
        Self::with_policy(method, BenchmarkPolicy::default())
    }

    /// Unclustered engine selecting benchmarks with `policy`.
    pub fn with_policy(method: ClusterMethod, policy: BenchmarkPolicy) -> Self {
        Self {
            method,
            policy,
            state: State::Unclustered,
        }
    }

    /// Fresh unclustered engine with the same configuration.
    pub fn spawn(&self) -> Self {
        Self::with_policy(self.method.clone(), self.policy.clone())
    }

    /// Configured method.
    pub fn method(&self) -> &ClusterMethod {
        &self.method
    }

    /// Current stage.
    pub fn stage(&self) -> EngineStage {
        match self.state {
            State::Unclustered => EngineStage::Unclustered,
            State::Clustered { .. } => EngineStage::Clustered,
            State::BenchmarksSelected { .. } => EngineStage::BenchmarksSelected,
            State::Written => EngineStage::Written,
        }
    }

    /// Assignment, once clustered and until written.
    pub fn assignment(&self) -> Option<&ClusterAssignment> {
        match &self.state {
            State::Clustered { assignment, .. } | State::BenchmarksSelected { assignment, .. } => {
                Some(assignment)
            }
            _ => None,
        }
    }

    /// Benchmark flags, once selected and until written.
    pub fn benchmarks(&self) -> Option<&[bool]> {
        match &self.state {
            State::BenchmarksSelected { flags, .. } => Some(flags),
            _ => None,
        }
    }

    /// Clusters `data`.
    ///
    /// Re-clustering an already clustered engine discards the previous
    /// result and any selected benchmarks.
    pub fn cluster(&mut self, data: &DataWithErrors) -> Result<&ClusterAssignment, CkError> {
        if matches!(self.state, State::Written) {
            return Err(out_of_order(
                "engine-spent",
                "engine results were already written",
                EngineStage::Written,
            ));
        }
        let n = data.n();
        if n == 0 {
            return Err(CkError::schema("cluster-empty", "no rows to cluster"));
        }
        info!(rows = n, algorithm = self.method.kind().as_str(), "clustering");
        let distributions = data.data_container().data(true);
        let distances = self.method.metric().condensed(data)?;
        let rows: &[Vec<f64>] = match &distributions {
            Ok(rows) => rows,
            Err(err) if self.method.uses_distributions() => return Err(err.clone()),
            Err(err) => {
                debug!(%err, "normalised distributions unavailable");
                &[]
            }
        };
        let labels = self.method.run(&ClusterInput {
            data,
            distributions: rows,
            distances: &distances,
        })?;
        if labels.len() != n {
            return Err(CkError::Schema(
                ErrorInfo::new("cluster-label-count", "algorithm returned wrong number of labels")
                    .with_context("expected", n.to_string())
                    .with_context("found", labels.len().to_string()),
            ));
        }
        let assignment = ClusterAssignment::from_labels(&labels);
        info!(clusters = assignment.n_clusters(), "clustering done");
        self.state = State::Clustered {
            assignment,
            distributions,
            distances,
        };
        self.assignment()
            .ok_or_else(|| CkError::config("engine-state", "clustering result missing"))
    }

    /// Convenience for containers carrying their error model in the metadata.
    pub fn cluster_container(
        &mut self,
        data: &DataContainer,
    ) -> Result<&ClusterAssignment, CkError> {
        self.cluster(&DataWithErrors::new(data.clone()))
    }

    /// Flags the benchmark points of the current clustering.
    pub fn select_benchmarks(&mut self) -> Result<&[bool], CkError> {
        let state = std::mem::replace(&mut self.state, State::Unclustered);
        let (assignment, flags) = match state {
            State::Clustered {
                assignment,
                distributions,
                distances,
            } => {
                let selected = match &distributions {
                    Err(err) if self.policy.uses_distributions() => Err(err.clone()),
                    rows => self.policy.select(&SelectionInput {
                        distributions: rows.as_deref().unwrap_or(&[]),
                        distances: &distances,
                        assignment: &assignment,
                    }),
                };
                match selected {
                    Ok(flags) => (assignment, flags),
                    Err(err) => {
                        self.state = State::Clustered {
                            assignment,
                            distributions,
                            distances,
                        };
                        return Err(err);
                    }
                }
            }
            other => {
                let stage = match other {
                    State::Unclustered => EngineStage::Unclustered,
                    State::BenchmarksSelected { .. } => EngineStage::BenchmarksSelected,
                    _ => EngineStage::Written,
                };
                self.state = other;
                return Err(out_of_order(
                    "engine-select-order",
                    "must cluster before selecting benchmarks",
                    stage,
                ));
            }
        };
        debug!(
            benchmarks = flags.iter().filter(|&&flag| flag).count(),
            "benchmarks selected"
        );
        self.state = State::BenchmarksSelected { assignment, flags };
        self.benchmarks()
            .ok_or_else(|| CkError::config("engine-state", "benchmark flags missing"))
    }

    /// Writes the assignment to `column` (and benchmarks to `<column>_bp`).
    ///
    /// The clustering is recorded in the metadata under `cluster.<column>`.
    pub fn write(&mut self, data: &mut DataContainer, column: &str) -> Result<(), CkError> {
        let (assignment, flags) = match &self.state {
            State::Clustered { assignment, .. } => (assignment, None),
            State::BenchmarksSelected { assignment, flags } => (assignment, Some(flags)),
            State::Unclustered => {
                return Err(out_of_order(
                    "engine-write-order",
                    "must cluster before writing",
                    EngineStage::Unclustered,
                ))
            }
            State::Written => {
                return Err(out_of_order(
                    "engine-spent",
                    "engine results were already written",
                    EngineStage::Written,
                ))
            }
        };
        if assignment.len() != data.n() {
            return Err(CkError::Schema(
                ErrorInfo::new("cluster-write-rows", "container has a different number of rows")
                    .with_context("clustered", assignment.len().to_string())
                    .with_context("container", data.n().to_string()),
            ));
        }

        data.set_column(Column::int(column, assignment.ids().to_vec()))?;
        data.rename_clusters(column, Rename::Auto, None)?;
        let bp_column = format!("{column}_bp");
        if let Some(flags) = flags {
            data.set_column(Column::bool(bp_column.clone(), flags.clone()))?;
        }
        data.metadata_mut().record_cluster(
            column,
            ClusterMetadata {
                algorithm: self.method.kind().as_str().to_string(),
                cluster_args: self.method.args(),
                n_clusters: assignment.n_clusters(),
                select_bpoints_args: flags.map(|_| self.policy.args()),
                time: timestamp(),
            },
        );
        info!(column, benchmarks = flags.is_some(), "clustering written");
        self.state = State::Written;
        Ok(())
    }
}
