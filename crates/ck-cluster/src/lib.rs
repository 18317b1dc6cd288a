#![deny(missing_docs)]
#![doc = "Chi² distances, clustering and benchmark selection for scanned distributions."]

pub mod assignment;
pub mod benchmarks;
pub mod config;
pub mod engine;
pub mod hierarchy;
pub mod kmeans;
pub mod metric;

pub use assignment::ClusterAssignment;
pub use benchmarks::{BenchmarkPolicy, BenchmarkSelector, BenchmarkSpec, SelectionInput};
pub use config::{load_cluster_config, ClusterConfig, ErrorsSpec, MethodSpec};
pub use engine::{
    ClusterAlgorithm, ClusterEngine, ClusterInput, ClusterKind, ClusterMethod, EngineStage,
};
pub use hierarchy::{Criterion, Dendrogram, Linkage, Merge};
pub use kmeans::{kmeans, KMeansFit};
pub use metric::{
    chi2, condense, euclidean, uncondense, CondensedMatrix, DistanceMatrix, DistanceOutput, Metric,
};
