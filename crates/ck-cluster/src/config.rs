//! YAML clustering configuration.

use std::fs;
use std::path::Path;

use ck_core::errors::{CkError, ErrorInfo};
use ck_core::serde::from_yaml_slice;
use ck_data::{DataContainer, DataWithErrors};
use serde::{Deserialize, Serialize};

use crate::assignment::ClusterAssignment;
use crate::benchmarks::BenchmarkSpec;
use crate::engine::{ClusterEngine, ClusterMethod};
use crate::hierarchy::{Criterion, Linkage};
use crate::metric::Metric;

/// Serializable form of the built-in clustering methods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MethodSpec {
    /// See [`ClusterMethod::Hierarchical`].
    Hierarchical {
        /// Inter-cluster distance.
        #[serde(default)]
        linkage: Linkage,
        /// Cut rule.
        criterion: Criterion,
        /// Pairwise distance.
        #[serde(default)]
        metric: Metric,
    },
    /// See [`ClusterMethod::KMeans`].
    KMeans {
        /// Number of clusters.
        k: usize,
        /// Iteration cap.
        #[serde(default = "MethodSpec::default_max_iterations")]
        max_iterations: usize,
        /// Initialisation seed.
        #[serde(default)]
        seed: u64,
    },
}

impl MethodSpec {
    const fn default_max_iterations() -> usize {
        100
    }
}

impl From<MethodSpec> for ClusterMethod {
    fn from(spec: MethodSpec) -> Self {
        match spec {
            MethodSpec::Hierarchical {
                linkage,
                criterion,
                metric,
            } => ClusterMethod::Hierarchical {
                linkage,
                criterion,
                metric,
            },
            MethodSpec::KMeans {
                k,
                max_iterations,
                seed,
            } => ClusterMethod::KMeans {
                k,
                max_iterations,
                seed,
            },
        }
    }
}

/// Uncertainties added before computing distances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ErrorsSpec {
    /// Absolute error per bin.
    #[serde(default)]
    pub abs: f64,
    /// Relative error per bin.
    #[serde(default)]
    pub rel: f64,
    /// Poisson scale (events per unit of content).
    #[serde(default)]
    pub poisson: Option<f64>,
}

impl ErrorsSpec {
    /// Wraps `data` with exactly these uncertainties, replacing any recorded model.
    pub fn apply(&self, data: DataContainer) -> Result<DataWithErrors, CkError> {
        let mut dwe = DataWithErrors::new(data);
        dwe.reset_errors();
        if self.abs > 0.0 {
            dwe.add_err_uncorr(self.abs);
        }
        if self.rel > 0.0 {
            dwe.add_rel_err_uncorr(self.rel);
        }
        if let Some(scale) = self.poisson {
            dwe.add_err_poisson(scale)?;
        }
        Ok(dwe)
    }
}

/// Complete clustering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Algorithm.
    pub method: MethodSpec,
    /// Benchmark selection; none when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmarks: Option<BenchmarkSpec>,
    /// Uncertainties added to the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorsSpec>,
    /// Output column.
    #[serde(default = "ClusterConfig::default_column")]
    pub column: String,
}

impl ClusterConfig {
    fn default_column() -> String {
        "cluster".to_string()
    }

    /// Unclustered engine for this configuration.
    pub fn engine(&self) -> ClusterEngine {
        match self.benchmarks {
            Some(spec) => ClusterEngine::with_policy(self.method.into(), spec.into()),
            None => ClusterEngine::new(self.method.into()),
        }
    }

    /// Wraps `data` with the configured uncertainties.
    ///
    /// Without an `errors` section the error model stored in the metadata is used.
    pub fn with_errors(&self, data: DataContainer) -> Result<DataWithErrors, CkError> {
        match self.errors {
            Some(errors) => errors.apply(data),
            None => Ok(DataWithErrors::new(data)),
        }
    }

    /// Clusters `data` in place: cluster, select benchmarks if configured, write.
    pub fn apply(&self, data: &mut DataContainer) -> Result<ClusterAssignment, CkError> {
        let dwe = self.with_errors(data.clone())?;
        let mut engine = self.engine();
        let assignment = engine.cluster(&dwe)?.clone();
        if self.benchmarks.is_some() {
            engine.select_benchmarks()?;
        }
        *data = dwe.into_inner();
        engine.write(data, &self.column)?;
        Ok(assignment)
    }
}

/// Loads and validates a clustering configuration.
pub fn load_cluster_config<P: AsRef<Path>>(path: P) -> Result<ClusterConfig, CkError> {
    let config_path = path.as_ref();
    let bytes =
        fs::read(config_path).map_err(|err| CkError::io("cluster-config-read", config_path, err))?;
    let config: ClusterConfig = from_yaml_slice(&bytes)?;
    if config.column.is_empty() || config.column.ends_with("_bp") {
        return Err(CkError::Configuration(
            ErrorInfo::new("cluster-column-invalid", "invalid output column name")
                .with_context("column", config.column.clone())
                .with_path(config_path),
        ));
    }
    if let MethodSpec::KMeans { k: 0, .. } = config.method {
        return Err(CkError::Configuration(
            ErrorInfo::new("kmeans-k-zero", "k-means needs at least one cluster")
                .with_path(config_path),
        ));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses_with_defaults() {
        let yaml = r#"
method:
  type: hierarchical
  criterion:
    type: maxclust
    k: 3
benchmarks:
  type: medoid
errors:
  rel: 0.01
"#;
        let config: ClusterConfig = from_yaml_slice(yaml.as_bytes()).unwrap();
        assert_eq!(config.column, "cluster");
        assert_eq!(
            config.method,
            MethodSpec::Hierarchical {
                linkage: Linkage::Complete,
                criterion: Criterion::MaxClust { k: 3 },
                metric: Metric::Chi2,
            }
        );
        assert_eq!(config.benchmarks, Some(BenchmarkSpec::Medoid { count: 1 }));
    }

    #[test]
    fn invalid_columns_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.yaml");
        fs::write(
            &path,
            "method:\n  type: kmeans\n  k: 2\ncolumn: cluster_bp\n",
        )
        .unwrap();
        assert!(matches!(
            load_cluster_config(&path),
            Err(CkError::Configuration(_))
        ));
    }
}
