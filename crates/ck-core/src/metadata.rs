//! Typed metadata record persisted next to every data table.
//!
//! The record is passed and returned by value between pipeline stages. Each
//! stage owns one section: the scanner writes `scan`, a cluster engine adds an
//! entry to `cluster`, the error model writes `errors`. Keys written by other
//! tools survive a load/write cycle through `extra`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provenance::RunProvenance;

/// How the sample points of a scan were generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sampling {
    /// Explicit per-parameter value lists.
    #[default]
    Grid,
    /// `linspace(min, max, count)` per parameter.
    Equidistant,
}

/// Inclusive range with a number of equidistant points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    /// Lower end (inclusive).
    pub min: f64,
    /// Upper end (inclusive).
    pub max: f64,
    /// Number of points between `min` and `max`.
    pub count: usize,
}

/// Description of the sampled parameter space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SpointsMetadata {
    /// Parameter names in sorted order (the table column order).
    pub coeffs: Vec<String>,
    /// Value lists per parameter.
    pub values: BTreeMap<String, Vec<f64>>,
    /// Scale at which the parameters are defined.
    pub scale: Option<f64>,
    /// Effective theory label of the parameters.
    pub eft: Option<String>,
    /// Basis label of the parameters.
    pub basis: Option<String>,
    /// Sampling scheme.
    pub sampling: Sampling,
    /// Ranges used for equidistant sampling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges: Option<BTreeMap<String, RangeSpec>>,
    /// Noise applied to the points before evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise: Option<Value>,
}

/// Description of the distribution function evaluated at every point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DFunctionMetadata {
    /// Registered name of the function.
    pub name: String,
    /// Free-form documentation of the function.
    pub doc: String,
    /// Keyword arguments the function was configured with.
    pub kwargs: BTreeMap<String, Value>,
    /// Number of bins of every distribution.
    pub nbins: usize,
    /// Bin edges when the function integrates a density.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binning: Option<Vec<f64>>,
    /// Whether the distributions were normalised to unit sum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalize: Option<bool>,
}

/// Scan section of the metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScanMetadata {
    /// Time at which the scan finished.
    pub time: String,
    /// Sample point description.
    pub spoints: SpointsMetadata,
    /// Distribution function description.
    pub dfunction: DFunctionMetadata,
    /// Configuration hash, seed and tool versions.
    #[serde(default)]
    pub provenance: RunProvenance,
}

/// Record of one clustering written into a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClusterMetadata {
    /// Algorithm tag (`hierarchical`, `kmeans`, `custom`).
    pub algorithm: String,
    /// Parameters the algorithm ran with.
    pub cluster_args: BTreeMap<String, Value>,
    /// Number of distinct clusters found.
    pub n_clusters: usize,
    /// Benchmark selection parameters, if benchmarks were selected.
    pub select_bpoints_args: Option<BTreeMap<String, Value>>,
    /// Time at which the clustering was written.
    pub time: String,
}

/// Uncorrelated uncertainties attached to the distributions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ErrorsMetadata {
    /// Absolute uncertainty per bin.
    pub abs: f64,
    /// Relative uncertainty per bin.
    pub rel: f64,
    /// Scale factor converting normalised contents to event counts for Poisson errors.
    pub poisson: Option<f64>,
}

/// Metadata bundle of a data container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Metadata {
    /// Scan configuration and provenance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanMetadata>,
    /// Clusterings keyed by the column they were written to.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cluster: BTreeMap<String, ClusterMetadata>,
    /// Error model used for distance computations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorsMetadata>,
    /// Keys not understood by this version, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Metadata {
    /// Parameter column names recorded by the scanner.
    pub fn par_cols(&self) -> &[String] {
        self.scan
            .as_ref()
            .map(|scan| scan.spoints.coeffs.as_slice())
            .unwrap_or(&[])
    }

    /// Records (or replaces) the clustering written under `column`.
    pub fn record_cluster(&mut self, column: impl Into<String>, record: ClusterMetadata) {
        self.cluster.insert(column.into(), record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_keys_survive_roundtrip() {
        let raw = json!({
            "scan": {
                "time": "Mon  3 Jun 2024 14:05",
                "spoints": {
                    "coeffs": ["a", "b"],
                    "values": {"a": [0.0], "b": [1.0, 2.0]},
                    "scale": 5.0, "eft": "WET", "basis": "flavio",
                    "sampling": "grid"
                },
                "dfunction": {"name": "f", "doc": "", "kwargs": {}, "nbins": 3}
            },
            "plots": {"style": "dark"}
        });
        let md: Metadata = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(md.par_cols(), ["a".to_string(), "b".to_string()]);
        assert_eq!(md.extra["plots"], json!({"style": "dark"}));
        let again = serde_json::to_value(&md).unwrap();
        assert_eq!(again["plots"], raw["plots"]);
        assert_eq!(again["scan"]["spoints"]["eft"], "WET");
    }

    #[test]
    fn empty_record_has_no_parameters() {
        assert!(Metadata::default().par_cols().is_empty());
    }
}
