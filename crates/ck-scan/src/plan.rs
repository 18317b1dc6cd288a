//! YAML scan plans.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ck_core::errors::{CkError, ErrorInfo};
use ck_core::serde::{from_yaml_slice, to_yaml_string};
use ck_core::{stable_hash_string, RangeSpec};
use serde::{Deserialize, Serialize};

use crate::dfunction::{FunctionRegistry, Polynomial};
use crate::noise::Noise;
use crate::scanner::{Scanner, SpointsLabels};

/// How the sample points are generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sampling", rename_all = "lowercase")]
pub enum SpointsSpec {
    /// Explicit value lists.
    Grid {
        /// Values per parameter.
        values: BTreeMap<String, Vec<f64>>,
    },
    /// Equidistant values per parameter.
    Equidistant {
        /// Range per parameter.
        ranges: BTreeMap<String, RangeSpec>,
    },
}

/// Distribution function of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DFunctionSpec {
    /// Registered function name.
    #[serde(default = "DFunctionSpec::default_name")]
    pub name: String,
    /// Bin edges.
    pub binning: Vec<f64>,
    /// Normalise every distribution to unit sum.
    #[serde(default = "DFunctionSpec::default_normalize")]
    pub normalize: bool,
}

impl DFunctionSpec {
    fn default_name() -> String {
        Polynomial::NAME.to_string()
    }

    fn default_normalize() -> bool {
        true
    }
}

/// Noise section of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseSpec {
    /// Noise model.
    #[serde(flatten)]
    pub noise: Noise,
    /// Master seed.
    #[serde(default)]
    pub seed: u64,
}

/// Complete description of a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanPlan {
    /// Sample points.
    pub spoints: SpointsSpec,
    /// Scale label.
    #[serde(default)]
    pub scale: Option<f64>,
    /// Effective theory label.
    #[serde(default)]
    pub eft: Option<String>,
    /// Basis label.
    #[serde(default)]
    pub basis: Option<String>,
    /// Distribution function.
    pub dfunction: DFunctionSpec,
    /// Optional perturbation of the points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise: Option<NoiseSpec>,
    /// Worker threads; all cores when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl ScanPlan {
    /// Registry with the built-in functions configured by this plan.
    pub fn registry(&self) -> Result<FunctionRegistry, CkError> {
        FunctionRegistry::with_builtins(self.dfunction.binning.clone(), self.dfunction.normalize)
    }

    /// Scanner configured by this plan.
    pub fn scanner(&self) -> Result<Scanner, CkError> {
        let mut scanner = Scanner::new(self.registry()?);
        match &self.spoints {
            SpointsSpec::Grid { values } => scanner.set_spoints_grid(values.clone()),
            SpointsSpec::Equidistant { ranges } => scanner.set_spoints_equidist(ranges.clone()),
        };
        scanner
            .set_labels(SpointsLabels {
                scale: self.scale,
                eft: self.eft.clone(),
                basis: self.basis.clone(),
            })
            .set_workers(self.workers)
            .set_dfunction(&self.dfunction.name)?;
        if let Some(spec) = self.noise {
            scanner.set_noise(spec.noise, spec.seed);
        }
        Ok(scanner)
    }

    /// Stable hash of the plan.
    pub fn hash(&self) -> Result<String, CkError> {
        stable_hash_string(self)
    }

    /// YAML rendering of the plan.
    pub fn to_yaml(&self) -> Result<String, CkError> {
        to_yaml_string(self)
    }
}

/// Loads and validates a plan from `path`.
pub fn load_plan<P: AsRef<Path>>(path: P) -> Result<ScanPlan, CkError> {
    let plan_path = path.as_ref();
    let bytes = fs::read(plan_path).map_err(|err| CkError::io("plan-read", plan_path, err))?;
    let plan: ScanPlan = from_yaml_slice(&bytes).map_err(|err| {
        let mut info = err.info().clone();
        info.context
            .insert("path".to_string(), plan_path.display().to_string());
        CkError::Serde(info)
    })?;
    let space_is_empty = match &plan.spoints {
        SpointsSpec::Grid { values } => values.is_empty(),
        SpointsSpec::Equidistant { ranges } => ranges.is_empty(),
    };
    if space_is_empty {
        return Err(CkError::Configuration(
            ErrorInfo::new("plan-no-parameters", "plan samples no parameters").with_path(plan_path),
        ));
    }
    Ok(plan)
}
