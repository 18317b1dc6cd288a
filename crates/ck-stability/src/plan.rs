//! YAML stability plans.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use ck_cluster::ErrorsSpec;
use ck_core::errors::{CkError, ErrorInfo};
use ck_core::serde::from_yaml_slice;
use ck_scan::NoiseSpec;
use serde::{Deserialize, Serialize};

use crate::fom::{DeltaNClusters, FigureOfMerit, MatchingClusters, RandIndex};
use crate::tester::StabilityTester;

/// Built-in figure of merit called `name`.
pub fn builtin_fom(name: &str) -> Result<Arc<dyn FigureOfMerit>, CkError> {
    match name {
        MatchingClusters::NAME => Ok(Arc::new(MatchingClusters)),
        DeltaNClusters::NAME => Ok(Arc::new(DeltaNClusters)),
        RandIndex::NAME => Ok(Arc::new(RandIndex)),
        other => Err(CkError::Configuration(
            ErrorInfo::new("fom-unknown", "unknown figure of merit")
                .with_context("name", other)
                .with_hint("use one of: matching_clusters, delta_n_clusters, rand_index"),
        )),
    }
}

/// Complete description of a stability test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityPlan {
    /// Perturbation applied in every repetition.
    pub noise: NoiseSpec,
    /// Number of perturbed repetitions.
    #[serde(default = "StabilityPlan::default_repeat")]
    pub repeat: usize,
    /// Figures of merit; all built-ins when empty.
    #[serde(default)]
    pub foms: Vec<String>,
    /// Keep the scanned containers.
    #[serde(default)]
    pub cache: bool,
    /// Uncertainties added before clustering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorsSpec>,
}

impl StabilityPlan {
    fn default_repeat() -> usize {
        10
    }

    /// Plan with the default settings around `noise`.
    pub fn with_noise(noise: NoiseSpec) -> Self {
        Self {
            noise,
            repeat: Self::default_repeat(),
            foms: Vec::new(),
            cache: false,
            errors: None,
        }
    }

    /// Tester configured by this plan.
    pub fn tester(&self) -> Result<StabilityTester, CkError> {
        let mut tester = StabilityTester::new(self.noise.noise, self.noise.seed);
        if self.foms.is_empty() {
            tester = tester.with_default_foms();
        }
        for name in &self.foms {
            tester.add_fom(builtin_fom(name)?);
        }
        tester
            .set_repeat(self.repeat)
            .set_cache(self.cache)
            .set_errors(self.errors);
        Ok(tester)
    }
}

/// Loads and validates a stability plan from `path`.
pub fn load_stability_plan<P: AsRef<Path>>(path: P) -> Result<StabilityPlan, CkError> {
    let plan_path = path.as_ref();
    let bytes =
        fs::read(plan_path).map_err(|err| CkError::io("stability-plan-read", plan_path, err))?;
    let mut plan: StabilityPlan = from_yaml_slice(&bytes).map_err(|err| {
        CkError::Serde(err.info().clone().with_path(plan_path))
    })?;
    for name in &plan.foms {
        builtin_fom(name).map_err(|err| CkError::Configuration(err.info().clone().with_path(plan_path)))?;
    }
    plan.foms.sort();
    plan.foms.dedup();
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_plan(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let file = write_plan("noise:\n  kind:\n    type: gauss\n    sigma: 0.1\n  seed: 7\n");
        let plan = load_stability_plan(file.path()).unwrap();
        assert_eq!(plan.repeat, 10);
        assert_eq!(plan.noise.seed, 7);
        assert!(!plan.cache);
        let tester = plan.tester().unwrap();
        assert_eq!(
            tester.fom_names(),
            vec!["matching_clusters", "delta_n_clusters", "rand_index"]
        );
    }

    #[test]
    fn listed_foms_are_sorted_and_deduplicated() {
        let file = write_plan(
            "noise:\n  kind:\n    type: uniform\n    half_width: 0.2\n  mode: relative\nfoms: [rand_index, delta_n_clusters, rand_index]\n",
        );
        let plan = load_stability_plan(file.path()).unwrap();
        assert_eq!(plan.foms, vec!["delta_n_clusters", "rand_index"]);
    }

    #[test]
    fn unknown_fom_is_rejected() {
        let file = write_plan("noise:\n  kind:\n    type: gauss\n    sigma: 0.1\nfoms: [purity]\n");
        let err = load_stability_plan(file.path()).unwrap_err();
        assert!(matches!(err, CkError::Configuration(_)));
        assert!(err.to_string().contains("purity"));
    }
}
