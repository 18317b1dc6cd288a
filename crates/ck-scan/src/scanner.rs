//! Scan orchestration: space + function → table + metadata.

use std::collections::BTreeMap;
use std::sync::Arc;

use ck_core::errors::{CkError, ErrorInfo};
use ck_core::{stable_hash_string, timestamp, RangeSpec, RunProvenance, ScanMetadata};
use ck_data::{DataContainer, Table};
use serde_json::json;
use tracing::{debug, info};

use crate::assemble::assemble;
use crate::dfunction::{DistributionFunction, FunctionRegistry};
use crate::noise::Noise;
use crate::pool::{CancelToken, Job, ProgressObserver, RunHooks, WorkerPool};
use crate::space::ParameterSpace;

/// Labels attached to the sampled parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpointsLabels {
    /// Scale at which the parameters are defined.
    pub scale: Option<f64>,
    /// Effective theory.
    pub eft: Option<String>,
    /// Basis.
    pub basis: Option<String>,
}

/// Table and scan metadata produced by [`Scanner::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    /// One row per sample point.
    pub table: Table,
    /// `scan` section of the metadata.
    pub metadata: ScanMetadata,
}

impl ScanResult {
    /// Fresh container holding the result.
    pub fn into_container(self) -> DataContainer {
        let mut data = DataContainer::empty();
        self.write_into(&mut data);
        data
    }

    /// Replaces the table of `data` and its `scan` metadata.
    ///
    /// Clusterings recorded for the previous table are dropped.
    pub fn write_into(self, data: &mut DataContainer) {
        data.set_table(self.table);
        let metadata = data.metadata_mut();
        if !metadata.cluster.is_empty() {
            debug!(
                clusterings = metadata.cluster.len(),
                "dropping clusterings of the replaced table"
            );
            metadata.cluster.clear();
        }
        metadata.scan = Some(self.metadata);
    }
}

/// Configures and runs a scan.
#[derive(Clone)]
pub struct Scanner {
    registry: FunctionRegistry,
    space: Option<ParameterSpace>,
    labels: SpointsLabels,
    function: Option<Arc<dyn DistributionFunction>>,
    noise: Option<(Noise, u64)>,
    workers: Option<usize>,
    observer: Option<Arc<dyn ProgressObserver>>,
    cancel: CancelToken,
}

impl Scanner {
    /// Scanner resolving function names through `registry`.
    pub fn new(registry: FunctionRegistry) -> Self {
        Self {
            registry,
            space: None,
            labels: SpointsLabels::default(),
            function: None,
            noise: None,
            workers: None,
            observer: None,
            cancel: CancelToken::new(),
        }
    }

    /// Samples the cartesian product of explicit value lists.
    pub fn set_spoints_grid(&mut self, values: BTreeMap<String, Vec<f64>>) -> &mut Self {
        self.space = Some(ParameterSpace::grid(values));
        self
    }

    /// Samples `linspace(min, max, count)` per parameter.
    pub fn set_spoints_equidist(&mut self, ranges: BTreeMap<String, RangeSpec>) -> &mut Self {
        self.space = Some(ParameterSpace::equidistant(ranges));
        self
    }

    /// Sets scale, eft and basis labels recorded in the metadata.
    pub fn set_labels(&mut self, labels: SpointsLabels) -> &mut Self {
        self.labels = labels;
        self
    }

    /// Selects the registered distribution function `name`.
    pub fn set_dfunction(&mut self, name: &str) -> Result<&mut Self, CkError> {
        self.function = Some(self.registry.get(name)?);
        Ok(self)
    }

    /// Registers `function` and selects it.
    pub fn set_dfunction_instance(&mut self, function: Arc<dyn DistributionFunction>) -> &mut Self {
        self.registry.register(Arc::clone(&function));
        self.function = Some(function);
        self
    }

    /// Perturbs the sample points of [`Scanner::run`] with `noise`.
    pub fn set_noise(&mut self, noise: Noise, seed: u64) -> &mut Self {
        self.noise = Some((noise, seed));
        self
    }

    /// Number of worker threads; `None` uses all available cores.
    pub fn set_workers(&mut self, workers: Option<usize>) -> &mut Self {
        self.workers = workers;
        self
    }

    /// Receives progress updates during [`Scanner::run`].
    pub fn set_progress_observer(&mut self, observer: Arc<dyn ProgressObserver>) -> &mut Self {
        self.observer = Some(observer);
        self
    }

    /// Token that cancels running scans of this scanner.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Configured parameter space.
    pub fn space(&self) -> Option<&ParameterSpace> {
        self.space.as_ref()
    }

    /// Runs the scan, applying the configured noise (repetition 0) if any.
    pub fn run(&self) -> Result<ScanResult, CkError> {
        match self.noise {
            Some((noise, seed)) => self.run_with_noise(&noise, seed, 0),
            None => self.run_points(None),
        }
    }

    /// Runs the scan on the unperturbed points, ignoring any configured noise.
    pub fn run_without_noise(&self) -> Result<ScanResult, CkError> {
        self.run_points(None)
    }

    /// Runs the scan on points perturbed by `noise` for `repetition` of `seed`.
    pub fn run_with_noise(
        &self,
        noise: &Noise,
        seed: u64,
        repetition: u64,
    ) -> Result<ScanResult, CkError> {
        self.run_points(Some((noise, seed, repetition)))
    }

    fn run_points(&self, noise: Option<(&Noise, u64, u64)>) -> Result<ScanResult, CkError> {
        let space = self.space.as_ref().ok_or_else(|| {
            CkError::Configuration(
                ErrorInfo::new("scan-no-spoints", "sample points were not configured")
                    .with_hint("call set_spoints_grid or set_spoints_equidist"),
            )
        })?;
        let function = self.function.as_ref().ok_or_else(|| {
            CkError::Configuration(
                ErrorInfo::new("scan-no-dfunction", "distribution function was not configured")
                    .with_hint("call set_dfunction"),
            )
        })?;
        space.validate()?;

        let mut spoints = space.metadata(
            self.labels.scale,
            self.labels.eft.clone(),
            self.labels.basis.clone(),
        );
        let mut seed_used = None;
        let points = match noise {
            Some((noise, seed, repetition)) => {
                debug!(seed, repetition, "perturbing sample points");
                spoints.noise = Some(json!({
                    "noise": noise,
                    "seed": seed,
                    "repetition": repetition,
                }));
                seed_used = Some(seed);
                space.perturbed_points(noise, seed, repetition)
            }
            None => space.points(),
        };

        let dfunction = function.metadata();
        let input_hash = stable_hash_string(&json!({
            "spoints": &spoints,
            "dfunction": &dfunction,
        }))?;
        info!(
            points = points.len(),
            dfunction = %dfunction.name,
            hash = %input_hash,
            "scan configured"
        );

        let jobs: Vec<Job> = points
            .iter()
            .enumerate()
            .map(|(index, point)| Job {
                index,
                function: dfunction.name.clone(),
                values: point.clone(),
            })
            .collect();
        let hooks = RunHooks {
            observer: self.observer.clone(),
            cancel: Some(self.cancel.clone()),
        };
        let distributions =
            WorkerPool::new(self.workers).run_with(&jobs, &self.registry, &hooks)?;
        let table = assemble(&points, &distributions)?;

        let mut provenance = RunProvenance::capture(input_hash);
        provenance.seed = seed_used;
        provenance
            .tool_versions
            .insert("ck-scan".to_string(), env!("CARGO_PKG_VERSION").to_string());
        Ok(ScanResult {
            table,
            metadata: ScanMetadata {
                time: timestamp(),
                spoints,
                dfunction,
                provenance,
            },
        })
    }
}
