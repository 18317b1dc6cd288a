//! Repeated noisy re-scans and re-clusterings compared with a baseline.

use std::sync::Arc;

use ck_cluster::{ClusterAssignment, ClusterEngine, ErrorsSpec};
use ck_core::errors::{CkError, ErrorInfo};
use ck_data::{DataContainer, DataWithErrors};
use ck_scan::{Noise, Scanner};
use tracing::{debug, info, warn};

use crate::fom::{DeltaNClusters, FigureOfMerit, MatchingClusters, RandIndex};
use crate::table::FomTable;

/// Column the cluster ids are written to in cached containers.
pub const CACHE_COLUMN: &str = "cluster";

/// Output of [`StabilityTester::run`].
#[derive(Debug, Clone)]
pub struct StabilityResult {
    /// Figures of merit per perturbed repetition.
    pub foms: FomTable,
    /// Clustering of the unperturbed scan.
    pub baseline: ClusterAssignment,
    /// Scanned and clustered containers, baseline first; empty unless caching.
    pub cached: Vec<DataContainer>,
}

/// Measures how much a clustering changes when the sample points are perturbed.
#[derive(Clone)]
pub struct StabilityTester {
    noise: Noise,
    seed: u64,
    repeat: usize,
    foms: Vec<Arc<dyn FigureOfMerit>>,
    cache: bool,
    errors: Option<ErrorsSpec>,
}

impl std::fmt::Debug for StabilityTester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilityTester")
            .field("noise", &self.noise)
            .field("seed", &self.seed)
            .field("repeat", &self.repeat)
            .field("foms", &self.fom_names())
            .field("cache", &self.cache)
            .field("errors", &self.errors)
            .finish()
    }
}

impl StabilityTester {
    /// Tester with ten repetitions, caching enabled and no figures of merit.
    pub fn new(noise: Noise, seed: u64) -> Self {
        Self {
            noise,
            seed,
            repeat: 10,
            foms: Vec::new(),
            cache: true,
            errors: None,
        }
    }

    /// Adds the built-in figures of merit.
    pub fn with_default_foms(mut self) -> Self {
        self.add_fom(Arc::new(MatchingClusters));
        self.add_fom(Arc::new(DeltaNClusters));
        self.add_fom(Arc::new(RandIndex));
        self
    }

    /// Number of perturbed repetitions.
    pub fn set_repeat(&mut self, repeat: usize) -> &mut Self {
        self.repeat = repeat;
        self
    }

    /// Keep every scanned and clustered container in the result.
    pub fn set_cache(&mut self, cache: bool) -> &mut Self {
        self.cache = cache;
        self
    }

    /// Uncertainties added to every scan before clustering.
    pub fn set_errors(&mut self, errors: Option<ErrorsSpec>) -> &mut Self {
        self.errors = errors;
        self
    }

    /// Adds `fom`, replacing one with the same name.
    pub fn add_fom(&mut self, fom: Arc<dyn FigureOfMerit>) -> &mut Self {
        match self.foms.iter_mut().find(|existing| existing.name() == fom.name()) {
            Some(existing) => {
                warn!(fom = fom.name(), "figure of merit already registered, replacing");
                *existing = fom;
            }
            None => self.foms.push(fom),
        }
        self
    }

    /// Names of the registered figures of merit, in column order.
    pub fn fom_names(&self) -> Vec<String> {
        self.foms.iter().map(|fom| fom.name().to_string()).collect()
    }

    /// Scans and clusters once without noise, then `repeat` times with noise.
    ///
    /// Every scan replaces the table of a copy of `data`, so metadata such as
    /// a recorded error model carries over. Each repetition is clustered by a
    /// fresh engine spawned from `engine`.
    pub fn run(
        &self,
        data: &DataContainer,
        scanner: &Scanner,
        engine: &ClusterEngine,
    ) -> Result<StabilityResult, CkError> {
        if self.foms.is_empty() {
            return Err(CkError::Configuration(
                ErrorInfo::new("stability-no-foms", "no figures of merit registered")
                    .with_hint("call with_default_foms or add_fom"),
            ));
        }
        info!(repeat = self.repeat, foms = self.foms.len(), "stability test");
        let mut cached = Vec::new();

        let (baseline, container) = self.scan_and_cluster(data, scanner, engine, None)?;
        if let Some(container) = container {
            cached.push(container);
        }

        let mut foms = FomTable::new(self.fom_names());
        for repetition in 1..=self.repeat {
            let (perturbed, container) =
                self.scan_and_cluster(data, scanner, engine, Some(repetition as u64))?;
            let row = self
                .foms
                .iter()
                .map(|fom| fom.compute(&baseline, &perturbed))
                .collect::<Result<Vec<_>, _>>()?;
            debug!(repetition, values = ?row, "figures of merit");
            foms.push_row(row)?;
            if let Some(container) = container {
                cached.push(container);
            }
        }
        info!("stability test done");
        Ok(StabilityResult {
            foms,
            baseline,
            cached,
        })
    }

    fn scan_and_cluster(
        &self,
        data: &DataContainer,
        scanner: &Scanner,
        engine: &ClusterEngine,
        repetition: Option<u64>,
    ) -> Result<(ClusterAssignment, Option<DataContainer>), CkError> {
        let scan = match repetition {
            Some(repetition) => scanner.run_with_noise(&self.noise, self.seed, repetition)?,
            None => scanner.run_without_noise()?,
        };
        let mut container = data.clone();
        scan.write_into(&mut container);
        let dwe = match self.errors {
            Some(errors) => errors.apply(container)?,
            None => DataWithErrors::new(container),
        };
        let mut engine = engine.spawn();
        let assignment = engine.cluster(&dwe)?.clone();
        if !self.cache {
            return Ok((assignment, None));
        }
        let mut container = dwe.into_inner();
        engine.write(&mut container, CACHE_COLUMN)?;
        Ok((assignment, Some(container)))
    }
}
