mod fixtures;

use std::sync::Arc;

use ck_cluster::ClusterAssignment;
use ck_core::CkError;
use ck_data::{DataContainer, FixedPrompt, OverwritePolicy};
use ck_scan::{Noise, NoiseKind, NoiseMode};
use ck_stability::{
    FigureOfMerit, MatchingClusters, RandIndex, StabilityTester, CACHE_COLUMN,
};

use fixtures::{errors, step_scanner, two_cluster_engine};

fn gauss(sigma: f64) -> Noise {
    Noise {
        kind: NoiseKind::Gauss { sigma },
        mode: NoiseMode::Absolute,
    }
}

fn tester(sigma: f64, seed: u64) -> StabilityTester {
    let mut tester = StabilityTester::new(gauss(sigma), seed).with_default_foms();
    tester.set_repeat(4).set_errors(Some(errors()));
    tester
}

#[test]
fn zero_noise_gives_perfect_figures() -> Result<(), CkError> {
    let result = tester(0.0, 1).run(
        &DataContainer::empty(),
        &step_scanner(),
        &two_cluster_engine(),
    )?;
    assert_eq!(result.foms.len(), 4);
    assert_eq!(result.baseline.n_clusters(), 2);
    assert!(result.foms.column("matching_clusters").unwrap().iter().all(|&v| v == 1.0));
    assert!(result.foms.column("rand_index").unwrap().iter().all(|&v| v == 1.0));
    assert!(result.foms.column("delta_n_clusters").unwrap().iter().all(|&v| v == 0.0));
    Ok(())
}

#[test]
fn same_seed_same_figures() -> Result<(), CkError> {
    let scanner = step_scanner();
    let engine = two_cluster_engine();
    let first = tester(1.5, 9).run(&DataContainer::empty(), &scanner, &engine)?;
    let second = tester(1.5, 9).run(&DataContainer::empty(), &scanner, &engine)?;
    assert_eq!(first.foms, second.foms);
    for value in first.foms.column("rand_index").unwrap() {
        assert!((0.0..=1.0).contains(&value));
    }
    Ok(())
}

#[test]
fn caching_keeps_containers_without_changing_figures() -> Result<(), CkError> {
    let scanner = step_scanner();
    let engine = two_cluster_engine();
    let mut cached = tester(1.5, 3);
    cached.set_cache(true);
    let mut uncached = tester(1.5, 3);
    uncached.set_cache(false);

    let with = cached.run(&DataContainer::empty(), &scanner, &engine)?;
    let without = uncached.run(&DataContainer::empty(), &scanner, &engine)?;
    assert_eq!(with.foms, without.foms);
    assert!(without.cached.is_empty());
    assert_eq!(with.cached.len(), 5);
    for container in &with.cached {
        assert_eq!(container.n(), 6);
        assert_eq!(container.table().ints(CACHE_COLUMN)?.len(), 6);
        assert!(container.metadata().errors.is_some());
    }
    Ok(())
}

struct Constant(f64);

impl FigureOfMerit for Constant {
    fn name(&self) -> &str {
        MatchingClusters::NAME
    }

    fn compute(&self, _: &ClusterAssignment, _: &ClusterAssignment) -> Result<f64, CkError> {
        Ok(self.0)
    }
}

#[test]
fn duplicate_fom_replaces_in_place() -> Result<(), CkError> {
    let mut tester = tester(0.0, 1);
    tester.add_fom(Arc::new(Constant(0.25)));
    assert_eq!(
        tester.fom_names(),
        vec!["matching_clusters", "delta_n_clusters", "rand_index"]
    );
    let result = tester.run(&DataContainer::empty(), &step_scanner(), &two_cluster_engine())?;
    assert_eq!(result.foms.mean("matching_clusters"), Some(0.25));
    Ok(())
}

#[test]
fn empty_fom_set_is_a_configuration_error() {
    let mut tester = StabilityTester::new(gauss(0.1), 0);
    tester.set_repeat(1);
    let err = tester
        .run(&DataContainer::empty(), &step_scanner(), &two_cluster_engine())
        .unwrap_err();
    assert!(matches!(err, CkError::Configuration(_)));
}

#[test]
fn fom_csv_respects_overwrite_policy() -> Result<(), CkError> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foms.csv");
    let mut tester = StabilityTester::new(gauss(0.0), 0);
    tester.add_fom(Arc::new(RandIndex)).set_repeat(2).set_errors(Some(errors()));
    let result = tester.run(&DataContainer::empty(), &step_scanner(), &two_cluster_engine())?;

    assert!(result.foms.write_csv(&path, OverwritePolicy::Raise, &FixedPrompt(false))?);
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, "repetition,rand_index\n1,1.0\n2,1.0\n");

    std::fs::write(&path, "sentinel").unwrap();
    let err = result
        .foms
        .write_csv(&path, OverwritePolicy::Raise, &FixedPrompt(true))
        .unwrap_err();
    assert!(matches!(err, CkError::OverwriteConflict(_)));
    assert!(!result.foms.write_csv(&path, OverwritePolicy::Ask, &FixedPrompt(false))?);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "sentinel");
    assert!(result.foms.write_csv(&path, OverwritePolicy::Overwrite, &FixedPrompt(false))?);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), written);
    Ok(())
}
