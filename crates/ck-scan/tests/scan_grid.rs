use std::collections::BTreeMap;

use ck_core::{CkError, Sampling};
use ck_data::{DataContainer, FixedPrompt, OverwritePolicy, WriteOptions};
use ck_scan::{FunctionRegistry, ParameterSpace, Scanner};
use proptest::prelude::*;

fn three_by_two() -> BTreeMap<String, Vec<f64>> {
    ["c3", "c1", "c2"]
        .iter()
        .map(|name| (name.to_string(), vec![0.0, 1.0]))
        .collect()
}

fn scanner() -> Scanner {
    let registry = FunctionRegistry::with_builtins(vec![0.0, 1.0, 2.0], true).unwrap();
    let mut scanner = Scanner::new(registry);
    scanner
        .set_spoints_grid(three_by_two())
        .set_workers(Some(2))
        .set_dfunction("polynomial")
        .unwrap();
    scanner
}

#[test]
fn three_parameters_two_values_two_bins() -> Result<(), CkError> {
    let data = scanner().run()?.into_container();
    assert_eq!(data.n(), 8);
    assert_eq!(data.nbins(), 2);
    assert_eq!(data.npars(), 3);
    assert_eq!(
        data.table().column_names(),
        vec!["c1", "c2", "c3", "bin0", "bin1"]
    );
    for row in data.data(false)? {
        assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
    let scan = data.metadata().scan.as_ref().unwrap();
    assert_eq!(scan.spoints.coeffs, vec!["c1", "c2", "c3"]);
    assert_eq!(scan.spoints.sampling, Sampling::Grid);
    assert_eq!(scan.dfunction.name, "polynomial");
    assert_eq!(scan.dfunction.binning, Some(vec![0.0, 1.0, 2.0]));
    assert_eq!(scan.provenance.input_hash.len(), 64);
    Ok(())
}

#[test]
fn equal_configuration_gives_equal_tables() -> Result<(), CkError> {
    let first = scanner().run()?;
    let mut single = scanner();
    single.set_workers(Some(1));
    let second = single.run()?;
    assert_eq!(first.table, second.table);
    assert_eq!(
        first.metadata.provenance.input_hash,
        second.metadata.provenance.input_hash
    );
    Ok(())
}

#[test]
fn scanned_container_survives_persistence() -> Result<(), CkError> {
    let dir = tempfile::tempdir().unwrap();
    let data = scanner().run()?.into_container();
    data.write_with_prompt(
        dir.path(),
        "scan",
        WriteOptions::with_policy(OverwritePolicy::Raise),
        &FixedPrompt(false),
    )?;
    let loaded = DataContainer::from_path_and_name(dir.path(), "scan")?;
    assert_eq!(loaded, data);
    assert_eq!(loaded.par_cols(), vec!["c1", "c2", "c3"]);
    Ok(())
}

#[test]
fn missing_configuration_is_reported() {
    let registry = FunctionRegistry::with_builtins(vec![0.0, 1.0], false).unwrap();
    let mut scanner = Scanner::new(registry);
    assert!(matches!(scanner.run(), Err(CkError::Configuration(_))));
    scanner.set_spoints_grid(three_by_two());
    assert!(matches!(scanner.run(), Err(CkError::Configuration(_))));
    assert!(matches!(
        scanner.set_dfunction("unknown"),
        Err(CkError::Configuration(_))
    ));

    let mut empty = three_by_two();
    empty.insert("c4".to_string(), Vec::new());
    scanner.set_spoints_grid(empty).set_dfunction("polynomial").unwrap();
    assert!(matches!(scanner.run(), Err(CkError::Configuration(_))));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn product_size_and_column_order(counts in prop::collection::vec(1usize..4, 1..4)) {
        let values: BTreeMap<String, Vec<f64>> = counts
            .iter()
            .enumerate()
            .map(|(i, &count)| (format!("p{}", 9 - i), (0..count).map(|v| v as f64).collect()))
            .collect();
        let space = ParameterSpace::grid(values.clone());
        let expected: usize = counts.iter().product();
        prop_assert_eq!(space.points().len(), expected);

        let registry = FunctionRegistry::with_builtins(vec![0.0, 1.0], false).unwrap();
        let mut scanner = Scanner::new(registry);
        scanner.set_spoints_grid(values).set_workers(Some(2)).set_dfunction("polynomial").unwrap();
        let result = scanner.run().unwrap();
        prop_assert_eq!(result.table.n_rows(), expected);
        let names = result.table.column_names();
        let params: Vec<&str> = names[..counts.len()].to_vec();
        let mut sorted = params.clone();
        sorted.sort_unstable();
        prop_assert_eq!(params, sorted);
    }
}
