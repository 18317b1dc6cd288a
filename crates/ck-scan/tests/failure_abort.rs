use std::collections::BTreeMap;
use std::sync::Arc;

use ck_core::{CkError, ErrorInfo};
use ck_data::WriteOptions;
use ck_scan::{FnDistribution, FunctionRegistry, SamplePoint, Scanner};
use proptest::prelude::*;

/// Scans x = 0..20 on three workers; evaluation fails at x = `pole`.
fn failing_scanner(pole: usize) -> Scanner {
    let mut scanner = Scanner::new(FunctionRegistry::new());
    let mut values = BTreeMap::new();
    values.insert("x".to_string(), (0..20).map(|v| v as f64).collect());
    scanner
        .set_spoints_grid(values)
        .set_workers(Some(3))
        .set_dfunction_instance(Arc::new(FnDistribution::new(
            "fragile",
            2,
            move |point: &SamplePoint| {
                let x = point.values()[0];
                if x == pole as f64 {
                    Err(CkError::Evaluation(ErrorInfo::new(
                        "fragile-pole",
                        format!("pole at x = {pole}"),
                    )))
                } else {
                    Ok(vec![x, 1.0])
                }
            },
        )));
    scanner
}

#[test]
fn a_failing_point_aborts_the_scan() {
    let info = match failing_scanner(13).run() {
        Err(CkError::Evaluation(info)) => info,
        other => panic!("expected an evaluation error, got {other:?}"),
    };
    assert_eq!(info.code, "fragile-pole");
    assert_eq!(info.context.get("index").map(String::as_str), Some("13"));
    assert_eq!(info.context.get("point").map(String::as_str), Some("{x=13}"));
}

#[test]
fn nothing_is_written_after_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let result = failing_scanner(13).run().map(|scan| {
        scan.into_container()
            .write(dir.path(), "scan", WriteOptions::default())
    });
    assert!(result.is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn any_failing_point_is_reported(pole in 0usize..20) {
        let info = match failing_scanner(pole).run() {
            Err(CkError::Evaluation(info)) => info,
            other => return Err(TestCaseError::fail(format!("unexpected {other:?}"))),
        };
        let index = pole.to_string();
        prop_assert_eq!(info.code.as_str(), "fragile-pole");
        prop_assert_eq!(info.context.get("index"), Some(&index));
    }
}
