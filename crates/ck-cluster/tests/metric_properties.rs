use ck_cluster::{chi2, condense, uncondense, DistanceMatrix, DistanceOutput, Metric};
use ck_core::{CkError, Metadata};
use ck_data::{Column, DataContainer, DataWithErrors, Table};
use proptest::prelude::*;

fn dwe(rows: &[Vec<f64>]) -> DataWithErrors {
    let nbins = rows.first().map_or(0, Vec::len);
    let mut table = Table::with_rows(rows.len());
    for bin in 0..nbins {
        table
            .insert_column(Column::float(
                format!("bin{bin}"),
                rows.iter().map(|row| row[bin]).collect(),
            ))
            .unwrap();
    }
    DataWithErrors::new(DataContainer::from_table_and_metadata(
        table,
        Metadata::default(),
    ))
}

#[test]
fn chi2_of_a_known_pair() -> Result<(), CkError> {
    let mut data = dwe(&[vec![1.0, 3.0], vec![2.0, 2.0]]);
    data.add_err_uncorr(1.0);
    let matrix = chi2(&data)?;
    assert_eq!(matrix.values().len(), 1);
    assert!((matrix.get(0, 1) - 0.5).abs() < 1e-12);
    Ok(())
}

#[test]
fn zero_uncertainties_are_degenerate() {
    let data = dwe(&[vec![1.0, 3.0], vec![2.0, 2.0]]);
    let err = chi2(&data).unwrap_err();
    assert!(matches!(err, CkError::NumericDegeneracy(_)));
    assert_eq!(err.info().context.get("rows").map(String::as_str), Some("0,1"));
}

#[test]
fn full_output_is_symmetric() -> Result<(), CkError> {
    let mut data = dwe(&[vec![1.0, 3.0], vec![2.0, 2.0], vec![4.0, 0.5]]);
    data.add_rel_err_uncorr(0.1);
    let DistanceMatrix::Full(full) = Metric::Chi2.matrix(&data, DistanceOutput::Full)? else {
        panic!("expected a full matrix");
    };
    for i in 0..3 {
        assert_eq!(full[i][i], 0.0);
        for j in 0..3 {
            assert_eq!(full[i][j], full[j][i]);
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn chi2_is_symmetric_with_zero_diagonal(
        rows in prop::collection::vec(prop::collection::vec(0.1f64..10.0, 3), 2..8),
        abs in 0.01f64..1.0,
    ) {
        let mut data = dwe(&rows);
        data.add_err_uncorr(abs);
        let matrix = chi2(&data).unwrap();
        for i in 0..rows.len() {
            prop_assert_eq!(matrix.get(i, i), 0.0);
            for j in 0..rows.len() {
                prop_assert_eq!(matrix.get(i, j), matrix.get(j, i));
                prop_assert!(matrix.get(i, j) >= 0.0);
            }
        }
        let full = matrix.to_full();
        let condensed = condense(&full).unwrap();
        prop_assert_eq!(&condensed[..], matrix.values());
        prop_assert_eq!(uncondense(&condensed).unwrap(), full);
    }
}
