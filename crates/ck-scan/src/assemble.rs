//! Builds the result table from evaluated points.

use ck_core::errors::{CkError, ErrorInfo};
use ck_data::{Column, Table, BIN_PREFIX};

use crate::space::SamplePoint;

/// Table with columns `[sorted parameter names][bin0..bin(n-1)]` and index `0..n`.
pub fn assemble(points: &[SamplePoint], distributions: &[Vec<f64>]) -> Result<Table, CkError> {
    let Some(first) = points.first() else {
        return Err(CkError::schema("assemble-empty", "no sample points to assemble"));
    };
    if points.len() != distributions.len() {
        return Err(CkError::Schema(
            ErrorInfo::new("assemble-length-mismatch", "points and distributions differ in number")
                .with_context("points", points.len().to_string())
                .with_context("distributions", distributions.len().to_string()),
        ));
    }
    let nbins = distributions[0].len();
    for (row, (point, distribution)) in points.iter().zip(distributions).enumerate() {
        if point.names() != first.names() {
            return Err(CkError::Schema(
                ErrorInfo::new("assemble-parameter-mismatch", "point has different parameters")
                    .with_context("row", row.to_string())
                    .with_context("point", point.to_string()),
            ));
        }
        if distribution.len() != nbins {
            return Err(CkError::Schema(
                ErrorInfo::new("assemble-nbins-mismatch", "distribution has a different length")
                    .with_context("row", row.to_string())
                    .with_context("expected", nbins.to_string())
                    .with_context("found", distribution.len().to_string()),
            ));
        }
    }

    let mut table = Table::with_rows(points.len());
    for (param, name) in first.names().iter().enumerate() {
        let values = points.iter().map(|point| point.values()[param]).collect();
        table.insert_column(Column::float(name.clone(), values))?;
    }
    for bin in 0..nbins {
        let values = distributions.iter().map(|d| d[bin]).collect();
        table.insert_column(Column::float(format!("{BIN_PREFIX}{bin}"), values))?;
    }
    Ok(table)
}
