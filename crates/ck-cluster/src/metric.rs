//! Pairwise distances between distributions.

use ck_core::errors::{CkError, ErrorInfo};
use ck_data::DataWithErrors;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Distance between two distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Reduced chi² using the bin uncertainties.
    #[default]
    Chi2,
    /// Euclidean distance of the normalised distributions.
    Euclidean,
}

/// Layout of a computed distance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceOutput {
    /// Upper triangle, row-major, without the diagonal.
    #[default]
    Condensed,
    /// Square `n × n` matrix.
    Full,
}

/// Distance matrix in either layout.
#[derive(Debug, Clone, PartialEq)]
pub enum DistanceMatrix {
    /// See [`DistanceOutput::Condensed`].
    Condensed(CondensedMatrix),
    /// See [`DistanceOutput::Full`].
    Full(Vec<Vec<f64>>),
}

/// Symmetric, zero-diagonal matrix stored as its strict upper triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct CondensedMatrix {
    n: usize,
    values: Vec<f64>,
}

impl CondensedMatrix {
    /// Wraps a condensed vector; its length must be a triangular number.
    pub fn from_values(values: Vec<f64>) -> Result<Self, CkError> {
        let n = side_for_len(values.len()).ok_or_else(|| {
            CkError::Schema(
                ErrorInfo::new("condensed-length", "length is not a triangular number")
                    .with_context("len", values.len().to_string()),
            )
        })?;
        Ok(Self { n, values })
    }

    /// Number of rows of the square form.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Condensed entries.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Distance between rows `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        match i.cmp(&j) {
            std::cmp::Ordering::Equal => 0.0,
            std::cmp::Ordering::Less => self.values[condensed_index(self.n, i, j)],
            std::cmp::Ordering::Greater => self.values[condensed_index(self.n, j, i)],
        }
    }

    /// Square form.
    pub fn to_full(&self) -> Vec<Vec<f64>> {
        (0..self.n)
            .map(|i| (0..self.n).map(|j| self.get(i, j)).collect())
            .collect()
    }
}

fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    debug_assert!(i < j && j < n);
    n * i - i * (i + 1) / 2 + (j - i - 1)
}

fn side_for_len(len: usize) -> Option<usize> {
    let mut n = 1usize;
    loop {
        let triangle = n * (n - 1) / 2;
        if triangle == len {
            return Some(n);
        }
        if triangle > len {
            return None;
        }
        n += 1;
    }
}

/// Condensed form of a square matrix.
pub fn condense(full: &[Vec<f64>]) -> Result<Vec<f64>, CkError> {
    let n = full.len();
    if let Some((row, _)) = full.iter().enumerate().find(|(_, row)| row.len() != n) {
        return Err(CkError::Schema(
            ErrorInfo::new("condense-not-square", "matrix is not square")
                .with_context("rows", n.to_string())
                .with_context("row", row.to_string()),
        ));
    }
    let mut values = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        if full[i][i] != 0.0 {
            return Err(CkError::Schema(
                ErrorInfo::new("condense-nonzero-diagonal", "diagonal entries must be zero")
                    .with_context("row", i.to_string()),
            ));
        }
        for j in (i + 1)..n {
            if full[i][j] != full[j][i] {
                return Err(CkError::Schema(
                    ErrorInfo::new("condense-not-symmetric", "matrix is not symmetric")
                        .with_context("rows", format!("{i},{j}")),
                ));
            }
            values.push(full[i][j]);
        }
    }
    Ok(values)
}

/// Square form of a condensed vector.
pub fn uncondense(condensed: &[f64]) -> Result<Vec<Vec<f64>>, CkError> {
    Ok(CondensedMatrix::from_values(condensed.to_vec())?.to_full())
}

impl Metric {
    /// Condensed distances between all rows of `data`.
    pub fn condensed(&self, data: &DataWithErrors) -> Result<CondensedMatrix, CkError> {
        match self {
            Metric::Chi2 => chi2(data),
            Metric::Euclidean => euclidean(&data.data_container().data(true)?),
        }
    }

    /// Distances in the requested layout.
    pub fn matrix(
        &self,
        data: &DataWithErrors,
        output: DistanceOutput,
    ) -> Result<DistanceMatrix, CkError> {
        let condensed = self.condensed(data)?;
        Ok(match output {
            DistanceOutput::Condensed => DistanceMatrix::Condensed(condensed),
            DistanceOutput::Full => DistanceMatrix::Full(condensed.to_full()),
        })
    }
}

/// Reduced chi² between every pair of rows.
///
/// For rows `i`, `j` with norms `n`, contents `d` and errors `e`:
/// `(1/nbins) Σ_b (n_i d_j[b] − n_j d_i[b])² / ((n_i e_j[b])² + (n_j e_i[b])²)`.
pub fn chi2(data: &DataWithErrors) -> Result<CondensedMatrix, CkError> {
    let contents = data.data()?;
    let errors = data.err()?;
    let norms = data.norms()?;
    let n = contents.len();
    let nbins = data.nbins();
    debug!(rows = n, nbins, "computing chi2 distances");
    if n > 1 && nbins == 0 {
        return Err(CkError::schema("chi2-no-bins", "distributions have no bins"));
    }
    let mut values = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let mut sum = 0.0;
            for bin in 0..nbins {
                let numerator = norms[i] * contents[j][bin] - norms[j] * contents[i][bin];
                let denominator =
                    (norms[i] * errors[j][bin]).powi(2) + (norms[j] * errors[i][bin]).powi(2);
                if denominator == 0.0 {
                    return Err(CkError::NumericDegeneracy(
                        ErrorInfo::new("chi2-zero-denominator", "both bins have zero uncertainty")
                            .with_context("rows", format!("{i},{j}"))
                            .with_context("bin", bin.to_string())
                            .with_hint("add uncertainties to the data before clustering"),
                    ));
                }
                sum += numerator * numerator / denominator;
            }
            values.push(sum / nbins as f64);
        }
    }
    Ok(CondensedMatrix { n, values })
}

/// Euclidean distance between every pair of rows.
pub fn euclidean(rows: &[Vec<f64>]) -> Result<CondensedMatrix, CkError> {
    let n = rows.len();
    let mut values = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            values.push(euclidean_distance(&rows[i], &rows[j]));
        }
    }
    Ok(CondensedMatrix { n, values })
}

pub(crate) fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    let max_len = a.len().max(b.len());
    let mut sum = 0.0;
    for idx in 0..max_len {
        let va = a.get(idx).copied().unwrap_or(0.0);
        let vb = b.get(idx).copied().unwrap_or(0.0);
        sum += (va - vb).powi(2);
    }
    sum.sqrt()
}
