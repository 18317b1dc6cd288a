//! Distributions with uncorrelated per-bin uncertainties.

use ck_core::errors::{CkError, ErrorInfo};
use ck_core::ErrorsMetadata;

use crate::container::DataContainer;

/// A data container plus the error model used by the chi² distance.
///
/// Uncertainties added through the `add_*` methods are combined in
/// quadrature. The accumulated settings are mirrored into the container's
/// metadata under `errors`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataWithErrors {
    data: DataContainer,
    abs_var: f64,
    rel_var: f64,
    poisson_scale: Option<f64>,
}

impl DataWithErrors {
    /// Wraps `data`, restoring any error model recorded in its metadata.
    pub fn new(data: DataContainer) -> Self {
        let (abs_var, rel_var, poisson_scale) = match data.metadata().errors {
            Some(errors) => (errors.abs.powi(2), errors.rel.powi(2), errors.poisson),
            None => (0.0, 0.0, None),
        };
        Self {
            data,
            abs_var,
            rel_var,
            poisson_scale,
        }
    }

    /// Wrapped container.
    pub fn data_container(&self) -> &DataContainer {
        &self.data
    }

    /// Unwraps the container (with the error model recorded in its metadata).
    pub fn into_inner(self) -> DataContainer {
        self.data
    }

    /// Adds an absolute uncertainty to every bin.
    pub fn add_err_uncorr(&mut self, abs: f64) -> &mut Self {
        self.abs_var += abs.powi(2);
        self.sync_metadata();
        self
    }

    /// Adds an uncertainty proportional to the bin content.
    pub fn add_rel_err_uncorr(&mut self, rel: f64) -> &mut Self {
        self.rel_var += rel.powi(2);
        self.sync_metadata();
        self
    }

    /// Adds Poisson uncertainties assuming `scale` events per unit of content.
    pub fn add_err_poisson(&mut self, scale: f64) -> Result<&mut Self, CkError> {
        if !(scale > 0.0) {
            return Err(CkError::Configuration(
                ErrorInfo::new("poisson-scale", "poisson scale must be positive")
                    .with_context("scale", scale.to_string()),
            ));
        }
        self.poisson_scale = Some(scale);
        self.sync_metadata();
        Ok(self)
    }

    /// Drops every uncertainty, including the model recorded in the metadata.
    pub fn reset_errors(&mut self) -> &mut Self {
        self.abs_var = 0.0;
        self.rel_var = 0.0;
        self.poisson_scale = None;
        self.data.metadata_mut().errors = None;
        self
    }

    fn sync_metadata(&mut self) {
        self.data.metadata_mut().errors = Some(ErrorsMetadata {
            abs: self.abs_var.sqrt(),
            rel: self.rel_var.sqrt(),
            poisson: self.poisson_scale,
        });
    }

    /// Number of bins per distribution.
    pub fn nbins(&self) -> usize {
        self.data.nbins()
    }

    /// Number of distributions.
    pub fn n(&self) -> usize {
        self.data.n()
    }

    /// Bin contents (`n × nbins`).
    pub fn data(&self) -> Result<Vec<Vec<f64>>, CkError> {
        self.data.data(false)
    }

    /// Normalisation of every distribution.
    pub fn norms(&self) -> Result<Vec<f64>, CkError> {
        self.data.norms()
    }

    /// Standard deviation of every bin (`n × nbins`).
    pub fn err(&self) -> Result<Vec<Vec<f64>>, CkError> {
        let contents = self.data.data(false)?;
        Ok(contents
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&content| {
                        let mut var = self.abs_var + self.rel_var * content.powi(2);
                        if let Some(scale) = self.poisson_scale {
                            var += content.abs() / scale;
                        }
                        var.sqrt()
                    })
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, Table};
    use ck_core::Metadata;

    fn dwe() -> DataWithErrors {
        let mut table = Table::with_rows(1);
        table.insert_column(Column::float("bin0", vec![4.0])).unwrap();
        table.insert_column(Column::float("bin1", vec![0.0])).unwrap();
        DataWithErrors::new(DataContainer::from_table_and_metadata(
            table,
            Metadata::default(),
        ))
    }

    #[test]
    fn errors_add_in_quadrature() {
        let mut dwe = dwe();
        dwe.add_err_uncorr(0.3).add_rel_err_uncorr(0.1);
        dwe.add_err_uncorr(0.4);
        let err = dwe.err().unwrap();
        let expected = (0.25f64 + 0.01 * 16.0).sqrt();
        assert!((err[0][0] - expected).abs() < 1e-12);
        assert!((err[0][1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn poisson_errors_scale_with_content() {
        let mut dwe = dwe();
        dwe.add_err_poisson(100.0).unwrap();
        let err = dwe.err().unwrap();
        assert!((err[0][0] - 0.2).abs() < 1e-12);
        assert_eq!(err[0][1], 0.0);
        assert!(dwe.add_err_poisson(0.0).is_err());
    }

    #[test]
    fn error_model_survives_metadata() {
        let mut dwe = dwe();
        dwe.add_err_uncorr(0.5);
        let restored = DataWithErrors::new(dwe.clone().into_inner());
        assert_eq!(restored.err().unwrap(), dwe.err().unwrap());
    }

    #[test]
    fn reset_drops_the_recorded_model() {
        let mut dwe = dwe();
        dwe.add_err_uncorr(0.5).add_err_poisson(10.0).unwrap();
        dwe.reset_errors().add_rel_err_uncorr(0.1);
        let restored = DataWithErrors::new(dwe.into_inner());
        let errors = restored.data_container().metadata().errors.clone().unwrap();
        assert_eq!(errors.abs, 0.0);
        assert_eq!(errors.poisson, None);
        assert!((restored.err().unwrap()[0][0] - 0.4).abs() < 1e-12);
    }
}
