//! Per-repetition figures of merit.

use std::path::Path;

use ck_core::errors::{CkError, ErrorInfo};
use ck_data::persist::{handle_overwrite, write_files_atomically};
use ck_data::{OverwritePolicy, Prompt};
use csv::WriterBuilder;
use tracing::info;

fn csv_error(code: &str, err: impl ToString) -> CkError {
    CkError::Serde(ErrorInfo::new(code, err.to_string()))
}

/// One row per perturbed repetition, one column per figure of merit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FomTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FomTable {
    /// Empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends the values of one repetition, in column order.
    pub fn push_row(&mut self, row: Vec<f64>) -> Result<(), CkError> {
        if row.len() != self.columns.len() {
            return Err(CkError::Schema(
                ErrorInfo::new("fom-row-width", "row does not match the table columns")
                    .with_context("columns", self.columns.len().to_string())
                    .with_context("values", row.len().to_string()),
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of repetitions.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True without repetitions.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of the figure of merit `name` over all repetitions.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let position = self.columns.iter().position(|column| column == name)?;
        Some(self.rows.iter().map(|row| row[position]).collect())
    }

    /// Mean of `name` over all repetitions; `None` for unknown names or an empty table.
    pub fn mean(&self, name: &str) -> Option<f64> {
        let values = self.column(name)?;
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Serializes the table as CSV with a leading `repetition` column (1-based).
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, CkError> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        let mut header = vec!["repetition".to_string()];
        header.extend(self.columns.iter().cloned());
        writer
            .write_record(&header)
            .map_err(|err| csv_error("fom-write-header", err))?;
        for (repetition, row) in self.rows.iter().enumerate() {
            let mut record = Vec::with_capacity(row.len() + 1);
            record.push((repetition + 1).to_string());
            record.extend(row.iter().map(|value| format!("{value:?}")));
            writer
                .write_record(&record)
                .map_err(|err| csv_error("fom-write-row", err))?;
        }
        writer
            .into_inner()
            .map_err(|err| csv_error("fom-flush", err))
    }

    /// Writes the table to `path`; returns false if the user declined to overwrite.
    pub fn write_csv(
        &self,
        path: impl AsRef<Path>,
        overwrite: OverwritePolicy,
        prompt: &dyn Prompt,
    ) -> Result<bool, CkError> {
        let path = path.as_ref();
        if !handle_overwrite(&[path], overwrite, prompt)? {
            return Ok(false);
        }
        let bytes = self.to_csv_bytes()?;
        info!(path = %path.display(), repetitions = self.len(), "writing figures of merit");
        write_files_atomically(&[(path, bytes.as_slice())])?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FomTable {
        let mut table = FomTable::new(vec!["a".into(), "b".into()]);
        table.push_row(vec![1.0, 0.0]).unwrap();
        table.push_row(vec![0.5, -1.0]).unwrap();
        table
    }

    #[test]
    fn columns_and_means() {
        let table = table();
        assert_eq!(table.column("a"), Some(vec![1.0, 0.5]));
        assert_eq!(table.mean("b"), Some(-0.5));
        assert_eq!(table.mean("c"), None);
        assert_eq!(FomTable::new(vec!["a".into()]).mean("a"), None);
    }

    #[test]
    fn rows_must_fill_every_column() {
        let mut table = table();
        assert!(matches!(table.push_row(vec![1.0]), Err(CkError::Schema(_))));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn csv_layout() {
        let text = String::from_utf8(table().to_csv_bytes().unwrap()).unwrap();
        assert_eq!(text, "repetition,a,b\n1,1.0,0.0\n2,0.5,-1.0\n");
    }
}
