//! The data container: table plus metadata, its constructors and persistence.

use std::fs;
use std::path::{Path, PathBuf};

use ck_core::errors::{CkError, ErrorInfo};
use ck_core::serde::{from_json_slice, to_pretty_json_string};
use ck_core::Metadata;
use tracing::{debug, info, warn};

use crate::persist::{
    data_path, handle_overwrite, metadata_path, write_files_atomically, Prompt, StdinPrompt,
    WriteOptions, WriteOutcome,
};
use crate::table::{Column, Table};

/// Prefix of the distribution bin columns (`bin0`, `bin1`, ...).
pub const BIN_PREFIX: &str = "bin";

/// A table of sample points and distributions bundled with its metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataContainer {
    table: Table,
    metadata: Metadata,
}

/// Where a container is initialised from.
///
/// Mirrors the five named constructors so that configuration files can
/// describe a source declaratively.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// Empty container.
    Empty,
    /// Copy of an existing container.
    Container(Box<DataContainer>),
    /// Load `<directory>/<name>_data.csv` and `<directory>/<name>_metadata.json`.
    DirectoryAndName {
        /// Input directory.
        directory: PathBuf,
        /// Dataset name.
        name: String,
    },
    /// Explicit table and metadata.
    TableAndMetadata(Table, Metadata),
    /// Explicit file paths.
    Paths {
        /// Tabular file.
        table: PathBuf,
        /// Metadata file.
        metadata: PathBuf,
    },
}

impl DataSource {
    /// Builds a file-backed source from optional arguments, rejecting mixed signatures.
    ///
    /// Exactly one of `(directory, name)` or `(table_path, metadata_path)` must
    /// be complete; supplying parts of both, or only half of a pair, is a
    /// configuration error. No arguments at all means [`DataSource::Empty`].
    pub fn from_parts(
        directory: Option<PathBuf>,
        name: Option<String>,
        table_path: Option<PathBuf>,
        metadata_path: Option<PathBuf>,
    ) -> Result<Self, CkError> {
        let mixed = |detail: &str| {
            CkError::Configuration(
                ErrorInfo::new(
                    "data-source-conflict",
                    "conflicting or incomplete data source arguments",
                )
                .with_context("detail", detail)
                .with_hint("give either directory and name, or table and metadata paths"),
            )
        };
        let by_name = directory.is_some() || name.is_some();
        let by_path = table_path.is_some() || metadata_path.is_some();
        match (by_name, by_path) {
            (false, false) => Ok(DataSource::Empty),
            (true, true) => Err(mixed("both directory/name and explicit paths given")),
            (true, false) => match (directory, name) {
                (Some(directory), Some(name)) => Ok(DataSource::DirectoryAndName { directory, name }),
                _ => Err(mixed("directory and name must be given together")),
            },
            (false, true) => match (table_path, metadata_path) {
                (Some(table), Some(metadata)) => Ok(DataSource::Paths { table, metadata }),
                _ => Err(mixed("table and metadata paths must be given together")),
            },
        }
    }
}

impl DataContainer {
    /// Empty container with no rows and default metadata.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Deep copy of `other`.
    pub fn from_container(other: &DataContainer) -> Self {
        other.clone()
    }

    /// Loads the dataset `(directory, name)` written by [`DataContainer::write`].
    pub fn from_path_and_name(directory: impl AsRef<Path>, name: &str) -> Result<Self, CkError> {
        let directory = directory.as_ref();
        Self::from_paths(data_path(directory, name), metadata_path(directory, name))
    }

    /// Bundles an existing table and metadata record.
    pub fn from_table_and_metadata(table: Table, metadata: Metadata) -> Self {
        Self { table, metadata }
    }

    /// Loads a table and a metadata file from explicit paths.
    pub fn from_paths(
        table_path: impl AsRef<Path>,
        metadata_path: impl AsRef<Path>,
    ) -> Result<Self, CkError> {
        let table = load_table(table_path.as_ref())?;
        let metadata = load_metadata(metadata_path.as_ref())?;
        Ok(Self { table, metadata })
    }

    /// Constructs a container from a declarative source.
    pub fn open(source: DataSource) -> Result<Self, CkError> {
        match source {
            DataSource::Empty => Ok(Self::empty()),
            DataSource::Container(other) => Ok(*other),
            DataSource::DirectoryAndName { directory, name } => {
                Self::from_path_and_name(directory, &name)
            }
            DataSource::TableAndMetadata(table, metadata) => {
                Ok(Self::from_table_and_metadata(table, metadata))
            }
            DataSource::Paths { table, metadata } => Self::from_paths(table, metadata),
        }
    }

    /// Splits the container into its parts.
    pub fn into_parts(self) -> (Table, Metadata) {
        (self.table, self.metadata)
    }

    /// Underlying table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Attached metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Mutable access to the metadata.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Replaces the table, keeping the metadata.
    pub fn set_table(&mut self, table: Table) {
        self.table = table;
    }

    /// Adds or replaces a column.
    pub fn set_column(&mut self, column: Column) -> Result<(), CkError> {
        self.table.insert_column(column)
    }

    /// Columns holding the distribution bins, ordered by bin number.
    pub fn bin_cols(&self) -> Vec<String> {
        let mut bins: Vec<(usize, &str)> = self
            .table
            .column_names()
            .into_iter()
            .filter_map(|name| {
                name.strip_prefix(BIN_PREFIX)
                    .and_then(|rest| rest.parse::<usize>().ok())
                    .map(|number| (number, name))
            })
            .collect();
        bins.sort_by_key(|(number, _)| *number);
        bins.into_iter().map(|(_, name)| name.to_string()).collect()
    }

    /// Parameter columns, as recorded by the scanner in the metadata.
    pub fn par_cols(&self) -> Vec<String> {
        self.metadata.par_cols().to_vec()
    }

    /// Number of sample points (rows).
    pub fn n(&self) -> usize {
        self.table.n_rows()
    }

    /// Number of bins per distribution.
    pub fn nbins(&self) -> usize {
        self.bin_cols().len()
    }

    /// Number of sampled parameters.
    pub fn npars(&self) -> usize {
        self.metadata.par_cols().len()
    }

    /// All distributions as an `n × nbins` matrix, optionally normalised to unit sum.
    pub fn data(&self, normalize: bool) -> Result<Vec<Vec<f64>>, CkError> {
        let columns = self
            .bin_cols()
            .iter()
            .map(|name| self.table.floats(name))
            .collect::<Result<Vec<_>, _>>()?;
        let mut rows: Vec<Vec<f64>> = (0..self.n())
            .map(|row| columns.iter().map(|col| col[row]).collect())
            .collect();
        if normalize {
            for (row, values) in rows.iter_mut().enumerate() {
                let total: f64 = values.iter().sum();
                if total == 0.0 {
                    return Err(CkError::NumericDegeneracy(
                        ErrorInfo::new("data-normalize-zero", "distribution sums to zero")
                            .with_context("index", self.table.index()[row].to_string()),
                    ));
                }
                values.iter_mut().for_each(|value| *value /= total);
            }
        }
        Ok(rows)
    }

    /// Normalisation (sum of bin contents) of every distribution.
    pub fn norms(&self) -> Result<Vec<f64>, CkError> {
        Ok(self
            .data(false)?
            .iter()
            .map(|row| row.iter().sum())
            .collect())
    }

    /// Distinct cluster ids of `column` in order of first appearance.
    pub fn clusters(&self, column: &str) -> Result<Vec<i64>, CkError> {
        let mut seen = Vec::new();
        for &id in self.table.ints(column)? {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        Ok(seen)
    }

    /// Distinct values of parameter `param` in order of first appearance.
    pub fn param_values(&self, param: &str) -> Result<Vec<f64>, CkError> {
        let mut seen: Vec<f64> = Vec::new();
        for &value in self.table.floats(param)? {
            if !seen.iter().any(|v| v.to_bits() == value.to_bits()) {
                seen.push(value);
            }
        }
        Ok(seen)
    }

    /// Writes the dataset, asking on stdin if the policy is `ask`.
    pub fn write(
        &self,
        directory: impl AsRef<Path>,
        name: &str,
        opts: WriteOptions,
    ) -> Result<WriteOutcome, CkError> {
        self.write_with_prompt(directory, name, opts, &StdinPrompt)
    }

    /// Writes `<directory>/<name>_data.csv` and `<directory>/<name>_metadata.json`.
    ///
    /// Both files are staged next to their targets and only renamed into
    /// place once both are complete, so a failure leaves any previous pair
    /// untouched. An empty table is a schema error unless `opts.force` is set.
    pub fn write_with_prompt(
        &self,
        directory: impl AsRef<Path>,
        name: &str,
        opts: WriteOptions,
        prompt: &dyn Prompt,
    ) -> Result<WriteOutcome, CkError> {
        let directory = directory.as_ref();
        let table_path = data_path(directory, name);
        let md_path = metadata_path(directory, name);

        if self.table.is_empty() {
            if !opts.force {
                return Err(CkError::Schema(
                    ErrorInfo::new("write-empty-table", "refusing to write an empty table")
                        .with_path(&table_path)
                        .with_hint("set force to write it anyway"),
                ));
            }
            warn!(path = %table_path.display(), "table is empty, writing anyway");
        }

        if !handle_overwrite(&[table_path.as_path(), md_path.as_path()], opts.overwrite, prompt)? {
            return Ok(WriteOutcome::Declined);
        }

        info!(data = %table_path.display(), metadata = %md_path.display(), "writing dataset");
        let mut table_bytes = Vec::new();
        self.table.write_csv(&mut table_bytes)?;
        let md_bytes = to_pretty_json_string(&self.metadata)?.into_bytes();
        write_files_atomically(&[
            (table_path.as_path(), table_bytes.as_slice()),
            (md_path.as_path(), md_bytes.as_slice()),
        ])?;
        debug!("dataset written");
        Ok(WriteOutcome::Written {
            data: table_path,
            metadata: md_path,
        })
    }
}

fn load_table(path: &Path) -> Result<Table, CkError> {
    debug!(path = %path.display(), "loading table");
    let file = fs::File::open(path).map_err(|err| CkError::io("table-open", path, err))?;
    Table::read_csv(file).map_err(|err| attach_path(err, path))
}

fn load_metadata(path: &Path) -> Result<Metadata, CkError> {
    debug!(path = %path.display(), "loading metadata");
    let bytes = fs::read(path).map_err(|err| CkError::io("metadata-read", path, err))?;
    from_json_slice(&bytes).map_err(|err| attach_path(err, path))
}

fn attach_path(err: CkError, path: &Path) -> CkError {
    match err {
        CkError::Schema(info) => CkError::Schema(info.with_path(path)),
        CkError::Serde(info) => CkError::Serde(info.with_path(path)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> DataContainer {
        let mut table = Table::with_rows(2);
        table.insert_column(Column::float("x", vec![0.0, 1.0])).unwrap();
        table.insert_column(Column::float("bin10", vec![1.0, 3.0])).unwrap();
        table.insert_column(Column::float("bin2", vec![1.0, 1.0])).unwrap();
        table.insert_column(Column::int("cluster", vec![4, 4])).unwrap();
        DataContainer::from_table_and_metadata(table, Metadata::default())
    }

    #[test]
    fn bin_columns_are_ordered_numerically() {
        assert_eq!(container().bin_cols(), vec!["bin2", "bin10"]);
        assert_eq!(container().nbins(), 2);
    }

    #[test]
    fn normalised_data_sums_to_one() {
        let data = container().data(true).unwrap();
        assert_eq!(data[1], vec![0.25, 0.75]);
        assert_eq!(container().norms().unwrap(), vec![2.0, 4.0]);
        assert_eq!(container().clusters("cluster").unwrap(), vec![4]);
    }

    #[test]
    fn source_arguments_must_not_mix() {
        let err = DataSource::from_parts(
            Some(PathBuf::from("out")),
            Some("run".to_string()),
            Some(PathBuf::from("t.csv")),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CkError::Configuration(_)));
        let err = DataSource::from_parts(Some(PathBuf::from("out")), None, None, None).unwrap_err();
        assert!(matches!(err, CkError::Configuration(_)));
        assert_eq!(
            DataSource::from_parts(None, None, None, None).unwrap(),
            DataSource::Empty
        );
    }
}
