//! Column-typed table with a stable row index.

use std::collections::BTreeSet;
use std::io::{Read, Write};

use ck_core::errors::{CkError, ErrorInfo};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};

/// Name of the index column in the CSV representation.
pub const INDEX_COLUMN: &str = "index";

fn csv_error(code: &str, err: impl ToString) -> CkError {
    CkError::Serde(ErrorInfo::new(code, err.to_string()))
}

fn type_mismatch(column: &str, expected: &str, found: &ColumnValues) -> CkError {
    CkError::Schema(
        ErrorInfo::new("table-column-type", "column has unexpected type")
            .with_context("column", column)
            .with_context("expected", expected)
            .with_context("found", found.kind()),
    )
}

/// Values stored in a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    /// Parameter values and bin contents.
    Float(Vec<f64>),
    /// Cluster ids.
    Int(Vec<i64>),
    /// Benchmark flags.
    Bool(Vec<bool>),
}

impl ColumnValues {
    /// Number of rows in the column.
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Float(values) => values.len(),
            ColumnValues::Int(values) => values.len(),
            ColumnValues::Bool(values) => values.len(),
        }
    }

    /// Returns true if the column holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> &'static str {
        match self {
            ColumnValues::Float(_) => "float",
            ColumnValues::Int(_) => "int",
            ColumnValues::Bool(_) => "bool",
        }
    }

    fn filter(&self, mask: &[bool]) -> ColumnValues {
        fn keep<T: Copy>(values: &[T], mask: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(value, _)| *value)
                .collect()
        }
        match self {
            ColumnValues::Float(values) => ColumnValues::Float(keep(values, mask)),
            ColumnValues::Int(values) => ColumnValues::Int(keep(values, mask)),
            ColumnValues::Bool(values) => ColumnValues::Bool(keep(values, mask)),
        }
    }

    fn format(&self, row: usize) -> String {
        match self {
            // Debug formatting is the shortest representation that round-trips
            // and always carries a decimal point or exponent.
            ColumnValues::Float(values) => format!("{:?}", values[row]),
            ColumnValues::Int(values) => values[row].to_string(),
            ColumnValues::Bool(values) => values[row].to_string(),
        }
    }

    fn parse(raw: &[&str]) -> Result<ColumnValues, String> {
        if raw.is_empty() {
            return Ok(ColumnValues::Float(Vec::new()));
        }
        if let Some(values) = raw
            .iter()
            .map(|cell| cell.parse::<bool>().ok())
            .collect::<Option<Vec<_>>>()
        {
            return Ok(ColumnValues::Bool(values));
        }
        if let Some(values) = raw
            .iter()
            .map(|cell| cell.parse::<i64>().ok())
            .collect::<Option<Vec<_>>>()
        {
            return Ok(ColumnValues::Int(values));
        }
        raw.iter()
            .map(|cell| cell.parse::<f64>().map_err(|_| (*cell).to_string()))
            .collect::<Result<Vec<_>, _>>()
            .map(ColumnValues::Float)
    }
}

/// Named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column header.
    pub name: String,
    /// Column contents.
    pub values: ColumnValues,
}

impl Column {
    /// Float column.
    pub fn float(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Float(values),
        }
    }

    /// Integer column.
    pub fn int(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Int(values),
        }
    }

    /// Boolean column.
    pub fn bool(name: impl Into<String>, values: Vec<bool>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Bool(values),
        }
    }
}

/// Table with one row per sample point and a unique, stable row index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    index: Vec<u64>,
    columns: Vec<Column>,
}

impl Table {
    /// Creates a table with the given index and no columns.
    pub fn new(index: Vec<u64>) -> Result<Self, CkError> {
        let unique: BTreeSet<_> = index.iter().collect();
        if unique.len() != index.len() {
            return Err(CkError::schema(
                "table-index-duplicate",
                "index values must be unique",
            ));
        }
        Ok(Self {
            index,
            columns: Vec::new(),
        })
    }

    /// Creates a table indexed `0..rows`.
    pub fn with_rows(rows: usize) -> Self {
        Self {
            index: (0..rows as u64).collect(),
            columns: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    /// True if the table has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || self.columns.is_empty()
    }

    /// Row index values.
    pub fn index(&self) -> &[u64] {
        &self.index
    }

    /// All columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column headers in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|col| col.name.as_str()).collect()
    }

    /// Looks a column up by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    /// Returns true if a column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    fn values(&self, name: &str) -> Result<&ColumnValues, CkError> {
        self.column(name)
            .map(|column| &column.values)
            .ok_or_else(|| {
                CkError::Schema(
                    ErrorInfo::new("table-column-missing", "column not found")
                        .with_context("column", name),
                )
            })
    }

    /// Float contents of `name`.
    pub fn floats(&self, name: &str) -> Result<&[f64], CkError> {
        match self.values(name)? {
            ColumnValues::Float(values) => Ok(values),
            other => Err(type_mismatch(name, "float", other)),
        }
    }

    /// Integer contents of `name`.
    pub fn ints(&self, name: &str) -> Result<&[i64], CkError> {
        match self.values(name)? {
            ColumnValues::Int(values) => Ok(values),
            other => Err(type_mismatch(name, "int", other)),
        }
    }

    /// Boolean contents of `name`.
    pub fn bools(&self, name: &str) -> Result<&[bool], CkError> {
        match self.values(name)? {
            ColumnValues::Bool(values) => Ok(values),
            other => Err(type_mismatch(name, "bool", other)),
        }
    }

    /// Adds `column`, replacing an existing column of the same name in place.
    pub fn insert_column(&mut self, column: Column) -> Result<(), CkError> {
        if column.values.len() != self.n_rows() {
            return Err(CkError::Schema(
                ErrorInfo::new("table-column-length", "column length differs from row count")
                    .with_context("column", column.name.clone())
                    .with_context("rows", self.n_rows().to_string())
                    .with_context("length", column.values.len().to_string()),
            ));
        }
        match self.columns.iter_mut().find(|col| col.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Removes a column, returning it if it existed.
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let position = self.columns.iter().position(|col| col.name == name)?;
        Some(self.columns.remove(position))
    }

    /// Keeps the rows where `mask` is true; index values are retained.
    pub fn filter(&self, mask: &[bool]) -> Table {
        debug_assert_eq!(mask.len(), self.n_rows());
        let index = self
            .index
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(idx, _)| *idx)
            .collect();
        let columns = self
            .columns
            .iter()
            .map(|col| Column {
                name: col.name.clone(),
                values: col.values.filter(mask),
            })
            .collect();
        Table { index, columns }
    }

    /// Writes the table as CSV with a leading `index` column.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), CkError> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
        let mut header = vec![INDEX_COLUMN.to_string()];
        header.extend(self.columns.iter().map(|col| col.name.clone()));
        writer
            .write_record(&header)
            .map_err(|err| csv_error("table-write-header", err))?;
        for row in 0..self.n_rows() {
            let mut record = Vec::with_capacity(self.columns.len() + 1);
            record.push(self.index[row].to_string());
            record.extend(self.columns.iter().map(|col| col.values.format(row)));
            writer
                .write_record(&record)
                .map_err(|err| csv_error("table-write-row", err))?;
        }
        writer
            .flush()
            .map_err(|err| csv_error("table-flush", err))?;
        Ok(())
    }

    /// Reads a table written by [`Table::write_csv`].
    ///
    /// Column types are inferred: all-`true`/`false` columns are boolean,
    /// columns of plain integers are integer, everything else is float.
    pub fn read_csv<R: Read>(reader: R) -> Result<Table, CkError> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let header = reader
            .headers()
            .map_err(|err| csv_error("table-read-header", err))?
            .clone();
        if header.get(0) != Some(INDEX_COLUMN) {
            return Err(CkError::Schema(
                ErrorInfo::new("table-index-missing", "first column must be the index")
                    .with_context("found", header.get(0).unwrap_or("").to_string()),
            ));
        }
        let records = reader
            .records()
            .collect::<Result<Vec<StringRecord>, _>>()
            .map_err(|err| csv_error("table-read-row", err))?;

        let index = records
            .iter()
            .map(|record| {
                let cell = record.get(0).unwrap_or("");
                cell.parse::<u64>().map_err(|_| {
                    CkError::Schema(
                        ErrorInfo::new("table-index-parse", "index value is not an integer")
                            .with_context("value", cell.to_string()),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut table = Table::new(index)?;

        for (position, name) in header.iter().enumerate().skip(1) {
            let raw: Vec<&str> = records
                .iter()
                .map(|record| record.get(position).unwrap_or(""))
                .collect();
            let values = ColumnValues::parse(&raw).map_err(|cell| {
                CkError::Schema(
                    ErrorInfo::new("table-cell-parse", "cell is not a number or boolean")
                        .with_context("column", name.to_string())
                        .with_context("value", cell),
                )
            })?;
            table.insert_column(Column {
                name: name.to_string(),
                values,
            })?;
        }
        Ok(table)
    }
}
