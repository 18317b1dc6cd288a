#![deny(missing_docs)]
#![doc = "Data container for scanned distributions: typed table, metadata, persistence and subsetting."]

pub mod container;
pub mod dwe;
pub mod persist;
pub mod rename;
pub mod subset;
pub mod table;

pub use container::{DataContainer, DataSource, BIN_PREFIX};
pub use dwe::DataWithErrors;
pub use persist::{
    data_path, metadata_path, FixedPrompt, OverwritePolicy, Prompt, StdinPrompt, WriteOptions,
    WriteOutcome,
};
pub use rename::{canonical_ids, Rename};
pub use subset::{linspace, FixOptions, SampleSpec, DEFAULT_BPOINT_COLUMN};
pub use table::{Column, ColumnValues, Table, INDEX_COLUMN};
