#![deny(missing_docs)]
#![doc = "Shared error taxonomy, metadata record and deterministic helpers for the ck workspace."]

pub mod errors;
/// Stable hashing of serializable configuration.
pub mod hash;
pub mod metadata;
pub mod provenance;
pub mod rng;
pub mod serde;

pub use errors::{CkError, ErrorInfo};
pub use hash::stable_hash_string;
pub use metadata::{
    ClusterMetadata, DFunctionMetadata, ErrorsMetadata, Metadata, RangeSpec, Sampling,
    ScanMetadata, SpointsMetadata,
};
pub use provenance::{timestamp, RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, CkError>;
