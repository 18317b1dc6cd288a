//! Provenance and schema descriptors attached to persisted datasets.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp layout used in metadata files, e.g. `Mon  3 Jun 2024 14:05`.
const TIME_FORMAT: &str = "%a %e %b %Y %H:%M";

/// Semantic version describing the schema of the metadata file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version incremented for breaking changes.
    pub major: u32,
    /// Minor version incremented for additive changes.
    pub minor: u32,
    /// Patch version incremented for bug fixes and documentation updates.
    pub patch: u32,
}

impl SchemaVersion {
    /// Creates a new schema version descriptor.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

/// Provenance information recorded with every scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// Hash of the scan configuration (sample points and distribution function).
    pub input_hash: String,
    /// Seed used for sample-point noise, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Timestamp recording when the run finished.
    pub created_at: String,
    /// Version map for the tools involved in the run.
    #[serde(default)]
    pub tool_versions: BTreeMap<String, String>,
    /// Schema of the metadata file.
    #[serde(default)]
    pub schema: SchemaVersion,
}

impl RunProvenance {
    /// Captures provenance for a run with the given configuration hash.
    pub fn capture(input_hash: impl Into<String>) -> Self {
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert("ck-core".to_string(), env!("CARGO_PKG_VERSION").to_string());
        Self {
            input_hash: input_hash.into(),
            seed: None,
            created_at: timestamp(),
            tool_versions,
            schema: SchemaVersion::default(),
        }
    }
}

/// Current UTC time in the metadata timestamp layout.
pub fn timestamp() -> String {
    Utc::now().format(TIME_FORMAT).to_string()
}
