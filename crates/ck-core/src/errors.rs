//! Structured error types shared across ck crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`CkError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, indices, offending values).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Adds the offending filesystem path to the payload.
    pub fn with_path(self, path: &Path) -> Self {
        self.with_context("path", path.display().to_string())
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the scan, data and clustering pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum CkError {
    /// Missing or conflicting configuration, or an operation called out of order.
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),
    /// Empty or inconsistent result tables.
    #[error("schema error: {0}")]
    Schema(ErrorInfo),
    /// Output files already exist and the overwrite policy forbids replacing them.
    #[error("overwrite conflict: {0}")]
    OverwriteConflict(ErrorInfo),
    /// Vanishing denominators and other numerically undefined quantities.
    #[error("numeric degeneracy: {0}")]
    NumericDegeneracy(ErrorInfo),
    /// References to cluster ids or columns that do not exist.
    #[error("unknown cluster reference: {0}")]
    UnknownClusterReference(ErrorInfo),
    /// Failure of the distribution function at a sample point.
    #[error("evaluation error: {0}")]
    Evaluation(ErrorInfo),
    /// The run was interrupted before completion.
    #[error("cancelled: {0}")]
    Cancelled(ErrorInfo),
    /// Filesystem failures.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and parsing failures.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl CkError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            CkError::Configuration(info)
            | CkError::Schema(info)
            | CkError::OverwriteConflict(info)
            | CkError::NumericDegeneracy(info)
            | CkError::UnknownClusterReference(info)
            | CkError::Evaluation(info)
            | CkError::Cancelled(info)
            | CkError::Io(info)
            | CkError::Serde(info) => info,
        }
    }

    /// Shorthand for a configuration error.
    pub fn config(code: &str, message: impl Into<String>) -> Self {
        CkError::Configuration(ErrorInfo::new(code, message))
    }

    /// Shorthand for a schema error.
    pub fn schema(code: &str, message: impl Into<String>) -> Self {
        CkError::Schema(ErrorInfo::new(code, message))
    }

    /// Wraps an IO failure on `path`.
    pub fn io(code: &str, path: &Path, err: impl ToString) -> Self {
        CkError::Io(ErrorInfo::new(code, err.to_string()).with_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_context_and_hint() {
        let err = CkError::Configuration(
            ErrorInfo::new("scan-no-points", "no sample points configured")
                .with_context("scanner", "default")
                .with_hint("call set_spoints_grid first"),
        );
        let text = err.to_string();
        assert!(text.starts_with("configuration error: no sample points configured"));
        assert!(text.contains("scanner=default"));
        assert!(text.contains("hint: call set_spoints_grid first"));
    }

    #[test]
    fn serde_tags_family() {
        let err = CkError::schema("table-empty", "empty");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["family"], "Schema");
        let back: CkError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }
}
