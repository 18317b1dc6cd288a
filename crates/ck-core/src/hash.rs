//! Content hashes of plans and scan inputs.
//!
//! Hashes are taken over canonical JSON, so field order never changes them.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::CkError;
use crate::serde::to_canonical_json_bytes;

/// Lowercase hex SHA-256 of the canonical JSON form of `value`.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, CkError> {
    let digest = Sha256::digest(to_canonical_json_bytes(value)?);
    Ok(format!("{digest:x}"))
}
