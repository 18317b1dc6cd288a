//! File layout, overwrite handling and atomic writes for `(directory, name)` pairs.

use std::fmt;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ck_core::errors::{CkError, ErrorInfo};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Path of the tabular file for `(directory, name)`.
pub fn data_path(directory: impl AsRef<Path>, name: &str) -> PathBuf {
    directory.as_ref().join(format!("{name}_data.csv"))
}

/// Path of the metadata file for `(directory, name)`.
pub fn metadata_path(directory: impl AsRef<Path>, name: &str) -> PathBuf {
    directory.as_ref().join(format!("{name}_metadata.json"))
}

/// What to do when an output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Ask for confirmation before replacing.
    #[default]
    Ask,
    /// Replace silently.
    Overwrite,
    /// Abort with [`CkError::OverwriteConflict`] and write nothing.
    Raise,
}

impl FromStr for OverwritePolicy {
    type Err = CkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ask" => Ok(OverwritePolicy::Ask),
            "overwrite" => Ok(OverwritePolicy::Overwrite),
            "raise" => Ok(OverwritePolicy::Raise),
            other => Err(CkError::Configuration(
                ErrorInfo::new("overwrite-policy-unknown", "unknown overwrite policy")
                    .with_context("value", other)
                    .with_hint("use one of: ask, overwrite, raise"),
            )),
        }
    }
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OverwritePolicy::Ask => "ask",
            OverwritePolicy::Overwrite => "overwrite",
            OverwritePolicy::Raise => "raise",
        };
        f.write_str(label)
    }
}

/// Source of yes/no answers for [`OverwritePolicy::Ask`].
pub trait Prompt {
    /// Returns true if the user agrees to `question`.
    fn confirm(&self, question: &str) -> bool;
}

/// Prompt reading `y`/`n` from standard input.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&self, question: &str) -> bool {
        let stdin = io::stdin();
        loop {
            print!("{question} [y/n] ");
            let _ = io::stdout().flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return false,
                Ok(_) => {}
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return true,
                "n" | "no" => return false,
                _ => continue,
            }
        }
    }
}

/// Prompt with a fixed answer, for non-interactive use.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt(pub bool);

impl Prompt for FixedPrompt {
    fn confirm(&self, _question: &str) -> bool {
        self.0
    }
}

/// Options for writing a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Behaviour when either output file exists.
    pub overwrite: OverwritePolicy,
    /// Write even if the table is empty.
    pub force: bool,
}

impl WriteOptions {
    /// Options with the given policy and no forcing.
    pub fn with_policy(overwrite: OverwritePolicy) -> Self {
        Self {
            overwrite,
            force: false,
        }
    }
}

/// Result of a write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Both files were written.
    Written {
        /// Tabular file.
        data: PathBuf,
        /// Metadata file.
        metadata: PathBuf,
    },
    /// The user declined to overwrite; nothing was touched.
    Declined,
}

/// Applies `policy` to `paths`; returns false if the write must be skipped.
pub fn handle_overwrite(
    paths: &[&Path],
    policy: OverwritePolicy,
    prompt: &dyn Prompt,
) -> Result<bool, CkError> {
    let existing: Vec<&Path> = paths.iter().copied().filter(|p| p.exists()).collect();
    if existing.is_empty() {
        return Ok(true);
    }
    let listing = existing
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    match policy {
        OverwritePolicy::Overwrite => {
            debug!(paths = %listing, "overwriting existing files");
            Ok(true)
        }
        OverwritePolicy::Raise => Err(CkError::OverwriteConflict(
            ErrorInfo::new("overwrite-refused", "output files already exist")
                .with_context("paths", listing)
                .with_hint("pass overwrite policy `overwrite` to replace them"),
        )),
        OverwritePolicy::Ask => {
            let agreed = prompt.confirm(&format!(
                "Output paths {listing} already exist and will be overwritten. Proceed?"
            ));
            if !agreed {
                info!(paths = %listing, "overwrite declined, leaving files untouched");
            }
            Ok(agreed)
        }
    }
}

/// Writes every `(path, contents)` pair to a scratch file next to its target
/// and renames all of them into place once every scratch file is complete.
pub fn write_files_atomically(files: &[(&Path, &[u8])]) -> Result<(), CkError> {
    let mut staged = Vec::with_capacity(files.len());
    for (path, contents) in files {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.is_dir() {
            debug!(dir = %parent.display(), "creating directory");
            fs::create_dir_all(&parent).map_err(|err| CkError::io("output-mkdir", &parent, err))?;
        }
        let mut scratch =
            NamedTempFile::new_in(&parent).map_err(|err| CkError::io("scratch-create", path, err))?;
        scratch
            .write_all(contents)
            .and_then(|_| scratch.flush())
            .map_err(|err| CkError::io("scratch-write", path, err))?;
        staged.push((scratch, path.to_path_buf()));
    }
    for (scratch, target) in staged {
        scratch
            .persist(&target)
            .map_err(|err| CkError::io("scratch-persist", &target, err.error))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parsing() {
        assert_eq!("raise".parse::<OverwritePolicy>().unwrap(), OverwritePolicy::Raise);
        assert_eq!(OverwritePolicy::Overwrite.to_string(), "overwrite");
        let err = "sometimes".parse::<OverwritePolicy>().unwrap_err();
        assert!(matches!(err, CkError::Configuration(_)));
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn paths_are_pure_functions_of_dir_and_name() {
        assert_eq!(data_path("out", "run"), PathBuf::from("out/run_data.csv"));
        assert_eq!(
            metadata_path("out", "run"),
            PathBuf::from("out/run_metadata.json")
        );
    }

    #[test]
    fn missing_files_always_proceed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        for policy in [
            OverwritePolicy::Ask,
            OverwritePolicy::Raise,
            OverwritePolicy::Overwrite,
        ] {
            assert!(handle_overwrite(&[&path], policy, &FixedPrompt(false)).unwrap());
        }
    }
}
