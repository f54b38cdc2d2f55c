//! Error types for definition loading and schema-graph construction.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading a definition document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Document errors (exit code 2)
    #[error("duplicate type definition: {name}")]
    DuplicateDefinition { name: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors during schema-graph construction.
///
/// Most malformed input degrades silently (unknown predicates are recorded,
/// unrecognized rule shapes yield empty constraints). The cases below would
/// corrupt the output if absorbed, so they surface to the caller.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("union '{union}' has variant '{variant}' that no handler can resolve")]
    UnresolvedVariant { union: String, variant: String },

    #[error("no definition named '{name}'")]
    UnknownRoot { name: String },
}

impl BuildError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}
