//! Definition document loading.
//!
//! A definition document is a JSON object with a `types` array of tagged
//! type definitions. Loading indexes it into [`Definitions`].

use std::path::Path;

use serde::Deserialize;

use crate::error::LoadError;
use crate::types::{Definitions, TypeDef};

#[derive(Debug, Deserialize)]
struct Document {
    types: Vec<TypeDef>,
}

/// Load a definition document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// `LoadError::InvalidJson` if it isn't a valid document, or
/// `LoadError::DuplicateDefinition` if two definitions share a name.
pub fn load_definitions(path: &Path) -> Result<Definitions, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_definitions_str(&content)
}

/// Load a definition document from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` or `LoadError::DuplicateDefinition`.
pub fn load_definitions_str(content: &str) -> Result<Definitions, LoadError> {
    let document: Document =
        serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })?;
    Definitions::new(document.types)
}
