//! Storage traits and error types
//!
//! This module defines the record interface shared by the append-only logs
//! and the errors raised while reading or writing them.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A line-delimited JSON record keyed by a URL identity
///
/// Logs holding these records are append-only: a record is never rewritten,
/// and resuming a run means skipping every identity already present.
pub trait Record: Serialize + DeserializeOwned {
    /// The identity this record is deduplicated by
    fn identity(&self) -> &str;
}
