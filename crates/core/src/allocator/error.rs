//! Error types for the allocator module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while allocating destination paths.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The target directory is missing, not a directory, or rejects writes.
    #[error("Directory is not writable: {path}")]
    NotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination file name could not be derived from the input.
    #[error("Cannot derive a file name from: {path}")]
    InvalidBaseName { path: PathBuf },

    /// I/O error while probing candidate names.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AllocationError {
    /// Creates a not-writable error.
    pub fn not_writable(path: PathBuf, source: std::io::Error) -> Self {
        Self::NotWritable { path, source }
    }
}
