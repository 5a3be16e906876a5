//! Error types for the disk cache
//!
//! Provides unified error handling using thiserror.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CodecError;

// == Cache Error Enum ==
/// Unified error type for the disk cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// No platform cache directory could be resolved
    #[error("Cache directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// The cache root could not be created
    #[error("Failed to create cache directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The codec rejected the value
    #[error("Failed to encode value for key {key:?}: {source}")]
    EncodingFailed {
        key: String,
        #[source]
        source: CodecError,
    },

    /// I/O error while writing an entry
    #[error("Failed to write entry for key {key:?}: {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: io::Error,
    },

    /// I/O error while reading an existing entry
    #[error("Failed to read entry for key {key:?}: {source}")]
    ReadFailed {
        key: String,
        #[source]
        source: io::Error,
    },

    /// Stored bytes are corrupt or do not match the requested type
    #[error("Failed to decode entry for key {key:?}: {source}")]
    DecodingFailed {
        key: String,
        #[source]
        source: CodecError,
    },

    /// I/O error while deleting one or more entries.
    ///
    /// Bulk operations keep going after a failure; `failed` counts every
    /// file that could not be removed and `path`/`source` describe the first.
    #[error("Failed to remove {failed} cache file(s), first at {path}: {source}")]
    RemovalFailed {
        path: PathBuf,
        failed: usize,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    /// Builds a removal error for a single path.
    pub(crate) fn removal(path: PathBuf, source: io::Error) -> Self {
        CacheError::RemovalFailed {
            path,
            failed: 1,
            source,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the disk cache.
pub type Result<T> = std::result::Result<T, CacheError>;
