use thiserror::Error;

use crate::backend::common::BackendError;

/// Errors that can occur in the blob client.
#[derive(Debug, Error)]
pub enum Error {
    /// The given string cannot be interpreted as a blob path.
    #[error("invalid blob path `{path}`: {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why the path was rejected.
        reason: &'static str,
    },

    /// The glob pattern could not be compiled.
    #[error("invalid glob pattern `{pattern}`")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying regex error.
        #[source]
        cause: regex::Error,
    },

    /// The object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// An error from the storage backend.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// An I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for client operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
