use std::fmt::Debug;

use thiserror::Error;

use crate::PayloadStream;
use crate::path::BlobPath;

/// User agent string used for outgoing requests.
pub const USER_AGENT: &str = concat!("blobbench/", env!("CARGO_PKG_VERSION"));

/// A half-open byte range within an object.
///
/// An `end` of `None` extends the range to the end of the object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ByteRange {
    /// Offset of the first byte.
    pub start: u64,
    /// Offset one past the last byte, if bounded.
    pub end: Option<u64>,
}

impl ByteRange {
    /// The range covering the entire object.
    pub const FULL: Self = Self {
        start: 0,
        end: None,
    };

    /// The range starting at `start` and extending to the end of the object.
    pub fn starting_at(start: u64) -> Self {
        Self { start, end: None }
    }

    /// The range of `len` bytes starting at `start`.
    pub fn bounded(start: u64, len: u64) -> Self {
        Self {
            start,
            end: Some(start.saturating_add(len)),
        }
    }

    /// Returns `true` if the range cannot contain any bytes.
    pub fn is_empty(&self) -> bool {
        self.end.is_some_and(|end| end <= self.start)
    }

    /// The number of bytes in the range, if bounded.
    pub fn len(&self) -> Option<u64> {
        self.end.map(|end| end.saturating_sub(self.start))
    }
}

/// Result of listing a prefix.
#[derive(Debug, Default)]
pub struct Listing {
    /// Objects found under the prefix.
    pub objects: Vec<BlobPath>,
    /// Sub-prefixes ("directories"), only populated by non-recursive listings.
    pub prefixes: Vec<BlobPath>,
}

#[async_trait::async_trait]
pub trait Backend: Debug + Send + Sync + 'static {
    /// The backend name, used for diagnostics.
    fn name(&self) -> &'static str;

    /// Creates or overwrites the object at the given path.
    async fn put_object(&self, path: &BlobPath, stream: PayloadStream) -> BackendResult<()>;

    /// Streams the given range of an object, or `None` if it does not exist.
    ///
    /// Ranges starting at or beyond the end of the object yield an empty stream.
    async fn get_object(
        &self,
        path: &BlobPath,
        range: ByteRange,
    ) -> BackendResult<Option<PayloadStream>>;

    /// Lists objects below `prefix`.
    ///
    /// The key of `prefix` is either empty or ends with `/`. Recursive listings return every
    /// object below the prefix; non-recursive listings return direct children and sub-prefixes.
    async fn list(&self, prefix: &BlobPath, recursive: bool) -> BackendResult<Listing>;
}

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// IO errors related to payload streaming or file operations.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors related to de/serialization.
    #[error("serde error: {context}")]
    Serde {
        /// What was being decoded.
        context: String,
        /// The underlying decoding error.
        #[source]
        cause: serde_json::Error,
    },

    /// All errors stemming from the reqwest client.
    ///
    /// These can be network errors encountered when sending the requests, but can also indicate
    /// errors returned by the API itself.
    #[error("reqwest error: {context}")]
    Reqwest {
        /// The request that failed.
        context: String,
        /// The underlying client error.
        #[source]
        cause: reqwest::Error,
    },

    /// Errors encountered when attempting to authenticate with GCP.
    #[error("GCP authentication error: {0}")]
    GcpAuth(#[from] gcp_auth::Error),

    /// Any other error stemming from one of the storage backends.
    #[error("storage backend error: {context}")]
    Generic {
        /// What the backend was doing.
        context: String,
        /// The underlying error.
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BackendError {
    pub(crate) fn reqwest(context: impl Into<String>) -> impl FnOnce(reqwest::Error) -> Self {
        let context = context.into();
        move |cause| Self::Reqwest { context, cause }
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Creates a reqwest client with required defaults.
///
/// With `release_connection`, no idle connections are kept in the pool, so every request opens
/// a fresh connection.
pub fn reqwest_client(release_connection: bool) -> BackendResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if release_connection {
        builder = builder.pool_max_idle_per_host(0);
    }

    builder
        .build()
        .map_err(BackendError::reqwest("building http client"))
}
