use std::fmt::{self, Display};
use std::str::FromStr;

use crate::error::Error;

const GCS_SCHEME: &str = "gs://";
const MEMORY_SCHEME: &str = "memory://";
const FILE_SCHEME: &str = "file://";

/// The storage system a [`BlobPath`] points into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scheme {
    /// A path on the local filesystem.
    Local,
    /// An object in a Google Cloud Storage bucket.
    Gcs,
    /// An object in the client's in-memory store.
    Memory,
}

/// The fully qualified location of an object or prefix.
///
/// Paths are written in one of the following forms:
///
/// - `gs://{bucket}/{key}` for Google Cloud Storage,
/// - `memory://{store}/{key}` for the in-memory store,
/// - `file:///{path}` or a plain filesystem path for local files.
///
/// Local paths are always rendered without the `file://` prefix, so that listings and user input
/// compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobPath {
    scheme: Scheme,
    bucket: String,
    key: String,
}

impl BlobPath {
    /// Parses a path string.
    pub fn parse(path: &str) -> Result<Self, Error> {
        let invalid = |reason| Error::InvalidPath {
            path: path.to_owned(),
            reason,
        };

        if let Some(rest) = path.strip_prefix(GCS_SCHEME) {
            let (bucket, key) = split_bucket(rest).ok_or_else(|| invalid("missing bucket"))?;
            return Ok(Self::new(Scheme::Gcs, bucket, key));
        }

        if let Some(rest) = path.strip_prefix(MEMORY_SCHEME) {
            let (store, key) = split_bucket(rest).ok_or_else(|| invalid("missing store name"))?;
            return Ok(Self::new(Scheme::Memory, store, key));
        }

        let local = path.strip_prefix(FILE_SCHEME).unwrap_or(path);
        if local.contains("://") {
            return Err(invalid("unsupported scheme"));
        }
        if local.is_empty() {
            return Err(invalid("path is empty"));
        }

        Ok(Self::new(Scheme::Local, "", local))
    }

    pub(crate) fn new(scheme: Scheme, bucket: &str, key: &str) -> Self {
        Self {
            scheme,
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        }
    }

    /// Returns a path in the same bucket with a different key.
    pub(crate) fn with_key(&self, key: impl Into<String>) -> Self {
        Self {
            scheme: self.scheme,
            bucket: self.bucket.clone(),
            key: key.into(),
        }
    }

    /// The storage system this path belongs to.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The bucket (or in-memory store name). Empty for local paths.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The key within the bucket. For local paths, this is the filesystem path.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Appends `name` to this path, separated by exactly one `/`.
    pub fn join(&self, name: &str) -> Self {
        let name = name.trim_start_matches('/');
        let key = if self.key.is_empty() || self.key.ends_with('/') {
            format!("{}{name}", self.key)
        } else {
            format!("{}/{name}", self.key)
        };

        self.with_key(key)
    }
}

/// Joins a base path string and a name into a new path string.
pub fn join(base: &str, name: &str) -> Result<String, Error> {
    Ok(BlobPath::parse(base)?.join(name).to_string())
}

fn split_bucket(rest: &str) -> Option<(&str, &str)> {
    let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
    (!bucket.is_empty()).then_some((bucket, key))
}

impl Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scheme {
            Scheme::Local => write!(f, "{}", self.key),
            Scheme::Gcs => write!(f, "{GCS_SCHEME}{}/{}", self.bucket, self.key),
            Scheme::Memory => write!(f, "{MEMORY_SCHEME}{}/{}", self.bucket, self.key),
        }
    }
}

impl FromStr for BlobPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
