//! The [`BlobClient`] entry point and its configuration.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::OnceCell;

use crate::PayloadStream;
use crate::backend::common::{Backend, ByteRange, Listing};
use crate::backend::{Gcs, InMemory, LocalFs};
use crate::error::{Error, Result};
use crate::glob::{self, GlobMode, GlobPattern, GlobStream};
use crate::path::{BlobPath, Scheme};
use crate::reader::BlobReader;
use crate::writer::BlobWriter;

/// Default number of listing requests a parallel glob keeps in flight.
const DEFAULT_LIST_CONCURRENCY: usize = 32;

/// Configuration to initialize a [`BlobClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Release the underlying connection after each request instead of reusing it.
    pub release_connection: bool,
    /// Maximum number of concurrent listing requests issued by [`GlobMode::Parallel`].
    pub list_concurrency: usize,
    /// Custom endpoint for Google Cloud Storage.
    ///
    /// Assumes an emulator without authentication if set.
    pub gcs_endpoint: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            release_connection: false,
            list_concurrency: DEFAULT_LIST_CONCURRENCY,
            gcs_endpoint: None,
        }
    }
}

/// Client for reading, writing and enumerating blobs.
///
/// The client dispatches to a backend based on the scheme of each [`BlobPath`]. It is cheap to
/// clone; clones share the same backends, including the in-memory store.
#[derive(Clone, Debug)]
pub struct BlobClient(Arc<BlobClientInner>);

#[derive(Debug)]
struct BlobClientInner {
    config: ClientConfig,
    local: LocalFs,
    memory: InMemory,
    /// Created on first use, since credential discovery requires network access.
    gcs: OnceCell<Gcs>,
}

impl BlobClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self(Arc::new(BlobClientInner {
            config,
            local: LocalFs::new(),
            memory: InMemory::new(),
            gcs: OnceCell::new(),
        }))
    }

    /// Returns the configuration this client was created with.
    pub fn config(&self) -> &ClientConfig {
        &self.0.config
    }

    /// Opens a handle for writing the object at `path`.
    ///
    /// Nothing is written until [`BlobWriter::close`] is called.
    pub fn writer(&self, path: &BlobPath) -> BlobWriter {
        BlobWriter::new(self.clone(), path.clone())
    }

    /// Opens a handle for reading the object at `path`, positioned at the start.
    pub fn reader(&self, path: &BlobPath) -> BlobReader {
        BlobReader::new(self.clone(), path.clone())
    }

    /// Creates or overwrites the object at `path` with `contents`.
    pub async fn write_all(&self, path: &BlobPath, contents: impl Into<Bytes>) -> Result<()> {
        let mut writer = self.writer(path);
        writer.write(contents);
        writer.close().await
    }

    /// Reads the entire object at `path`.
    pub async fn read_all(&self, path: &BlobPath) -> Result<Vec<u8>> {
        let mut contents = Vec::new();
        self.reader(path).read_to_end(&mut contents).await?;
        Ok(contents)
    }

    /// Enumerates all objects matching the glob `pattern`.
    ///
    /// The returned stream is finite and yields every matching path once. See [`GlobMode`] for
    /// the available strategies.
    pub fn glob(&self, pattern: &str, mode: GlobMode) -> Result<GlobStream> {
        let pattern = GlobPattern::parse(pattern)?;
        Ok(match mode {
            GlobMode::Sequential => glob::sequential(self.clone(), pattern),
            GlobMode::Parallel => {
                let concurrency = self.config().list_concurrency.max(1);
                glob::parallel(self.clone(), pattern, concurrency)
            }
        })
    }

    async fn backend(&self, scheme: Scheme) -> Result<&dyn Backend> {
        let backend: &dyn Backend = match scheme {
            Scheme::Local => &self.0.local,
            Scheme::Memory => &self.0.memory,
            Scheme::Gcs => {
                let config = self.config();
                self.0
                    .gcs
                    .get_or_try_init(|| {
                        Gcs::new(config.gcs_endpoint.as_deref(), config.release_connection)
                    })
                    .await?
            }
        };

        Ok(backend)
    }

    pub(crate) async fn put(&self, path: &BlobPath, stream: PayloadStream) -> Result<()> {
        let backend = self.backend(path.scheme()).await?;
        tracing::trace!(backend = backend.name(), %path, "put");
        Ok(backend.put_object(path, stream).await?)
    }

    pub(crate) async fn get(&self, path: &BlobPath, range: ByteRange) -> Result<PayloadStream> {
        let backend = self.backend(path.scheme()).await?;
        tracing::trace!(backend = backend.name(), %path, ?range, "get");
        match backend.get_object(path, range).await? {
            Some(stream) => Ok(stream),
            None => Err(Error::NotFound(path.to_string())),
        }
    }

    pub(crate) async fn list(&self, prefix: &BlobPath, recursive: bool) -> Result<Listing> {
        let backend = self.backend(prefix.scheme()).await?;
        tracing::trace!(backend = backend.name(), %prefix, recursive, "list");
        Ok(backend.list(prefix, recursive).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_memory_store() {
        let client = BlobClient::new(ClientConfig::default());
        let path = BlobPath::parse("memory://shared/object").unwrap();

        client.write_all(&path, &b"oh hai!"[..]).await.unwrap();

        let clone = client.clone();
        assert_eq!(clone.read_all(&path).await.unwrap(), b"oh hai!");
    }

    #[test]
    fn keeps_configuration() {
        let client = BlobClient::new(ClientConfig {
            release_connection: true,
            list_concurrency: 4,
            gcs_endpoint: Some("http://localhost:4443".into()),
        });

        let config = client.config();
        assert!(config.release_connection);
        assert_eq!(config.list_concurrency, 4);
        assert_eq!(config.gcs_endpoint.as_deref(), Some("http://localhost:4443"));
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let client = BlobClient::new(ClientConfig::default());
        let path = BlobPath::parse("memory://shared/missing").unwrap();

        let err = client.read_all(&path).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(p) if p == "memory://shared/missing"));
    }

    #[tokio::test]
    async fn round_trips_local_files() {
        let tempdir = tempfile::tempdir().unwrap();
        let client = BlobClient::new(ClientConfig::default());
        let base = BlobPath::parse(&tempdir.path().display().to_string()).unwrap();
        let path = base.join("nested").join("object.bin");

        let contents: Vec<u8> = (0..=255).cycle().take(10_000).collect();
        client.write_all(&path, contents.clone()).await.unwrap();

        assert_eq!(client.read_all(&path).await.unwrap(), contents);
    }
}
