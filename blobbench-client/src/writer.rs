//! Buffered write handles for blobs.

use bytes::Bytes;
use futures_util::StreamExt;

use crate::client::BlobClient;
use crate::error::Result;
use crate::path::BlobPath;

/// A write handle for a single blob.
///
/// Written chunks are buffered without copying and uploaded as one stream on
/// [`close`](Self::close). Dropping the handle without closing it discards the data.
#[derive(Debug)]
pub struct BlobWriter {
    client: BlobClient,
    path: BlobPath,
    chunks: Vec<Bytes>,
    len: u64,
}

impl BlobWriter {
    pub(crate) fn new(client: BlobClient, path: BlobPath) -> Self {
        Self {
            client,
            path,
            chunks: Vec::new(),
            len: 0,
        }
    }

    /// The path this handle writes to.
    pub fn path(&self) -> &BlobPath {
        &self.path
    }

    /// Appends `data` to the object.
    pub fn write(&mut self, data: impl Into<Bytes>) {
        let data = data.into();
        self.len += data.len() as u64;
        if !data.is_empty() {
            self.chunks.push(data);
        }
    }

    /// The number of bytes written so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Uploads the buffered contents, creating or overwriting the object.
    pub async fn close(self) -> Result<()> {
        tracing::debug!(path = %self.path, len = self.len, "closing writer");
        let stream = futures_util::stream::iter(self.chunks.into_iter().map(Ok)).boxed();
        self.client.put(&self.path, stream).await
    }
}
