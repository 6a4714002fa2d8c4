//! Positioned read handles for blobs.

use bytes::Bytes;
use futures_util::TryStreamExt;
use tokio::io::{AsyncBufReadExt, Lines};
use tokio_util::io::StreamReader;

use crate::PayloadStream;
use crate::backend::common::ByteRange;
use crate::client::BlobClient;
use crate::error::Result;
use crate::path::BlobPath;

/// Line iterator over a blob, as returned by [`BlobReader::lines`].
pub type BlobLines = Lines<StreamReader<PayloadStream, Bytes>>;

/// A read handle for a single blob.
///
/// The handle tracks a position within the object. Every call to [`read`](Self::read) issues one
/// ranged request starting at that position, so small reads measure per-request overhead rather
/// than hitting a local buffer.
#[derive(Debug)]
pub struct BlobReader {
    client: BlobClient,
    path: BlobPath,
    position: u64,
}

impl BlobReader {
    pub(crate) fn new(client: BlobClient, path: BlobPath) -> Self {
        Self {
            client,
            path,
            position: 0,
        }
    }

    /// The path this handle reads from.
    pub fn path(&self) -> &BlobPath {
        &self.path
    }

    /// The offset of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Moves the handle to an absolute offset.
    ///
    /// Seeking beyond the end of the object is allowed; subsequent reads return no data.
    pub fn seek(&mut self, position: u64) {
        self.position = position;
    }

    /// Reads up to `buf.len()` bytes at the current position and advances past them.
    ///
    /// Returns `0` at the end of the object.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let range = ByteRange::bounded(self.position, buf.len() as u64);
        let mut stream = self.client.get(&self.path, range).await?;

        let mut filled = 0;
        while filled < buf.len() {
            let Some(chunk) = stream.try_next().await? else {
                break;
            };
            let n = chunk.len().min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&chunk[..n]);
            filled += n;
        }

        self.position += filled as u64;
        Ok(filled)
    }

    /// Reads everything from the current position to the end into `buf`.
    ///
    /// Returns the number of bytes appended.
    pub async fn read_to_end(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        let range = ByteRange::starting_at(self.position);
        let mut stream = self.client.get(&self.path, range).await?;

        let start = buf.len();
        while let Some(chunk) = stream.try_next().await? {
            buf.extend_from_slice(&chunk);
        }

        let read = buf.len() - start;
        self.position += read as u64;
        Ok(read)
    }

    /// Reads from the current position to the end without holding on to the contents.
    ///
    /// Returns the number of bytes read.
    pub async fn discard_to_end(&mut self) -> Result<u64> {
        let range = ByteRange::starting_at(self.position);
        let mut stream = self.client.get(&self.path, range).await?;

        let mut read = 0;
        while let Some(chunk) = stream.try_next().await? {
            read += chunk.len() as u64;
        }

        self.position += read;
        Ok(read)
    }

    /// Converts the handle into an iterator over UTF-8 lines from the current position.
    ///
    /// Lines are decoded while streaming; invalid UTF-8 surfaces as an error from
    /// [`Lines::next_line`].
    pub async fn lines(self) -> Result<BlobLines> {
        let range = ByteRange::starting_at(self.position);
        let stream = self.client.get(&self.path, range).await?;
        Ok(StreamReader::new(stream).lines())
    }
}
