use std::io::{ErrorKind, SeekFrom};
use std::pin::pin;

use futures_util::StreamExt;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufWriter};
use tokio_util::io::{ReaderStream, StreamReader};

use super::common::{Backend, BackendResult, ByteRange, Listing};
use crate::PayloadStream;
use crate::path::BlobPath;

#[derive(Debug, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Backend for LocalFs {
    fn name(&self) -> &'static str {
        "local-fs"
    }

    #[tracing::instrument(level = "trace", fields(%path), skip_all)]
    async fn put_object(&self, path: &BlobPath, stream: PayloadStream) -> BackendResult<()> {
        let file_path = std::path::Path::new(path.key());
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(file_path)
            .await?;

        let mut reader = pin!(StreamReader::new(stream));
        let mut writer = BufWriter::new(file);

        tokio::io::copy(&mut reader, &mut writer).await?;
        writer.flush().await?;
        let file = writer.into_inner();
        file.sync_data().await?;

        Ok(())
    }

    #[tracing::instrument(level = "trace", fields(%path, ?range), skip_all)]
    async fn get_object(
        &self,
        path: &BlobPath,
        range: ByteRange,
    ) -> BackendResult<Option<PayloadStream>> {
        let mut file = match OpenOptions::new().read(true).open(path.key()).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!("Object not found");
                return Ok(None);
            }
            err => err?,
        };

        if range.start > 0 {
            file.seek(SeekFrom::Start(range.start)).await?;
        }

        let stream = match range.len() {
            Some(len) => ReaderStream::new(file.take(len)).boxed(),
            None => ReaderStream::new(file).boxed(),
        };

        Ok(Some(stream))
    }

    #[tracing::instrument(level = "trace", fields(%prefix, recursive = recursive), skip_all)]
    async fn list(&self, prefix: &BlobPath, recursive: bool) -> BackendResult<Listing> {
        let mut listing = Listing::default();
        let mut directories = vec![prefix.key().to_owned()];

        while let Some(dir) = directories.pop() {
            let fs_dir = if dir.is_empty() { "." } else { dir.as_str() };
            let mut entries = match tokio::fs::read_dir(fs_dir).await {
                Ok(entries) => entries,
                // A missing directory is an empty prefix.
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let Ok(name) = entry.file_name().into_string() else {
                    tracing::warn!(?dir, "skipping non-UTF-8 file name");
                    continue;
                };

                if entry.file_type().await?.is_dir() {
                    let sub_dir = format!("{dir}{name}/");
                    if recursive {
                        directories.push(sub_dir);
                    } else {
                        listing.prefixes.push(prefix.with_key(sub_dir));
                    }
                } else {
                    listing.objects.push(prefix.with_key(format!("{dir}{name}")));
                }
            }
        }

        tracing::debug!(
            objects = listing.objects.len(),
            prefixes = listing.prefixes.len(),
            "listed directory"
        );
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{make_stream, read_to_vec};

    fn local(dir: &tempfile::TempDir, key: &str) -> BlobPath {
        BlobPath::parse(&format!("{}/{key}", dir.path().display())).unwrap()
    }

    #[tokio::test]
    async fn overwrites_objects() {
        let tempdir = tempfile::tempdir().unwrap();
        let backend = LocalFs::new();
        let path = local(&tempdir, "nested/object.bin");

        backend.put_object(&path, make_stream(b"first")).await.unwrap();
        backend.put_object(&path, make_stream(b"oh hai!")).await.unwrap();

        let stream = backend
            .get_object(&path, ByteRange::FULL)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read_to_vec(stream).await.unwrap(), b"oh hai!");
    }

    #[tokio::test]
    async fn reads_ranges() {
        let tempdir = tempfile::tempdir().unwrap();
        let backend = LocalFs::new();
        let path = local(&tempdir, "object.bin");
        backend.put_object(&path, make_stream(b"0123456789")).await.unwrap();

        let stream = backend
            .get_object(&path, ByteRange::bounded(3, 4))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read_to_vec(stream).await.unwrap(), b"3456");

        let stream = backend
            .get_object(&path, ByteRange::starting_at(20))
            .await
            .unwrap()
            .unwrap();
        assert!(read_to_vec(stream).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_object_is_none() {
        let tempdir = tempfile::tempdir().unwrap();
        let backend = LocalFs::new();

        let result = backend
            .get_object(&local(&tempdir, "missing"), ByteRange::FULL)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn lists_directories() {
        let tempdir = tempfile::tempdir().unwrap();
        let backend = LocalFs::new();
        for key in ["a.bin", "sub/b.bin", "sub/deeper/c.bin"] {
            backend
                .put_object(&local(&tempdir, key), make_stream(b"x"))
                .await
                .unwrap();
        }
        let prefix = local(&tempdir, "");

        let shallow = backend.list(&prefix, false).await.unwrap();
        assert_eq!(shallow.objects, vec![local(&tempdir, "a.bin")]);
        assert_eq!(shallow.prefixes, vec![local(&tempdir, "sub/")]);

        let mut deep: Vec<_> = backend
            .list(&prefix, true)
            .await
            .unwrap()
            .objects
            .into_iter()
            .map(|p| p.to_string())
            .collect();
        deep.sort();
        let expected: Vec<_> = ["a.bin", "sub/b.bin", "sub/deeper/c.bin"]
            .into_iter()
            .map(|key| local(&tempdir, key).to_string())
            .collect();
        assert_eq!(deep, expected);
    }

    #[tokio::test]
    async fn missing_prefix_is_empty() {
        let tempdir = tempfile::tempdir().unwrap();
        let listing = LocalFs::new()
            .list(&local(&tempdir, "nothing/here/"), true)
            .await
            .unwrap();
        assert!(listing.objects.is_empty());
    }
}
