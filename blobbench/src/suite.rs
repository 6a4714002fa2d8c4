//! Sequential benchmarks against a single target object.
//!
//! Each function covers one phase and wraps the measured work in a [`Timer`](crate::report::Timer).
//! Any error aborts the phase; the timer line is still printed, but no throughput is reported.

use anyhow::{Context, Result};
use blobbench_client::{BlobClient, BlobPath, GlobMode};
use futures::TryStreamExt;

use crate::error::BenchError;
use crate::payload::Payload;
use crate::report::{Reporter, throughput};

/// Maximum number of offsets visited by [`seek_speed`].
pub const SEEK_ITERATIONS: u64 = 10_000;

/// Writes the payload to `path`, creating or overwriting the object.
pub async fn write_large_file(
    client: &BlobClient,
    reporter: &Reporter,
    path: &BlobPath,
    payload: &Payload,
) -> Result<()> {
    let _timer = reporter.timer("write_large_file");

    let mut writer = client.writer(path);
    writer.write(payload.bytes().clone());
    writer
        .close()
        .await
        .with_context(|| format!("failed to write `{path}`"))
}

/// Reads `path` to the end and verifies it matches the payload.
///
/// Returns the throughput in MB/s.
pub async fn read_large_file(
    client: &BlobClient,
    reporter: &Reporter,
    path: &BlobPath,
    payload: &Payload,
) -> Result<f64> {
    let timer = reporter.timer("read_large_file");

    let mut contents = Vec::with_capacity(payload.len() as usize);
    client
        .reader(path)
        .read_to_end(&mut contents)
        .await
        .with_context(|| format!("failed to read `{path}`"))?;

    let elapsed = timer.finish();

    if contents != payload.bytes().as_ref() {
        return Err(BenchError::PayloadMismatch {
            path: path.to_string(),
            expected: payload.len(),
            actual: contents.len() as u64,
        }
        .into());
    }

    let mbps = throughput(payload.len(), elapsed);
    reporter.throughput(mbps);
    Ok(mbps)
}

/// Iterates over all lines of `path` without holding on to them.
///
/// Returns the number of lines.
pub async fn read_large_file_lines(
    client: &BlobClient,
    reporter: &Reporter,
    path: &BlobPath,
) -> Result<u64> {
    let _timer = reporter.timer("read_large_file_lines");

    let mut lines = client
        .reader(path)
        .lines()
        .await
        .with_context(|| format!("failed to open `{path}` in line mode"))?;

    let mut count = 0;
    while lines
        .next_line()
        .await
        .with_context(|| format!("failed to read line {} of `{path}`", count + 1))?
        .is_some()
    {
        count += 1;
    }

    tracing::debug!(%path, lines = count, "iterated lines");
    Ok(count)
}

/// Reads single bytes at consecutive offsets, seeking before each read.
///
/// Every read must return exactly the byte of the payload at that offset. The number of offsets
/// is capped at [`SEEK_ITERATIONS`] and at the payload length.
pub async fn seek_speed(
    client: &BlobClient,
    reporter: &Reporter,
    path: &BlobPath,
    payload: &Payload,
) -> Result<()> {
    let offsets = SEEK_ITERATIONS.min(payload.len());
    let expected = payload.bytes();

    let _timer = reporter.timer("seek_speed");

    let mut reader = client.reader(path);
    let mut byte = [0; 1];
    for offset in 0..offsets {
        reader.seek(offset);
        let read = reader
            .read(&mut byte)
            .await
            .with_context(|| format!("failed to read offset {offset} of `{path}`"))?;

        if read != 1 {
            return Err(BenchError::ShortRead {
                path: path.to_string(),
                offset,
                read,
            }
            .into());
        }

        let expected = expected[offset as usize];
        if byte[0] != expected {
            return Err(BenchError::SeekMismatch {
                path: path.to_string(),
                offset,
                expected,
                actual: byte[0],
            }
            .into());
        }
    }

    Ok(())
}

/// Reads the first byte of every object matching `pattern`.
///
/// The listing happens before the timer starts. Returns the number of objects read.
pub async fn read_small_files(
    client: &BlobClient,
    reporter: &Reporter,
    pattern: &str,
) -> Result<usize> {
    let paths: Vec<String> = client
        .glob(pattern, GlobMode::Sequential)?
        .try_collect()
        .await
        .with_context(|| format!("failed to list `{pattern}`"))?;

    let _timer = reporter.timer("read_small_files");

    let mut byte = [0; 1];
    for path in &paths {
        let path = BlobPath::parse(path)?;
        client
            .reader(&path)
            .read(&mut byte)
            .await
            .with_context(|| format!("failed to read `{path}`"))?;
    }

    tracing::debug!(pattern, files = paths.len(), "read small files");
    Ok(paths.len())
}

#[cfg(test)]
mod tests {
    use blobbench_client::ClientConfig;

    use super::*;

    fn setup() -> (BlobClient, Reporter, BlobPath) {
        let client = BlobClient::new(ClientConfig::default());
        let path = BlobPath::parse("memory://suite/bench/1gb.bin").unwrap();
        (client, Reporter::capturing(), path)
    }

    fn span_names(reporter: &Reporter) -> Vec<String> {
        reporter
            .lines()
            .into_iter()
            .map(|line| line.split(':').next().unwrap().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn round_trips_payload() {
        let (client, reporter, path) = setup();
        let payload = Payload::generate(7);

        write_large_file(&client, &reporter, &path, &payload)
            .await
            .unwrap();
        let mbps = read_large_file(&client, &reporter, &path, &payload)
            .await
            .unwrap();
        assert!(mbps > 0.0);

        let lines = read_large_file_lines(&client, &reporter, &path)
            .await
            .unwrap();
        assert_eq!(lines, payload.lines());

        seek_speed(&client, &reporter, &path, &payload).await.unwrap();

        let lines = reporter.lines();
        assert_eq!(lines.len(), 5);
        assert!(lines[2].starts_with("MB/s "));
        assert!(lines[0].starts_with("write_large_file: "));
        assert!(lines[1].starts_with("read_large_file: "));
        assert!(lines[3].starts_with("read_large_file_lines: "));
        assert!(lines[4].starts_with("seek_speed: "));
    }

    #[tokio::test]
    async fn detects_modified_payload() {
        let (client, reporter, path) = setup();
        let payload = Payload::generate(2);
        client.write_all(&path, &b"not the payload"[..]).await.unwrap();

        let err = read_large_file(&client, &reporter, &path, &payload)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BenchError>(),
            Some(BenchError::PayloadMismatch { actual: 15, .. })
        ));

        // The span was measured, but no throughput is reported.
        assert_eq!(span_names(&reporter), ["read_large_file"]);
    }

    #[tokio::test]
    async fn seek_detects_truncated_object() {
        let (client, reporter, path) = setup();
        let payload = Payload::generate(1);
        let truncated = payload.bytes().slice(..500);
        client.write_all(&path, truncated).await.unwrap();

        let err = seek_speed(&client, &reporter, &path, &payload)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BenchError>(),
            Some(BenchError::ShortRead {
                offset: 500,
                read: 0,
                ..
            })
        ));
        assert_eq!(span_names(&reporter), ["seek_speed"]);
    }

    #[tokio::test]
    async fn seek_detects_wrong_bytes() {
        let (client, reporter, path) = setup();
        let payload = Payload::generate(1);
        let mut corrupted = payload.bytes().to_vec();
        corrupted[42] = b'X';
        client.write_all(&path, corrupted).await.unwrap();

        let err = seek_speed(&client, &reporter, &path, &payload)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BenchError>(),
            Some(BenchError::SeekMismatch {
                offset: 42,
                actual: b'X',
                ..
            })
        ));
    }

    #[tokio::test]
    async fn missing_object_fails_read() {
        let (client, reporter, path) = setup();
        let payload = Payload::generate(1);

        assert!(
            read_large_file(&client, &reporter, &path, &payload)
                .await
                .is_err()
        );
        assert!(
            read_large_file_lines(&client, &reporter, &path)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn reads_small_files() {
        let (client, reporter, _) = setup();
        for name in ["a.bin", "b.bin", "nested/c.bin", "empty.bin"] {
            let path = BlobPath::parse(&format!("memory://suite/small/{name}")).unwrap();
            let contents: &[u8] = if name == "empty.bin" { b"" } else { b"data" };
            client.write_all(&path, contents).await.unwrap();
        }

        let count = read_small_files(&client, &reporter, "memory://suite/small/**")
            .await
            .unwrap();
        assert_eq!(count, 4);
        assert_eq!(span_names(&reporter), ["read_small_files"]);
    }
}
