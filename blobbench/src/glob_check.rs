//! Cross-validation of sequential and parallel glob enumeration.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use blobbench_client::{BlobClient, GlobMode, GlobStream};
use futures::TryStreamExt;

use crate::error::BenchError;
use crate::report::Reporter;

/// Enumerates `pattern` in both modes and fails if the results differ.
///
/// The sequential enumeration is timed as `glob`, the parallel one as `parallel_glob`. Returns
/// the matched paths.
pub async fn check_glob(
    client: &BlobClient,
    reporter: &Reporter,
    pattern: &str,
) -> Result<BTreeSet<String>> {
    let sequential = client.glob(pattern, GlobMode::Sequential)?;
    let parallel = client.glob(pattern, GlobMode::Parallel)?;

    let sequential = {
        let _timer = reporter.timer("glob");
        drain(sequential).await
    }
    .with_context(|| format!("sequential glob of `{pattern}` failed"))?;

    let parallel = {
        let _timer = reporter.timer("parallel_glob");
        drain(parallel).await
    }
    .with_context(|| format!("parallel glob of `{pattern}` failed"))?;

    tracing::info!(pattern, matches = sequential.len(), "enumerated glob");
    compare(pattern, sequential, parallel)
}

async fn drain(stream: GlobStream) -> blobbench_client::Result<BTreeSet<String>> {
    stream.try_collect().await
}

/// Returns the common set if both enumerations are equal.
fn compare(
    pattern: &str,
    sequential: BTreeSet<String>,
    parallel: BTreeSet<String>,
) -> Result<BTreeSet<String>> {
    if sequential == parallel {
        return Ok(sequential);
    }

    Err(BenchError::GlobMismatch {
        pattern: pattern.to_owned(),
        only_sequential: sequential.difference(&parallel).cloned().collect(),
        only_parallel: parallel.difference(&sequential).cloned().collect(),
    }
    .into())
}
