//! Aggregate read throughput of concurrent worker processes.
//!
//! Every worker is a separate OS process that reads the target object to the end and prints the
//! number of bytes it read to stdout. The driver starts all workers, waits for every one of them
//! and only then stops the timer.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use blobbench_client::{BlobClient, BlobPath};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::process::Command;

use crate::error::BenchError;
use crate::report::{Reporter, throughput};

/// Name of the CLI subcommand that runs a single worker.
pub const WORKER_SUBCOMMAND: &str = "read-worker";

/// The program used to launch worker processes.
///
/// Workers are invoked as `<program> <args...> read-worker <path> [--release-conn]
/// [--gcs-endpoint <url>]`.
#[derive(Clone, Debug)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl WorkerCommand {
    /// Launches workers by re-executing the running binary.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    /// Launches workers with a custom program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Adds an argument before the worker subcommand.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn command(&self, params: &MultiRead) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(WORKER_SUBCOMMAND)
            .arg(params.path.to_string());
        if params.release_connection {
            command.arg("--release-conn");
        }
        if let Some(ref endpoint) = params.gcs_endpoint {
            command.arg("--gcs-endpoint").arg(endpoint);
        }

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }
}

/// Parameters of a multi-worker read.
#[derive(Clone, Debug)]
pub struct MultiRead {
    /// The object every worker reads.
    pub path: BlobPath,
    /// Number of worker processes.
    pub workers: usize,
    /// Number of bytes each worker must read.
    pub expected_len: u64,
    /// Passed on to the workers' client configuration.
    pub release_connection: bool,
    /// Custom GCS endpoint passed on to the workers.
    pub gcs_endpoint: Option<String>,
    /// Upper bound for waiting on all workers. Unbounded if `None`.
    pub timeout: Option<Duration>,
}

/// Runs the multi-worker read and reports the aggregate throughput.
///
/// Returns the throughput in MB/s. Workers still running when this function returns early are
/// killed.
pub async fn multi_read(
    reporter: &Reporter,
    command: &WorkerCommand,
    params: &MultiRead,
) -> Result<f64> {
    anyhow::ensure!(params.workers > 0, "at least one worker is required");

    let style = ProgressStyle::with_template("{spinner} {msg} {elapsed}")?;

    let timer = reporter.timer("multi_read");

    let mut children = Vec::with_capacity(params.workers);
    for worker in 0..params.workers {
        let child = command
            .command(params)
            .spawn()
            .with_context(|| format!("failed to spawn worker {worker}"))?;
        children.push(child);
    }
    tracing::debug!(workers = children.len(), "spawned read workers");

    let bar = ProgressBar::new_spinner()
        .with_style(style)
        .with_message(format!("Waiting for {} read workers:", params.workers));
    bar.enable_steady_tick(Duration::from_millis(100));

    let barrier = futures::future::join_all(children.into_iter().map(|c| c.wait_with_output()));
    let outputs = match params.timeout {
        Some(timeout) => tokio::time::timeout(timeout, barrier)
            .await
            .map_err(|_| BenchError::WorkerTimeout(timeout)),
        None => Ok(barrier.await),
    };

    let elapsed = timer.finish();
    bar.finish_and_clear();

    for (worker, output) in outputs?.into_iter().enumerate() {
        let output = output.with_context(|| format!("failed to wait for worker {worker}"))?;
        check_output(worker, &output, params.expected_len)?;
    }

    let total = params.expected_len * params.workers as u64;
    let mbps = throughput(total, elapsed);
    reporter.throughput(mbps);
    Ok(mbps)
}

fn check_output(worker: usize, output: &Output, expected_len: u64) -> Result<(), BenchError> {
    let failed = |reason| BenchError::WorkerFailed { worker, reason };

    if !output.status.success() {
        return Err(failed(output.status.to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let read: u64 = stdout
        .trim()
        .parse()
        .map_err(|_| failed(format!("unexpected output `{}`", stdout.trim())))?;

    if read != expected_len {
        return Err(failed(format!("read {read} bytes, expected {expected_len}")));
    }

    Ok(())
}

/// Entry point of a worker process: reads `path` to the end.
///
/// Returns the number of bytes read.
pub async fn run_worker(client: &BlobClient, path: &BlobPath) -> Result<u64> {
    let read = client
        .reader(path)
        .discard_to_end()
        .await
        .with_context(|| format!("failed to read `{path}`"))?;

    tracing::debug!(%path, read, "worker finished");
    Ok(read)
}

#[cfg(test)]
mod tests {
    use blobbench_client::ClientConfig;

    use super::*;

    fn params(workers: usize, expected_len: u64) -> MultiRead {
        MultiRead {
            path: BlobPath::parse("memory://workers/1gb.bin").unwrap(),
            workers,
            expected_len,
            release_connection: false,
            gcs_endpoint: None,
            timeout: Some(Duration::from_secs(30)),
        }
    }

    fn shell(script: &str) -> WorkerCommand {
        WorkerCommand::new("sh").arg("-c").arg(script)
    }

    fn worker_error(err: anyhow::Error) -> BenchError {
        err.downcast().expect("expected a BenchError")
    }

    #[test]
    fn builds_worker_invocation() {
        let params = MultiRead {
            path: BlobPath::parse("gs://bucket/base/1gb.bin").unwrap(),
            release_connection: true,
            gcs_endpoint: Some("http://localhost:4443".to_owned()),
            ..params(1, 1)
        };
        let command = WorkerCommand::new("/bin/blobbench")
            .arg("--quiet")
            .command(&params);

        let std = command.as_std();
        assert_eq!(std.get_program(), "/bin/blobbench");
        let args: Vec<_> = std.get_args().collect();
        assert_eq!(
            args,
            [
                "--quiet",
                "read-worker",
                "gs://bucket/base/1gb.bin",
                "--release-conn",
                "--gcs-endpoint",
                "http://localhost:4443"
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn joins_all_workers() {
        let reporter = Reporter::capturing();
        let mbps = multi_read(&reporter, &shell("echo 1000"), &params(4, 1000))
            .await
            .unwrap();
        assert!(mbps > 0.0);

        let lines = reporter.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("multi_read: "));
        assert!(lines[1].starts_with("MB/s "));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_worker_fails_run() {
        let reporter = Reporter::capturing();
        let err = multi_read(&reporter, &shell("exit 3"), &params(2, 1000))
            .await
            .unwrap_err();

        assert!(matches!(worker_error(err), BenchError::WorkerFailed { worker: 0, .. }));
        assert_eq!(reporter.lines().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn short_worker_read_fails_run() {
        let reporter = Reporter::capturing();
        let err = multi_read(&reporter, &shell("echo 999"), &params(2, 1000))
            .await
            .unwrap_err();

        let BenchError::WorkerFailed { reason, .. } = worker_error(err) else {
            panic!("expected worker failure");
        };
        assert_eq!(reason, "read 999 bytes, expected 1000");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stalled_workers_time_out() {
        let reporter = Reporter::capturing();
        let params = MultiRead {
            timeout: Some(Duration::from_millis(200)),
            ..params(2, 1000)
        };
        let err = multi_read(&reporter, &shell("sleep 30"), &params)
            .await
            .unwrap_err();

        assert!(matches!(worker_error(err), BenchError::WorkerTimeout(_)));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let reporter = Reporter::capturing();
        let command = WorkerCommand::new("/nonexistent/blobbench");
        assert!(multi_read(&reporter, &command, &params(1, 1)).await.is_err());
    }

    #[tokio::test]
    async fn worker_reads_whole_object() {
        let client = BlobClient::new(ClientConfig::default());
        let path = BlobPath::parse("memory://workers/object").unwrap();
        client.write_all(&path, vec![7; 12_345]).await.unwrap();

        assert_eq!(run_worker(&client, &path).await.unwrap(), 12_345);
    }
}
