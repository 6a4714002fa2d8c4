//! Sequencing of all benchmark phases.

use anyhow::Result;
use blobbench_client::BlobClient;
use bytesize::ByteSize;

use crate::config::Config;
use crate::glob_check::check_glob;
use crate::multi_read::{MultiRead, WorkerCommand, multi_read};
use crate::payload::Payload;
use crate::report::Reporter;
use crate::suite;

/// Runs all benchmark phases in order, stopping at the first failure.
///
/// Phases never overlap. The glob check runs once before anything is written and once at the
/// end, after the benchmark object exists.
pub async fn run(config: &Config, reporter: &Reporter, workers: &WorkerCommand) -> Result<()> {
    let client = BlobClient::new(config.client_config());
    let target = config.target_path()?;
    let pattern = config.glob_pattern()?;
    let payload = Payload::generate(config.size);
    let worker_count = config.worker_count();

    tracing::info!(
        %target,
        %pattern,
        payload = %ByteSize(payload.len()),
        workers = worker_count,
        release_conn = config.release_conn,
        "starting benchmark"
    );

    check_glob(&client, reporter, &pattern).await?;

    suite::write_large_file(&client, reporter, &target, &payload).await?;
    suite::read_large_file(&client, reporter, &target, &payload).await?;
    suite::read_large_file_lines(&client, reporter, &target).await?;
    suite::seek_speed(&client, reporter, &target, &payload).await?;

    let params = MultiRead {
        path: target.clone(),
        workers: worker_count,
        expected_len: payload.len(),
        release_connection: config.release_conn,
        gcs_endpoint: config.gcs_endpoint.clone(),
        timeout: config.worker_timeout,
    };
    multi_read(reporter, workers, &params).await?;

    suite::read_small_files(&client, reporter, &pattern).await?;

    let matches = check_glob(&client, reporter, &pattern).await?;
    if config.glob.is_none() {
        anyhow::ensure!(
            matches.contains(&target.to_string()),
            "glob `{pattern}` did not find the benchmark object `{target}`"
        );
    }

    tracing::info!("benchmark finished");
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::payload::LINE_LEN;

    fn span_names(reporter: &Reporter) -> Vec<String> {
        reporter
            .lines()
            .into_iter()
            .map(|line| match line.split_once(": ") {
                Some((name, _)) => name.to_owned(),
                None => line.split(' ').next().unwrap_or_default().to_owned(),
            })
            .collect()
    }

    #[tokio::test]
    async fn runs_phases_in_order() {
        let config = Config {
            path: Some("memory://driver/base".to_owned()),
            size: 10,
            workers: Some(2),
            ..Default::default()
        };
        let workers = WorkerCommand::new("sh")
            .arg("-c")
            .arg(format!("echo {}", 10 * LINE_LEN));
        let reporter = Reporter::capturing();

        run(&config, &reporter, &workers).await.unwrap();

        assert_eq!(
            span_names(&reporter),
            [
                "glob",
                "parallel_glob",
                "write_large_file",
                "read_large_file",
                "MB/s",
                "read_large_file_lines",
                "seek_speed",
                "multi_read",
                "MB/s",
                "read_small_files",
                "glob",
                "parallel_glob",
            ]
        );
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let config = Config {
            path: Some("memory://driver/failing".to_owned()),
            size: 1,
            workers: Some(1),
            ..Default::default()
        };
        let workers = WorkerCommand::new("sh").arg("-c").arg("exit 1");
        let reporter = Reporter::capturing();

        assert!(run(&config, &reporter, &workers).await.is_err());

        let names = span_names(&reporter);
        assert_eq!(names.last().map(String::as_str), Some("multi_read"));
        assert!(!names.contains(&"read_small_files".to_owned()));
    }
}
