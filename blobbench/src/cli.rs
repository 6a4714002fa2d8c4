//! Command line interface.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use argh::FromArgs;
use blobbench_client::{BlobClient, BlobPath, ClientConfig};

use crate::config::{Config, Overrides};
use crate::multi_read::{WorkerCommand, run_worker};
use crate::report::Reporter;
use crate::{driver, observability};

/// Benchmark writes, reads, seeks and enumeration against a blob store.
///
/// Results are printed to stdout as `<name>: <seconds>` lines, followed by `MB/s <value>` for
/// throughput measurements. Logs are written to stderr and controlled with `RUST_LOG`.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// base path under which the benchmark object is created
    #[argh(option)]
    path: Option<String>,

    /// payload size as a number of 1000-byte lines (default 1000000)
    #[argh(option)]
    size: Option<usize>,

    /// release the connection after every request
    #[argh(switch)]
    release_conn: bool,

    /// number of read worker processes (default: twice the number of CPUs)
    #[argh(option)]
    workers: Option<usize>,

    /// maximum time to wait for all read workers, such as `5m`
    #[argh(option, from_str_fn(parse_duration))]
    worker_timeout: Option<Duration>,

    /// glob pattern for the enumeration check and small-file reads (default: `<path>/**`)
    #[argh(option)]
    glob: Option<String>,

    #[argh(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    ReadWorker(ReadWorkerCommand),
}

/// read an object to the end and print the number of bytes read (used internally)
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "read-worker")]
struct ReadWorkerCommand {
    /// the object to read
    #[argh(positional)]
    path: String,

    /// release the connection after every request
    #[argh(switch)]
    release_conn: bool,

    /// custom GCS endpoint
    #[argh(option)]
    gcs_endpoint: Option<String>,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|err| err.to_string())
}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("blobbench-rt")
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing();

    match args.command {
        Some(Command::ReadWorker(command)) => runtime.block_on(read_worker(command)),
        None => {
            let overrides = Overrides {
                path: args.path,
                size: args.size,
                release_conn: args.release_conn.then_some(true),
                workers: args.workers,
                worker_timeout: args.worker_timeout,
                glob: args.glob,
            };
            let config = Config::load(args.config.as_deref(), overrides)?;
            tracing::debug!(?config);

            let workers = WorkerCommand::current_exe()
                .context("failed to locate the running executable")?;
            runtime.block_on(driver::run(&config, &Reporter::stdout(), &workers))
        }
    }
}

async fn read_worker(command: ReadWorkerCommand) -> Result<()> {
    let path = BlobPath::parse(&command.path)?;
    let client = BlobClient::new(ClientConfig {
        release_connection: command.release_conn,
        gcs_endpoint: command.gcs_endpoint,
        ..Default::default()
    });

    let read = run_worker(&client, &path).await?;
    println!("{read}");
    Ok(())
}
