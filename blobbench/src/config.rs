//! Configuration for the benchmark run.
//!
//! Values are layered from lowest to highest priority:
//!
//! 1. Built-in defaults
//! 2. A YAML file passed with `-c`
//! 3. Environment variables prefixed with `BLOBBENCH__`, for example `BLOBBENCH__SIZE=1000`
//! 4. Command line flags

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use blobbench_client::{BlobPath, ClientConfig, Scheme};
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "BLOBBENCH__";

/// Default payload multiplier, producing a payload of roughly one gigabyte.
const DEFAULT_SIZE: usize = 1_000_000;

/// Default number of concurrent listing requests for the parallel glob.
const DEFAULT_LIST_CONCURRENCY: usize = 32;

/// Name of the benchmark object created below the base path.
pub const TARGET_NAME: &str = "1gb.bin";

/// Runtime configuration of a benchmark run.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Base prefix under which the benchmark object is created.
    pub path: Option<String>,
    /// Number of payload lines to write.
    pub size: usize,
    /// Release the client connection after every request.
    pub release_conn: bool,
    /// Number of worker processes for the multi-worker read.
    ///
    /// Defaults to twice the available parallelism.
    pub workers: Option<usize>,
    /// Upper bound for waiting on all read workers.
    #[serde(default, with = "humantime_serde")]
    pub worker_timeout: Option<Duration>,
    /// Pattern for the glob check and small-file reads.
    ///
    /// Defaults to everything below the base path.
    pub glob: Option<String>,
    /// Maximum number of listing requests in flight during a parallel glob.
    pub list_concurrency: usize,
    /// Custom GCS endpoint, for example an emulator.
    pub gcs_endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            size: DEFAULT_SIZE,
            release_conn: false,
            workers: None,
            worker_timeout: None,
            glob: None,
            list_concurrency: DEFAULT_LIST_CONCURRENCY,
            gcs_endpoint: None,
        }
    }
}

/// Values set on the command line, taking precedence over all other sources.
#[derive(Debug, Default, Serialize)]
pub struct Overrides {
    /// See [`Config::path`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// See [`Config::size`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    /// See [`Config::release_conn`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_conn: Option<bool>,
    /// See [`Config::workers`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// See [`Config::worker_timeout`].
    #[serde(skip_serializing_if = "Option::is_none", with = "humantime_serde")]
    pub worker_timeout: Option<Duration>,
    /// See [`Config::glob`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glob: Option<String>,
}

impl Config {
    /// Loads and validates the configuration.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
            .extract()
            .context("failed to load configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.path.is_some(),
            "missing base path, pass --path or set {ENV_PREFIX}PATH"
        );
        anyhow::ensure!(self.size > 0, "size must be positive");
        anyhow::ensure!(self.workers != Some(0), "workers must be positive");
        anyhow::ensure!(
            self.list_concurrency > 0,
            "list_concurrency must be positive"
        );

        // Read workers run in separate processes and cannot see this process' memory store.
        let base = self.base_path()?;
        anyhow::ensure!(
            base.scheme() != Scheme::Memory,
            "base path `{base}` uses the in-memory store, which read workers cannot access"
        );
        if let Some(ref glob) = self.glob {
            let pattern =
                BlobPath::parse(glob).with_context(|| format!("invalid glob pattern `{glob}`"))?;
            anyhow::ensure!(
                pattern.scheme() != Scheme::Memory,
                "glob pattern `{glob}` uses the in-memory store, which read workers cannot access"
            );
        }

        Ok(())
    }

    /// The parsed base path.
    pub fn base_path(&self) -> Result<BlobPath> {
        let path = self.path.as_deref().context("missing base path")?;
        BlobPath::parse(path).with_context(|| format!("invalid base path `{path}`"))
    }

    /// The path of the benchmark object.
    pub fn target_path(&self) -> Result<BlobPath> {
        Ok(self.base_path()?.join(TARGET_NAME))
    }

    /// The number of read workers to spawn.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            let parallelism = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
            2 * parallelism
        })
    }

    /// The pattern used for glob checks and small-file reads.
    pub fn glob_pattern(&self) -> Result<String> {
        match self.glob {
            Some(ref glob) => Ok(glob.clone()),
            None => Ok(self.base_path()?.join("**").to_string()),
        }
    }

    /// Configuration for the blob client.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            release_connection: self.release_conn,
            list_concurrency: self.list_concurrency,
            gcs_endpoint: self.gcs_endpoint.clone(),
        }
    }
}
