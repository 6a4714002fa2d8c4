//! A benchmark and consistency harness for blob storage.
//!
//! A run writes a deterministic payload below a base path and then measures, in order:
//!
//! - sequential write and read throughput, line iteration and single-byte seeks,
//! - the aggregate read throughput of many concurrent worker processes,
//! - reads of the first byte of every object matching a glob.
//!
//! Before and after, the same glob is enumerated sequentially and in parallel, and the run fails
//! if the two enumerations disagree. See [`driver::run`] for the exact sequence.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod glob_check;
pub mod multi_read;
mod observability;
pub mod payload;
pub mod report;
pub mod suite;

pub use crate::error::BenchError;
pub use crate::report::{Reporter, Timer};
