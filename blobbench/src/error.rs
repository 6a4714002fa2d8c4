//! Benchmark failures that are not I/O errors.

use std::time::Duration;

use thiserror::Error;

/// Invariant violations and worker failures detected by the benchmarks.
///
/// I/O errors from the blob client are reported as-is; this type covers everything that is a
/// failure of the system under test rather than of an individual request.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The object read back differs from the payload that was written.
    #[error(
        "contents of `{path}` do not match the written payload \
         ({actual} bytes, expected {expected})"
    )]
    PayloadMismatch {
        /// The object that was read.
        path: String,
        /// Length of the written payload.
        expected: u64,
        /// Length of the data read back.
        actual: u64,
    },

    /// A one-byte read after a seek returned no data.
    #[error("read at offset {offset} of `{path}` returned {read} bytes, expected 1")]
    ShortRead {
        /// The object that was read.
        path: String,
        /// The offset that was seeked to.
        offset: u64,
        /// The number of bytes returned.
        read: usize,
    },

    /// A one-byte read after a seek returned the wrong byte.
    #[error("byte at offset {offset} of `{path}` is {actual:#04x}, expected {expected:#04x}")]
    SeekMismatch {
        /// The object that was read.
        path: String,
        /// The offset that was seeked to.
        offset: u64,
        /// The byte in the written payload.
        expected: u8,
        /// The byte that was read.
        actual: u8,
    },

    /// A worker process exited unsuccessfully or reported an unexpected result.
    #[error("worker {worker} failed: {reason}")]
    WorkerFailed {
        /// Index of the worker within the pool.
        worker: usize,
        /// Description of the failure.
        reason: String,
    },

    /// Not all workers finished within the configured timeout.
    #[error("workers did not finish within {0:?}")]
    WorkerTimeout(Duration),

    /// Sequential and parallel enumeration returned different sets of paths.
    #[error(
        "parallel glob of `{pattern}` disagrees with sequential glob \
         (only sequential: {only_sequential:?}, only parallel: {only_parallel:?})"
    )]
    GlobMismatch {
        /// The pattern that was enumerated.
        pattern: String,
        /// Paths returned only by the sequential glob.
        only_sequential: Vec<String>,
        /// Paths returned only by the parallel glob.
        only_parallel: Vec<String>,
    },
}
