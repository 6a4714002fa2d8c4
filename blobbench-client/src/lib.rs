//! A small blob-storage client used by the `blobbench` harness.
//!
//! The client addresses objects with URI-like [`BlobPath`]s and dispatches to one of several
//! backends based on the path's scheme:
//!
//! - `gs://bucket/key` talks to Google Cloud Storage through its JSON API,
//! - `memory://store/key` uses an in-process store shared between clones of a client,
//! - plain paths (or `file://` URIs) use the local filesystem.
//!
//! It exposes streaming read and write handles ([`BlobReader`], [`BlobWriter`]) and two
//! independent enumeration strategies for glob patterns ([`GlobMode::Sequential`] and
//! [`GlobMode::Parallel`]). Connection reuse is configured explicitly on the [`ClientConfig`].
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod backend;
mod client;
mod error;
mod glob;
mod path;
mod reader;
mod stream;
mod writer;

pub use backend::common::{BackendError, ByteRange};
pub use client::{BlobClient, ClientConfig};
pub use error::{Error, Result};
pub use glob::{GlobMode, GlobPattern, GlobStream};
pub use path::{BlobPath, Scheme, join};
pub use reader::{BlobLines, BlobReader};
pub use stream::PayloadStream;
pub use writer::BlobWriter;
