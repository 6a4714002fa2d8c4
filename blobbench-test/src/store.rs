//! Scratch blob stores on the local filesystem.
//!
//! ```
//! use blobbench_test::store::TempStore;
//!
//! let store = TempStore::new();
//! let target = store.path("1gb.bin");
//! assert!(target.to_string().ends_with("/1gb.bin"));
//! ```

use std::path::Path;

use blobbench_client::BlobPath;
use tempfile::TempDir;

/// A local blob store in a temporary directory.
///
/// The directory and everything written to it is deleted when the store is dropped.
#[derive(Debug)]
pub struct TempStore {
    base: BlobPath,
    tempdir: TempDir,
}

impl TempStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let tempdir = tempfile::tempdir().unwrap();
        let base = BlobPath::parse(&tempdir.path().display().to_string()).unwrap();
        Self { base, tempdir }
    }

    /// The base path of the store, usable as `--path`.
    pub fn base(&self) -> &BlobPath {
        &self.base
    }

    /// The path of `name` below the base path.
    pub fn path(&self, name: &str) -> BlobPath {
        self.base.join(name)
    }

    /// The directory backing the store.
    pub fn dir(&self) -> &Path {
        self.tempdir.path()
    }
}

impl Default for TempStore {
    fn default() -> Self {
        Self::new()
    }
}
