pub mod common;
mod gcs;
mod in_memory;
mod local_fs;

pub use gcs::Gcs;
pub(crate) use in_memory::InMemory;
pub use local_fs::LocalFs;
