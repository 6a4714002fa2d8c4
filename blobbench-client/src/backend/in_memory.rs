//! In-memory backend for tests and local experiments.
//!
//! This provides a [`Backend`](super::common::Backend) backed by a `BTreeMap`, addressed with
//! `memory://{store}/{key}` paths. Clones share the same store, so every clone of a
//! [`BlobClient`](crate::BlobClient) sees the same objects. The store is private to the process.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use futures_util::{StreamExt, TryStreamExt};

use super::common::{Backend, BackendResult, ByteRange, Listing};
use crate::PayloadStream;
use crate::path::BlobPath;

type Store = BTreeMap<(String, String), Bytes>;

#[derive(Debug, Clone, Default)]
pub(crate) struct InMemory {
    store: Arc<Mutex<Store>>,
}

impl InMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the backend has no stored objects.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.store.lock().unwrap().is_empty()
    }

    fn store_key(path: &BlobPath) -> (String, String) {
        (path.bucket().to_owned(), path.key().to_owned())
    }
}

#[async_trait::async_trait]
impl Backend for InMemory {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn put_object(&self, path: &BlobPath, stream: PayloadStream) -> BackendResult<()> {
        let bytes: BytesMut = stream.try_collect().await?;
        self.store
            .lock()
            .unwrap()
            .insert(Self::store_key(path), bytes.freeze());
        Ok(())
    }

    async fn get_object(
        &self,
        path: &BlobPath,
        range: ByteRange,
    ) -> BackendResult<Option<PayloadStream>> {
        let entry = self
            .store
            .lock()
            .unwrap()
            .get(&Self::store_key(path))
            .cloned();

        Ok(entry.map(|bytes| {
            let len = bytes.len() as u64;
            let start = range.start.min(len);
            let end = range.end.unwrap_or(len).clamp(start, len);
            let slice = bytes.slice(start as usize..end as usize);
            futures_util::stream::once(async move { Ok(slice) }).boxed()
        }))
    }

    async fn list(&self, prefix: &BlobPath, recursive: bool) -> BackendResult<Listing> {
        let store = self.store.lock().unwrap();
        let mut listing = Listing::default();
        let mut prefixes = BTreeSet::new();

        let matching = store
            .keys()
            .filter(|(bucket, key)| bucket == prefix.bucket() && key.starts_with(prefix.key()));

        for (_, key) in matching {
            let rest = &key[prefix.key().len()..];
            match rest.split_once('/') {
                Some((dir, _)) if !recursive => {
                    prefixes.insert(format!("{}{dir}/", prefix.key()));
                }
                _ => listing.objects.push(prefix.with_key(key.as_str())),
            }
        }

        listing.prefixes = prefixes
            .into_iter()
            .map(|key| prefix.with_key(key))
            .collect();
        Ok(listing)
    }
}
