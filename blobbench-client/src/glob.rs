//! Enumeration of blobs matching a wildcard pattern.
//!
//! Patterns use the following wildcards:
//!
//! - `*` matches any run of characters within a single path segment,
//! - `**` matches any run of characters, including `/`,
//! - `?` matches a single character other than `/`.
//!
//! Both [`GlobMode`]s list the longest literal directory prefix of the pattern and filter the
//! results. They differ only in how listing requests are issued, so their results must always be
//! the same set of paths.

use std::collections::VecDeque;

use futures_util::stream::{BoxStream, FuturesUnordered};
use futures_util::StreamExt;
use regex::Regex;

use crate::client::BlobClient;
use crate::error::{Error, Result};
use crate::path::BlobPath;

/// A finite, non-restartable stream of matching paths.
pub type GlobStream = BoxStream<'static, Result<String>>;

/// Strategy used to enumerate a glob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlobMode {
    /// A single recursive listing of the pattern's prefix.
    Sequential,
    /// One non-recursive listing per directory, issued concurrently.
    Parallel,
}

/// A compiled glob pattern.
#[derive(Clone, Debug)]
pub struct GlobPattern {
    prefix: BlobPath,
    regex: Regex,
}

impl GlobPattern {
    /// Compiles a pattern such as `gs://bucket/data/**/*.bin`.
    pub fn parse(pattern: &str) -> Result<Self> {
        let path = BlobPath::parse(pattern)?;

        let key = path.key();
        let literal_end = key.find(['*', '?']).unwrap_or(key.len());
        let prefix_end = key[..literal_end].rfind('/').map_or(0, |i| i + 1);
        let prefix = path.with_key(&key[..prefix_end]);

        let regex = Regex::new(&glob_to_regex(&path.to_string())).map_err(|cause| {
            Error::InvalidPattern {
                pattern: pattern.to_owned(),
                cause,
            }
        })?;

        Ok(Self { prefix, regex })
    }

    /// The directory prefix that contains all possible matches.
    pub fn prefix(&self) -> &BlobPath {
        &self.prefix
    }

    /// Returns `true` if the rendered `path` matches the pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut regex = String::from("^");
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                regex.push_str(".*");
            }
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push_str("[^/]"),
            c => regex.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }

    regex.push('$');
    regex
}

pub(crate) fn sequential(client: BlobClient, pattern: GlobPattern) -> GlobStream {
    async_stream::try_stream! {
        let listing = client.list(pattern.prefix(), true).await?;
        for object in listing.objects {
            let path = object.to_string();
            if pattern.matches(&path) {
                yield path;
            }
        }
    }
    .boxed()
}

pub(crate) fn parallel(client: BlobClient, pattern: GlobPattern, concurrency: usize) -> GlobStream {
    async_stream::try_stream! {
        let mut queue = VecDeque::from([pattern.prefix().clone()]);
        let mut pending = FuturesUnordered::new();

        loop {
            while pending.len() < concurrency {
                let Some(prefix) = queue.pop_front() else {
                    break;
                };
                let client = client.clone();
                pending.push(async move { client.list(&prefix, false).await });
            }

            let Some(listing) = pending.next().await else {
                break;
            };
            let listing = listing?;

            queue.extend(listing.prefixes);
            for object in listing.objects {
                let path = object.to_string();
                if pattern.matches(&path) {
                    yield path;
                }
            }
        }
    }
    .boxed()
}
