use std::fmt;
use std::io;
use std::sync::Arc;

use futures_util::{StreamExt, TryStreamExt};
use gcp_auth::TokenProvider;
use reqwest::header::RANGE;
use reqwest::{Body, RequestBuilder, StatusCode, Url};
use serde::Deserialize;

use super::common::{Backend, BackendError, BackendResult, ByteRange, Listing, reqwest_client};
use crate::PayloadStream;
use crate::path::BlobPath;

/// Default endpoint for the GCS JSON API.
const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";
/// OAuth scope required for reading, writing and listing objects.
const TOKEN_SCOPES: &[&str] = &["https://www.googleapis.com/auth/devstorage.read_write"];

pub struct Gcs {
    client: reqwest::Client,
    endpoint: String,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl Gcs {
    /// Creates a GCS backend.
    ///
    /// If an `endpoint` is given, an emulator without authentication is assumed. Otherwise,
    /// credentials are discovered from the environment.
    pub async fn new(endpoint: Option<&str>, release_connection: bool) -> BackendResult<Self> {
        let client = reqwest_client(release_connection)?;
        let (endpoint, token_provider) = match endpoint {
            Some(endpoint) => (endpoint.trim_end_matches('/').to_owned(), None),
            None => (DEFAULT_ENDPOINT.to_owned(), Some(gcp_auth::provider().await?)),
        };

        Ok(Self {
            client,
            endpoint,
            token_provider,
        })
    }

    async fn authorize(&self, builder: RequestBuilder) -> BackendResult<RequestBuilder> {
        Ok(match self.token_provider {
            Some(ref provider) => {
                let token = provider.token(TOKEN_SCOPES).await?;
                builder.bearer_auth(token.as_str())
            }
            None => builder,
        })
    }

    fn url(&self, segments: &[&str]) -> BackendResult<Url> {
        let mut url = Url::parse(&self.endpoint).map_err(|cause| BackendError::Generic {
            context: format!("invalid GCS endpoint `{}`", self.endpoint),
            cause: cause.into(),
        })?;

        url.path_segments_mut()
            .map_err(|()| BackendError::Generic {
                context: format!("GCS endpoint `{}` cannot be a base", self.endpoint),
                cause: "cannot-be-a-base URL".into(),
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    async fn list_page(
        &self,
        prefix: &BlobPath,
        recursive: bool,
        page_token: Option<&str>,
    ) -> BackendResult<ListResponse> {
        let url = self.url(&["storage", "v1", "b", prefix.bucket(), "o"])?;
        let mut request = self
            .client
            .get(url)
            .query(&[("prefix", prefix.key())])
            .query(&[("fields", "items(name),prefixes,nextPageToken")]);
        if !recursive {
            request = request.query(&[("delimiter", "/")]);
        }
        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }

        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(BackendError::reqwest("listing objects"))?;

        let body = response
            .bytes()
            .await
            .map_err(BackendError::reqwest("reading listing response"))?;

        serde_json::from_slice(&body).map_err(|cause| BackendError::Serde {
            context: "parsing listing response".into(),
            cause,
        })
    }
}

impl fmt::Debug for Gcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gcs")
            .field("endpoint", &self.endpoint)
            .field("authenticated", &self.token_provider.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListItem>,
    #[serde(default)]
    prefixes: Vec<String>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    name: String,
}

fn range_header(range: ByteRange) -> String {
    match range.end {
        Some(end) => format!("bytes={}-{}", range.start, end - 1),
        None => format!("bytes={}-", range.start),
    }
}

#[async_trait::async_trait]
impl Backend for Gcs {
    fn name(&self) -> &'static str {
        "gcs"
    }

    #[tracing::instrument(level = "trace", fields(%path), skip_all)]
    async fn put_object(&self, path: &BlobPath, stream: PayloadStream) -> BackendResult<()> {
        tracing::debug!("Writing to GCS backend");
        let url = self.url(&["upload", "storage", "v1", "b", path.bucket(), "o"])?;
        let request = self
            .client
            .post(url)
            .query(&[("uploadType", "media"), ("name", path.key())])
            .body(Body::wrap_stream(stream));

        self.authorize(request)
            .await?
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(BackendError::reqwest("uploading object"))?;

        Ok(())
    }

    #[tracing::instrument(level = "trace", fields(%path, ?range), skip_all)]
    async fn get_object(
        &self,
        path: &BlobPath,
        range: ByteRange,
    ) -> BackendResult<Option<PayloadStream>> {
        tracing::debug!("Reading from GCS backend");
        if range.is_empty() {
            return Ok(Some(futures_util::stream::empty().boxed()));
        }

        let url = self.url(&["storage", "v1", "b", path.bucket(), "o", path.key()])?;
        let mut request = self.client.get(url).query(&[("alt", "media")]);
        if range != ByteRange::FULL {
            request = request.header(RANGE, range_header(range));
        }

        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(BackendError::reqwest("requesting object"))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!("Object not found");
                Ok(None)
            }
            StatusCode::RANGE_NOT_SATISFIABLE => Ok(Some(futures_util::stream::empty().boxed())),
            _ => {
                let response = response
                    .error_for_status()
                    .map_err(BackendError::reqwest("requesting object"))?;
                let stream = response.bytes_stream().map_err(io::Error::other);
                Ok(Some(stream.boxed()))
            }
        }
    }

    #[tracing::instrument(level = "trace", fields(%prefix, recursive = recursive), skip_all)]
    async fn list(&self, prefix: &BlobPath, recursive: bool) -> BackendResult<Listing> {
        let mut listing = Listing::default();
        let mut page_token = None;

        loop {
            let page = self
                .list_page(prefix, recursive, page_token.as_deref())
                .await?;

            listing.objects.extend(
                page.items
                    .into_iter()
                    // Zero-length "directory marker" objects are not files.
                    .filter(|item| !item.name.ends_with('/'))
                    .map(|item| prefix.with_key(item.name)),
            );
            listing
                .prefixes
                .extend(page.prefixes.into_iter().map(|key| prefix.with_key(key)));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(
            objects = listing.objects.len(),
            prefixes = listing.prefixes.len(),
            "listed prefix"
        );
        Ok(listing)
    }
}
