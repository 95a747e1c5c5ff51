use crate::types::{InputStream, QueryParams};
use axum::body::{Body, HttpBody};
use axum::http::header::CONTENT_LENGTH;
use axum::http::HeaderMap;
use futures::TryStreamExt;
use reqwest::Client;
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("request carries no document")]
    NoInput,
    #[error("remote fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
}

/// Failure while reading the body of a remote source, carried inside the
/// `io::Error` of an [`InputStream`] so it stays distinguishable from a
/// request-body read error.
#[derive(Debug, Error)]
#[error("remote body read failed: {0}")]
pub struct RemoteReadError(#[from] reqwest::Error);

/// True when `err` came from reading a remote source (timeout, reset).
pub fn is_remote_read_error(err: &io::Error) -> bool {
    err.get_ref()
        .is_some_and(|inner| inner.is::<RemoteReadError>())
}

/// Picks the document source for a request: `?url=` when present, the
/// request body otherwise. Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct InputResolver {
    client: Client,
}

impl InputResolver {
    pub fn new(fetch_timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = fetch_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub async fn resolve(
        &self,
        query: &QueryParams,
        headers: &HeaderMap,
        body: Body,
    ) -> Result<InputStream, ResolveError> {
        let url = query.get("url");
        if !url.is_empty() {
            // The body is never read once a URL is given; dropping it here
            // releases it before the fetch starts.
            drop(body);
            return self.fetch(url).await;
        }

        if declared_empty(headers, &body) {
            return Err(ResolveError::NoInput);
        }
        Ok(Box::pin(body.into_data_stream().map_err(io::Error::other)))
    }

    async fn fetch(&self, url: &str) -> Result<InputStream, ResolveError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::warn!("remote source {url} answered {status}; translating its body anyway");
        }
        Ok(Box::pin(
            response
                .bytes_stream()
                .map_err(|e| io::Error::other(RemoteReadError(e))),
        ))
    }
}

fn declared_empty(headers: &HeaderMap, body: &Body) -> bool {
    let declared_zero = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        == Some(0);
    declared_zero || body.size_hint().exact() == Some(0)
}
