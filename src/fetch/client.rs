//! HTTP transport for the feed.

use super::ConditionalFetchCache;
use crate::config::FeedConfig;
use crate::error::{Error, Result};
use futures::TryStreamExt;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use std::pin::Pin;
use tokio::io::AsyncBufRead;
use tokio_util::io::StreamReader;

/// Streaming response body, read incrementally by the parser
pub type FeedBody = Pin<Box<dyn AsyncBufRead + Send>>;

/// Result of one conditional GET
pub enum FetchOutcome {
    /// 304: the feed is unchanged since the validators were issued
    NotModified,
    /// 200: a new document, still streaming
    Modified(FeedBody),
}

impl std::fmt::Debug for FetchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchOutcome::NotModified => f.write_str("NotModified"),
            FetchOutcome::Modified(_) => f.write_str("Modified(..)"),
        }
    }
}

/// Client for the single configured feed URL
#[derive(Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    url: String,
    accept: String,
}

impl FeedClient {
    /// Build a client from the feed configuration
    ///
    /// The request timeout covers the body as well, so a stalled stream fails
    /// the parse instead of hanging the cycle.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: config.url.clone(),
            accept: config.accept.clone(),
        })
    }

    /// Feed URL this client polls
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one conditional GET and classify the response
    ///
    /// Validators are recorded only for a 200. A 304 leaves them as they were;
    /// any other status is an error and also leaves them untouched.
    pub async fn fetch(&self, cache: &mut ConditionalFetchCache) -> Result<FetchOutcome> {
        let request = cache.apply(
            self.http
                .get(&self.url)
                .header(ACCEPT, self.accept.as_str()),
        );

        let response = request.send().await?;
        let status = response.status();

        match status {
            StatusCode::NOT_MODIFIED => {
                tracing::debug!(url = %self.url, "Feed not modified");
                Ok(FetchOutcome::NotModified)
            }
            StatusCode::OK => {
                cache.observe(response.headers());

                let stream = response.bytes_stream().map_err(std::io::Error::other);
                Ok(FetchOutcome::Modified(Box::pin(StreamReader::new(stream))))
            }
            other => Err(Error::UnexpectedStatus {
                status: other.as_u16(),
                url: self.url.clone(),
            }),
        }
    }
}
