//! Cache validators for conditional GETs.

use reqwest::RequestBuilder;
use reqwest::header::{
    ETAG, HeaderMap, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use serde::{Deserialize, Serialize};

/// Entity tag and last-modified value taken from one response
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheValidators {
    /// `ETag` of the last successful response
    pub etag: Option<String>,
    /// `Last-Modified` of the last successful response
    pub last_modified: Option<String>,
}

impl CacheValidators {
    /// Read both validators from response headers
    ///
    /// Values that are missing or not visible ASCII are treated as absent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            etag: read(ETAG),
            last_modified: read(LAST_MODIFIED),
        }
    }

    /// Whether neither validator is held
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Holder of the most recent validators
///
/// Owned by the poll loop and passed by `&mut` into each fetch, so there is a
/// single writer and no locking. The pair is always replaced as a unit: a
/// request never mixes the tag of one response with the date of another.
#[derive(Debug, Default)]
pub struct ConditionalFetchCache {
    validators: CacheValidators,
}

impl ConditionalFetchCache {
    /// Create an empty cache (first request is unconditional)
    pub fn new() -> Self {
        Self::default()
    }

    /// Current validators
    pub fn validators(&self) -> &CacheValidators {
        &self.validators
    }

    /// Attach `If-None-Match` / `If-Modified-Since` for whichever validators are held
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request;
        if let Some(etag) = &self.validators.etag {
            request = request.header(IF_NONE_MATCH, etag.as_str());
        }
        if let Some(last_modified) = &self.validators.last_modified {
            request = request.header(IF_MODIFIED_SINCE, last_modified.as_str());
        }
        request
    }

    /// Record the validators of a successful (200) response
    ///
    /// Replaces the previous pair wholesale; a validator missing from this
    /// response is dropped and the next request simply omits its header.
    pub fn observe(&mut self, headers: &HeaderMap) {
        let next = CacheValidators::from_headers(headers);
        if next != self.validators {
            tracing::debug!(
                etag = next.etag.as_deref().unwrap_or("-"),
                last_modified = next.last_modified.as_deref().unwrap_or("-"),
                "Feed validators changed"
            );
        }
        self.validators = next;
    }

    /// Forget all validators
    pub fn clear(&mut self) {
        self.validators = CacheValidators::default();
    }
}
