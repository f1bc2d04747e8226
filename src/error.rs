//! Error types for filing-feed
//!
//! Errors fall into three families, matching the stage of the poll cycle in
//! which they occur:
//! - transport failures (connection, timeout, unexpected HTTP status)
//! - feed decoding failures ([`ParseError`])
//! - record store failures ([`DatabaseError`])
//!
//! [`Error::stage`] maps any error back to its [`FailureStage`] for logging
//! and cycle events.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for filing-feed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for filing-feed
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "feed.url")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Network error talking to the feed host
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Feed host answered with a status other than 200 or 304
    #[error("feed returned HTTP {status}: {url}")]
    UnexpectedStatus {
        /// HTTP status code received
        status: u16,
        /// Feed URL that was requested
        url: String,
    },

    /// The feed request did not complete within the configured bound
    #[error("feed request timed out after {0:?}")]
    Timeout(Duration),

    /// Feed body could not be decoded
    #[error("feed parse error: {0}")]
    Parse(#[from] ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),

    /// Constraint violation (e.g., duplicate link)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Errors raised while decoding an Atom document
#[derive(Debug, Error)]
pub enum ParseError {
    /// Malformed XML (mismatched tags, bad escapes, I/O failure mid-stream)
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed attribute on an element
    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// Text content was not valid UTF-8
    #[error("invalid text encoding: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// The document has no root element at all
    #[error("document has no root element")]
    MissingRoot,

    /// The root element is not an Atom `feed`
    #[error("unexpected root element <{0}>, expected <feed>")]
    UnexpectedRoot(String),

    /// The stream ended while elements were still open
    #[error("document ended with {open} unclosed element(s)")]
    UnexpectedEof {
        /// Number of elements left open
        open: usize,
    },
}

/// Poll-cycle stage in which a failure happened
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Building, sending or awaiting the feed request
    Fetch,
    /// Decoding the feed body
    Parse,
    /// Writing to the record store
    Persist,
    /// Anything else (configuration, I/O outside the cycle)
    Other,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureStage::Fetch => "fetch",
            FailureStage::Parse => "parse",
            FailureStage::Persist => "persist",
            FailureStage::Other => "other",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Classify this error by the cycle stage it belongs to
    pub fn stage(&self) -> FailureStage {
        match self {
            Error::Network(_) | Error::UnexpectedStatus { .. } | Error::Timeout(_) => {
                FailureStage::Fetch
            }
            Error::Parse(_) => FailureStage::Parse,
            Error::Database(_) | Error::Sqlx(_) => FailureStage::Persist,
            Error::Config { .. } | Error::Io(_) | Error::Serialization(_) | Error::Other(_) => {
                FailureStage::Other
            }
        }
    }

    /// Whether this error is a unique-link conflict reported by the store
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::Database(DatabaseError::ConstraintViolation(_))
        )
    }

    /// Shorthand for a configuration error tied to a specific key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
