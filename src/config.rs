//! Configuration types for filing-feed

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default feed: the SEC "current filings" Atom listing for Form 144
pub const DEFAULT_FEED_URL: &str =
    "https://www.sec.gov/cgi-bin/browse-edgar?action=getcurrent&CIK=&type=144&output=atom";

/// Default identifying user agent (the SEC rejects anonymous clients)
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; FilingFeed/0.1; +mailto:contact@example.com)";

/// Default accept header, preferring Atom over generic XML
pub const DEFAULT_ACCEPT: &str = "application/atom+xml, application/xml;q=0.9, */*;q=0.8";

/// Remote feed and polling configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed URL (default: SEC Form 144 current filings)
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept header sent with every request
    #[serde(default = "default_accept")]
    pub accept: String,

    /// Origin prepended to relative entry links (default: origin of `url`)
    #[serde(default)]
    pub link_origin: Option<String>,

    /// Fixed polling rate (default: 500ms)
    #[serde(default = "default_poll_interval", with = "millis_serde")]
    #[serde(rename = "poll_interval_ms")]
    pub poll_interval: Duration,

    /// Upper bound for one feed request, body included (default: 20s)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub fetch_timeout: Duration,

    /// TCP/TLS connect timeout (default: 10s)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            user_agent: default_user_agent(),
            accept: default_accept(),
            link_origin: None,
            poll_interval: default_poll_interval(),
            fetch_timeout: default_fetch_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// Parse and persist stage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Maximum concurrent store writes across all cycles (default: 10)
    #[serde(default = "default_persist_workers")]
    pub persist_workers: usize,

    /// How long shutdown waits for in-flight persistence (default: 30s)
    #[serde(default = "default_shutdown_grace", with = "duration_serde")]
    pub shutdown_grace: Duration,

    /// Capacity of the event broadcast channel (default: 256)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            persist_workers: default_persist_workers(),
            shutdown_grace: default_shutdown_grace(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "./filings.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration for the filing poller
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote feed and polling settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Parse and persist settings
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Record store settings
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive a poller
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.feed.url)
            .map_err(|e| Error::config("feed.url", format!("invalid feed URL: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(
                "feed.url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if self.feed.user_agent.trim().is_empty() {
            return Err(Error::config("feed.user_agent", "user agent must not be empty"));
        }

        if self.feed.poll_interval.is_zero() {
            return Err(Error::config(
                "feed.poll_interval_ms",
                "poll interval must be greater than zero",
            ));
        }

        if self.feed.fetch_timeout.is_zero() {
            return Err(Error::config(
                "feed.fetch_timeout",
                "fetch timeout must be greater than zero",
            ));
        }

        if self.ingest.persist_workers == 0 {
            return Err(Error::config(
                "ingest.persist_workers",
                "at least one persistence worker is required",
            ));
        }

        if self.ingest.persist_workers > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(Error::config(
                "ingest.persist_workers",
                format!(
                    "persistence workers must not exceed {}",
                    tokio::sync::Semaphore::MAX_PERMITS
                ),
            ));
        }

        if self.ingest.event_buffer == 0 {
            return Err(Error::config(
                "ingest.event_buffer",
                "event buffer must be greater than zero",
            ));
        }

        self.link_origin()?;
        Ok(())
    }

    /// Origin used to absolutize relative entry links
    ///
    /// Uses `feed.link_origin` when set, otherwise the scheme/host/port of the feed URL.
    pub fn link_origin(&self) -> Result<Url> {
        match &self.feed.link_origin {
            Some(origin) => Url::parse(origin).map_err(|e| {
                Error::config("feed.link_origin", format!("invalid link origin: {}", e))
            }),
            None => {
                let feed = Url::parse(&self.feed.url)
                    .map_err(|e| Error::config("feed.url", format!("invalid feed URL: {}", e)))?;
                let origin = feed.origin().ascii_serialization();
                Url::parse(&origin).map_err(|e| {
                    Error::config("feed.url", format!("feed URL has no usable origin: {}", e))
                })
            }
        }
    }
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept() -> String {
    DEFAULT_ACCEPT.to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_persist_workers() -> usize {
    10
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(30)
}

fn default_event_buffer() -> usize {
    256
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./filings.db")
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
