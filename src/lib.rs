//! # filing-feed
//!
//! Background poller for SEC-style Atom filing feeds.
//!
//! ## Design Philosophy
//!
//! filing-feed is designed to be:
//! - **Polite to the feed host** - Conditional GETs, so an unchanged feed costs one 304
//! - **Streaming** - Entries are decoded straight off the response body
//! - **Idempotent** - Each distinct link becomes exactly one record, however often it is seen
//! - **Event-driven** - Consumers subscribe to cycle events, no polling of the poller required
//!
//! ## Quick Start
//!
//! ```no_run
//! use filing_feed::{Config, Database, PollScheduler, run_with_shutdown};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let db = Arc::new(Database::new(&config.persistence.database_path).await?);
//!
//!     let scheduler = PollScheduler::new(config, db)?;
//!
//!     // Subscribe to events
//!     let mut events = scheduler.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     run_with_shutdown(scheduler.spawn()).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Conditional feed fetching
pub mod fetch;
/// Dedup-and-persist stage
pub mod ingest;
/// Streaming Atom decoding
pub mod parser;
/// Fixed-rate poll scheduler
pub mod poller;
/// Record store seam
pub mod store;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, FeedConfig, IngestConfig, PersistenceConfig};
pub use db::Database;
pub use error::{DatabaseError, Error, FailureStage, ParseError, Result};
pub use fetch::{CacheValidators, ConditionalFetchCache, FeedClient, FetchOutcome};
pub use ingest::DedupPersister;
pub use parser::{FeedReader, parse_feed};
pub use poller::{PollScheduler, PollerHandle};
pub use store::FilingStore;
pub use types::{
    CycleOutcome, CycleReport, Event, FilingCandidate, FilingRecord, PersistOutcome,
};

/// Helper function to run the poller with graceful signal handling.
///
/// Waits for a termination signal and then calls the handle's `shutdown()` method,
/// which stops new cycles and drains in-flight persistence.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// If the scheduler's shutdown token is cancelled some other way, this returns
/// without waiting for a signal.
///
/// # Example
///
/// ```no_run
/// use filing_feed::{Config, Database, PollScheduler, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let db = Arc::new(Database::new(&config.persistence.database_path).await?);
///     let handle = PollScheduler::new(config, db)?.spawn();
///
///     // Run with automatic signal handling
///     run_with_shutdown(handle).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(handle: PollerHandle) -> Result<()> {
    let token = handle.shutdown_token();
    let reason = tokio::select! {
        reason = wait_for_signal() => reason,
        _ = token.cancelled() => StopReason::Requested,
    };
    tracing::info!(
        reason = reason.as_str(),
        "Stopping filing poller, draining in-flight filings"
    );
    handle.shutdown().await
}

/// What ended [`run_with_shutdown`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Terminate,
    Interrupt,
    Requested,
}

impl StopReason {
    fn as_str(self) -> &'static str {
        match self {
            StopReason::Terminate => "SIGTERM",
            StopReason::Interrupt => "SIGINT",
            StopReason::Requested => "shutdown token",
        }
    }
}

/// Resolve on SIGTERM or SIGINT
///
/// Registration can fail in sandboxes. With no usable handler this never
/// resolves, leaving the shutdown token as the only way to stop the poller.
#[cfg(unix)]
async fn wait_for_signal() -> StopReason {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => tokio::select! {
            _ = sigterm.recv() => StopReason::Terminate,
            _ = sigint.recv() => StopReason::Interrupt,
        },
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "No SIGINT handler; filing poller stops on SIGTERM only");
            sigterm.recv().await;
            StopReason::Terminate
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "No SIGTERM handler; filing poller stops on SIGINT only");
            sigint.recv().await;
            StopReason::Interrupt
        }
        (Err(term), Err(int)) => {
            tracing::error!(
                sigterm = %term,
                sigint = %int,
                "No signal handlers; filing poller stops only when its shutdown token is cancelled"
            );
            std::future::pending().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> StopReason {
    match tokio::signal::ctrl_c().await {
        Ok(()) => StopReason::Interrupt,
        Err(e) => {
            tracing::error!(
                error = %e,
                "No Ctrl+C handler; filing poller stops only when its shutdown token is cancelled"
            );
            std::future::pending().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_labels() {
        assert_eq!(StopReason::Terminate.as_str(), "SIGTERM");
        assert_eq!(StopReason::Interrupt.as_str(), "SIGINT");
        assert_eq!(StopReason::Requested.as_str(), "shutdown token");
    }
}
