//! Database layer for filing-feed
//!
//! Handles SQLite persistence for ingested filings.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`filings`] — Filing lookup, insert and touch

use crate::types::FilingRecord;
use chrono::{TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod filings;
mod migrations;

/// Filing record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct FilingRow {
    /// Unique database ID
    pub id: i64,
    /// Entry title
    pub title: String,
    /// Canonical link (unique)
    pub link: String,
    /// Entry summary
    pub summary: String,
    /// Unix timestamp in milliseconds when the filing was first stored
    pub created_at: i64,
    /// Unix timestamp in milliseconds when the filing was last observed
    pub updated_at: i64,
}

impl From<FilingRow> for FilingRecord {
    fn from(row: FilingRow) -> Self {
        FilingRecord {
            id: row.id,
            title: row.title,
            link: row.link,
            summary: row.summary,
            created_at: Utc
                .timestamp_millis_opt(row.created_at)
                .single()
                .unwrap_or_else(Utc::now),
            updated_at: Utc
                .timestamp_millis_opt(row.updated_at)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Database handle for filing-feed
pub struct Database {
    pool: SqlitePool,
}
