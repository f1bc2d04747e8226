//! Filing lookup, insert and touch.

use crate::error::DatabaseError;
use crate::types::{FilingCandidate, FilingRecord};
use crate::{Error, Result};

use super::{Database, FilingRow};

impl Database {
    /// Find a filing by its canonical link
    pub async fn find_filing_by_link(&self, link: &str) -> Result<Option<FilingRecord>> {
        let row = sqlx::query_as::<_, FilingRow>(
            r#"
            SELECT id, title, link, summary, created_at, updated_at
            FROM filings
            WHERE link = ?
            "#,
        )
        .bind(link)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to look up filing by link: {}",
                e
            )))
        })?;

        Ok(row.map(FilingRecord::from))
    }

    /// Get a filing by ID
    pub async fn get_filing(&self, id: i64) -> Result<Option<FilingRecord>> {
        let row = sqlx::query_as::<_, FilingRow>(
            r#"
            SELECT id, title, link, summary, created_at, updated_at
            FROM filings
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get filing: {}",
                e
            )))
        })?;

        Ok(row.map(FilingRecord::from))
    }

    /// Insert a new filing, stamping both timestamps with the current instant
    ///
    /// Returns [`DatabaseError::ConstraintViolation`] if the link is already stored.
    pub async fn insert_filing(&self, candidate: &FilingCandidate) -> Result<FilingRecord> {
        let now = chrono::Utc::now().timestamp_millis();

        let row = sqlx::query_as::<_, FilingRow>(
            r#"
            INSERT INTO filings (title, link, summary, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, title, link, summary, created_at, updated_at
            "#,
        )
        .bind(&candidate.title)
        .bind(&candidate.link)
        .bind(&candidate.summary)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Error::Database(DatabaseError::ConstraintViolation(format!(
                    "filing link already stored: {}",
                    candidate.link
                )))
            }
            _ => Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert filing: {}",
                e
            ))),
        })?;

        Ok(row.into())
    }

    /// Move a filing's last-updated timestamp to the current instant
    ///
    /// Title, summary and creation time are left untouched. The timestamp never
    /// moves backwards, so out-of-order commits from concurrent touches keep the
    /// latest value.
    pub async fn touch_filing(&self, id: i64) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();

        let result = sqlx::query("UPDATE filings SET updated_at = MAX(updated_at, ?) WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to touch filing: {}",
                    e
                )))
            })?;

        if result.rows_affected() == 0 {
            return Err(Error::Database(DatabaseError::NotFound(format!(
                "filing {}",
                id
            ))));
        }

        Ok(())
    }

    /// Count stored filings
    pub async fn count_filings(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM filings")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count filings: {}",
                    e
                )))
            })?;

        Ok(count)
    }

    /// List the most recently observed filings, newest first
    pub async fn list_recent_filings(&self, limit: i64) -> Result<Vec<FilingRecord>> {
        let rows = sqlx::query_as::<_, FilingRow>(
            r#"
            SELECT id, title, link, summary, created_at, updated_at
            FROM filings
            ORDER BY updated_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list recent filings: {}",
                e
            )))
        })?;

        Ok(rows.into_iter().map(FilingRecord::from).collect())
    }
}
