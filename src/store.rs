//! Record store boundary
//!
//! The persistence stage talks to durable storage only through [`FilingStore`].
//! The store owns identifiers and timestamps; the caller decides between insert
//! and touch.

use crate::db::Database;
use crate::error::Result;
use crate::types::{FilingCandidate, FilingRecord};
use async_trait::async_trait;

/// Durable filing storage keyed by canonical link
///
/// # Examples
///
/// ```no_run
/// use filing_feed::{Database, FilingCandidate, FilingStore};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Database::new(Path::new("filings.db")).await?;
/// let candidate = FilingCandidate::new("144 - Acme", "https://www.sec.gov/a", "Filed");
///
/// match db.find_by_link(&candidate.link).await? {
///     Some(existing) => db.touch_updated_at(existing.id).await?,
///     None => {
///         db.insert(&candidate).await?;
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait FilingStore: Send + Sync {
    /// Look up the record holding `link`, if any
    async fn find_by_link(&self, link: &str) -> Result<Option<FilingRecord>>;

    /// Create a record; the store assigns the id and both timestamps
    ///
    /// Implementations must reject a second record for the same link with
    /// [`DatabaseError::ConstraintViolation`](crate::DatabaseError::ConstraintViolation).
    async fn insert(&self, candidate: &FilingCandidate) -> Result<FilingRecord>;

    /// Set a record's last-updated timestamp to now, leaving everything else as is
    async fn touch_updated_at(&self, id: i64) -> Result<()>;
}

#[async_trait]
impl FilingStore for Database {
    async fn find_by_link(&self, link: &str) -> Result<Option<FilingRecord>> {
        self.find_filing_by_link(link).await
    }

    async fn insert(&self, candidate: &FilingCandidate) -> Result<FilingRecord> {
        self.insert_filing(candidate).await
    }

    async fn touch_updated_at(&self, id: i64) -> Result<()> {
        self.touch_filing(id).await
    }
}
