//! Core types and events

use crate::error::FailureStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A filing decoded from one feed entry, not yet persisted
///
/// Text fields are trimmed and entity-decoded; `link` is always absolute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingCandidate {
    /// Entry title
    pub title: String,
    /// Canonical (alternate) link; the identity key once persisted
    pub link: String,
    /// Entry summary
    pub summary: String,
}

impl FilingCandidate {
    /// Create a candidate from already-decoded parts
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            summary: summary.into(),
        }
    }
}

/// A filing as held by the record store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRecord {
    /// Store-assigned identifier
    pub id: i64,
    /// Title from the first observation
    pub title: String,
    /// Canonical link (unique)
    pub link: String,
    /// Summary from the first observation
    pub summary: String,
    /// When the link was first observed
    pub created_at: DateTime<Utc>,
    /// When the link was most recently observed
    pub updated_at: DateTime<Utc>,
}

/// What the persistence stage did with a candidate
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PersistOutcome {
    /// First observation of the link; a new record was created
    Inserted {
        /// Identifier of the new record
        id: i64,
    },
    /// Link already known; only its last-updated timestamp moved
    Touched {
        /// Identifier of the existing record
        id: i64,
    },
}

impl PersistOutcome {
    /// Identifier of the record that was written
    pub fn id(&self) -> i64 {
        match self {
            PersistOutcome::Inserted { id } | PersistOutcome::Touched { id } => *id,
        }
    }

    /// Whether this call created the record
    pub fn is_inserted(&self) -> bool {
        matches!(self, PersistOutcome::Inserted { .. })
    }
}

/// Tally of one ingested feed document
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Entries decoded from the document
    pub parsed: usize,
    /// Candidates that created a new record
    pub inserted: usize,
    /// Candidates that refreshed an existing record
    pub touched: usize,
    /// Candidates dropped for this cycle because the store failed
    pub failed: usize,
}

impl CycleReport {
    /// Fold one persistence outcome into the tally
    pub(crate) fn record(&mut self, outcome: &crate::Result<PersistOutcome>) {
        match outcome {
            Ok(PersistOutcome::Inserted { .. }) => self.inserted += 1,
            Ok(PersistOutcome::Touched { .. }) => self.touched += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// How a single poll cycle ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Feed answered 304; nothing was parsed or persisted
    NotModified,
    /// Feed answered 200 and its body was ingested
    Ingested(CycleReport),
}

/// Event emitted by the poll scheduler
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A tick fired and a cycle began fetching
    CycleStarted {
        /// Monotonic cycle number (starts at 1)
        cycle: u64,
    },

    /// Feed reported no change since the last successful fetch
    NotModified {
        /// Cycle number
        cycle: u64,
    },

    /// A link was seen for the first time
    FilingInserted {
        /// Cycle number
        cycle: u64,
        /// Record identifier
        id: i64,
        /// Canonical link
        link: String,
    },

    /// A known link was seen again
    FilingTouched {
        /// Cycle number
        cycle: u64,
        /// Record identifier
        id: i64,
    },

    /// A cycle parsed and persisted a feed document
    CycleCompleted {
        /// Cycle number
        cycle: u64,
        /// Counts for the cycle
        report: CycleReport,
        /// Wall time from tick to last write, in milliseconds
        elapsed_ms: u64,
    },

    /// A cycle ended early on an error
    CycleFailed {
        /// Cycle number
        cycle: u64,
        /// Stage that failed
        stage: FailureStage,
        /// Error message
        message: String,
    },

    /// Scheduler stopped and in-flight work was drained
    Shutdown,
}
