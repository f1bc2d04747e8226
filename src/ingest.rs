//! Dedup-and-persist stage
//!
//! Every candidate ends in exactly one store write: an insert the first time
//! its link is seen, a timestamp touch every time after. Calls for the same
//! link are serialized by a per-link async lock, so N concurrent calls produce
//! one insert and N-1 touches. The store's UNIQUE(link) constraint backs this
//! up against writers outside the process.

use crate::error::Result;
use crate::store::FilingStore;
use crate::types::{FilingCandidate, PersistOutcome};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

/// Per-link mutual exclusion
///
/// Entries are created on demand and removed once no caller holds or awaits
/// them, so the map only ever holds links with work in flight.
#[derive(Debug, Default)]
pub struct LinkLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LinkLocks {
    /// Wait for exclusive access to `link`
    pub async fn lock(&self, link: &str) -> LinkGuard<'_> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks
                .entry(link.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };

        let guard = mutex.lock_owned().await;
        LinkGuard {
            owner: self,
            link: link.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of links currently locked or awaited
    pub fn in_flight(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Held lock on one link; releasing it prunes the map entry when unused
pub struct LinkGuard<'a> {
    owner: &'a LinkLocks,
    link: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for LinkGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex first so its Arc no longer counts as a holder
        drop(self.guard.take());

        let mut locks = self
            .owner
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.link)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            locks.remove(&self.link);
        }
    }
}

/// Decides insert-vs-touch for each candidate and performs the write
pub struct DedupPersister {
    store: Arc<dyn FilingStore>,
    locks: LinkLocks,
}

impl DedupPersister {
    /// Create a persister over a record store
    pub fn new(store: Arc<dyn FilingStore>) -> Self {
        Self {
            store,
            locks: LinkLocks::default(),
        }
    }

    /// Persist one candidate
    ///
    /// Known link: touch its last-updated timestamp; title and summary keep
    /// their first-seen values. Unknown link: insert a new record.
    ///
    /// # Errors
    /// Returns the store error if the lookup or the write fails; the candidate
    /// is then simply not recorded for this cycle.
    pub async fn persist(&self, candidate: &FilingCandidate) -> Result<PersistOutcome> {
        let _guard = self.locks.lock(&candidate.link).await;

        if let Some(existing) = self.store.find_by_link(&candidate.link).await? {
            self.store.touch_updated_at(existing.id).await?;
            debug!(id = existing.id, link = %candidate.link, "Touched known filing");
            return Ok(PersistOutcome::Touched { id: existing.id });
        }

        match self.store.insert(candidate).await {
            Ok(record) => {
                debug!(id = record.id, link = %candidate.link, "Inserted new filing");
                Ok(PersistOutcome::Inserted { id: record.id })
            }
            Err(e) if e.is_constraint_violation() => {
                // Another writer inserted between our lookup and insert. Its
                // insert already stamped updated_at, so this call writes nothing more.
                debug!(link = %candidate.link, "Insert lost a race to another writer");
                match self.store.find_by_link(&candidate.link).await? {
                    Some(existing) => Ok(PersistOutcome::Touched { id: existing.id }),
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Per-link lock table (exposed for diagnostics)
    pub fn locks(&self) -> &LinkLocks {
        &self.locks
    }
}
