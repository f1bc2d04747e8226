//! Fixed-rate feed polling
//!
//! [`PollScheduler`] owns the whole fetch, parse, persist pipeline. One timer
//! drives cycle starts on a fixed grid; the fetch of each cycle runs on the
//! timer task so only one request is ever outstanding and the validator cache
//! has a single writer. Once a 200 body arrives, parsing and persistence move
//! to a tracked task so the next tick is not held back by a slow store.
//!
//! Failures end their own cycle only. Shutdown stops the timer and then waits
//! (bounded by `ingest.shutdown_grace`) for tracked ingestion to finish.
//!
//! # Example
//!
//! ```no_run
//! use filing_feed::{Config, Database, PollScheduler};
//! use std::sync::Arc;
//!
//! # async fn example() -> filing_feed::Result<()> {
//! let config = Config::default();
//! let db = Arc::new(Database::new(&config.persistence.database_path).await?);
//!
//! let scheduler = PollScheduler::new(config, db)?;
//! let mut events = scheduler.subscribe();
//! let handle = scheduler.spawn();
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{ConditionalFetchCache, FeedBody, FeedClient, FetchOutcome};
use crate::ingest::DedupPersister;
use crate::parser::parse_feed;
use crate::store::FilingStore;
use crate::types::{CycleOutcome, CycleReport, Event, PersistOutcome};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Semaphore, broadcast};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use url::Url;


/// Parse and persist half of a cycle
///
/// Cloned into every ingestion task; the semaphore is shared, so the worker
/// bound holds across overlapping cycles.
#[derive(Clone)]
struct Pipeline {
    persister: Arc<DedupPersister>,
    workers: Arc<Semaphore>,
    origin: Url,
    event_tx: broadcast::Sender<Event>,
}

impl Pipeline {
    /// Parse `body` and persist every candidate, then report the cycle
    async fn ingest(&self, cycle: u64, body: FeedBody, started: Instant) -> Result<CycleReport> {
        let result = self.ingest_inner(cycle, body).await;

        match &result {
            Ok(report) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                if report.inserted > 0 {
                    info!(
                        cycle,
                        parsed = report.parsed,
                        inserted = report.inserted,
                        touched = report.touched,
                        failed = report.failed,
                        elapsed_ms,
                        "Ingested new filings"
                    );
                } else {
                    debug!(
                        cycle,
                        parsed = report.parsed,
                        touched = report.touched,
                        failed = report.failed,
                        elapsed_ms,
                        "Feed cycle completed"
                    );
                }
                self.emit(Event::CycleCompleted {
                    cycle,
                    report: *report,
                    elapsed_ms,
                });
            }
            Err(e) => self.cycle_failed(cycle, e),
        }

        result
    }

    async fn ingest_inner(&self, cycle: u64, body: FeedBody) -> Result<CycleReport> {
        let candidates = parse_feed(body, &self.origin).await?;
        let mut report = CycleReport {
            parsed: candidates.len(),
            ..Default::default()
        };
        debug!(cycle, entries = candidates.len(), "Parsed feed document");

        let mut tasks = JoinSet::new();
        for candidate in candidates {
            let permit = self
                .workers
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| Error::Other(format!("persistence pool closed: {}", e)))?;
            let persister = self.persister.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let outcome = persister.persist(&candidate).await;
                (candidate.link, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (link, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    error!(cycle, error = %e, "Persistence task panicked");
                    report.failed += 1;
                    continue;
                }
            };

            match &outcome {
                Ok(PersistOutcome::Inserted { id }) => self.emit(Event::FilingInserted {
                    cycle,
                    id: *id,
                    link,
                }),
                Ok(PersistOutcome::Touched { id }) => {
                    self.emit(Event::FilingTouched { cycle, id: *id })
                }
                Err(e) => {
                    // Dropped for this cycle; the next document still lists it
                    warn!(cycle, link = %link, error = %e, "Failed to persist filing");
                }
            }
            report.record(&outcome);
        }

        Ok(report)
    }

    fn cycle_failed(&self, cycle: u64, error: &Error) {
        let stage = error.stage();
        warn!(cycle, stage = %stage, error = %error, "Feed cycle failed");
        self.emit(Event::CycleFailed {
            cycle,
            stage,
            message: error.to_string(),
        });
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}

/// Drives the fetch, parse, persist cycle at a fixed rate
pub struct PollScheduler {
    config: Arc<Config>,
    client: FeedClient,
    pipeline: Pipeline,
    tracker: TaskTracker,
    cycles: AtomicU64,
}

impl PollScheduler {
    /// Create a scheduler writing to `store`
    ///
    /// # Errors
    /// Returns a configuration error if `config` does not validate, or an
    /// error if the HTTP client cannot be built.
    pub fn new(config: Config, store: Arc<dyn FilingStore>) -> Result<Self> {
        config.validate()?;

        let client = FeedClient::new(&config.feed)?;
        let origin = config.link_origin()?;
        let (event_tx, _rx) = broadcast::channel(config.ingest.event_buffer);

        let pipeline = Pipeline {
            persister: Arc::new(DedupPersister::new(store)),
            workers: Arc::new(Semaphore::new(config.ingest.persist_workers)),
            origin,
            event_tx,
        };

        Ok(Self {
            config: Arc::new(config),
            client,
            pipeline,
            tracker: TaskTracker::new(),
            cycles: AtomicU64::new(0),
        })
    }

    /// Subscribe to scheduler events
    ///
    /// Slow receivers may observe `RecvError::Lagged` and miss events; the
    /// pipeline never waits on them.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.pipeline.event_tx.subscribe()
    }

    /// Configuration the scheduler was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a single cycle to completion, ingestion included
    ///
    /// Emits the same events as a timer-driven cycle.
    ///
    /// # Errors
    /// Returns the error that ended the cycle: transport errors from the fetch,
    /// or a parse error for an unusable body. Per-candidate store failures are
    /// counted in the report instead.
    pub async fn poll_once(&self, cache: &mut ConditionalFetchCache) -> Result<CycleOutcome> {
        let cycle = self.next_cycle();
        let started = Instant::now();
        self.pipeline.emit(Event::CycleStarted { cycle });

        match self.fetch(cache).await {
            Ok(FetchOutcome::NotModified) => {
                self.not_modified(cycle);
                Ok(CycleOutcome::NotModified)
            }
            Ok(FetchOutcome::Modified(body)) => self
                .pipeline
                .ingest(cycle, body, started)
                .await
                .map(CycleOutcome::Ingested),
            Err(e) => {
                self.pipeline.cycle_failed(cycle, &e);
                Err(e)
            }
        }
    }

    /// Poll until `shutdown` is cancelled, then drain in-flight ingestion
    ///
    /// The first tick fires immediately. Ticks missed while a fetch was slow
    /// are skipped rather than replayed, so the grid never bunches up.
    pub async fn run_until(self, shutdown: CancellationToken) {
        let interval = self.config.feed.poll_interval;
        info!(
            url = %self.client.url(),
            interval_ms = interval.as_millis() as u64,
            workers = self.config.ingest.persist_workers,
            "Poll scheduler started"
        );

        let mut cache = ConditionalFetchCache::new();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let cycle = self.next_cycle();
            let started = Instant::now();
            self.pipeline.emit(Event::CycleStarted { cycle });

            let fetched = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!(cycle, "Shutdown requested during fetch; abandoning cycle");
                    break;
                }
                fetched = self.fetch(&mut cache) => fetched,
            };

            match fetched {
                Ok(FetchOutcome::NotModified) => self.not_modified(cycle),
                Ok(FetchOutcome::Modified(body)) => {
                    let pipeline = self.pipeline.clone();
                    self.tracker.spawn(async move {
                        // Outcome is already logged and emitted
                        let _ = pipeline.ingest(cycle, body, started).await;
                    });
                }
                Err(e) => self.pipeline.cycle_failed(cycle, &e),
            }
        }

        self.drain().await;
        info!("Poll scheduler stopped");
        self.pipeline.emit(Event::Shutdown);
    }

    /// Start polling on a background task
    pub fn spawn(self) -> PollerHandle {
        let shutdown = CancellationToken::new();
        let event_tx = self.pipeline.event_tx.clone();
        let task = tokio::spawn(self.run_until(shutdown.clone()));

        PollerHandle {
            shutdown,
            event_tx,
            task,
        }
    }

    async fn fetch(&self, cache: &mut ConditionalFetchCache) -> Result<FetchOutcome> {
        let limit = self.config.feed.fetch_timeout;
        match tokio::time::timeout(limit, self.client.fetch(cache)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(limit)),
        }
    }

    fn not_modified(&self, cycle: u64) {
        debug!(cycle, "Feed unchanged");
        self.pipeline.emit(Event::NotModified { cycle });
    }

    fn next_cycle(&self) -> u64 {
        self.cycles.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn drain(&self) {
        self.tracker.close();
        let in_flight = self.tracker.len();
        if in_flight == 0 {
            return;
        }

        let grace = self.config.ingest.shutdown_grace;
        info!(in_flight, grace_secs = grace.as_secs(), "Waiting for in-flight ingestion");

        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => info!("In-flight ingestion finished"),
            Err(_) => warn!(
                remaining = self.tracker.len(),
                "Timeout waiting for ingestion to finish, proceeding with shutdown"
            ),
        }
    }
}

/// Handle to a scheduler running on a background task
pub struct PollerHandle {
    shutdown: CancellationToken,
    event_tx: broadcast::Sender<Event>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Subscribe to scheduler events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that stops the scheduler when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Whether the scheduler task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop scheduling new cycles and wait for in-flight ingestion to drain
    ///
    /// # Errors
    /// Returns an error if the scheduler task panicked.
    pub async fn shutdown(self) -> Result<()> {
        info!("Initiating poller shutdown");
        self.shutdown.cancel();
        self.task
            .await
            .map_err(|e| Error::Other(format!("poll scheduler task failed: {}", e)))
    }
}
