//! Instrument Watch Units
//!
//! A watch unit is one spawned tokio task per running instrument. It owns
//! the instrument's create-event subscription and fans every relevant
//! event out to its own short-lived rename job:
//!
//! ```text
//!   Subscription ──▶ WatchUnit loop ──spawn──▶ job (path lock ─▶ RenamePipeline::handle)
//!        ▲               │  ▲                  job ...
//!   cancel token ────────┘  └── liveness probe (health interval)
//! ```
//!
//! Jobs for different files run concurrently. Jobs for the same path are
//! serialized through a per-path lock. Cancelling the unit drops the
//! subscription at once, then waits for in-flight jobs to finish. A watch
//! fault ends the unit task at once; its in-flight jobs move to a separate
//! drain task ([`OrphanedJobs`]) so the fault is visible to the supervisor
//! while they finish.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument as _};

use crate::domain::error::WatchError;
use crate::domain::models::{Instrument, InstrumentKind, RenameOutcome};
use crate::domain::ports::{CreateEventSource, CreatedEvent, Subscription};
use crate::services::RenamePipeline;

/// Terminal outcome counts of one watch unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub renamed: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl JobStats {
    pub const fn total(&self) -> u64 {
        self.renamed + self.skipped + self.failed
    }
}

#[derive(Debug, Default)]
struct JobCounters {
    renamed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl JobCounters {
    fn record(&self, outcome: &RenameOutcome) {
        let counter = match outcome {
            RenameOutcome::Renamed { .. } => &self.renamed,
            RenameOutcome::Skipped(_) => &self.skipped,
            RenameOutcome::Failed { .. } | RenameOutcome::Pending => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> JobStats {
        JobStats {
            renamed: self.renamed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// How a watch unit ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitExit {
    /// Cancelled and all in-flight jobs reached a terminal outcome
    Stopped,
    /// Subscription or directory fault ended the unit
    Failed(WatchError),
    /// The unit task panicked
    Panicked(String),
    /// Cancelled, but in-flight jobs outlived the drain timeout; they keep running
    DrainTimedOut,
}

impl UnitExit {
    fn from_join(joined: Result<UnitEnd, JoinError>) -> (Self, Option<OrphanedJobs>) {
        match joined {
            Ok(UnitEnd {
                result: Ok(()),
                orphans,
            }) => (Self::Stopped, orphans),
            Ok(UnitEnd {
                result: Err(e),
                orphans,
            }) => (Self::Failed(e), orphans),
            Err(e) => (Self::Panicked(e.to_string()), None),
        }
    }
}

/// What a finished unit task leaves behind
#[derive(Debug)]
struct UnitEnd {
    result: Result<(), WatchError>,
    orphans: Option<OrphanedJobs>,
}

/// Rename jobs still finishing after their unit ended on a watch fault
#[derive(Debug)]
pub struct OrphanedJobs {
    instrument: String,
    task: JoinHandle<()>,
}

impl OrphanedJobs {
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait up to `timeout`; false if the jobs are still running
    pub async fn wait(self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.task).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(instrument = %self.instrument, error = %e, "orphaned rename jobs failed");
                true
            }
            Err(_) => false,
        }
    }
}

/// Handle to a running watch unit
#[derive(Debug)]
pub struct WatchHandle {
    instrument: String,
    cancel: CancellationToken,
    task: JoinHandle<UnitEnd>,
    counters: Arc<JobCounters>,
    started_at: DateTime<Utc>,
}

impl WatchHandle {
    /// Whether the unit task is still running
    pub fn is_alive(&self) -> bool {
        !self.task.is_finished()
    }

    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn stats(&self) -> JobStats {
        self.counters.snapshot()
    }

    /// Cancel the subscription and wait (bounded) for in-flight jobs
    ///
    /// Jobs orphaned by a watch fault count as in flight.
    pub async fn stop(self, drain_timeout: Duration) -> UnitExit {
        self.cancel.cancel();

        let drained = tokio::time::timeout(drain_timeout, async {
            let (exit, orphans) = UnitExit::from_join(self.task.await);
            if let Some(orphans) = orphans {
                orphans.wait(drain_timeout).await;
            }
            exit
        })
        .await;

        match drained {
            Ok(exit) => exit,
            Err(_) => {
                warn!(
                    instrument = %self.instrument,
                    drain_timeout_secs = drain_timeout.as_secs(),
                    "in-flight rename jobs still running after drain timeout"
                );
                UnitExit::DrainTimedOut
            }
        }
    }

    /// Collect the exit of a unit that already finished on its own
    pub async fn reap(self) -> (UnitExit, Option<OrphanedJobs>) {
        self.cancel.cancel();
        UnitExit::from_join(self.task.await)
    }
}

/// Starts watch units for instruments
pub struct InstrumentWatcher {
    source: Arc<dyn CreateEventSource>,
    pipeline: Arc<RenamePipeline>,
    health_check_interval: Duration,
}

impl InstrumentWatcher {
    pub fn new(
        source: Arc<dyn CreateEventSource>,
        pipeline: Arc<RenamePipeline>,
        health_check_interval: Duration,
    ) -> Self {
        Self {
            source,
            pipeline,
            health_check_interval,
        }
    }

    /// Subscribe to the instrument's directory and spawn its unit
    ///
    /// The subscription is established before spawning, so an inaccessible
    /// directory is reported here rather than as a unit exit.
    pub fn start(&self, instrument: &Instrument) -> Result<WatchHandle, WatchError> {
        let subscription = self.source.subscribe(&instrument.path)?;

        let cancel = CancellationToken::new();
        let counters = Arc::new(JobCounters::default());

        let unit = WatchUnit {
            instrument: instrument.name.clone(),
            kind: instrument.kind,
            directory: instrument.path.clone(),
            pipeline: Arc::clone(&self.pipeline),
            subscription,
            cancel: cancel.clone(),
            counters: Arc::clone(&counters),
            health_check_interval: self.health_check_interval,
        };

        let span = info_span!("watch", instrument = %instrument.name, kind = %instrument.kind);
        let task = tokio::spawn(unit.run().instrument(span));

        info!(
            instrument = %instrument.name,
            path = %instrument.path.display(),
            "watch unit started"
        );

        Ok(WatchHandle {
            instrument: instrument.name.clone(),
            cancel,
            task,
            counters,
            started_at: Utc::now(),
        })
    }
}

struct WatchUnit {
    instrument: String,
    kind: InstrumentKind,
    directory: PathBuf,
    pipeline: Arc<RenamePipeline>,
    subscription: Subscription,
    cancel: CancellationToken,
    counters: Arc<JobCounters>,
    health_check_interval: Duration,
}

impl WatchUnit {
    async fn run(self) -> UnitEnd {
        let Self {
            instrument,
            kind,
            directory,
            pipeline,
            mut subscription,
            cancel,
            counters,
            health_check_interval,
        } = self;

        let locks = PathLocks::default();
        let mut jobs = JoinSet::new();
        let mut health = tokio::time::interval(health_check_interval);

        // Skip first tick (fires immediately)
        health.tick().await;

        let result = loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    debug!("watch unit cancelled");
                    break Ok(());
                }

                item = subscription.next() => match item {
                    Some(Ok(event)) => {
                        if let Some(path) = relevant_event(event) {
                            let pipeline = Arc::clone(&pipeline);
                            let locks = locks.clone();
                            let span = info_span!("job", path = %path.display());
                            jobs.spawn(
                                async move {
                                    let lock = locks.acquire(&path);
                                    let outcome = {
                                        let _serialized = lock.lock().await;
                                        pipeline.handle(&path, kind).await
                                    };
                                    locks.release(&path, lock);
                                    outcome
                                }
                                .instrument(span),
                            );
                        }
                    }
                    Some(Err(e)) => break Err(e),
                    None => break Err(WatchError::SubscriptionClosed),
                },

                _ = health.tick() => {
                    if !directory_accessible(&directory).await {
                        break Err(WatchError::DirectoryGone(directory.clone()));
                    }
                }

                Some(joined) = jobs.join_next() => record(&counters, joined),
            }
        };

        drop(subscription);

        match result {
            Ok(()) => {
                info!(in_flight = jobs.len(), "watch subscription cancelled");
                drain(jobs, counters).await;
                UnitEnd {
                    result: Ok(()),
                    orphans: None,
                }
            }
            Err(e) => {
                error!(error = %e, in_flight = jobs.len(), "watch unit failed");
                let orphans = (!jobs.is_empty()).then(|| OrphanedJobs {
                    instrument,
                    task: tokio::spawn(drain(jobs, counters).in_current_span()),
                });
                UnitEnd {
                    result: Err(e),
                    orphans,
                }
            }
        }
    }
}

async fn drain(mut jobs: JoinSet<RenameOutcome>, counters: Arc<JobCounters>) {
    while let Some(joined) = jobs.join_next().await {
        record(&counters, joined);
    }
}

fn relevant_event(event: CreatedEvent) -> Option<PathBuf> {
    if event.is_directory {
        debug!(path = %event.path.display(), "ignoring directory creation");
        return None;
    }
    debug!(path = %event.path.display(), "file created");
    Some(event.path)
}

fn record(counters: &JobCounters, joined: Result<RenameOutcome, JoinError>) {
    match joined {
        Ok(outcome) => {
            debug!(outcome = outcome.label(), "rename job finished");
            counters.record(&outcome);
        }
        Err(e) => {
            error!(error = %e, "rename job panicked");
            counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

async fn directory_accessible(directory: &Path) -> bool {
    tokio::fs::metadata(directory)
        .await
        .is_ok_and(|meta| meta.is_dir())
}

/// One async lock per source path with an active job
#[derive(Clone, Default)]
struct PathLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>,
}

impl PathLocks {
    fn acquire(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(map.entry(path.to_path_buf()).or_default())
    }

    fn release(&self, path: &Path, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Only the map and this job hold the lock: nobody is waiting on the path.
        if Arc::strong_count(&lock) == 2 {
            map.remove(path);
        }
    }
}
