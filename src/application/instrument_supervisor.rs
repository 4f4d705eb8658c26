//! Instrument Supervisor
//!
//! Owns the ordered instrument registry and, for every running instrument,
//! the handle of its watch unit. All state transitions go through a short
//! critical section that marks the instrument `Starting` or `Stopping`
//! before any slow work happens, so a concurrent toggle of the same
//! instrument is rejected instead of racing into a second watch unit.
//!
//! ```text
//!   Stopped ──toggle──▶ Starting ──subscribed──▶ Running
//!      ▲                   │ subscribe failed        │ toggle / stop_all
//!      │◀──────────────────┘                         ▼
//!      │◀─────────── units drained ─────────── Stopping
//!      │◀─────────── reconcile (unit died) ─── Running
//! ```

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::instrument_watcher::{
    InstrumentWatcher, JobStats, OrphanedJobs, UnitExit, WatchHandle,
};
use crate::domain::error::SupervisorError;
use crate::domain::models::{Instrument, InstrumentKind, RunState};

#[derive(Debug)]
enum SlotState {
    Stopped,
    Starting,
    Running(WatchHandle),
    Stopping,
}

#[derive(Debug)]
struct Slot {
    instrument: Instrument,
    state: SlotState,
}

#[derive(Debug, Default)]
struct Inner {
    slots: Vec<Slot>,
    /// Jobs of reconciled units, awaited by `stop_all`
    orphans: Vec<OrphanedJobs>,
    closed: bool,
}

impl Inner {
    fn slot_mut(&mut self, name: &str) -> Result<&mut Slot, SupervisorError> {
        self.slots
            .iter_mut()
            .find(|slot| slot.instrument.name == name)
            .ok_or_else(|| SupervisorError::InstrumentNotFound(name.to_string()))
    }
}

/// Point-in-time view of one instrument
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentStatus {
    /// 1-based position in the registry
    pub index: usize,
    pub name: String,
    pub kind: InstrumentKind,
    pub path: PathBuf,
    pub state: RunState,
    /// A start or stop is in flight
    pub transitioning: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub jobs: JobStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Stopped,
    Running,
    Transitioning,
}

impl Phase {
    const fn of(state: &SlotState) -> Self {
        match state {
            SlotState::Stopped => Self::Stopped,
            SlotState::Running(_) => Self::Running,
            SlotState::Starting | SlotState::Stopping => Self::Transitioning,
        }
    }
}

enum Transition {
    Start(Instrument),
    Stop(WatchHandle),
}

/// Start/stop/toggle manager for per-instrument watch units
pub struct InstrumentSupervisor {
    watcher: InstrumentWatcher,
    inner: Mutex<Inner>,
    drain_timeout: Duration,
}

impl InstrumentSupervisor {
    /// Create a supervisor with every instrument stopped
    ///
    /// Watch paths are not checked here; a missing directory surfaces when
    /// the instrument is started.
    pub fn new(
        watcher: InstrumentWatcher,
        instruments: Vec<Instrument>,
        drain_timeout: Duration,
    ) -> Result<Self, SupervisorError> {
        let mut inner = Inner::default();
        for instrument in instruments {
            if inner.slots.iter().any(|s| s.instrument.name == instrument.name) {
                return Err(SupervisorError::DuplicateInstrument(instrument.name));
            }
            inner.slots.push(Slot {
                instrument,
                state: SlotState::Stopped,
            });
        }

        Ok(Self {
            watcher,
            inner: Mutex::new(inner),
            drain_timeout,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registered instruments in registry order
    pub fn instruments(&self) -> Vec<Instrument> {
        self.lock()
            .slots
            .iter()
            .map(|slot| slot.instrument.clone())
            .collect()
    }

    /// Name of the instrument at 1-based `index`
    pub fn name_at(&self, index: usize) -> Result<String, SupervisorError> {
        index
            .checked_sub(1)
            .and_then(|i| self.lock().slots.get(i).map(|s| s.instrument.name.clone()))
            .ok_or_else(|| SupervisorError::InstrumentNotFound(format!("#{index}")))
    }

    /// Register a new, stopped instrument
    pub fn add(&self, instrument: Instrument) -> Result<(), SupervisorError> {
        if !instrument.path.is_dir() {
            return Err(SupervisorError::PathNotFound(instrument.path));
        }

        let mut inner = self.lock();
        if inner.slots.iter().any(|s| s.instrument.name == instrument.name) {
            return Err(SupervisorError::DuplicateInstrument(instrument.name));
        }

        info!(instrument = %instrument.name, kind = %instrument.kind, path = %instrument.path.display(), "instrument added");
        inner.slots.push(Slot {
            instrument,
            state: SlotState::Stopped,
        });
        Ok(())
    }

    /// Remove a stopped instrument from the registry
    pub async fn remove(&self, name: &str) -> Result<Instrument, SupervisorError> {
        self.reconcile().await;

        let mut inner = self.lock();
        let position = inner
            .slots
            .iter()
            .position(|s| s.instrument.name == name)
            .ok_or_else(|| SupervisorError::InstrumentNotFound(name.to_string()))?;

        match inner.slots[position].state {
            SlotState::Stopped => {}
            SlotState::Running(_) => return Err(SupervisorError::StillRunning(name.to_string())),
            SlotState::Starting | SlotState::Stopping => {
                return Err(SupervisorError::TransitionInProgress(name.to_string()))
            }
        }

        let slot = inner.slots.remove(position);
        info!(instrument = %name, "instrument removed");
        Ok(slot.instrument)
    }

    /// Current run state of `name`
    pub fn state_of(&self, name: &str) -> Option<RunState> {
        self.lock()
            .slots
            .iter()
            .find(|s| s.instrument.name == name)
            .map(|s| run_state(&s.state))
    }

    /// Start if stopped, stop if running
    ///
    /// Returns the state the instrument ended in.
    pub async fn toggle(&self, name: &str) -> Result<RunState, SupervisorError> {
        self.reconcile().await;

        let transition = {
            let mut inner = self.lock();
            let closed = inner.closed;
            let slot = inner.slot_mut(name)?;
            match Phase::of(&slot.state) {
                Phase::Stopped if closed => return Err(SupervisorError::ShuttingDown),
                Phase::Stopped => begin_start(slot),
                Phase::Running => Transition::Stop(begin_stop(slot)?),
                Phase::Transitioning => {
                    return Err(SupervisorError::TransitionInProgress(name.to_string()))
                }
            }
        };

        self.complete(name, transition).await
    }

    /// Start a stopped instrument
    pub async fn start(&self, name: &str) -> Result<(), SupervisorError> {
        self.reconcile().await;

        let transition = {
            let mut inner = self.lock();
            if inner.closed {
                return Err(SupervisorError::ShuttingDown);
            }
            let slot = inner.slot_mut(name)?;
            match Phase::of(&slot.state) {
                Phase::Stopped => begin_start(slot),
                Phase::Running => return Err(SupervisorError::AlreadyRunning(name.to_string())),
                Phase::Transitioning => {
                    return Err(SupervisorError::TransitionInProgress(name.to_string()))
                }
            }
        };

        self.complete(name, transition).await.map(|_| ())
    }

    /// Stop a running instrument, waiting (bounded) for its in-flight jobs
    pub async fn stop(&self, name: &str) -> Result<UnitExit, SupervisorError> {
        let handle = {
            let mut inner = self.lock();
            let slot = inner.slot_mut(name)?;
            match Phase::of(&slot.state) {
                Phase::Running => begin_stop(slot)?,
                Phase::Stopped => return Err(SupervisorError::NotRunning(name.to_string())),
                Phase::Transitioning => {
                    return Err(SupervisorError::TransitionInProgress(name.to_string()))
                }
            }
        };

        Ok(self.finish_stop(name, handle).await)
    }

    async fn complete(&self, name: &str, transition: Transition) -> Result<RunState, SupervisorError> {
        match transition {
            Transition::Start(instrument) => {
                let started = self.watcher.start(&instrument);

                let mut inner = self.lock();
                let closed = inner.closed;
                let slot = inner.slot_mut(name)?;
                match started {
                    Ok(handle) if closed => {
                        // stop_all ran while this unit was starting
                        slot.state = SlotState::Stopping;
                        drop(inner);
                        self.finish_stop(name, handle).await;
                        Err(SupervisorError::ShuttingDown)
                    }
                    Ok(handle) => {
                        slot.state = SlotState::Running(handle);
                        Ok(RunState::Running)
                    }
                    Err(source) => {
                        slot.state = SlotState::Stopped;
                        error!(instrument = %name, error = %source, "failed to start watch unit");
                        Err(SupervisorError::WatchFailed {
                            name: name.to_string(),
                            source,
                        })
                    }
                }
            }
            Transition::Stop(handle) => {
                self.finish_stop(name, handle).await;
                Ok(RunState::Stopped)
            }
        }
    }

    async fn finish_stop(&self, name: &str, handle: WatchHandle) -> UnitExit {
        let exit = handle.stop(self.drain_timeout).await;
        log_exit(name, &exit);

        if let Ok(slot) = self.lock().slot_mut(name) {
            slot.state = SlotState::Stopped;
        }
        exit
    }

    /// Move instruments whose unit ended on its own back to `Stopped`
    ///
    /// Returns the reconciled instruments with their exit reasons.
    pub async fn reconcile(&self) -> Vec<(String, UnitExit)> {
        let dead: Vec<(String, WatchHandle)> = {
            let mut inner = self.lock();
            inner
                .slots
                .iter_mut()
                .filter(|slot| matches!(&slot.state, SlotState::Running(h) if !h.is_alive()))
                .filter_map(|slot| {
                    match std::mem::replace(&mut slot.state, SlotState::Stopped) {
                        SlotState::Running(handle) => Some((slot.instrument.name.clone(), handle)),
                        _ => None,
                    }
                })
                .collect()
        };

        let mut reconciled = Vec::with_capacity(dead.len());
        for (name, handle) in dead {
            let (exit, orphans) = handle.reap().await;
            warn!(instrument = %name, exit = ?exit, "watch unit terminated unexpectedly, instrument reconciled to stopped");
            if let Some(orphans) = orphans {
                let mut inner = self.lock();
                inner.orphans.retain(|o| !o.is_finished());
                inner.orphans.push(orphans);
            }
            reconciled.push((name, exit));
        }
        reconciled
    }

    /// Stop every running instrument and refuse further starts
    ///
    /// Units are drained concurrently, each bounded by the drain timeout.
    /// Jobs left behind by reconciled units are awaited under the same bound.
    pub async fn stop_all(&self) -> Vec<(String, UnitExit)> {
        let (handles, orphans): (Vec<(String, WatchHandle)>, Vec<OrphanedJobs>) = {
            let mut inner = self.lock();
            inner.closed = true;
            let orphans = std::mem::take(&mut inner.orphans);
            let handles = inner
                .slots
                .iter_mut()
                .filter(|slot| matches!(slot.state, SlotState::Running(_)))
                .filter_map(|slot| {
                    match std::mem::replace(&mut slot.state, SlotState::Stopping) {
                        SlotState::Running(handle) => Some((slot.instrument.name.clone(), handle)),
                        _ => None,
                    }
                })
                .collect();
            (handles, orphans)
        };

        info!(running = handles.len(), orphaned = orphans.len(), "stopping all instruments");

        let drain_timeout = self.drain_timeout;
        let stopping = join_all(handles.into_iter().map(|(name, handle)| async move {
            let exit = handle.stop(drain_timeout).await;
            (name, exit)
        }));
        let orphans = join_all(orphans.into_iter().map(|orphans| async move {
            let instrument = orphans.instrument().to_string();
            if !orphans.wait(drain_timeout).await {
                warn!(instrument = %instrument, "orphaned rename jobs still running after drain timeout");
            }
        }));
        let (exits, _) = tokio::join!(stopping, orphans);

        let mut inner = self.lock();
        for (name, exit) in &exits {
            log_exit(name, exit);
            if let Ok(slot) = inner.slot_mut(name) {
                slot.state = SlotState::Stopped;
            }
        }

        exits
    }

    /// Snapshot of every instrument, in registry order
    pub fn snapshot(&self) -> Vec<InstrumentStatus> {
        self.lock()
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let (started_at, jobs) = match &slot.state {
                    SlotState::Running(handle) => (Some(handle.started_at()), handle.stats()),
                    _ => (None, JobStats::default()),
                };
                InstrumentStatus {
                    index: i + 1,
                    name: slot.instrument.name.clone(),
                    kind: slot.instrument.kind,
                    path: slot.instrument.path.clone(),
                    state: run_state(&slot.state),
                    transitioning: matches!(slot.state, SlotState::Starting | SlotState::Stopping),
                    started_at,
                    jobs,
                }
            })
            .collect()
    }

    /// Spawn a background sweep that reconciles dead units every `interval`
    pub fn spawn_reconciler(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let supervisor = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            // Skip first tick (fires immediately)
            ticker.tick().await;

            debug!(interval_secs = interval.as_secs(), "reconciler started");

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        supervisor.reconcile().await;
                    }
                }
            }

            debug!("reconciler stopped");
        })
    }
}

fn begin_start(slot: &mut Slot) -> Transition {
    slot.state = SlotState::Starting;
    Transition::Start(slot.instrument.clone())
}

fn begin_stop(slot: &mut Slot) -> Result<WatchHandle, SupervisorError> {
    match std::mem::replace(&mut slot.state, SlotState::Stopping) {
        SlotState::Running(handle) => Ok(handle),
        other => {
            slot.state = other;
            Err(SupervisorError::NotRunning(slot.instrument.name.clone()))
        }
    }
}

fn run_state(state: &SlotState) -> RunState {
    match state {
        SlotState::Running(handle) if handle.is_alive() => RunState::Running,
        SlotState::Stopping => RunState::Running,
        _ => RunState::Stopped,
    }
}

fn log_exit(name: &str, exit: &UnitExit) {
    match exit {
        UnitExit::Stopped => info!(instrument = %name, "instrument stopped"),
        UnitExit::DrainTimedOut => {
            warn!(instrument = %name, "instrument stopped, rename jobs still finishing");
        }
        UnitExit::Failed(e) => {
            warn!(instrument = %name, error = %e, "instrument stopped after watch failure");
        }
        UnitExit::Panicked(e) => {
            error!(instrument = %name, error = %e, "instrument stopped after watch unit panic");
        }
    }
}
