//! Application layer: per-instrument watch units and their supervisor

pub mod instrument_supervisor;
pub mod instrument_watcher;

pub use instrument_supervisor::{InstrumentStatus, InstrumentSupervisor};
pub use instrument_watcher::{InstrumentWatcher, JobStats, OrphanedJobs, UnitExit, WatchHandle};
