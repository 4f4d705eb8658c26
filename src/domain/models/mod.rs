//! Domain models

pub mod config;
pub mod instrument;
pub mod rename_job;

pub use config::{Config, LoggingConfig, PipelineConfig, RegistryConfig, SupervisorConfig};
pub use instrument::{Instrument, InstrumentKind, RunState};
pub use rename_job::{RenameJob, RenameOutcome, SkipReason};
