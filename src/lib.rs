//! Autorename - instrument PDF report renamer
//!
//! Watches the output directories of lab instruments and renames every new
//! report PDF after the "Data File" named on its first page.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, port traits and error types
//! - **Service Layer** (`services`): name extraction and the per-file rename pipeline
//! - **Application Layer** (`application`): per-instrument watch units and their supervisor
//! - **Infrastructure Layer** (`infrastructure`): pdf-extract, notify, registry file, config, logging
//! - **CLI Layer** (`cli`): command-line interface and operator console
//!
//! # Example
//!
//! ```ignore
//! use autorename::domain::models::InstrumentKind;
//! use autorename::services::derive;
//!
//! let name = derive(&["Data File: P0QC2418.D"], InstrumentKind::ChemStation)?;
//! assert_eq!(name.file_name(), "PrintTextP0QC2418.D.pdf");
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{InstrumentStatus, InstrumentSupervisor, InstrumentWatcher, UnitExit};
pub use domain::error::{ExtractionError, ReadError, RegistryError, SupervisorError, WatchError};
pub use domain::models::{Config, Instrument, InstrumentKind, RenameOutcome, RunState};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{derive, RenamePipeline};
