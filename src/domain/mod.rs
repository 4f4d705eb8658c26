//! Domain layer for the report renamer
//!
//! Instrument and job models, the ports the core consumes, and the error
//! types each concern reports.

pub mod error;
pub mod models;
pub mod ports;

pub use error::{ExtractionError, ReadError, RegistryError, SupervisorError, WatchError};
