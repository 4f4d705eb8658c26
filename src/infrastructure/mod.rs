//! Infrastructure layer module
//!
//! Adapters satisfying the domain ports, plus process-wide concerns:
//! - PDF text extraction (pdf-extract)
//! - Filesystem create events (notify)
//! - Instrument registry file (serde_yaml)
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)

pub mod config;
pub mod logging;
pub mod pdf;
pub mod registry;
pub mod watch;

pub use pdf::PdfExtractReader;
pub use registry::YamlInstrumentStore;
pub use watch::NotifyEventSource;
