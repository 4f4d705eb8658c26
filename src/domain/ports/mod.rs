//! Port trait definitions (Hexagonal Architecture)
//!
//! Interfaces of the external collaborators the core consumes:
//! - PdfTextReader: first-page text of a report
//! - CreateEventSource: file creation events for a directory
//! - InstrumentStore: persisted instrument registry

pub mod event_source;
pub mod instrument_store;
pub mod pdf_text_reader;

pub use event_source::{CreateEventSource, CreatedEvent, EventItem, Subscription};
pub use instrument_store::InstrumentStore;
pub use pdf_text_reader::PdfTextReader;
