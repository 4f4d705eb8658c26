//! Service layer: name derivation and the per-file rename pipeline

pub mod name_extractor;
pub mod rename_pipeline;

pub use name_extractor::{derive, ExtractedName};
pub use rename_pipeline::{destination_for, is_relevant, AttemptError, RenamePipeline};
