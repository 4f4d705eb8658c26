//! CLI command implementations.

pub mod instrument;
pub mod rename;
pub mod run;

use std::sync::Arc;

use crate::domain::models::PipelineConfig;
use crate::infrastructure::PdfExtractReader;
use crate::services::RenamePipeline;

/// Rename pipeline reading reports with pdf-extract
pub(crate) fn build_pipeline(config: PipelineConfig) -> Arc<RenamePipeline> {
    Arc::new(RenamePipeline::new(Arc::new(PdfExtractReader::new()), config))
}
