//! Per-file rename pipeline
//!
//! One call to [`RenamePipeline::handle`] drives one [`RenameJob`] from the
//! create event to a terminal outcome:
//!
//! ```text
//! relevance filter ──no──▶ Skipped(Irrelevant)
//!        │
//!   settle delay
//!        │
//!   ┌─▶ read first page ─▶ derive name ─▶ destination exists? ──yes──▶ Skipped(Collision)
//!   │        │ err             │ err              │ no
//!   └─ backoff ◀───────────────┘                rename ──▶ Renamed
//!   (max_attempts, then Failed)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::error::{ExtractionError, ReadError};
use crate::domain::models::{
    InstrumentKind, PipelineConfig, RenameJob, RenameOutcome, SkipReason,
};
use crate::domain::ports::PdfTextReader;
use crate::services::name_extractor::{self, ExtractedName};

/// Failure of a single attempt; every variant is retried
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Extract(#[from] ExtractionError),

    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Whether a created file is a report of `kind`
///
/// Exact, case-sensitive suffix match on the file name.
pub fn is_relevant(path: &Path, kind: InstrumentKind) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(kind.report_suffix()))
}

/// Same directory, base name replaced by `<name>.pdf`
pub fn destination_for(source: &Path, name: &ExtractedName) -> PathBuf {
    source.with_file_name(name.file_name())
}

/// Filter, extract and rename created report files
pub struct RenamePipeline {
    reader: Arc<dyn PdfTextReader>,
    config: PipelineConfig,
}

impl RenamePipeline {
    pub fn new(reader: Arc<dyn PdfTextReader>, config: PipelineConfig) -> Self {
        Self { reader, config }
    }

    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one created file to a terminal outcome
    ///
    /// Never returns `Pending` and never panics on file content; all
    /// per-file failures end up in the returned outcome and the log.
    pub async fn handle(&self, path: &Path, kind: InstrumentKind) -> RenameOutcome {
        let mut job = RenameJob::new(path, kind);

        if !is_relevant(&job.source, kind) {
            debug!(job_id = %job.id, path = %job.source.display(), %kind, "skipping file without report suffix");
            return job.finish(RenameOutcome::Skipped(SkipReason::Irrelevant));
        }

        // The create event fires when the file is opened, not when it is complete.
        tokio::time::sleep(self.config.settle_delay()).await;

        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        while job.attempts < max_attempts {
            job.attempts += 1;

            match self.attempt(&job).await {
                Ok(outcome) => return job.finish(outcome),
                Err(e) => {
                    warn!(
                        job_id = %job.id,
                        path = %job.source.display(),
                        attempt = job.attempts,
                        max_attempts,
                        error = %e,
                        "rename attempt failed"
                    );
                    last_error = e.to_string();

                    if job.attempts < max_attempts {
                        tokio::time::sleep(self.config.retry_backoff()).await;
                    }
                }
            }
        }

        error!(
            job_id = %job.id,
            path = %job.source.display(),
            attempts = job.attempts,
            error = %last_error,
            "giving up on report, file left under its original name"
        );

        let attempts = job.attempts;
        job.finish(RenameOutcome::Failed {
            attempts,
            last_error,
        })
    }

    async fn attempt(&self, job: &RenameJob) -> Result<RenameOutcome, AttemptError> {
        let lines = self.reader.read_first_page_lines(&job.source).await?;
        let name = name_extractor::derive(&lines, job.kind)?;
        let destination = destination_for(&job.source, &name);

        debug!(job_id = %job.id, name = %name, destination = %destination.display(), "derived report name");

        // An unknown existence state is treated as a collision: never risk a clobber.
        let exists = tokio::fs::try_exists(&destination).await.unwrap_or(true);
        if exists {
            info!(
                job_id = %job.id,
                path = %job.source.display(),
                destination = %destination.display(),
                "destination already exists, leaving report untouched"
            );
            return Ok(RenameOutcome::Skipped(SkipReason::Collision {
                existing: destination,
            }));
        }

        tokio::fs::rename(&job.source, &destination)
            .await
            .map_err(|source| AttemptError::Rename {
                from: job.source.clone(),
                to: destination.clone(),
                source,
            })?;

        info!(
            job_id = %job.id,
            path = %job.source.display(),
            destination = %destination.display(),
            attempt = job.attempts,
            "report renamed"
        );

        Ok(RenameOutcome::Renamed { destination })
    }

    /// Derive the name a report would get, without waiting or renaming
    pub async fn preview(
        &self,
        path: &Path,
        kind: InstrumentKind,
    ) -> Result<(ExtractedName, PathBuf), AttemptError> {
        let lines = self.reader.read_first_page_lines(path).await?;
        let name = name_extractor::derive(&lines, kind)?;
        let destination = destination_for(path, &name);
        Ok((name, destination))
    }
}
