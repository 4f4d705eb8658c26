//! One-shot rename: `autorename rename <FILE> --kind <kind>`

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::build_pipeline;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, InstrumentKind, PipelineConfig, RenameOutcome, SkipReason};
use crate::services::is_relevant;

#[derive(Debug, Serialize)]
pub struct RenamePreviewOutput {
    pub source: PathBuf,
    pub name: String,
    pub destination: PathBuf,
    pub destination_exists: bool,
}

impl CommandOutput for RenamePreviewOutput {
    fn to_human(&self) -> String {
        let mut text = format!("{} -> {}", self.source.display(), self.destination.display());
        if self.destination_exists {
            text.push_str("\n(destination exists; a real run would leave the file untouched)");
        }
        text
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct RenameOutput {
    pub source: PathBuf,
    pub outcome: RenameOutcome,
}

impl CommandOutput for RenameOutput {
    fn to_human(&self) -> String {
        let source = self.source.display();
        match &self.outcome {
            RenameOutcome::Renamed { destination } => {
                format!("Renamed {source} -> {}", destination.display())
            }
            RenameOutcome::Skipped(SkipReason::Irrelevant) => {
                format!("Skipped {source}: not a report of this kind")
            }
            RenameOutcome::Skipped(SkipReason::Collision { existing }) => {
                format!("Skipped {source}: {} already exists", existing.display())
            }
            RenameOutcome::Failed { attempts, last_error } => {
                format!("Failed {source} after {attempts} attempt(s): {last_error}")
            }
            RenameOutcome::Pending => format!("{source}: pending"),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(
    file: &Path,
    kind: InstrumentKind,
    dry_run: bool,
    config: &Config,
    json_mode: bool,
) -> Result<()> {
    if !file.is_file() {
        anyhow::bail!("Report not found: {}", file.display());
    }
    if !is_relevant(file, kind) {
        anyhow::bail!(
            "{} is not a {kind} report (expected a name ending in {})",
            file.display(),
            kind.report_suffix()
        );
    }

    // The file already exists in full, so there is nothing to settle.
    let pipeline = build_pipeline(PipelineConfig {
        settle_delay_ms: 0,
        ..config.pipeline.clone()
    });

    if dry_run {
        let (name, destination) = pipeline
            .preview(file, kind)
            .await
            .with_context(|| format!("Failed to derive a name for {}", file.display()))?;
        let destination_exists = tokio::fs::try_exists(&destination).await.unwrap_or(true);

        output(
            &RenamePreviewOutput {
                source: file.to_path_buf(),
                name: name.into_inner(),
                destination,
                destination_exists,
            },
            json_mode,
        );
        return Ok(());
    }

    let outcome = pipeline.handle(file, kind).await;
    let failed = matches!(outcome, RenameOutcome::Failed { .. });

    output(
        &RenameOutput {
            source: file.to_path_buf(),
            outcome,
        },
        json_mode,
    );

    if failed {
        anyhow::bail!("Rename of {} failed", file.display());
    }
    Ok(())
}
