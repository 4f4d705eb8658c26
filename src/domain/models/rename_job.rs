use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use super::instrument::InstrumentKind;

/// Why a job ended without renaming anything
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// File name does not carry the kind's report suffix
    Irrelevant,
    /// Destination already exists and is left untouched
    Collision { existing: PathBuf },
}

/// State of a rename job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenameOutcome {
    Pending,
    Renamed { destination: PathBuf },
    Skipped(SkipReason),
    Failed { attempts: u32, last_error: String },
}

impl RenameOutcome {
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Renamed { .. } => "renamed",
            Self::Skipped(_) => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// One created file moving through the rename pipeline
#[derive(Debug, Clone)]
pub struct RenameJob {
    pub id: Uuid,
    pub source: PathBuf,
    pub kind: InstrumentKind,
    pub attempts: u32,
    pub outcome: RenameOutcome,
}

impl RenameJob {
    pub fn new(source: impl Into<PathBuf>, kind: InstrumentKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            kind,
            attempts: 0,
            outcome: RenameOutcome::Pending,
        }
    }

    /// Record the terminal outcome and hand it back
    pub(crate) fn finish(mut self, outcome: RenameOutcome) -> RenameOutcome {
        debug_assert!(outcome.is_terminal());
        self.outcome = outcome;
        self.outcome
    }
}
