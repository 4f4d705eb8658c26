use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Report software an instrument writes its PDFs with.
///
/// The set is closed: each kind fixes both the file name that marks a
/// report as relevant and the rule that turns the "Data File" line into
/// the sample name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    /// Agilent ChemStation `PrintText.pdf` reports
    #[serde(alias = "cs")]
    ChemStation,
    /// SRI PeakSimple `PeakSimple.pdf` reports
    #[serde(alias = "ps")]
    PeakSimple,
}

impl InstrumentKind {
    /// Suffix a created file name must carry to be processed
    pub const fn report_suffix(self) -> &'static str {
        match self {
            Self::ChemStation => "PrintText.pdf",
            Self::PeakSimple => "PeakSimple.pdf",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChemStation => "chemstation",
            Self::PeakSimple => "peaksimple",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstrumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chemstation" | "cs" => Ok(Self::ChemStation),
            "peaksimple" | "ps" => Ok(Self::PeakSimple),
            other => Err(format!(
                "unknown instrument kind '{other}' (expected chemstation|cs or peaksimple|ps)"
            )),
        }
    }
}

/// Registered instrument: an operator-assigned name bound to one watched directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    pub kind: InstrumentKind,
    pub path: PathBuf,
}

impl Instrument {
    pub fn new(name: impl Into<String>, kind: InstrumentKind, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind,
            path: path.into(),
        }
    }
}

/// Externally visible run state of an instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Stopped,
    Running,
}

impl RunState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
