//! Sample name extraction from report text
//!
//! Both report kinds print a line such as `Data File: P0QC2418.D` near the
//! top of the first page. ChemStation names keep the value verbatim behind
//! a `PrintText` prefix; PeakSimple names reduce the value to its sample
//! number.

use std::fmt;
use std::path::{Component, Path};

use crate::domain::error::ExtractionError;
use crate::domain::models::InstrumentKind;

const DATA_FILE_PREFIX: &str = "data file";
const CHEMSTATION_NAME_PREFIX: &str = "PrintText";

/// Canonical sample name, without the `.pdf` extension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtractedName(String);

impl ExtractedName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name the report is renamed to
    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.0)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ExtractedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the canonical name from first-page lines
///
/// Only the first line starting with "data file" (after trimming, any case)
/// is considered. Every failure is returned as data; none of them panic.
pub fn derive<S: AsRef<str>>(
    lines: &[S],
    kind: InstrumentKind,
) -> Result<ExtractedName, ExtractionError> {
    let line = find_data_file_line(lines).ok_or(ExtractionError::NotFound)?;

    let (_, value) = line
        .split_once(':')
        .ok_or_else(|| ExtractionError::MissingColon(line.to_string()))?;
    let value = value.trim();

    let name = match kind {
        InstrumentKind::ChemStation => format!("{CHEMSTATION_NAME_PREFIX}{value}"),
        InstrumentKind::PeakSimple => peaksimple_sample_number(value),
    };

    if name.is_empty() {
        return Err(ExtractionError::EmptyName(line.to_string()));
    }
    if !is_plain_file_name(&name) {
        return Err(ExtractionError::InvalidName(name));
    }

    Ok(ExtractedName(name))
}

// Exactly one normal component, with no separator or drive marker of any
// platform, so the report stays in its own directory.
fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\', ':', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn find_data_file_line<S: AsRef<str>>(lines: &[S]) -> Option<&str> {
    lines.iter().map(|l| l.as_ref().trim()).find(|line| {
        line.get(..DATA_FILE_PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(DATA_FILE_PREFIX))
    })
}

// `GCTCD182089.CHR (path)` -> `182089`, `name_12345.chr` -> `12345`
fn peaksimple_sample_number(value: &str) -> String {
    let token = value.split_once('.').map_or(value, |(stem, _)| stem);

    match token.split_once('_') {
        Some((_, number)) => number.to_string(),
        None => token.chars().filter(char::is_ascii_digit).collect(),
    }
}
