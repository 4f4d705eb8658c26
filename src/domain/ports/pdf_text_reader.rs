use async_trait::async_trait;
use std::path::Path;

use crate::domain::error::ReadError;

/// Port trait for reading the text of a report's first page
///
/// Implementations split the page text into lines in reading order. Any
/// failure is treated by the pipeline like a missing "Data File" line: the
/// attempt is logged and retried.
#[async_trait]
pub trait PdfTextReader: Send + Sync {
    /// Read the first page of `path` as text lines
    ///
    /// # Errors
    /// - `ReadError::Io` - file missing, locked or unreadable
    /// - `ReadError::Parse` - not a valid PDF (often a half-written one)
    /// - `ReadError::NoPages` - document has no pages
    async fn read_first_page_lines(&self, path: &Path) -> Result<Vec<String>, ReadError>;
}
