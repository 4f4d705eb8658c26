//! PDF text adapter using the pdf-extract crate
//!
//! Handles digital reports with an embedded text layer, which is what both
//! ChemStation and PeakSimple print.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::domain::error::ReadError;
use crate::domain::ports::PdfTextReader;

/// Reads the first page of a PDF on the blocking pool
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractReader;

impl PdfExtractReader {
    pub const fn new() -> Self {
        Self
    }

    fn read_blocking(path: &Path) -> Result<Vec<String>, ReadError> {
        let bytes = std::fs::read(path).map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        first_page_lines(path, &bytes)
    }
}

/// Split the first page of an in-memory PDF into lines
pub fn first_page_lines(path: &Path, pdf_bytes: &[u8]) -> Result<Vec<String>, ReadError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes).map_err(|e| {
        ReadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    let first = pages
        .into_iter()
        .next()
        .ok_or_else(|| ReadError::NoPages(path.to_path_buf()))?;

    Ok(first.lines().map(str::to_string).collect())
}

#[async_trait]
impl PdfTextReader for PdfExtractReader {
    async fn read_first_page_lines(&self, path: &Path) -> Result<Vec<String>, ReadError> {
        let path: PathBuf = path.to_path_buf();

        tokio::task::spawn_blocking(move || Self::read_blocking(&path))
            .await
            .map_err(|e| ReadError::Worker(e.to_string()))?
    }
}
