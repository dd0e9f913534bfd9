//! PDF text extraction. Layout is discarded; only the text stream and page count matter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF extraction failed: {0}")]
    Extraction(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPdf {
    pub text: String,
    pub pages: Option<usize>,
}

/// Blocking extractor; callers run it on the blocking pool.
pub trait PdfExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedPdf, PdfError>;
}

/// `pdf-extract` backed implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractText;

impl PdfExtractor for PdfExtractText {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedPdf, PdfError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| PdfError::Extraction(e.to_string()))?;

        Ok(ExtractedPdf {
            text: pages.join("\n"),
            pages: Some(pages.len()),
        })
    }
}
