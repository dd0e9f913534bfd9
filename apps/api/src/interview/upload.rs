//! Résumé upload: multipart field intake, validation and text extraction.

use std::sync::Arc;

use anyhow::anyhow;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use bytes::Bytes;
use tracing::warn;

use crate::errors::AppError;
use crate::pdf::{ExtractedPdf, PdfExtractor};

pub const RESUME_FIELD: &str = "resume";
pub const PREVIEW_CHARS: usize = 600;
const PDF_MIME: &str = "application/pdf";

#[derive(Debug)]
pub struct ResumeUpload {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// Reads the `resume` field, skipping any others.
pub async fn read_resume_field(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<Option<ResumeUpload>, AppError> {
    let to_app_error = |e: MultipartError| multipart_error(e, max_bytes);
    while let Some(field) = multipart.next_field().await.map_err(to_app_error)? {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(to_app_error)?;
        return Ok(Some(ResumeUpload {
            bytes,
            content_type,
        }));
    }
    Ok(None)
}

fn multipart_error(e: MultipartError, max_bytes: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_bytes)
    } else {
        AppError::Validation(format!("Invalid upload: {}", e.body_text()))
    }
}

/// Checks mime type and size. Mime parameters are ignored.
pub fn validate_upload(upload: &ResumeUpload, max_bytes: usize) -> Result<(), AppError> {
    let is_pdf = upload
        .content_type
        .as_deref()
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME));
    if !is_pdf {
        return Err(AppError::Validation("PDF required".to_string()));
    }
    if upload.bytes.len() > max_bytes {
        return Err(too_large(max_bytes));
    }
    Ok(())
}

fn too_large(max_bytes: usize) -> AppError {
    AppError::Validation(format!(
        "File too large (max {}MB)",
        max_bytes / (1024 * 1024)
    ))
}

/// Runs the extractor on the blocking pool and rejects PDFs without text.
pub async fn extract_resume(
    pdf: Arc<dyn PdfExtractor>,
    bytes: Bytes,
) -> Result<ExtractedPdf, AppError> {
    let extracted = tokio::task::spawn_blocking(move || pdf.extract(&bytes))
        .await
        .map_err(|e| AppError::Internal(anyhow!("Resume parsing failed: {e}")))?;

    let extracted = match extracted {
        Ok(extracted) => extracted,
        Err(e) => {
            warn!("{e}");
            return Err(AppError::Validation(
                "Could not extract text from PDF".to_string(),
            ));
        }
    };

    let text = extracted.text.trim();
    if text.is_empty() {
        return Err(AppError::Validation(
            "Could not extract text from PDF".to_string(),
        ));
    }

    Ok(ExtractedPdf {
        text: text.to_string(),
        pages: extracted.pages,
    })
}
