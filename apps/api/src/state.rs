use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::pdf::PdfExtractor;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// `None` when no API key is configured; AI endpoints then fail with 500.
    pub llm: Option<LlmClient>,
    pub sessions: Arc<dyn SessionStore>,
    pub pdf: Arc<dyn PdfExtractor>,
    pub config: Config,
    /// Cancelled on shutdown; handlers hand children of it to the LLM client.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn llm(&self) -> Result<&LlmClient, AppError> {
        self.llm.as_ref().ok_or(AppError::NotConfigured)
    }
}
