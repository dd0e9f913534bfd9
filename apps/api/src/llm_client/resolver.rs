//! Model resolution: probe candidate ids in order and remember the first one that answers.

use serde::Serialize;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::models::ModelTier;
use super::retry::{retry_with_backoff, RetryPolicy};
use super::{GenerateRequest, LanguageModel, LlmError};

const PROBE_PROMPT: &str = "ping";
const DEBUG_PROBE_PROMPT: &str = "model-check";
const DEBUG_SAMPLE_CHARS: usize = 40;

pub struct ModelResolver {
    tier: ModelTier,
    candidates: Vec<String>,
    resolved: OnceCell<String>,
}

impl ModelResolver {
    pub fn new(tier: ModelTier, candidates: Vec<String>) -> Self {
        Self {
            tier,
            candidates,
            resolved: OnceCell::new(),
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    #[cfg(test)]
    pub fn resolved(&self) -> Option<&str> {
        self.resolved.get().map(String::as_str)
    }

    /// Returns the cached model id, probing the candidates on first use.
    /// Concurrent first callers share one probe run; a failed run is not cached.
    pub async fn resolve(
        &self,
        model: &dyn LanguageModel,
        retry: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        self.resolved
            .get_or_try_init(|| self.probe_in_order(model, retry, cancel))
            .await
            .cloned()
    }

    async fn probe_in_order(
        &self,
        model: &dyn LanguageModel,
        retry: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        let probe = GenerateRequest::new(PROBE_PROMPT);

        for id in &self.candidates {
            let outcome = retry_with_backoff(retry, cancel, || model.generate(id, &probe)).await;
            match outcome {
                Ok(text) if !text.trim().is_empty() => {
                    info!(tier = self.tier.as_str(), "Using Gemini model: {id}");
                    return Ok(id.clone());
                }
                Ok(_) => warn!("Model probe for \"{id}\" returned empty text"),
                Err(LlmError::Cancelled) => return Err(LlmError::Cancelled),
                Err(e) => warn!("Model probe failed for \"{id}\": {e}"),
            }
        }

        Err(LlmError::NoWorkingModel)
    }
}

/// Result of a single diagnostic probe.
#[derive(Debug, Serialize)]
pub struct ProbeOutcome {
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Probes every candidate once, without retry or caching.
pub async fn probe_all(model: &dyn LanguageModel, candidates: &[String]) -> Vec<ProbeOutcome> {
    let request = GenerateRequest::new(DEBUG_PROBE_PROMPT);
    let mut outcomes = Vec::with_capacity(candidates.len());

    for id in candidates {
        let outcome = match model.generate(id, &request).await {
            Ok(text) => ProbeOutcome {
                id: id.clone(),
                ok: true,
                sample: Some(text.chars().take(DEBUG_SAMPLE_CHARS).collect()),
                status: None,
                message: None,
            },
            Err(e) => ProbeOutcome {
                id: id.clone(),
                ok: false,
                sample: None,
                status: e.status(),
                message: Some(e.to_string()),
            },
        };
        outcomes.push(outcome);
    }

    outcomes
}
