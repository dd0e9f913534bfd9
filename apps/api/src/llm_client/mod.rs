/// LLM Client: the single point of entry for all Gemini calls in MockMate.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// Handlers pick a [`ModelTier`]; this module resolves the concrete model id,
/// retries rate-limited calls and repairs JSON output.
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub mod gemini;
pub mod models;
pub mod normalize;
pub mod prompts;
pub mod resolver;
pub mod retry;

use models::{ModelCandidates, ModelTier};
use normalize::{FenceStripper, JsonRepair, ParseError};
use resolver::{ModelResolver, ProbeOutcome};
use retry::{retry_with_backoff, RetryPolicy};

const FIXER_TEMPERATURE: f32 = 0.1;
const LOG_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Gemini returned empty content")]
    EmptyContent,

    #[error("No working Gemini model found for this API key/region.")]
    NoWorkingModel,

    #[error("Request cancelled")]
    Cancelled,
}

impl LlmError {
    /// Upstream HTTP status, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            LlmError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// One text-in, text-out model call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// A hosted model backend. Returns the response text, or `EmptyContent` when there is none.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, model_id: &str, request: &GenerateRequest) -> Result<String, LlmError>;
}

#[derive(Clone)]
pub struct LlmClient {
    model: Arc<dyn LanguageModel>,
    repair: Arc<dyn JsonRepair>,
    retry: RetryPolicy,
    fast: Arc<ModelResolver>,
    default: Arc<ModelResolver>,
}

impl LlmClient {
    pub fn new(model: Arc<dyn LanguageModel>, candidates: &ModelCandidates, retry: RetryPolicy) -> Self {
        Self {
            model,
            repair: Arc::new(FenceStripper),
            retry,
            fast: Arc::new(ModelResolver::new(
                ModelTier::Fast,
                candidates.for_tier(ModelTier::Fast).to_vec(),
            )),
            default: Arc::new(ModelResolver::new(
                ModelTier::Default,
                candidates.for_tier(ModelTier::Default).to_vec(),
            )),
        }
    }

    #[allow(dead_code)]
    pub fn with_repair(mut self, repair: Arc<dyn JsonRepair>) -> Self {
        self.repair = repair;
        self
    }

    fn resolver(&self, tier: ModelTier) -> &ModelResolver {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::Default => &self.default,
        }
    }

    /// Resolves (and caches) the model id for `tier`.
    pub async fn resolve_model(
        &self,
        tier: ModelTier,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        self.resolver(tier)
            .resolve(self.model.as_ref(), &self.retry, cancel)
            .await
    }

    /// Makes a raw call on the resolved model for `tier`, retrying on rate limits.
    pub async fn call(
        &self,
        tier: ModelTier,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        let model_id = self.resolve_model(tier, cancel).await?;
        let text = retry_with_backoff(&self.retry, cancel, || {
            self.model.generate(&model_id, request)
        })
        .await?;
        Ok(text.trim().to_string())
    }

    /// Calls the model and decodes its answer as `T`.
    ///
    /// If the answer is not valid JSON of the expected shape, the model is asked once to
    /// rewrite its own text as JSON matching `schema_hint`. A second failure is returned
    /// as [`LlmError::Parse`].
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        tier: ModelTier,
        request: &GenerateRequest,
        schema_hint: &str,
        cancel: &CancellationToken,
    ) -> Result<T, LlmError> {
        let text = self.call(tier, request, cancel).await?;
        debug!("Raw model response: {}", preview(&text));

        let error = match normalize::decode::<T>(self.repair.as_ref(), &text) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        warn!("Failed to parse model JSON, asking the model to fix it: {error}");

        let mut fixer = GenerateRequest::new(prompts::json_fixer_prompt(schema_hint, &text))
            .temperature(FIXER_TEMPERATURE);
        fixer.max_output_tokens = request.max_output_tokens;

        let fixed = self.call(tier, &fixer, cancel).await?;
        debug!("Fixer response: {}", preview(&fixed));

        normalize::decode::<T>(self.repair.as_ref(), &fixed).map_err(LlmError::Parse)
    }

    /// Diagnostic probe of every candidate for `tier`. Bypasses retry and the cache.
    pub async fn probe_candidates(&self, tier: ModelTier) -> Vec<ProbeOutcome> {
        resolver::probe_all(self.model.as_ref(), self.resolver(tier).candidates()).await
    }
}

fn preview(text: &str) -> String {
    text.chars().take(LOG_PREVIEW_CHARS).collect()
}
