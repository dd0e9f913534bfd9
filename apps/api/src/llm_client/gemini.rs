//! Gemini `generateContent` over plain REST.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerateRequest, LanguageModel, LlmError};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate's parts.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiBackend {
    async fn generate(&self, model_id: &str, request: &GenerateRequest) -> Result<String, LlmError> {
        let generation_config =
            if request.temperature.is_some() || request.max_output_tokens.is_some() {
                Some(GenerationConfig {
                    temperature: request.temperature,
                    max_output_tokens: request.max_output_tokens,
                })
            } else {
                None
            };
        let body = GeminiRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config,
        };

        let response = self
            .client
            .post(format!("{GEMINI_API_BASE}/models/{model_id}:generateContent"))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GeminiResponse = response.json().await?;
        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                model = model_id,
                "Gemini call succeeded: prompt_tokens={}, output_tokens={}",
                usage.prompt_token_count,
                usage.candidates_token_count
            );
        }

        parsed.text().ok_or(LlmError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case_config() {
        let body = GeminiRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: "ping" }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.5),
                max_output_tokens: Some(500),
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "ping");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 500);
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn test_request_omits_empty_config() {
        let body = GeminiRequest {
            contents: vec![],
            generation_config: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let json = r#"{
            "candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}], "role": "model"}}],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2}
        }"#;
        let parsed: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("{\"a\":1}"));
        assert_eq!(parsed.usage_metadata.unwrap().candidates_token_count, 2);
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let parsed: GeminiResponse = serde_json::from_str(r#"{"promptFeedback": {}}"#).unwrap();
        assert!(parsed.text().is_none());

        let blank: GeminiResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}}]}"#)
                .unwrap();
        assert!(blank.text().is_none());
    }

    #[test]
    fn test_error_body_message_extraction() {
        let body = r#"{"error": {"code": 429, "message": "Please retry in 3s", "status": "RESOURCE_EXHAUSTED"}}"#;
        let parsed: GeminiError = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "Please retry in 3s");
    }
}
