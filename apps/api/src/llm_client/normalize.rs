//! Best-effort repair of model output into JSON.
//!
//! Models wrap JSON in markdown fences or surround it with prose despite being told not to.
//! Callers go through [`JsonRepair`] so another extraction strategy can replace the default
//! without touching them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

static LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^```(?:json)?\s*").expect("leading fence pattern"));
static TRAILING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*```$").expect("trailing fence pattern"));
static JSON_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\{[\s\S]*\}|\[[\s\S]*\])").expect("json span pattern"));

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("model returned no JSON content")]
    Empty,

    #[error("invalid JSON: {0}")]
    Syntax(serde_json::Error),

    #[error("unexpected JSON shape: {0}")]
    Shape(serde_json::Error),
}

pub trait JsonRepair: Send + Sync {
    fn normalize(&self, text: &str) -> Result<Value, ParseError>;
}

/// Default strategy: strip fences, cut down to the outermost brace/bracket span, parse strictly.
#[derive(Debug, Default, Clone, Copy)]
pub struct FenceStripper;

impl JsonRepair for FenceStripper {
    fn normalize(&self, text: &str) -> Result<Value, ParseError> {
        normalize_to_json(text)
    }
}

/// Reduces `text` to its most likely JSON substring.
///
/// Returns the fence-stripped text unchanged when no `{...}` or `[...]` span exists.
pub fn clean_json_response(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let unfenced = LEADING_FENCE.replace(trimmed, "");
    let unfenced = TRAILING_FENCE.replace(&unfenced, "");
    let unfenced = unfenced.trim();

    match JSON_SPAN.find(unfenced) {
        Some(span) => span.as_str().trim().to_string(),
        None => unfenced.to_string(),
    }
}

pub fn normalize_to_json(text: &str) -> Result<Value, ParseError> {
    let cleaned = clean_json_response(text);
    if cleaned.is_empty() {
        return Err(ParseError::Empty);
    }
    serde_json::from_str(&cleaned).map_err(ParseError::Syntax)
}

/// Runs `repair` and decodes the result into `T`.
pub fn decode<T: DeserializeOwned>(repair: &dyn JsonRepair, text: &str) -> Result<T, ParseError> {
    let value = repair.normalize(text)?;
    serde_json::from_value(value).map_err(ParseError::Shape)
}
