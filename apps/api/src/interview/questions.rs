//! Behavioral question generation on the fast model tier.
//!
//! Validation happens while decoding, so a placeholder or malformed question counts as a
//! shape error and gets the LLM client's one fixer attempt.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::errors::AppError;
use crate::interview::excerpt;
use crate::interview::prompts::{question_prompt, QUESTION_SCHEMA};
use crate::llm_client::models::ModelTier;
use crate::llm_client::{GenerateRequest, LlmClient};

pub const RESUME_EXCERPT_CHARS: usize = 2000;
const MIN_QUESTION_CHARS: usize = 10;
const TEMPERATURE: f32 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 500;

/// Template filler a model sometimes echoes back instead of a real question.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(q\d*|question\s*\d*|<.*>|\.{3}|…|string|text|tbd|todo|n/?a)$")
        .expect("placeholder pattern")
});

/// Either `{"question": "..."}` or `{"questions": ["..."]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawQuestionPayload {
    Single { question: String },
    List { questions: Vec<String> },
}

/// Exactly one usable, trimmed question.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawQuestionPayload")]
pub struct GeneratedQuestion(pub String);

impl TryFrom<RawQuestionPayload> for GeneratedQuestion {
    type Error = String;

    fn try_from(raw: RawQuestionPayload) -> Result<Self, Self::Error> {
        let question = match raw {
            RawQuestionPayload::Single { question } => question,
            RawQuestionPayload::List { mut questions } => {
                if questions.len() != 1 {
                    return Err(format!(
                        "expected exactly 1 question, got {}",
                        questions.len()
                    ));
                }
                questions.remove(0)
            }
        };

        let question = question.trim().to_string();
        if is_placeholder(&question) {
            return Err(format!("placeholder instead of a question: {question:?}"));
        }
        if question.chars().count() < MIN_QUESTION_CHARS {
            return Err(format!(
                "question shorter than {MIN_QUESTION_CHARS} characters"
            ));
        }
        Ok(GeneratedQuestion(question))
    }
}

pub fn is_placeholder(question: &str) -> bool {
    PLACEHOLDER.is_match(question.trim())
}

pub async fn generate_question(
    llm: &LlmClient,
    resume_text: &str,
    company: &str,
    role: &str,
    cancel: &CancellationToken,
) -> Result<String, AppError> {
    let prompt = question_prompt(company, role, &excerpt(resume_text, RESUME_EXCERPT_CHARS));
    let request = GenerateRequest::new(prompt)
        .temperature(TEMPERATURE)
        .max_output_tokens(MAX_OUTPUT_TOKENS);

    let GeneratedQuestion(question) = llm
        .call_json(ModelTier::Fast, &request, QUESTION_SCHEMA, cancel)
        .await
        .map_err(|e| AppError::from_llm("Failed to generate questions", e))?;

    Ok(question)
}
