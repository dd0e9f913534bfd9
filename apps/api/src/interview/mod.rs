// Interview flow: résumé upload, question generation, answer review.
// All LLM calls go through llm_client; no direct Gemini calls here.

pub mod handlers;
pub mod prompts;
pub mod questions;
pub mod review;
pub mod upload;

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
