//! Scoring a written answer on the default model tier.

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::errors::AppError;
use crate::interview::excerpt;
use crate::interview::prompts::{review_prompt, ReviewPromptInput, REVIEW_SCHEMA};
use crate::llm_client::models::ModelTier;
use crate::llm_client::{GenerateRequest, LlmClient};
use crate::session::Session;

const RESUME_EXCERPT_CHARS: usize = 2000;
const MAX_FEEDBACK_ITEMS: usize = 5;

#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
    pub score: f64,
    #[serde(default)]
    pub feedback: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub score: u8,
    pub feedback: Vec<String>,
}

/// Rounds to an integer and clamps into 0..=100.
pub fn clamp_score(raw: f64) -> Result<u8, AppError> {
    if !raw.is_finite() {
        return Err(AppError::MalformedOutput(
            "Model returned a non-numeric score".to_string(),
        ));
    }
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}

/// Fixed feedback used when the model scores an answer without commenting on it.
pub fn bracket_feedback(score: u8) -> Vec<String> {
    let items: &[&str] = match score {
        85..=100 => &[
            "Strong answer with a clear situation, action and result.",
            "Keep quantifying impact the way you did here.",
            "Trim any background that does not support the result.",
        ],
        70..=84 => &[
            "Solid structure; make the result more concrete with numbers.",
            "Spend less time on the situation and more on your own actions.",
            "Close by tying the outcome back to the role.",
        ],
        50..=69 => &[
            "Use the STAR structure explicitly: situation, task, action, result.",
            "Say what you did personally rather than what the team did.",
            "Add a measurable outcome.",
        ],
        _ => &[
            "Answer the question with one specific example from your experience.",
            "Walk through situation, task, action and result in order.",
            "End with the result and what you learned.",
        ],
    };
    items.iter().map(|s| s.to_string()).collect()
}

pub fn finalize_review(payload: ReviewPayload) -> Result<Review, AppError> {
    let score = clamp_score(payload.score)?;
    let feedback: Vec<String> = payload
        .feedback
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .take(MAX_FEEDBACK_ITEMS)
        .collect();

    let feedback = if feedback.is_empty() {
        bracket_feedback(score)
    } else {
        feedback
    };

    Ok(Review { score, feedback })
}

pub async fn review_answer(
    llm: &LlmClient,
    session: &Session,
    question: &str,
    answer: &str,
    cancel: &CancellationToken,
) -> Result<Review, AppError> {
    let resume_excerpt = excerpt(&session.resume_text, RESUME_EXCERPT_CHARS);
    let prompt = review_prompt(&ReviewPromptInput {
        question,
        answer,
        company: session.company.as_deref(),
        role: session.role.as_deref(),
        resume_excerpt: &resume_excerpt,
    });

    let payload: ReviewPayload = llm
        .call_json(
            ModelTier::Default,
            &GenerateRequest::new(prompt),
            REVIEW_SCHEMA,
            cancel,
        )
        .await
        .map_err(|e| AppError::from_llm("Failed to analyze answer", e))?;

    finalize_review(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_are_clamped_and_rounded() {
        assert_eq!(clamp_score(104.7).unwrap(), 100);
        assert_eq!(clamp_score(-3.0).unwrap(), 0);
        assert_eq!(clamp_score(72.5).unwrap(), 73);
        assert_eq!(clamp_score(72.4).unwrap(), 72);
        assert_eq!(clamp_score(0.0).unwrap(), 0);
    }

    #[test]
    fn test_non_finite_score_is_rejected() {
        assert!(clamp_score(f64::NAN).is_err());
        assert!(clamp_score(f64::INFINITY).is_err());
    }

    #[test]
    fn test_model_feedback_is_cleaned_and_capped() {
        let review = finalize_review(ReviewPayload {
            score: 88.0,
            feedback: vec![
                " Lead with the result. ".to_string(),
                "".to_string(),
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
                "e".to_string(),
            ],
        })
        .unwrap();

        assert_eq!(review.score, 88);
        assert_eq!(review.feedback.len(), 5);
        assert_eq!(review.feedback[0], "Lead with the result.");
    }

    #[test]
    fn test_missing_feedback_falls_back_to_score_bracket() {
        let payload: ReviewPayload = serde_json::from_str(r#"{"score": 55}"#).unwrap();
        let review = finalize_review(payload).unwrap();
        assert_eq!(review.feedback, bracket_feedback(55));
        assert_ne!(bracket_feedback(55), bracket_feedback(90));
    }

    #[test]
    fn test_every_bracket_has_feedback() {
        for score in [0, 49, 50, 69, 70, 84, 85, 100] {
            assert!(!bracket_feedback(score).is_empty());
        }
    }

    #[test]
    fn test_string_score_does_not_decode() {
        assert!(serde_json::from_str::<ReviewPayload>(r#"{"score": "high"}"#).is_err());
    }
}
