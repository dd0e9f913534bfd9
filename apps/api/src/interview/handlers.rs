//! Axum route handlers for the interview API.

use std::future::Future;

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::questions::generate_question;
use crate::interview::review::review_answer;
use crate::interview::upload::{
    extract_resume, read_resume_field, validate_upload, PREVIEW_CHARS, RESUME_FIELD,
};
use crate::interview::excerpt;
use crate::session::{ReviewRecord, SessionUpdate};
use crate::state::AppState;

const MAX_JOB_FIELD_CHARS: usize = 120;
const MIN_QUESTION_CHARS: usize = 10;
const MAX_ANSWER_CHARS: usize = 5000;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResumeResponse {
    pub session_id: Uuid,
    pub resume_preview: String,
    pub pages: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuestionsRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateQuestionsResponse {
    pub question: String,
    pub questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub score: u8,
    pub feedback: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Input validation
// ────────────────────────────────────────────────────────────────────────────

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

fn parse_session_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation("sessionId must be a valid UUID".to_string()))
}

fn job_field(name: &str, raw: &str) -> Result<String, AppError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{name} is required")));
    }
    if value.chars().count() > MAX_JOB_FIELD_CHARS {
        return Err(AppError::Validation(format!(
            "{name} must be at most {MAX_JOB_FIELD_CHARS} characters"
        )));
    }
    Ok(value.to_string())
}

fn answer_fields(request: &AnswerRequest) -> Result<(String, String), AppError> {
    let question = request.question.trim();
    if question.chars().count() < MIN_QUESTION_CHARS {
        return Err(AppError::Validation(format!(
            "question must be at least {MIN_QUESTION_CHARS} characters"
        )));
    }
    let answer = request.answer.trim();
    if answer.is_empty() {
        return Err(AppError::Validation("answer is required".to_string()));
    }
    if answer.chars().count() > MAX_ANSWER_CHARS {
        return Err(AppError::Validation(format!(
            "answer must be at most {MAX_ANSWER_CHARS} characters"
        )));
    }
    Ok((question.to_string(), answer.to_string()))
}

/// Bounds model work by the configured request timeout.
async fn within_timeout<T>(
    state: &AppState,
    action: &str,
    work: impl Future<Output = Result<T, AppError>>,
) -> Result<T, AppError> {
    tokio::time::timeout(state.config.llm_timeout, work)
        .await
        .map_err(|_| {
            AppError::Llm(format!(
                "{action}: model did not respond within {}s",
                state.config.llm_timeout.as_secs()
            ))
        })?
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/upload-resume
///
/// Multipart upload of a PDF résumé in field `resume`. Creates the session.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResumeResponse>, AppError> {
    state.llm()?;

    let mut multipart = multipart
        .map_err(|_| AppError::Validation(format!("Missing file field: {RESUME_FIELD}")))?;
    let upload = read_resume_field(&mut multipart, state.config.max_upload_bytes)
        .await?
        .ok_or_else(|| AppError::Validation(format!("Missing file field: {RESUME_FIELD}")))?;
    validate_upload(&upload, state.config.max_upload_bytes)?;

    let extracted = extract_resume(state.pdf.clone(), upload.bytes).await?;
    let resume_preview = excerpt(&extracted.text, PREVIEW_CHARS);
    let session = state.sessions.create(extracted.text).await?;

    info!(
        session_id = %session.id,
        pages = ?extracted.pages,
        "Resume uploaded"
    );

    Ok(Json(UploadResumeResponse {
        session_id: session.id,
        resume_preview,
        pages: extracted.pages,
    }))
}

/// POST /api/generate-questions
///
/// Records company/role on the session and generates one tailored behavioral question.
pub async fn handle_generate_questions(
    State(state): State<AppState>,
    payload: Result<Json<GenerateQuestionsRequest>, JsonRejection>,
) -> Result<Json<GenerateQuestionsResponse>, AppError> {
    let llm = state.llm()?;

    let request = json_body(payload)?;
    let session_id = parse_session_id(&request.session_id)?;
    let company = job_field("company", &request.company)?;
    let role = job_field("role", &request.role)?;

    let session = state
        .sessions
        .update(
            session_id,
            SessionUpdate {
                company: Some(company.clone()),
                role: Some(role.clone()),
                ..Default::default()
            },
        )
        .await?;

    let cancel = state.shutdown.child_token();
    let question = within_timeout(
        &state,
        "Failed to generate questions",
        generate_question(llm, &session.resume_text, &company, &role, &cancel),
    )
    .await?;

    let session = state
        .sessions
        .update(
            session_id,
            SessionUpdate {
                questions: Some(vec![question.clone()]),
                ..Default::default()
            },
        )
        .await?;
    debug!(session_id = %session_id, stage = ?session.stage(), "Question generated");

    Ok(Json(GenerateQuestionsResponse {
        questions: vec![question.clone()],
        question,
    }))
}

/// POST /api/answer
///
/// Scores a written answer. The question text comes from the client, not the session.
pub async fn handle_answer(
    State(state): State<AppState>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, AppError> {
    let llm = state.llm()?;

    let request = json_body(payload)?;
    let session_id = parse_session_id(&request.session_id)?;
    let (question, answer) = answer_fields(&request)?;

    let session = state
        .sessions
        .get(session_id)
        .await?
        .ok_or(AppError::InvalidSession)?;

    let cancel = state.shutdown.child_token();
    let review = within_timeout(
        &state,
        "Failed to analyze answer",
        review_answer(llm, &session, &question, &answer, &cancel),
    )
    .await?;

    let session = state
        .sessions
        .update(
            session_id,
            SessionUpdate {
                review: Some(ReviewRecord {
                    question,
                    score: review.score,
                    feedback: review.feedback.clone(),
                    reviewed_at: Utc::now(),
                }),
                ..Default::default()
            },
        )
        .await?;
    debug!(
        session_id = %session_id,
        stage = ?session.stage(),
        score = review.score,
        "Answer reviewed"
    );

    Ok(Json(AnswerResponse {
        score: review.score,
        feedback: review.feedback,
    }))
}
