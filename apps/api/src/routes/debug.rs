use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::llm_client::models::ModelTier;
use crate::llm_client::resolver::ProbeOutcome;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ModelProbeResponse {
    pub probes: Vec<ProbeOutcome>,
}

/// GET /api/_debug/models
///
/// Probes every default-tier candidate once and reports which ones answer.
pub async fn models_handler(
    State(state): State<AppState>,
) -> Result<Json<ModelProbeResponse>, AppError> {
    let llm = state
        .llm
        .as_ref()
        .ok_or_else(|| AppError::Validation("Gemini not configured".to_string()))?;

    let probes = llm.probe_candidates(ModelTier::Default).await;
    Ok(Json(ModelProbeResponse { probes }))
}
