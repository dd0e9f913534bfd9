use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "MockMate Backend server is running!" }))
}

/// GET /api/health
/// Liveness only; does not touch Gemini or the session store.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }))
}
