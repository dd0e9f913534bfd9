pub mod debug;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(health::root_handler))
        .route("/api/health", get(health::health_handler))
        .route("/api/_debug/models", get(debug::models_handler))
        .route(
            "/api/upload-resume",
            post(handlers::handle_upload_resume).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/generate-questions",
            post(handlers::handle_generate_questions),
        )
        .route("/api/answer", post(handlers::handle_answer))
        .with_state(state)
}
