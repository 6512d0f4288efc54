use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::detection::loader::list_prompt_files;
use crate::state::AppState;

/// GET /health
/// Reports the service version and how many detection prompts a run would
/// evaluate. An unreadable prompt directory makes the service `degraded` (503).
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let signature_verification = state.webhook_secret.is_some();

    match list_prompt_files(&state.moderator.settings().prompts_dir).await {
        Ok(files) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "service": env!("CARGO_PKG_NAME"),
                "prompts": files.len(),
                "signature_verification": signature_verification
            })),
        ),
        Err(e) => {
            warn!("Health check failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "version": env!("CARGO_PKG_VERSION"),
                    "service": env!("CARGO_PKG_NAME"),
                    "error": e.to_string()
                })),
            )
        }
    }
}
