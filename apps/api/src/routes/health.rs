use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status and which optional integrations are configured.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "oput-api",
        "integrations": {
            "llm": state.llm.is_configured(),
            "speech": state.speech.is_configured(),
            "database": state.config.database_url.is_some()
        }
    }))
}
