pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::chat::handlers as chat;
use crate::matching::handlers as matching;
use crate::speech::handlers as speech;
use crate::state::AppState;
use crate::tracker::handlers as tracker;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Conversation
        .route("/api/v1/chat", post(chat::handle_chat))
        .route(
            "/api/v1/profile/extract",
            post(matching::handle_extract_profile),
        )
        // Matching
        .route("/api/v1/matches/score", post(matching::handle_score_match))
        .route(
            "/api/v1/opportunities",
            get(matching::handle_search_opportunities),
        )
        .route(
            "/api/v1/opportunities/rank",
            post(matching::handle_rank_opportunities),
        )
        .route(
            "/api/v1/opportunities/:id",
            get(matching::handle_get_opportunity),
        )
        // Tracker
        .route("/api/v1/tracker", get(tracker::handle_list_tracker))
        .route(
            "/api/v1/tracker/export",
            get(tracker::handle_export_csv),
        )
        .route(
            "/api/v1/tracker/:match_id/status",
            patch(tracker::handle_update_status),
        )
        // Speech
        .route("/api/v1/speech", post(speech::handle_text_to_speech))
        .with_state(state)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
