use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chat::context::{ConversationContext, ConversationStage};
use crate::errors::AppError;
use crate::matching::extractor::{extract_profile, requests_search};
use crate::matching::ranking::rank_opportunities;
use crate::models::matches::{OpportunityMatch, RankedOpportunity};
use crate::models::profile::{ConversationTurn, Role, UserProfile};
use crate::repository::SearchFilters;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ConversationTurn>,
    /// When present, the profile and any matches are remembered for this user.
    pub user_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub profile: UserProfile,
    pub stage: ConversationStage,
    /// Ranked matches when this turn triggered a search; empty otherwise.
    pub opportunities: Vec<RankedOpportunity>,
}

/// POST /api/v1/chat
///
/// Store and search failures never fail the turn: they are logged and the
/// conversation continues with what is available.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.messages.is_empty() {
        return Err(AppError::Validation("messages must not be empty".to_string()));
    }

    let tables = &state.ruleset.extraction;
    let mut profile = extract_profile(&req.messages, tables);
    if let Some(user_id) = req.user_id {
        merge_stored_profile(&state, user_id, &mut profile).await;
    }

    let last_user = req
        .messages
        .iter()
        .rev()
        .find(|t| t.role == Role::User)
        .map(|t| t.content.as_str())
        .unwrap_or_default();

    let ranked = if profile.is_search_ready() && requests_search(last_user, tables) {
        Some(search_and_rank(&state, &profile, req.user_id).await)
    } else {
        None
    };

    let context = ConversationContext::build(&req.messages, &profile, ranked.as_deref());
    let reply = state.llm.generate_reply(&req.messages, &context).await;

    Ok(Json(ChatResponse {
        reply,
        stage: context.current_stage,
        profile,
        opportunities: ranked.unwrap_or_default(),
    }))
}

/// Fills gaps from the stored profile, then stores the merged result.
async fn merge_stored_profile(state: &AppState, user_id: Uuid, profile: &mut UserProfile) {
    match state.store.get_profile(user_id).await {
        Ok(Some(stored)) => profile.fill_missing_from(&stored),
        Ok(None) => {}
        Err(e) => warn!("Could not load profile for {user_id}: {e}"),
    }
    if profile.is_empty() {
        return;
    }
    if let Err(e) = state.store.upsert_profile(user_id, profile).await {
        warn!("Could not store profile for {user_id}: {e}");
    }
}

async fn search_and_rank(
    state: &AppState,
    profile: &UserProfile,
    user_id: Option<Uuid>,
) -> Vec<RankedOpportunity> {
    let today = state.today();
    let candidates = match state
        .opportunities
        .search(&SearchFilters::for_profile(profile), today)
        .await
    {
        Ok(candidates) => candidates,
        Err(e) => {
            error!("Opportunity search failed: {e}");
            return Vec::new();
        }
    };

    let ranked = rank_opportunities(profile, &candidates, &state.ruleset, today);
    info!("Search found {} opportunities", ranked.len());

    if let Some(user_id) = user_id {
        for r in &ranked {
            let record = OpportunityMatch::new(user_id, r, profile);
            if let Err(e) = state.store.save_match(&record).await {
                warn!("Could not save match {} for {user_id}: {e}", r.opportunity.id);
            }
        }
    }
    ranked
}
