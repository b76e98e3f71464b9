use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::matching::action_items::generate_action_items;
use crate::matching::extractor::{extract_profile, requests_search};
use crate::matching::ranking::{rank_opportunities, FilterOptions};
use crate::matching::scorer::{score_breakdown, MatchBreakdown};
use crate::models::matches::RankedOpportunity;
use crate::models::opportunity::Opportunity;
use crate::models::profile::{ConversationTurn, Role, UserProfile};
use crate::repository::SearchFilters;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ExtractRequest {
    pub messages: Vec<ConversationTurn>,
}

#[derive(Serialize)]
pub struct ExtractResponse {
    pub profile: UserProfile,
    pub search_ready: bool,
    pub missing: Vec<&'static str>,
    /// Whether the latest user message asks for a search.
    pub requests_search: bool,
}

/// POST /api/v1/profile/extract
pub async fn handle_extract_profile(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Json<ExtractResponse> {
    let tables = &state.ruleset.extraction;
    let profile = extract_profile(&req.messages, tables);
    let last_user = req
        .messages
        .iter()
        .rev()
        .find(|t| t.role == Role::User)
        .map(|t| t.content.as_str())
        .unwrap_or_default();

    Json(ExtractResponse {
        search_ready: profile.is_search_ready(),
        missing: profile.missing_for_search(),
        requests_search: requests_search(last_user, tables),
        profile,
    })
}

#[derive(Deserialize)]
pub struct ScoreRequest {
    pub profile: UserProfile,
    pub opportunity_id: String,
}

#[derive(Serialize)]
pub struct ScoreResponse {
    pub opportunity_id: String,
    pub match_score: u32,
    pub breakdown: MatchBreakdown,
    pub action_items: Vec<String>,
}

/// POST /api/v1/matches/score
pub async fn handle_score_match(
    State(state): State<AppState>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    let opportunity = state
        .opportunities
        .get_opportunity(&req.opportunity_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Opportunity {} not found", req.opportunity_id)))?;

    let breakdown = score_breakdown(&req.profile, &opportunity, &state.ruleset);
    let action_items = generate_action_items(&opportunity, &req.profile, state.today());

    Ok(Json(ScoreResponse {
        opportunity_id: opportunity.id,
        match_score: breakdown.score,
        breakdown,
        action_items,
    }))
}

/// GET /api/v1/opportunities
pub async fn handle_search_opportunities(
    State(state): State<AppState>,
    Query(filters): Query<SearchFilters>,
) -> Result<Json<Vec<Opportunity>>, AppError> {
    let found = state
        .opportunities
        .search(&filters, state.today())
        .await?;
    Ok(Json(found))
}

/// GET /api/v1/opportunities/:id
pub async fn handle_get_opportunity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Opportunity>, AppError> {
    state
        .opportunities
        .get_opportunity(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Opportunity {id} not found")))
}

#[derive(Deserialize)]
pub struct RankRequest {
    pub profile: UserProfile,
    #[serde(default)]
    pub search: SearchFilters,
    #[serde(default)]
    pub filters: FilterOptions,
}

/// POST /api/v1/opportunities/rank
/// Scores open opportunities for a profile, then applies the results filter panel.
pub async fn handle_rank_opportunities(
    State(state): State<AppState>,
    Json(req): Json<RankRequest>,
) -> Result<Json<Vec<RankedOpportunity>>, AppError> {
    if req.filters.min_match_score > 100 {
        return Err(AppError::Validation(
            "min_match_score must be between 0 and 100".to_string(),
        ));
    }

    let today = state.today();
    let candidates = state.opportunities.search(&req.search, today).await?;
    let ranked = rank_opportunities(&req.profile, &candidates, &state.ruleset, today);
    let kept = req.filters.apply(ranked, today);
    info!(
        "Ranked {} candidates, {} kept after filters",
        candidates.len(),
        kept.len()
    );
    Ok(Json(kept))
}
