use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::matches::{ApplicationStatus, TrackedMatch};
use crate::state::AppState;
use crate::tracker::export::export_csv;
use crate::tracker::{build_tracker, TrackerEntry, TrackerSort};

#[derive(Deserialize)]
pub struct TrackerQuery {
    pub user_id: Uuid,
    #[serde(default)]
    pub sort: TrackerSort,
    pub status: Option<ApplicationStatus>,
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub application_status: ApplicationStatus,
}

/// GET /api/v1/tracker
pub async fn handle_list_tracker(
    State(state): State<AppState>,
    Query(params): Query<TrackerQuery>,
) -> Result<Json<Vec<TrackerEntry>>, AppError> {
    let tracked = state.store.user_matches(params.user_id).await?;
    let today = state.today();
    Ok(Json(build_tracker(tracked, params.sort, params.status, today)))
}

/// PATCH /api/v1/tracker/:match_id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<StatusUpdate>,
) -> Result<StatusCode, AppError> {
    let updated = state
        .store
        .update_match_status(match_id, req.application_status)
        .await?;
    if !updated {
        return Err(AppError::NotFound(format!("Match {match_id} not found")));
    }
    info!("Match {match_id} moved to {}", req.application_status);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/tracker/export
pub async fn handle_export_csv(
    State(state): State<AppState>,
    Query(params): Query<TrackerQuery>,
) -> Result<impl IntoResponse, AppError> {
    let today = state.today();
    let tracked: Vec<TrackedMatch> =
        build_tracker(state.store.user_matches(params.user_id).await?, params.sort, params.status, today)
            .into_iter()
            .map(|entry| entry.tracked)
            .collect();

    let body = export_csv(&tracked)?;
    let filename = format!("oput_opportunities_{}.csv", today.format("%Y-%m-%d"));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    ))
}
