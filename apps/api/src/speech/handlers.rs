use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SpeechRequest {
    pub text: String,
}

/// POST /api/v1/speech
/// Returns `audio/mpeg` bytes for the given text.
pub async fn handle_text_to_speech(
    State(state): State<AppState>,
    Json(req): Json<SpeechRequest>,
) -> Result<impl IntoResponse, AppError> {
    let audio = state.speech.text_to_speech(&req.text).await?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio))
}
