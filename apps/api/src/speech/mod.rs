//! Text-to-speech through ElevenLabs. Returns MP3 bytes per request; playback
//! and interruption belong to the client.

pub mod handlers;

use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const ELEVENLABS_API_BASE: &str = "https://api.elevenlabs.io/v1";
pub const DEFAULT_VOICE_ID: &str = "pMsXgVXv3BLzUgSXRplE";
const MODEL_ID: &str = "eleven_monolingual_v1";
const STABILITY: f32 = 0.5;
const SIMILARITY_BOOST: f32 = 0.5;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("ElevenLabs API key is not configured. Text-to-speech is disabled.")]
    NotConfigured,

    #[error("Text to speak must not be empty")]
    EmptyText,

    #[error("Invalid ElevenLabs API key. Please check your credentials.")]
    InvalidKey,

    #[error("ElevenLabs API rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Invalid voice ID or request parameters for ElevenLabs API.")]
    InvalidVoice,

    #[error("ElevenLabs API error: {status} {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SpeechError {
    fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => SpeechError::InvalidKey,
            429 => SpeechError::RateLimited,
            422 => SpeechError::InvalidVoice,
            _ => {
                let message = serde_json::from_str::<ErrorBody>(body)
                    .ok()
                    .and_then(|b| b.detail)
                    .and_then(|d| d.message)
                    .unwrap_or_else(|| body.trim().to_string());
                SpeechError::Api { status, message }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'static str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

#[derive(Clone)]
pub struct SpeechClient {
    client: Client,
    api_key: Option<String>,
    voice_id: String,
}

impl SpeechClient {
    pub fn new(client: Client, api_key: Option<String>, voice_id: String) -> Self {
        if api_key.is_none() {
            warn!("ElevenLabs API key not found. Text-to-speech will be disabled.");
        }
        Self {
            client,
            api_key,
            voice_id,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn text_to_speech(&self, text: &str) -> Result<Bytes, SpeechError> {
        let api_key = self.api_key.as_deref().ok_or(SpeechError::NotConfigured)?;
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let response = self
            .client
            .post(format!("{ELEVENLABS_API_BASE}/text-to-speech/{}", self.voice_id))
            .header("xi-api-key", api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&SpeechRequest {
                text,
                model_id: MODEL_ID,
                voice_settings: VoiceSettings {
                    stability: STABILITY,
                    similarity_boost: SIMILARITY_BOOST,
                },
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("ElevenLabs API returned {}: {}", status, body);
            return Err(SpeechError::from_status(status.as_u16(), &body));
        }

        let audio = response.bytes().await?;
        debug!("Synthesized {} bytes of audio", audio.len());
        Ok(audio)
    }
}
