use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::speech::DEFAULT_VOICE_ID;

/// Application configuration loaded from environment variables.
/// Every external service is optional; a missing credential disables that
/// feature instead of stopping startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres store. Unset → in-memory store seeded from the bundled catalogue.
    pub database_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: String,
    /// JSON file replacing the built-in match ruleset.
    pub match_ruleset_path: Option<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            elevenlabs_api_key: optional_env("ELEVENLABS_API_KEY"),
            elevenlabs_voice_id: optional_env("ELEVENLABS_VOICE_ID")
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            match_ruleset_path: optional_env("MATCH_RULESET_PATH").map(PathBuf::from),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Unset and blank values are both treated as missing.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
