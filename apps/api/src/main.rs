mod chat;
mod config;
mod db;
mod errors;
mod llm_client;
mod matching;
mod models;
mod repository;
mod routes;
mod speech;
mod state;
mod tracker;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::matching::ruleset::MatchRuleset;
use crate::repository::memory::InMemoryRepository;
use crate::repository::postgres::PgRepository;
use crate::repository::{MatchStore, OpportunityRepository};
use crate::routes::build_router;
use crate::speech::SpeechClient;
use crate::state::{utc_today, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Oput API v{}", env!("CARGO_PKG_VERSION"));

    // Match ruleset: built-in tables unless a replacement file is configured
    let ruleset = Arc::new(match &config.match_ruleset_path {
        Some(path) => {
            let ruleset = MatchRuleset::from_json_file(path)?;
            info!("Match ruleset loaded from {}", path.display());
            ruleset
        }
        None => MatchRuleset::default(),
    });

    // Opportunity and match store
    let (opportunities, store) = match &config.database_url {
        Some(url) => {
            let repo = Arc::new(PgRepository::new(create_pool(url).await?, ruleset.clone()));
            (repo.clone() as Arc<dyn OpportunityRepository>, repo as Arc<dyn MatchStore>)
        }
        None => {
            warn!("DATABASE_URL not set, using the bundled in-memory catalogue");
            let repo = Arc::new(InMemoryRepository::seeded(ruleset.clone())?);
            (repo.clone() as Arc<dyn OpportunityRepository>, repo as Arc<dyn MatchStore>)
        }
    };

    // Hosted services share one HTTP client
    let http = reqwest::Client::new();
    let llm = LlmClient::new(http.clone(), config.gemini_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let speech = SpeechClient::new(
        http,
        config.elevenlabs_api_key.clone(),
        config.elevenlabs_voice_id.clone(),
    );

    let state = AppState {
        opportunities,
        store,
        llm,
        speech,
        ruleset,
        config: config.clone(),
        clock: utc_today,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
