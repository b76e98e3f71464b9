use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::matching::ruleset::MatchRuleset;
use crate::repository::{MatchStore, OpportunityRepository};
use crate::speech::SpeechClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub opportunities: Arc<dyn OpportunityRepository>,
    pub store: Arc<dyn MatchStore>,
    pub llm: LlmClient,
    pub speech: SpeechClient,
    /// Weights and lookup tables for extraction and scoring. Swappable via MATCH_RULESET_PATH.
    pub ruleset: Arc<MatchRuleset>,
    pub config: Config,
    /// Date source for deadline arithmetic.
    pub clock: fn() -> NaiveDate,
}

impl AppState {
    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }
}

/// Current UTC date.
pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}
