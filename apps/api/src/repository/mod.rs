//! Repository: the opportunity store and the per-user match store.
//!
//! Two backends implement both traits: `PgRepository` (sqlx, used when
//! `DATABASE_URL` is set) and `InMemoryRepository` (seeded from
//! `seed/opportunities.json`, used for local runs and handler tests).
//! `AppState` carries them as `Arc<dyn OpportunityRepository>` / `Arc<dyn MatchStore>`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::ruleset::MatchRuleset;
use crate::models::matches::{ApplicationStatus, OpportunityMatch, TrackedMatch};
use crate::models::opportunity::{fallback_application_url, AcademicLevel, Opportunity, OpportunityType};
use crate::models::profile::UserProfile;

// ────────────────────────────────────────────────────────────────────────────
// Search filters
// ────────────────────────────────────────────────────────────────────────────

/// Repository-side filters. Every field is optional; unset means unrestricted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilters {
    pub level: Option<AcademicLevel>,
    /// Case-insensitive substring, widened with the ruleset's alias family.
    pub field: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<OpportunityType>,
    /// GPA ceiling: drops opportunities that require more than this.
    pub gpa: Option<f64>,
    pub citizenship: Option<String>,
}

impl SearchFilters {
    /// Filters used by the chat flow once a profile is search-ready.
    pub fn for_profile(profile: &UserProfile) -> Self {
        Self {
            level: profile.academic_level,
            field: profile.field_of_study.clone(),
            citizenship: profile.citizenship.clone(),
            ..Default::default()
        }
    }

    /// Lowercase field patterns a row may contain, "Various" included.
    pub fn field_patterns(&self, ruleset: &MatchRuleset) -> Option<Vec<String>> {
        self.field.as_ref().map(|field| {
            let mut terms = ruleset.field.search_terms(field);
            terms.push(ruleset.field.various_sentinel.to_lowercase());
            terms
        })
    }

    /// Requirement entries that admit the filtered citizenship.
    pub fn accepted_citizenships(&self, ruleset: &MatchRuleset) -> Option<Vec<String>> {
        self.citizenship.as_ref().map(|citizenship| {
            let rules = &ruleset.citizenship;
            let mut accepted = vec![citizenship.trim().to_string()];
            accepted.extend(rules.open_markers.iter().cloned());
            accepted.extend(rules.groups_for(citizenship).into_iter().map(String::from));
            accepted
        })
    }

    /// In-process evaluation of the same filter the SQL backend builds.
    pub fn matches(&self, opp: &Opportunity, today: NaiveDate, ruleset: &MatchRuleset) -> bool {
        if !opp.is_open_on(today) {
            return false;
        }
        if self.level.is_some_and(|level| level != opp.level) {
            return false;
        }
        if let Some(patterns) = self.field_patterns(ruleset) {
            let field = opp.field.to_lowercase();
            if !patterns.iter().any(|p| field.contains(p.as_str())) {
                return false;
            }
        }
        if self
            .country
            .as_ref()
            .is_some_and(|country| !country.eq_ignore_ascii_case(&opp.country))
        {
            return false;
        }
        if self.category.is_some_and(|category| category != opp.category) {
            return false;
        }
        if let (Some(ceiling), Some(required)) = (self.gpa, opp.min_gpa()) {
            if required > ceiling {
                return false;
            }
        }
        if let Some(accepted) = self.accepted_citizenships(ruleset) {
            let reqs = &opp.citizenship_requirements;
            if !reqs.is_empty()
                && !reqs
                    .iter()
                    .any(|r| accepted.iter().any(|a| a.eq_ignore_ascii_case(r.trim())))
            {
                return false;
            }
        }
        true
    }
}

/// Fills the gaps a stored row may have.
pub(crate) fn normalize(mut opp: Opportunity) -> Opportunity {
    if opp.application_url.trim().is_empty() {
        opp.application_url = fallback_application_url(&opp.id);
    }
    opp
}

// ────────────────────────────────────────────────────────────────────────────
// Traits
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait OpportunityRepository: Send + Sync {
    /// Open opportunities matching `filters`, deadline ascending.
    async fn search(
        &self,
        filters: &SearchFilters,
        today: NaiveDate,
    ) -> Result<Vec<Opportunity>, AppError>;

    async fn get_opportunity(&self, id: &str) -> Result<Option<Opportunity>, AppError>;

    /// Every stored opportunity, past deadlines included, deadline ascending.
    async fn all_opportunities(&self) -> Result<Vec<Opportunity>, AppError>;
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Inserts or refreshes the (user, opportunity) match. An existing
    /// application status is preserved.
    async fn save_match(&self, record: &OpportunityMatch) -> Result<(), AppError>;

    /// Stored matches joined with their opportunity, best score first.
    async fn user_matches(&self, user_id: Uuid) -> Result<Vec<TrackedMatch>, AppError>;

    /// Returns false when no match has this id.
    async fn update_match_status(
        &self,
        match_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<bool, AppError>;

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError>;

    async fn upsert_profile(&self, user_id: Uuid, profile: &UserProfile) -> Result<(), AppError>;
}
