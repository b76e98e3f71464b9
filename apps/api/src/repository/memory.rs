use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::ruleset::MatchRuleset;
use crate::models::matches::{ApplicationStatus, OpportunityMatch, TrackedMatch};
use crate::models::opportunity::Opportunity;
use crate::models::profile::UserProfile;
use crate::repository::{normalize, MatchStore, OpportunityRepository, SearchFilters};

const SEED_OPPORTUNITIES: &str = include_str!("../../seed/opportunities.json");

/// Process-local store. Opportunities are fixed at construction; matches and
/// profiles live until the process exits.
pub struct InMemoryRepository {
    opportunities: Vec<Opportunity>,
    matches: RwLock<HashMap<Uuid, OpportunityMatch>>,
    profiles: RwLock<HashMap<Uuid, UserProfile>>,
    ruleset: Arc<MatchRuleset>,
}

impl InMemoryRepository {
    pub fn new(opportunities: Vec<Opportunity>, ruleset: Arc<MatchRuleset>) -> Self {
        let mut opportunities: Vec<Opportunity> = opportunities.into_iter().map(normalize).collect();
        opportunities.sort_by(|a, b| a.deadline.cmp(&b.deadline));
        Self {
            opportunities,
            matches: RwLock::new(HashMap::new()),
            profiles: RwLock::new(HashMap::new()),
            ruleset,
        }
    }

    /// Repository preloaded with the bundled opportunity catalogue.
    pub fn seeded(ruleset: Arc<MatchRuleset>) -> Result<Self> {
        let opportunities: Vec<Opportunity> = serde_json::from_str(SEED_OPPORTUNITIES)
            .context("Bundled seed/opportunities.json is invalid")?;
        Ok(Self::new(opportunities, ruleset))
    }
}

#[async_trait]
impl OpportunityRepository for InMemoryRepository {
    async fn search(
        &self,
        filters: &SearchFilters,
        today: NaiveDate,
    ) -> Result<Vec<Opportunity>, AppError> {
        Ok(self
            .opportunities
            .iter()
            .filter(|opp| filters.matches(opp, today, &self.ruleset))
            .cloned()
            .collect())
    }

    async fn get_opportunity(&self, id: &str) -> Result<Option<Opportunity>, AppError> {
        Ok(self.opportunities.iter().find(|o| o.id == id).cloned())
    }

    async fn all_opportunities(&self) -> Result<Vec<Opportunity>, AppError> {
        Ok(self.opportunities.clone())
    }
}

#[async_trait]
impl MatchStore for InMemoryRepository {
    async fn save_match(&self, record: &OpportunityMatch) -> Result<(), AppError> {
        let mut matches = self.matches.write().await;
        let existing = matches
            .values_mut()
            .find(|m| m.user_id == record.user_id && m.opportunity_id == record.opportunity_id);

        match existing {
            Some(m) => {
                m.match_score = record.match_score;
                m.action_items = record.action_items.clone();
                m.profile_snapshot = record.profile_snapshot.clone();
                m.updated_at = record.updated_at;
            }
            None => {
                matches.insert(record.id, record.clone());
            }
        }
        Ok(())
    }

    async fn user_matches(&self, user_id: Uuid) -> Result<Vec<TrackedMatch>, AppError> {
        let matches = self.matches.read().await;
        let mut tracked: Vec<TrackedMatch> = matches
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| {
                self.opportunities
                    .iter()
                    .find(|o| o.id == m.opportunity_id)
                    .map(|opp| TrackedMatch {
                        record: m.clone(),
                        opportunity: opp.clone(),
                    })
            })
            .collect();
        tracked.sort_by(|a, b| b.record.match_score.cmp(&a.record.match_score));
        Ok(tracked)
    }

    async fn update_match_status(
        &self,
        match_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<bool, AppError> {
        let mut matches = self.matches.write().await;
        Ok(match matches.get_mut(&match_id) {
            Some(m) => {
                m.application_status = status;
                m.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }

    async fn upsert_profile(&self, user_id: Uuid, profile: &UserProfile) -> Result<(), AppError> {
        self.profiles.write().await.insert(user_id, profile.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::matches::RankedOpportunity;
    use crate::models::opportunity::fixtures::cybersecurity_scholarship;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn repo() -> InMemoryRepository {
        let mut later = cybersecurity_scholarship(today() + Duration::days(90));
        later.id = "later".to_string();
        let mut sooner = cybersecurity_scholarship(today() + Duration::days(10));
        sooner.id = "sooner".to_string();
        let mut closed = cybersecurity_scholarship(today() - Duration::days(5));
        closed.id = "closed".to_string();
        InMemoryRepository::new(vec![later, sooner, closed], Arc::new(MatchRuleset::default()))
    }

    fn record(user_id: Uuid, opportunity_id: &str, score: u32) -> OpportunityMatch {
        let mut opp = cybersecurity_scholarship(today());
        opp.id = opportunity_id.to_string();
        let ranked = RankedOpportunity {
            opportunity: opp,
            match_score: score,
            action_items: vec!["Write a compelling personal statement".to_string()],
        };
        OpportunityMatch::new(user_id, &ranked, &UserProfile::default())
    }

    #[test]
    fn test_seed_catalogue_parses() {
        let repo = InMemoryRepository::seeded(Arc::new(MatchRuleset::default())).unwrap();
        assert!(!repo.opportunities.is_empty());
        assert!(repo.opportunities.iter().all(|o| !o.application_url.is_empty()));
    }

    #[tokio::test]
    async fn test_search_skips_closed_and_orders_by_deadline() {
        let found = repo().search(&SearchFilters::default(), today()).await.unwrap();
        let ids: Vec<_> = found.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["sooner", "later"]);
    }

    #[tokio::test]
    async fn test_all_opportunities_includes_closed() {
        let all = repo().all_opportunities().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, "closed");
    }

    #[tokio::test]
    async fn test_save_match_upserts_and_keeps_status() {
        let repo = repo();
        let user = Uuid::new_v4();
        let first = record(user, "later", 70);
        repo.save_match(&first).await.unwrap();
        assert!(repo
            .update_match_status(first.id, ApplicationStatus::Submitted)
            .await
            .unwrap());

        repo.save_match(&record(user, "later", 82)).await.unwrap();
        let tracked = repo.user_matches(user).await.unwrap();
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].record.match_score, 82);
        assert_eq!(tracked[0].record.application_status, ApplicationStatus::Submitted);
    }

    #[tokio::test]
    async fn test_user_matches_sorted_by_score() {
        let repo = repo();
        let user = Uuid::new_v4();
        repo.save_match(&record(user, "later", 60)).await.unwrap();
        repo.save_match(&record(user, "sooner", 91)).await.unwrap();
        repo.save_match(&record(Uuid::new_v4(), "closed", 99)).await.unwrap();

        let tracked = repo.user_matches(user).await.unwrap();
        let scores: Vec<_> = tracked.iter().map(|t| t.record.match_score).collect();
        assert_eq!(scores, vec![91, 60]);
    }

    #[tokio::test]
    async fn test_update_unknown_match_returns_false() {
        let updated = repo()
            .update_match_status(Uuid::new_v4(), ApplicationStatus::Completed)
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_profile_upsert_replaces() {
        let repo = repo();
        let user = Uuid::new_v4();
        assert!(repo.get_profile(user).await.unwrap().is_none());
        let profile = UserProfile {
            citizenship: Some("Kenya".to_string()),
            ..Default::default()
        };
        repo.upsert_profile(user, &profile).await.unwrap();
        assert_eq!(repo.get_profile(user).await.unwrap(), Some(profile));
    }
}
