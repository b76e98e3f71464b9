//! Ranking: scores candidate opportunities for a profile and applies the results filter panel.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::matching::action_items::generate_action_items;
use crate::matching::ruleset::MatchRuleset;
use crate::matching::scorer::score_match;
use crate::models::matches::RankedOpportunity;
use crate::models::opportunity::{AcademicLevel, Opportunity, OpportunityType};
use crate::models::profile::UserProfile;

/// Scores every still-open opportunity, best match first (earlier deadline breaks ties).
/// Opportunities whose deadline has passed are never offered as new matches.
pub fn rank_opportunities(
    profile: &UserProfile,
    opportunities: &[Opportunity],
    ruleset: &MatchRuleset,
    today: NaiveDate,
) -> Vec<RankedOpportunity> {
    let mut ranked: Vec<RankedOpportunity> = opportunities
        .iter()
        .filter(|opp| opp.is_open_on(today))
        .map(|opp| RankedOpportunity {
            match_score: score_match(profile, opp, ruleset),
            action_items: generate_action_items(opp, profile, today),
            opportunity: opp.clone(),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.match_score
            .cmp(&a.match_score)
            .then_with(|| a.opportunity.deadline.cmp(&b.opportunity.deadline))
    });
    ranked
}

/// Deadline window of the results filter panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeadlineRange {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "30days")]
    Within30Days,
    #[serde(rename = "60days")]
    Within60Days,
    #[serde(rename = "90days")]
    Within90Days,
}

impl DeadlineRange {
    fn max_days(&self) -> Option<i64> {
        match self {
            DeadlineRange::All => None,
            DeadlineRange::Within30Days => Some(30),
            DeadlineRange::Within60Days => Some(60),
            DeadlineRange::Within90Days => Some(90),
        }
    }
}

/// Results filter panel. Empty lists mean "no restriction".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    #[serde(rename = "type")]
    pub categories: Vec<OpportunityType>,
    pub level: Vec<AcademicLevel>,
    pub country: Vec<String>,
    pub field: Vec<String>,
    pub min_funding: Option<f64>,
    pub max_funding: Option<f64>,
    pub deadline_range: DeadlineRange,
    pub min_match_score: u32,
}

impl FilterOptions {
    pub fn accepts(&self, ranked: &RankedOpportunity, today: NaiveDate) -> bool {
        let opp = &ranked.opportunity;

        if !self.categories.is_empty() && !self.categories.contains(&opp.category) {
            return false;
        }
        if !self.level.is_empty() && !self.level.contains(&opp.level) {
            return false;
        }
        if !self.country.is_empty()
            && !self
                .country
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&opp.country))
        {
            return false;
        }
        if !self.field.is_empty() {
            let field = opp.field.to_lowercase();
            if !self
                .field
                .iter()
                .any(|f| field.contains(&f.to_lowercase()))
            {
                return false;
            }
        }
        if self.min_funding.is_some_and(|min| opp.funding_amount < min) {
            return false;
        }
        if self.max_funding.is_some_and(|max| opp.funding_amount > max) {
            return false;
        }
        if let Some(max_days) = self.deadline_range.max_days() {
            let days = opp.days_until_deadline(today);
            if !(0..=max_days).contains(&days) {
                return false;
            }
        }
        ranked.match_score >= self.min_match_score
    }

    pub fn apply(&self, ranked: Vec<RankedOpportunity>, today: NaiveDate) -> Vec<RankedOpportunity> {
        ranked
            .into_iter()
            .filter(|r| self.accepts(r, today))
            .collect()
    }
}
