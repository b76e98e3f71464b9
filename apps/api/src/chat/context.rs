//! Conversation context: what the assistant knows about the student at this turn.

use serde::{Deserialize, Serialize};

use crate::models::matches::RankedOpportunity;
use crate::models::profile::{ConversationTurn, Role, UserProfile};

/// Number of matches summarized for the assistant.
pub const TOP_MATCHES_IN_CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    #[default]
    Greeting,
    Profiling,
    Searching,
    Results,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    pub title: String,
    pub institution: String,
    pub match_score: u32,
    pub funding_amount: f64,
}

impl From<&RankedOpportunity> for MatchSummary {
    fn from(ranked: &RankedOpportunity) -> Self {
        Self {
            title: ranked.opportunity.title.clone(),
            institution: ranked.opportunity.institution.clone(),
            match_score: ranked.match_score,
            funding_amount: ranked.opportunity.funding_amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundOpportunities {
    pub count: usize,
    pub top_matches: Vec<MatchSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    pub current_stage: ConversationStage,
    pub collected_info: UserProfile,
    pub profile_complete: bool,
    pub last_query: String,
    pub opportunities_shown: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found_opportunities: Option<FoundOpportunities>,
}

impl ConversationContext {
    /// Builds the context for the next reply. `search` is `Some` only when a search
    /// ran on this turn, even if it came back empty.
    pub fn build(
        turns: &[ConversationTurn],
        profile: &UserProfile,
        search: Option<&[RankedOpportunity]>,
    ) -> Self {
        let last_query = turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.clone())
            .unwrap_or_default();

        let profile_complete = profile.is_search_ready();
        let current_stage = match search {
            Some(found) if !found.is_empty() => ConversationStage::Results,
            Some(_) => ConversationStage::Searching,
            None if profile_complete => ConversationStage::Searching,
            None if last_query.is_empty() && profile.is_empty() => ConversationStage::Greeting,
            None => ConversationStage::Profiling,
        };

        let found = search.filter(|found| !found.is_empty());

        Self {
            current_stage,
            collected_info: profile.clone(),
            profile_complete,
            last_query,
            opportunities_shown: found
                .map(|f| f.iter().map(|r| r.opportunity.id.clone()).collect())
                .unwrap_or_default(),
            found_opportunities: found.map(|f| FoundOpportunities {
                count: f.len(),
                top_matches: f
                    .iter()
                    .take(TOP_MATCHES_IN_CONTEXT)
                    .map(MatchSummary::from)
                    .collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::opportunity::fixtures::cybersecurity_scholarship;
    use crate::models::opportunity::AcademicLevel;
    use chrono::NaiveDate;

    fn ranked(id: &str, score: u32) -> RankedOpportunity {
        let mut opp = cybersecurity_scholarship(NaiveDate::from_ymd_opt(2027, 3, 1).unwrap());
        opp.id = id.to_string();
        RankedOpportunity {
            opportunity: opp,
            match_score: score,
            action_items: vec![],
        }
    }

    fn complete_profile() -> UserProfile {
        UserProfile {
            academic_level: Some(AcademicLevel::Graduate),
            field_of_study: Some("Computer Science".to_string()),
            citizenship: Some("Nigeria".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_conversation_is_greeting() {
        let ctx = ConversationContext::build(&[], &UserProfile::default(), None);
        assert_eq!(ctx.current_stage, ConversationStage::Greeting);
        assert!(!ctx.profile_complete);
    }

    #[test]
    fn test_partial_profile_is_profiling() {
        let turns = [ConversationTurn::user("hi, I study medicine")];
        let profile = UserProfile {
            field_of_study: Some("Medicine".to_string()),
            ..Default::default()
        };
        let ctx = ConversationContext::build(&turns, &profile, None);
        assert_eq!(ctx.current_stage, ConversationStage::Profiling);
        assert_eq!(ctx.last_query, "hi, I study medicine");
    }

    #[test]
    fn test_results_summarize_top_three() {
        let turns = [ConversationTurn::user("find scholarships")];
        let found: Vec<_> = (0..5).map(|i| ranked(&format!("o{i}"), 90 - i)).collect();
        let ctx = ConversationContext::build(&turns, &complete_profile(), Some(&found));
        assert_eq!(ctx.current_stage, ConversationStage::Results);
        let summary = ctx.found_opportunities.unwrap();
        assert_eq!(summary.count, 5);
        assert_eq!(summary.top_matches.len(), 3);
        assert_eq!(ctx.opportunities_shown.len(), 5);
    }

    #[test]
    fn test_empty_search_stays_searching() {
        let turns = [ConversationTurn::user("search please")];
        let ctx = ConversationContext::build(&turns, &complete_profile(), Some(&[]));
        assert_eq!(ctx.current_stage, ConversationStage::Searching);
        assert!(ctx.found_opportunities.is_none());
    }
}
