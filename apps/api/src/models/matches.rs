use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::opportunity::Opportunity;
use crate::models::profile::UserProfile;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    NotStarted,
    InProgress,
    Submitted,
    Completed,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::NotStarted => "not_started",
            ApplicationStatus::InProgress => "in_progress",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "not_started" => Ok(ApplicationStatus::NotStarted),
            "in_progress" => Ok(ApplicationStatus::InProgress),
            "submitted" => Ok(ApplicationStatus::Submitted),
            "completed" => Ok(ApplicationStatus::Completed),
            other => Err(format!("unknown application status '{other}'")),
        }
    }
}

/// An opportunity surfaced for a profile, with its score and checklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedOpportunity {
    pub opportunity: Opportunity,
    pub match_score: u32, // 0 – 100
    pub action_items: Vec<String>,
}

/// A match remembered for a user. Only `application_status` changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityMatch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub opportunity_id: String,
    pub match_score: u32,
    pub action_items: Vec<String>,
    pub application_status: ApplicationStatus,
    /// Profile the score was computed against.
    pub profile_snapshot: UserProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OpportunityMatch {
    pub fn new(user_id: Uuid, ranked: &RankedOpportunity, profile: &UserProfile) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            opportunity_id: ranked.opportunity.id.clone(),
            match_score: ranked.match_score,
            action_items: ranked.action_items.clone(),
            application_status: ApplicationStatus::NotStarted,
            profile_snapshot: profile.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A stored match joined with its opportunity, as shown in the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedMatch {
    #[serde(flatten)]
    pub record: OpportunityMatch,
    pub opportunity: Opportunity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            ApplicationStatus::NotStarted,
            ApplicationStatus::InProgress,
            ApplicationStatus::Submitted,
            ApplicationStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<ApplicationStatus>(), Ok(status));
        }
        assert!("done".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_default_status_is_not_started() {
        assert_eq!(ApplicationStatus::default(), ApplicationStatus::NotStarted);
    }
}
