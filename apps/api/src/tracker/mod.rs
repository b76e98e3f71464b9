//! Tracker: a user's saved matches with deadline urgency, sorting and status filtering.

pub mod export;
pub mod handlers;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::matches::{ApplicationStatus, TrackedMatch};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerSort {
    #[default]
    Deadline,
    MatchScore,
    Status,
}

/// How pressing a deadline is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Overdue,
    /// 7 days or fewer.
    Critical,
    /// 30 days or fewer.
    Soon,
    Comfortable,
}

impl Urgency {
    pub fn from_days(days: i64) -> Self {
        match days {
            d if d < 0 => Urgency::Overdue,
            0..=7 => Urgency::Critical,
            8..=30 => Urgency::Soon,
            _ => Urgency::Comfortable,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackerEntry {
    #[serde(flatten)]
    pub tracked: TrackedMatch,
    pub days_until_deadline: i64,
    pub urgency: Urgency,
}

/// Applies the status filter, then sorts. Past-deadline matches stay listed.
pub fn build_tracker(
    tracked: Vec<TrackedMatch>,
    sort: TrackerSort,
    status: Option<ApplicationStatus>,
    today: NaiveDate,
) -> Vec<TrackerEntry> {
    let mut entries: Vec<TrackerEntry> = tracked
        .into_iter()
        .filter(|t| status.map_or(true, |s| t.record.application_status == s))
        .map(|tracked| {
            let days_until_deadline = tracked.opportunity.days_until_deadline(today);
            TrackerEntry {
                urgency: Urgency::from_days(days_until_deadline),
                days_until_deadline,
                tracked,
            }
        })
        .collect();

    match sort {
        TrackerSort::Deadline => {
            entries.sort_by(|a, b| a.tracked.opportunity.deadline.cmp(&b.tracked.opportunity.deadline))
        }
        TrackerSort::MatchScore => {
            entries.sort_by(|a, b| b.tracked.record.match_score.cmp(&a.tracked.record.match_score))
        }
        TrackerSort::Status => entries.sort_by(|a, b| {
            a.tracked
                .record
                .application_status
                .as_str()
                .cmp(b.tracked.record.application_status.as_str())
        }),
    }
    entries
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::models::matches::{OpportunityMatch, RankedOpportunity};
    use crate::models::opportunity::fixtures::cybersecurity_scholarship;
    use crate::models::profile::UserProfile;

    pub fn tracked(
        id: &str,
        score: u32,
        deadline: NaiveDate,
        status: ApplicationStatus,
    ) -> TrackedMatch {
        let mut opportunity = cybersecurity_scholarship(deadline);
        opportunity.id = id.to_string();
        opportunity.title = format!("Opportunity {id}");
        let ranked = RankedOpportunity {
            opportunity: opportunity.clone(),
            match_score: score,
            action_items: vec![],
        };
        let mut record = OpportunityMatch::new(Uuid::new_v4(), &ranked, &UserProfile::default());
        record.application_status = status;
        TrackedMatch { record, opportunity }
    }

    pub fn days_from(today: NaiveDate, days: i64) -> NaiveDate {
        today + Duration::days(days)
    }
}
