//! Action items: the ordered checklist shown next to each surfaced opportunity.

use chrono::NaiveDate;

use crate::models::opportunity::{AcademicLevel, Opportunity, OpportunityType};
use crate::models::profile::UserProfile;

/// Days-left threshold at which the deadline reminder becomes urgent.
pub const URGENT_WITHIN_DAYS: i64 = 30;

pub const REVIEW_ELIGIBILITY: &str = "Review complete eligibility requirements";
pub const PREPARE_TRANSCRIPTS: &str = "Prepare official academic transcripts";

/// Checklist for `opportunity` as of `today`. Order is fixed.
pub fn generate_action_items(
    opportunity: &Opportunity,
    profile: &UserProfile,
    today: NaiveDate,
) -> Vec<String> {
    let mut items = vec![
        REVIEW_ELIGIBILITY.to_string(),
        PREPARE_TRANSCRIPTS.to_string(),
    ];

    if let (Some(required), Some(gpa)) = (opportunity.min_gpa(), profile.current_gpa) {
        if gpa < required {
            items.push(format!("Improve GPA to meet {required} requirement"));
        } else {
            items.push("Highlight your strong academic performance".to_string());
        }
    }

    if opportunity.category == OpportunityType::Research || opportunity.level == AcademicLevel::Phd {
        items.push("Draft a compelling research proposal".to_string());
        items.push("Contact potential supervisors or mentors".to_string());
        items.push("Prepare research portfolio or publications".to_string());
    }

    if opportunity.has_language_requirements() {
        items.push("Prepare required language proficiency certificates".to_string());
    }

    items.push("Secure 2-3 strong letters of recommendation".to_string());
    items.push("Write a compelling personal statement".to_string());
    items.push("Prepare CV/resume highlighting relevant experience".to_string());

    let days_left = opportunity.days_until_deadline(today);
    let deadline = opportunity.deadline.format("%-m/%-d/%Y");
    if days_left <= URGENT_WITHIN_DAYS {
        items.push(format!(
            "URGENT: Submit application before {deadline} ({days_left} days left)"
        ));
    } else {
        items.push(format!("Submit application before deadline: {deadline}"));
    }

    items
}
