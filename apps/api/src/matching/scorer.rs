//! Match scoring: weighted-criteria compatibility between a profile and an opportunity.
//!
//! Each criterion yields a ratio in [0, 1]; the score is
//! `round(100 × Σ(weight × ratio) / Σ(weight))`, clamped to [0, 100].
//! Unknown profile fields contribute 0 and the weights are never renormalized.

use serde::{Deserialize, Serialize};

use crate::matching::ruleset::{CitizenshipRules, FieldRules, GpaRules, MatchRuleset};
use crate::models::opportunity::{AcademicLevel, Opportunity};
use crate::models::profile::UserProfile;

/// Per-criterion ratios (0.0 – 1.0) plus the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchBreakdown {
    pub academic_level: f64,
    pub field_of_study: f64,
    pub gpa: f64,
    pub citizenship: f64,
    pub country: f64,
    pub score: u32, // 0 – 100
}

/// Integer compatibility score in [0, 100].
pub fn score_match(profile: &UserProfile, opportunity: &Opportunity, ruleset: &MatchRuleset) -> u32 {
    score_breakdown(profile, opportunity, ruleset).score
}

pub fn score_breakdown(
    profile: &UserProfile,
    opportunity: &Opportunity,
    ruleset: &MatchRuleset,
) -> MatchBreakdown {
    let academic_level = level_ratio(profile.academic_level, opportunity.level, ruleset);
    let field_of_study = profile
        .field_of_study
        .as_deref()
        .map(|field| field_ratio(field, &opportunity.field, &ruleset.field))
        .unwrap_or(0.0);
    let gpa = gpa_ratio(profile.current_gpa, opportunity.min_gpa(), &ruleset.gpa);
    let citizenship = citizenship_ratio(
        profile.citizenship.as_deref(),
        &opportunity.citizenship_requirements,
        &ruleset.citizenship,
    );
    let country = profile
        .country
        .as_deref()
        .map(|preferred| country_ratio(preferred, &opportunity.country, ruleset))
        .unwrap_or(0.0);

    let w = &ruleset.weights;
    let weighted = w.academic_level * academic_level
        + w.field_of_study * field_of_study
        + w.gpa * gpa
        + w.citizenship * citizenship
        + w.country * country;
    let total_weight = w.sum();

    let score = if total_weight > 0.0 {
        ((weighted / total_weight) * 100.0).round().clamp(0.0, 100.0) as u32
    } else {
        0
    };

    MatchBreakdown {
        academic_level,
        field_of_study,
        gpa,
        citizenship,
        country,
        score,
    }
}

fn level_ratio(user: Option<AcademicLevel>, required: AcademicLevel, ruleset: &MatchRuleset) -> f64 {
    match user {
        Some(level) if level == required => 1.0,
        Some(level) if level.next_step() == Some(required) => ruleset.level.adjacent_ratio,
        _ => 0.0,
    }
}

fn field_ratio(user_field: &str, opportunity_field: &str, rules: &FieldRules) -> f64 {
    let user = user_field.trim().to_lowercase();
    let opp = opportunity_field.trim().to_lowercase();
    if user.is_empty() || opp.is_empty() {
        return 0.0;
    }

    if opp == rules.various_sentinel.to_lowercase() {
        rules.various_ratio
    } else if user == opp {
        1.0
    } else if user.contains(&opp) || opp.contains(&user) || same_family(&user, &opp, rules) {
        rules.partial_ratio
    } else if is_related(&user, &opp, rules) {
        rules.related_ratio
    } else {
        0.0
    }
}

/// Both fields belong to the same alias family (e.g. computer science ↔ cybersecurity).
fn same_family(user: &str, opp: &str, rules: &FieldRules) -> bool {
    let aliased = |a: &str, b: &str| {
        rules
            .search_terms(a)
            .iter()
            .skip(1)
            .any(|term| b.contains(term.as_str()))
    };
    aliased(user, opp) || aliased(opp, user)
}

fn is_related(a: &str, b: &str, rules: &FieldRules) -> bool {
    rules.related.iter().any(|(key, related)| {
        let links = |x: &str, y: &str| {
            x.contains(key.as_str()) && related.iter().any(|r| y.contains(r.as_str()))
        };
        links(a, b) || links(b, a)
    })
}

fn gpa_ratio(user: Option<f64>, required: Option<f64>, rules: &GpaRules) -> f64 {
    let Some(required) = required else {
        return rules.no_requirement_ratio;
    };
    let Some(gpa) = user else {
        return 0.0;
    };

    if gpa >= required {
        (rules.meets_base_ratio + (gpa - required) * rules.bonus_per_point).min(1.0)
    } else if gpa >= required - rules.near_miss_margin {
        rules.near_miss_ratio
    } else {
        0.0
    }
}

fn citizenship_ratio(user: Option<&str>, accepted: &[String], rules: &CitizenshipRules) -> f64 {
    if accepted.is_empty() {
        return rules.no_restriction_ratio;
    }
    let Some(citizenship) = user.map(str::trim).filter(|c| !c.is_empty()) else {
        return 0.0;
    };

    let satisfied = accepted.iter().any(|requirement| {
        requirement.eq_ignore_ascii_case(citizenship)
            || rules
                .open_markers
                .iter()
                .any(|marker| marker.eq_ignore_ascii_case(requirement))
            || rules
                .group(requirement)
                .is_some_and(|group| group.contains(citizenship))
    });

    if satisfied {
        1.0
    } else {
        0.0
    }
}

fn country_ratio(preferred: &str, country: &str, ruleset: &MatchRuleset) -> f64 {
    if preferred.trim().eq_ignore_ascii_case(country.trim()) {
        1.0
    } else if ruleset.country.same_region(preferred, country) {
        ruleset.country.same_region_ratio
    } else {
        0.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::opportunity::fixtures::cybersecurity_scholarship;
    use chrono::NaiveDate;

    fn deadline() -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, 1, 15).unwrap()
    }

    fn nigerian_cs_graduate() -> UserProfile {
        UserProfile {
            academic_level: Some(AcademicLevel::Graduate),
            field_of_study: Some("computer science".to_string()),
            citizenship: Some("Nigeria".to_string()),
            country: None,
            current_gpa: Some(3.6),
        }
    }

    #[test]
    fn test_commonwealth_cybersecurity_scores_high() {
        let opp = cybersecurity_scholarship(deadline());
        let breakdown = score_breakdown(&nigerian_cs_graduate(), &opp, &MatchRuleset::default());
        assert_eq!(breakdown.field_of_study, 0.9);
        assert_eq!(breakdown.citizenship, 1.0);
        assert!(breakdown.gpa > 0.8);
        assert!(breakdown.score >= 85, "Expected ≥85, got {}", breakdown.score);
    }

    #[test]
    fn test_us_only_opportunity_zeroes_citizenship() {
        let mut opp = cybersecurity_scholarship(deadline());
        opp.citizenship_requirements = vec!["United States".to_string()];
        let breakdown = score_breakdown(&nigerian_cs_graduate(), &opp, &MatchRuleset::default());
        assert_eq!(breakdown.citizenship, 0.0);
    }

    #[test]
    fn test_empty_profile_scores_low_but_valid() {
        let opp = cybersecurity_scholarship(deadline());
        let score = score_match(&UserProfile::default(), &opp, &MatchRuleset::default());
        assert!(score <= 100);
        assert!(score < 20, "Expected a low score, got {score}");
    }

    #[test]
    fn test_empty_profile_unrestricted_opportunity() {
        let mut opp = cybersecurity_scholarship(deadline());
        opp.gpa_requirement = None;
        opp.citizenship_requirements.clear();
        // 20 × 0.9 + 20 × 0.8 = 34
        assert_eq!(score_match(&UserProfile::default(), &opp, &MatchRuleset::default()), 34);
    }

    #[test]
    fn test_perfect_match_is_100() {
        let mut opp = cybersecurity_scholarship(deadline());
        // Two full points above the requirement saturates the GPA bonus.
        opp.gpa_requirement = Some(2.0);
        let profile = UserProfile {
            academic_level: Some(AcademicLevel::Graduate),
            field_of_study: Some("Cybersecurity".to_string()),
            citizenship: Some("Nigeria".to_string()),
            country: Some("United Kingdom".to_string()),
            current_gpa: Some(4.0),
        };
        assert_eq!(score_match(&profile, &opp, &MatchRuleset::default()), 100);
    }

    #[test]
    fn test_level_adjacency_is_one_directional() {
        let ruleset = MatchRuleset::default();
        assert_eq!(
            level_ratio(Some(AcademicLevel::Undergraduate), AcademicLevel::Graduate, &ruleset),
            0.7
        );
        assert_eq!(
            level_ratio(Some(AcademicLevel::Graduate), AcademicLevel::Phd, &ruleset),
            0.7
        );
        assert_eq!(
            level_ratio(Some(AcademicLevel::Phd), AcademicLevel::Graduate, &ruleset),
            0.0
        );
        assert_eq!(
            level_ratio(Some(AcademicLevel::Undergraduate), AcademicLevel::Phd, &ruleset),
            0.0
        );
        assert_eq!(level_ratio(None, AcademicLevel::Phd, &ruleset), 0.0);
    }

    #[test]
    fn test_field_tiers() {
        let rules = FieldRules::default();
        assert_eq!(field_ratio("Medicine", "Various", &rules), 0.8);
        assert_eq!(field_ratio("Medicine", "medicine", &rules), 1.0);
        assert_eq!(field_ratio("Engineering", "Mechanical Engineering", &rules), 0.9);
        assert_eq!(field_ratio("Computer Science", "Data Science", &rules), 0.6);
        assert_eq!(field_ratio("Biology", "Medicine", &rules), 0.6);
        assert_eq!(field_ratio("Law", "Physics", &rules), 0.0);
        assert_eq!(field_ratio("Law", "", &rules), 0.0);
    }

    #[test]
    fn test_gpa_tiers() {
        let rules = GpaRules::default();
        assert_eq!(gpa_ratio(None, None, &rules), 0.9);
        assert_eq!(gpa_ratio(Some(3.0), None, &rules), 0.9);
        assert_eq!(gpa_ratio(None, Some(3.0), &rules), 0.0);
        assert!((gpa_ratio(Some(3.5), Some(3.0), &rules) - 0.85).abs() < 1e-9);
        assert_eq!(gpa_ratio(Some(2.8), Some(3.0), &rules), 0.5);
        assert_eq!(gpa_ratio(Some(2.0), Some(3.0), &rules), 0.0);
        assert_eq!(gpa_ratio(Some(4.0), Some(1.0), &rules), 1.0);
    }

    #[test]
    fn test_gpa_component_is_monotonic() {
        let rules = GpaRules::default();
        for required in [0.5, 2.0, 3.0, 3.3, 3.7, 4.0] {
            let mut previous = 0.0;
            for step in 0..=400 {
                let gpa = step as f64 / 100.0;
                let ratio = gpa_ratio(Some(gpa), Some(required), &rules);
                assert!(
                    ratio >= previous,
                    "GPA ratio dropped at gpa={gpa} req={required}: {previous} -> {ratio}"
                );
                previous = ratio;
            }
        }
    }

    #[test]
    fn test_citizenship_rules() {
        let rules = CitizenshipRules::default();
        let reqs = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(citizenship_ratio(Some("Ghana"), &reqs(&["Any"]), &rules), 1.0);
        assert_eq!(
            citizenship_ratio(Some("Kenya"), &reqs(&["Commonwealth countries"]), &rules),
            1.0
        );
        assert_eq!(
            citizenship_ratio(Some("Brazil"), &reqs(&["Non-US citizens"]), &rules),
            1.0
        );
        assert_eq!(
            citizenship_ratio(Some("United States"), &reqs(&["Non-US citizens"]), &rules),
            0.0
        );
        assert_eq!(citizenship_ratio(None, &[], &rules), 0.8);
        assert_eq!(citizenship_ratio(None, &reqs(&["Nigeria"]), &rules), 0.0);
    }

    #[test]
    fn test_citizenship_group_name_ignores_case() {
        let rules = CitizenshipRules::default();
        let reqs = vec![" commonwealth countries ".to_string()];
        assert_eq!(citizenship_ratio(Some("Ghana"), &reqs, &rules), 1.0);
        assert_eq!(citizenship_ratio(Some("Brazil"), &reqs, &rules), 0.0);
    }

    #[test]
    fn test_search_admission_agrees_with_citizenship_score() {
        let ruleset = MatchRuleset::default();
        let mut opp = cybersecurity_scholarship(deadline());
        opp.citizenship_requirements = vec!["commonwealth countries".to_string()];
        let filters = crate::repository::SearchFilters {
            citizenship: Some("Ghana".to_string()),
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert!(filters.matches(&opp, today, &ruleset));

        let profile = UserProfile {
            citizenship: Some("Ghana".to_string()),
            ..nigerian_cs_graduate()
        };
        assert_eq!(score_breakdown(&profile, &opp, &ruleset).citizenship, 1.0);
    }

    #[test]
    fn test_country_region_half_weight() {
        let ruleset = MatchRuleset::default();
        assert_eq!(country_ratio("Germany", "germany", &ruleset), 1.0);
        assert_eq!(country_ratio("Germany", "France", &ruleset), 0.5);
        assert_eq!(country_ratio("Germany", "Japan", &ruleset), 0.0);
    }

    #[test]
    fn test_score_bounded_for_all_profiles() {
        let opp = cybersecurity_scholarship(deadline());
        let ruleset = MatchRuleset::default();
        let levels = [
            None,
            Some(AcademicLevel::Undergraduate),
            Some(AcademicLevel::Graduate),
            Some(AcademicLevel::Phd),
        ];
        for level in levels {
            for gpa in [None, Some(0.0), Some(2.0), Some(4.0)] {
                let profile = UserProfile {
                    academic_level: level,
                    current_gpa: gpa,
                    ..nigerian_cs_graduate()
                };
                assert!(score_match(&profile, &opp, &ruleset) <= 100);
            }
        }
    }

    #[test]
    fn test_fixture_ruleset_substitutes_weights() {
        let mut ruleset = MatchRuleset::default();
        ruleset.weights.academic_level = 100.0;
        ruleset.weights.field_of_study = 0.0;
        ruleset.weights.gpa = 0.0;
        ruleset.weights.citizenship = 0.0;
        ruleset.weights.country = 0.0;
        let opp = cybersecurity_scholarship(deadline());
        assert_eq!(score_match(&nigerian_cs_graduate(), &opp, &ruleset), 100);
    }
}
