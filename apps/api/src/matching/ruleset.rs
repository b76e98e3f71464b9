//! Match ruleset: every weight, ratio and lookup table the scorer and extractor use.
//!
//! `MatchRuleset::default()` carries the production tables. A JSON file with the
//! same shape can replace it at startup (`MATCH_RULESET_PATH`); tests build
//! fixture rulesets directly.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::matching::extractor::ExtractionTables;

/// Weight of each criterion. Defaults sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionWeights {
    pub academic_level: f64,
    pub field_of_study: f64,
    pub gpa: f64,
    pub citizenship: f64,
    pub country: f64,
}

impl Default for CriterionWeights {
    fn default() -> Self {
        Self {
            academic_level: 25.0,
            field_of_study: 30.0,
            gpa: 20.0,
            citizenship: 20.0,
            country: 5.0,
        }
    }
}

impl CriterionWeights {
    pub fn sum(&self) -> f64 {
        self.academic_level + self.field_of_study + self.gpa + self.citizenship + self.country
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelRules {
    /// Applying one level up (undergraduate → graduate, graduate → phd).
    pub adjacent_ratio: f64,
}

impl Default for LevelRules {
    fn default() -> Self {
        Self {
            adjacent_ratio: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRules {
    /// Opportunity field value meaning "open to every field".
    pub various_sentinel: String,
    pub various_ratio: f64,
    pub partial_ratio: f64,
    pub related_ratio: f64,
    /// Fields treated as the same discipline for partial matching and search.
    /// Keys and members are lowercase.
    pub aliases: BTreeMap<String, Vec<String>>,
    /// Loosely related fields (lookup is symmetric). Lowercase.
    pub related: BTreeMap<String, Vec<String>>,
}

impl Default for FieldRules {
    fn default() -> Self {
        Self {
            various_sentinel: "Various".to_string(),
            various_ratio: 0.8,
            partial_ratio: 0.9,
            related_ratio: 0.6,
            aliases: table(&[
                ("computer science", &["cybersecurity"]),
                ("cybersecurity", &["computer science"]),
            ]),
            related: table(&[
                (
                    "computer science",
                    &[
                        "cybersecurity",
                        "artificial intelligence",
                        "machine learning",
                        "data science",
                        "software engineering",
                    ],
                ),
                (
                    "cybersecurity",
                    &["computer science", "information security", "network security"],
                ),
                (
                    "engineering",
                    &[
                        "mechanical engineering",
                        "electrical engineering",
                        "civil engineering",
                        "computer science",
                    ],
                ),
                ("business", &["management", "finance", "marketing", "economics"]),
                (
                    "medicine",
                    &["biology", "chemistry", "health sciences", "biomedical"],
                ),
                (
                    "artificial intelligence",
                    &["computer science", "machine learning", "data science"],
                ),
            ]),
        }
    }
}

impl FieldRules {
    /// Lowercase search terms for a field: the field itself plus its aliases.
    pub fn search_terms(&self, field: &str) -> Vec<String> {
        let field = field.trim().to_lowercase();
        let mut terms = vec![field.clone()];
        for (key, members) in &self.aliases {
            if field.contains(key.as_str()) {
                for member in members {
                    if !terms.contains(member) {
                        terms.push(member.clone());
                    }
                }
            }
        }
        terms
    }
}

/// How a broad citizenship category ("Commonwealth countries") is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CitizenshipGroup {
    /// Satisfied by any listed citizenship.
    Members { countries: Vec<String> },
    /// Satisfied by every citizenship except the listed ones.
    Excluding { countries: Vec<String> },
}

impl CitizenshipGroup {
    pub fn contains(&self, citizenship: &str) -> bool {
        let listed = |countries: &[String]| {
            countries
                .iter()
                .any(|c| c.eq_ignore_ascii_case(citizenship.trim()))
        };
        match self {
            CitizenshipGroup::Members { countries } => listed(countries),
            CitizenshipGroup::Excluding { countries } => !listed(countries),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CitizenshipRules {
    /// Requirement entries that accept every citizenship.
    pub open_markers: Vec<String>,
    pub no_restriction_ratio: f64,
    pub groups: BTreeMap<String, CitizenshipGroup>,
}

impl Default for CitizenshipRules {
    fn default() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(
            "Commonwealth countries".to_string(),
            CitizenshipGroup::Members {
                countries: strings(&["Nigeria", "Ghana", "Kenya", "India"]),
            },
        );
        groups.insert(
            "Non-US citizens".to_string(),
            CitizenshipGroup::Excluding {
                countries: strings(&["United States"]),
            },
        );
        Self {
            open_markers: strings(&["Any"]),
            no_restriction_ratio: 0.8,
            groups,
        }
    }
}

impl CitizenshipRules {
    /// Looks up a broad category by name, ignoring case and surrounding whitespace.
    pub fn group(&self, name: &str) -> Option<&CitizenshipGroup> {
        let name = name.trim();
        self.groups
            .iter()
            .find(|(group, _)| group.eq_ignore_ascii_case(name))
            .map(|(_, group)| group)
    }

    /// Broad categories `citizenship` belongs to, by name.
    pub fn groups_for(&self, citizenship: &str) -> Vec<&str> {
        self.groups
            .iter()
            .filter(|(_, group)| group.contains(citizenship))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CountryRules {
    pub same_region_ratio: f64,
    /// Region name → member countries (lowercase).
    pub regions: BTreeMap<String, Vec<String>>,
}

impl Default for CountryRules {
    fn default() -> Self {
        Self {
            same_region_ratio: 0.5,
            regions: table(&[
                (
                    "europe",
                    &[
                        "germany",
                        "france",
                        "italy",
                        "spain",
                        "netherlands",
                        "sweden",
                        "norway",
                        "denmark",
                        "united kingdom",
                    ],
                ),
                ("north_america", &["united states", "canada", "mexico"]),
                (
                    "asia",
                    &["china", "japan", "south korea", "singapore", "india"],
                ),
                ("africa", &["nigeria", "ghana", "kenya", "south africa"]),
            ]),
        }
    }
}

impl CountryRules {
    pub fn same_region(&self, a: &str, b: &str) -> bool {
        let a = a.trim().to_lowercase();
        let b = b.trim().to_lowercase();
        self.regions
            .values()
            .any(|members| members.contains(&a) && members.contains(&b))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpaRules {
    pub no_requirement_ratio: f64,
    pub meets_base_ratio: f64,
    /// Added per full grade point above the requirement.
    pub bonus_per_point: f64,
    pub near_miss_margin: f64,
    pub near_miss_ratio: f64,
}

impl Default for GpaRules {
    fn default() -> Self {
        Self {
            no_requirement_ratio: 0.9,
            meets_base_ratio: 0.8,
            bonus_per_point: 0.1,
            near_miss_margin: 0.3,
            near_miss_ratio: 0.5,
        }
    }
}

/// Root of the configurable ruleset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRuleset {
    pub weights: CriterionWeights,
    pub level: LevelRules,
    pub field: FieldRules,
    pub gpa: GpaRules,
    pub citizenship: CitizenshipRules,
    pub country: CountryRules,
    pub extraction: ExtractionTables,
}

impl MatchRuleset {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read match ruleset at {}", path.display()))?;
        let ruleset: MatchRuleset = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid match ruleset in {}", path.display()))?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        let all = [w.academic_level, w.field_of_study, w.gpa, w.citizenship, w.country];
        if all.iter().any(|v| *v < 0.0 || !v.is_finite()) {
            bail!("Criterion weights must be finite and non-negative");
        }
        if w.sum() <= 0.0 {
            bail!("Criterion weights must not all be zero");
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn table(rows: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    rows.iter()
        .map(|(key, members)| (key.to_string(), strings(members)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_100() {
        assert!((CriterionWeights::default().sum() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_commonwealth_group_contains_nigeria() {
        let rules = CitizenshipRules::default();
        let groups = rules.groups_for("Nigeria");
        assert!(groups.contains(&"Commonwealth countries"));
        assert!(groups.contains(&"Non-US citizens"));
    }

    #[test]
    fn test_us_citizen_is_not_non_us() {
        let rules = CitizenshipRules::default();
        assert!(rules.groups_for("United States").is_empty());
    }

    #[test]
    fn test_same_region_is_case_insensitive() {
        let rules = CountryRules::default();
        assert!(rules.same_region("Germany", "United Kingdom"));
        assert!(!rules.same_region("Germany", "Canada"));
        assert!(!rules.same_region("Atlantis", "Atlantis"));
    }

    #[test]
    fn test_search_terms_include_aliases() {
        let rules = FieldRules::default();
        assert_eq!(
            rules.search_terms("Computer Science"),
            vec!["computer science".to_string(), "cybersecurity".to_string()]
        );
        assert_eq!(rules.search_terms("Law"), vec!["law".to_string()]);
    }

    #[test]
    fn test_partial_json_ruleset_keeps_defaults() {
        let json = r#"{ "weights": { "academic_level": 50, "field_of_study": 50, "gpa": 0, "citizenship": 0, "country": 0 } }"#;
        let ruleset: MatchRuleset = serde_json::from_str(json).unwrap();
        assert_eq!(ruleset.weights.academic_level, 50.0);
        assert_eq!(ruleset.field.various_sentinel, "Various");
        assert!(ruleset.validate().is_ok());
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let mut ruleset = MatchRuleset::default();
        ruleset.weights.gpa = -1.0;
        assert!(ruleset.validate().is_err());
    }
}
