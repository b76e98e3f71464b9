//! Profile extraction: derives a partial `UserProfile` from what the student has said.
//!
//! Pure keyword/regex matching over the lowercased user turns. Tables are
//! scanned in declaration order and the first entry with a hit wins, so more
//! specific entries must be declared before broader ones.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::opportunity::AcademicLevel;
use crate::models::profile::{ConversationTurn, Role, UserProfile};

/// GPA patterns in priority order. Capture group 1 is the value.
static GPA_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bgpa\s*(?:is|of|=|:)?\s*:?\s*(\d+(?:\.\d+)?)",
        r"\bgrade point average\s*(?:is|of|=|:)?\s*:?\s*(\d+(?:\.\d+)?)",
        r"\bcgpa\s*(?:is|of|=|:)?\s*:?\s*(\d+(?:\.\d+)?)",
        r"(\d+(?:\.\d+)?)\s*c?gpa\b",
        r"(\d+(?:\.\d+)?)\s*out\s+of\s+4(?:\.0+)?\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const GPA_RANGE: std::ops::RangeInclusive<f64> = 0.0..=4.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelKeywords {
    pub level: AcademicLevel,
    pub keywords: Vec<String>,
}

/// Canonical value and the phrases that imply it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub value: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionTables {
    /// Checked in order: phd, then graduate, then undergraduate.
    pub levels: Vec<LevelKeywords>,
    pub fields: Vec<KeywordEntry>,
    pub citizenship: Vec<KeywordEntry>,
    pub destinations: Vec<KeywordEntry>,
    /// Phrases in the latest user message that ask for a search.
    pub search_triggers: Vec<String>,
}

impl Default for ExtractionTables {
    fn default() -> Self {
        Self {
            levels: vec![
                level(
                    AcademicLevel::Phd,
                    &["phd", "ph.d", "doctorate", "doctoral", "dphil"],
                ),
                level(
                    AcademicLevel::Graduate,
                    &[
                        "master",
                        "masters",
                        "master's",
                        "msc",
                        "m.sc",
                        "mba",
                        "postgraduate",
                        "graduate student",
                        "graduate school",
                        "grad school",
                        "graduate",
                    ],
                ),
                level(
                    AcademicLevel::Undergraduate,
                    &[
                        "undergraduate",
                        "undergrad",
                        "bachelor",
                        "bachelors",
                        "bachelor's",
                        "bsc",
                        "b.sc",
                        "college student",
                        "freshman",
                        "sophomore",
                        "high school senior",
                    ],
                ),
            ],
            fields: vec![
                entry(
                    "Computer Science",
                    &[
                        "computer science",
                        "cs",
                        "computing",
                        "software",
                        "programming",
                        "informatics",
                    ],
                ),
                entry(
                    "Cybersecurity",
                    &[
                        "cybersecurity",
                        "cyber security",
                        "information security",
                        "infosec",
                        "network security",
                    ],
                ),
                entry(
                    "Artificial Intelligence",
                    &["artificial intelligence", "machine learning", "deep learning", "ai"],
                ),
                entry("Data Science", &["data science", "data analytics", "statistics"]),
                entry(
                    "Engineering",
                    &[
                        "engineering",
                        "mechanical",
                        "electrical",
                        "civil engineer",
                        "chemical engineer",
                    ],
                ),
                entry(
                    "Medicine",
                    &["medicine", "medical", "nursing", "pharmacy", "public health"],
                ),
                entry(
                    "Business",
                    &["business", "management", "finance", "marketing", "economics"],
                ),
                entry("Law", &["law", "legal studies"]),
                entry("Education", &["education", "teaching"]),
                entry("Biology", &["biology", "biotechnology", "life sciences"]),
                entry("Physics", &["physics"]),
                entry("Mathematics", &["mathematics", "maths", "math"]),
                entry("Arts", &["fine arts", "music", "design", "literature"]),
            ],
            citizenship: vec![
                entry(
                    "Nigeria",
                    &["nigerian", "from nigeria", "citizen of nigeria", "nigeria citizen"],
                ),
                entry("Ghana", &["ghanaian", "from ghana", "citizen of ghana"]),
                entry("Kenya", &["kenyan", "from kenya", "citizen of kenya"]),
                entry(
                    "South Africa",
                    &["south african", "from south africa", "citizen of south africa"],
                ),
                entry("India", &["indian citizen", "from india", "citizen of india"]),
                entry(
                    "United States",
                    &[
                        "us citizen",
                        "u.s. citizen",
                        "american citizen",
                        "i am american",
                        "i'm american",
                        "from the us",
                        "from the usa",
                        "from the united states",
                        "citizen of the united states",
                    ],
                ),
                entry(
                    "United Kingdom",
                    &[
                        "british citizen",
                        "i am british",
                        "i'm british",
                        "from the uk",
                        "from the united kingdom",
                    ],
                ),
                entry("Canada", &["canadian citizen", "from canada", "i'm canadian"]),
                entry("China", &["chinese citizen", "from china"]),
                entry("Pakistan", &["pakistani", "from pakistan"]),
            ],
            destinations: vec![
                entry(
                    "United Kingdom",
                    &[
                        "study in the uk",
                        "in the uk",
                        "to the uk",
                        "in the united kingdom",
                        "to the united kingdom",
                        "in england",
                        "in britain",
                        "uk universities",
                    ],
                ),
                entry(
                    "United States",
                    &[
                        "study in the us",
                        "in the us",
                        "in the usa",
                        "to the us",
                        "to the usa",
                        "in the united states",
                        "to the united states",
                        "in america",
                        "american universities",
                    ],
                ),
                entry("Canada", &["in canada", "to canada", "canadian universities"]),
                entry("Germany", &["in germany", "to germany", "german universities"]),
                entry("Netherlands", &["in the netherlands", "to the netherlands"]),
                entry("France", &["in france", "to france"]),
                entry("Australia", &["in australia", "to australia"]),
                entry("Japan", &["in japan", "to japan"]),
                entry("Singapore", &["in singapore", "to singapore"]),
            ],
            search_triggers: [
                "scholarship",
                "scholarships",
                "fellowship",
                "fellowships",
                "grant",
                "grants",
                "funding",
                "opportunities",
                "search",
                "find",
                "show me",
                "yes",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

fn level(level: AcademicLevel, keywords: &[&str]) -> LevelKeywords {
    LevelKeywords {
        level,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn entry(value: &str, keywords: &[&str]) -> KeywordEntry {
    KeywordEntry {
        value: value.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

/// Derives a partial profile from the user's side of a conversation.
/// Never fails; fields with no evidence stay `None`.
pub fn extract_profile(conversation: &[ConversationTurn], tables: &ExtractionTables) -> UserProfile {
    let text = conversation
        .iter()
        .filter(|turn| turn.role == Role::User)
        .map(|turn| turn.content.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n");

    if text.trim().is_empty() {
        return UserProfile::default();
    }

    UserProfile {
        academic_level: tables
            .levels
            .iter()
            .find(|group| mentions_any(&text, &group.keywords))
            .map(|group| group.level),
        field_of_study: first_entry(&text, &tables.fields),
        citizenship: first_entry(&text, &tables.citizenship),
        country: first_entry(&text, &tables.destinations),
        current_gpa: extract_gpa(&text),
    }
}

/// True when `message` contains any configured search trigger.
pub fn requests_search(message: &str, tables: &ExtractionTables) -> bool {
    mentions_any(&message.to_lowercase(), &tables.search_triggers)
}

fn first_entry(text: &str, entries: &[KeywordEntry]) -> Option<String> {
    entries
        .iter()
        .find(|e| mentions_any(text, &e.keywords))
        .map(|e| e.value.clone())
}

fn mentions_any(text: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|k| contains_term(text, &k.to_lowercase()))
}

/// First GPA in [0, 4], trying each pattern in priority order.
fn extract_gpa(text: &str) -> Option<f64> {
    GPA_PATTERNS.iter().find_map(|re| {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
            .find(|gpa| GPA_RANGE.contains(gpa))
    })
}

/// Whole-term containment: `term` must not be glued to surrounding letters or digits,
/// so "graduate" does not fire inside "undergraduate".
pub(crate) fn contains_term(haystack: &str, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return false;
    }
    haystack.match_indices(term).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + term.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
