use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Funding category of an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityType {
    Scholarship,
    Grant,
    Fellowship,
    Internship,
    Research,
}

impl OpportunityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityType::Scholarship => "scholarship",
            OpportunityType::Grant => "grant",
            OpportunityType::Fellowship => "fellowship",
            OpportunityType::Internship => "internship",
            OpportunityType::Research => "research",
        }
    }
}

impl fmt::Display for OpportunityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpportunityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scholarship" => Ok(OpportunityType::Scholarship),
            "grant" => Ok(OpportunityType::Grant),
            "fellowship" => Ok(OpportunityType::Fellowship),
            "internship" => Ok(OpportunityType::Internship),
            "research" => Ok(OpportunityType::Research),
            other => Err(format!("unknown opportunity type '{other}'")),
        }
    }
}

/// Academic level, ordered from least to most advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcademicLevel {
    Undergraduate,
    Graduate,
    Phd,
    Postdoc,
}

impl AcademicLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcademicLevel::Undergraduate => "undergraduate",
            AcademicLevel::Graduate => "graduate",
            AcademicLevel::Phd => "phd",
            AcademicLevel::Postdoc => "postdoc",
        }
    }

    /// The level a student at `self` would apply to next.
    /// Only undergraduate → graduate and graduate → phd count as adjacent.
    pub fn next_step(&self) -> Option<AcademicLevel> {
        match self {
            AcademicLevel::Undergraduate => Some(AcademicLevel::Graduate),
            AcademicLevel::Graduate => Some(AcademicLevel::Phd),
            AcademicLevel::Phd | AcademicLevel::Postdoc => None,
        }
    }
}

impl fmt::Display for AcademicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcademicLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "undergraduate" => Ok(AcademicLevel::Undergraduate),
            "graduate" => Ok(AcademicLevel::Graduate),
            "phd" => Ok(AcademicLevel::Phd),
            "postdoc" => Ok(AcademicLevel::Postdoc),
            other => Err(format!("unknown academic level '{other}'")),
        }
    }
}

/// A fundable academic program as served by the opportunity store.
/// Never mutated after it has been fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    pub institution: String,
    #[serde(rename = "type")]
    pub category: OpportunityType,
    pub field: String,
    pub level: AcademicLevel,
    pub country: String,
    pub deadline: NaiveDate,
    pub funding_amount: f64,
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub eligibility_criteria: Map<String, Value>,
    #[serde(default)]
    pub gpa_requirement: Option<f64>,
    #[serde(default)]
    pub citizenship_requirements: Vec<String>,
    #[serde(default)]
    pub language_requirements: Map<String, Value>,
    #[serde(default)]
    pub application_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Opportunity {
    /// Minimum GPA, treating zero or negative values as "no requirement".
    pub fn min_gpa(&self) -> Option<f64> {
        self.gpa_requirement.filter(|gpa| *gpa > 0.0)
    }

    pub fn has_language_requirements(&self) -> bool {
        !self.language_requirements.is_empty()
    }

    /// Whole days from `today` until the deadline; negative once it has passed.
    pub fn days_until_deadline(&self, today: NaiveDate) -> i64 {
        (self.deadline - today).num_days()
    }

    /// Still accepting applications on `today` (the deadline day itself counts).
    pub fn is_open_on(&self, today: NaiveDate) -> bool {
        self.deadline >= today
    }
}

/// Placeholder link for records stored without an application URL.
pub fn fallback_application_url(id: &str) -> String {
    format!("https://example.com/apply/{id}")
}

/// Normalizes a stored funding amount such as "$45,000" or "45000.50" to a number.
/// Anything that cannot be read as a number is 0.
pub fn parse_funding_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Whole-dollar amount with thousands separators, e.g. `$45,000`.
pub fn format_usd(amount: f64) -> String {
    let whole = amount.max(0.0).round() as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("${out}")
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    /// A graduate cybersecurity scholarship in the UK, open to Commonwealth citizens.
    pub fn cybersecurity_scholarship(deadline: NaiveDate) -> Opportunity {
        let mut language = Map::new();
        language.insert("english".to_string(), Value::from("IELTS 6.5 or TOEFL 90"));
        Opportunity {
            id: "commonwealth-cybersec".to_string(),
            title: "Commonwealth Scholarship for Cybersecurity Masters".to_string(),
            institution: "Commonwealth Scholarship Commission".to_string(),
            category: OpportunityType::Scholarship,
            field: "Cybersecurity".to_string(),
            level: AcademicLevel::Graduate,
            country: "United Kingdom".to_string(),
            deadline,
            funding_amount: 45000.0,
            requirements: "Bachelor's degree in Computer Science or related field".to_string(),
            eligibility_criteria: Map::new(),
            gpa_requirement: Some(3.3),
            citizenship_requirements: vec![
                "Nigeria".to_string(),
                "Commonwealth countries".to_string(),
            ],
            language_requirements: language,
            application_url: "https://cscuk.fcdo.gov.uk/scholarships/".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            updated_at: None,
        }
    }
}
