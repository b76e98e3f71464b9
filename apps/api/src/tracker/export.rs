//! CSV export of tracked opportunities.

use csv::WriterBuilder;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::matches::TrackedMatch;
use crate::models::opportunity::format_usd;

pub const NO_OPPORTUNITIES_MESSAGE: &str =
    "No opportunities to download. Please find some opportunities first through the chat.";

pub const HEADERS: [&str; 15] = [
    "Title",
    "Institution",
    "Type",
    "Level",
    "Field",
    "Country",
    "Deadline",
    "Funding Amount",
    "Match Score (%)",
    "Requirements",
    "GPA Requirement",
    "Citizenship Requirements",
    "Language Requirements",
    "Application URL",
    "Created Date",
];

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{}", NO_OPPORTUNITIES_MESSAGE)]
    NoOpportunities,

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer error: {0}")]
    Buffer(String),
}

/// Renders tracked matches as CSV, one row per match in the given order.
/// An empty list is an error: no file is produced.
pub fn export_csv(rows: &[TrackedMatch]) -> Result<String, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::NoOpportunities);
    }

    let mut wtr = WriterBuilder::new().from_writer(Vec::new());
    wtr.write_record(HEADERS)?;

    for row in rows {
        let opp = &row.opportunity;
        wtr.write_record([
            opp.title.clone(),
            opp.institution.clone(),
            opp.category.to_string(),
            opp.level.to_string(),
            or_na(&opp.field),
            opp.country.clone(),
            opp.deadline.format("%Y-%m-%d").to_string(),
            format_usd(opp.funding_amount),
            row.record.match_score.to_string(),
            or_na(&opp.requirements),
            opp.min_gpa()
                .map(|gpa| gpa.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            if opp.citizenship_requirements.is_empty() {
                "Any".to_string()
            } else {
                opp.citizenship_requirements.join("; ")
            },
            describe_map(&opp.language_requirements),
            or_na(&opp.application_url),
            row.record.created_at.format("%Y-%m-%d").to_string(),
        ])?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Buffer(e.to_string()))
}

fn or_na(value: &str) -> String {
    if value.trim().is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value.to_string()
    }
}

/// `{"english": "IELTS 6.5"}` → `english: IELTS 6.5`.
fn describe_map(map: &Map<String, Value>) -> String {
    if map.is_empty() {
        return NOT_AVAILABLE.to_string();
    }
    map.iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}: {s}"),
            other => format!("{key}: {other}"),
        })
        .collect::<Vec<_>>()
        .join("; ")
}
