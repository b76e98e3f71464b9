use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::ruleset::MatchRuleset;
use crate::models::matches::{ApplicationStatus, OpportunityMatch, TrackedMatch};
use crate::models::opportunity::{parse_funding_amount, Opportunity};
use crate::models::profile::UserProfile;
use crate::repository::{normalize, MatchStore, OpportunityRepository, SearchFilters};

/// Columns read for every opportunity query. Funding is read as text so that
/// rows stored as "$45,000" normalize the same way as numeric ones.
const OPPORTUNITY_COLUMNS: &str = "id, title, institution, type AS category, field, level, \
    country, deadline, funding_amount::text AS funding_amount, requirements, \
    eligibility_criteria, gpa_requirement::float8 AS gpa_requirement, \
    citizenship_requirements, language_requirements, application_url, created_at, updated_at";

#[derive(Debug, FromRow)]
struct OpportunityRow {
    id: String,
    title: String,
    institution: String,
    category: String,
    field: String,
    level: String,
    country: String,
    deadline: NaiveDate,
    funding_amount: Option<String>,
    requirements: Option<String>,
    eligibility_criteria: Option<Value>,
    gpa_requirement: Option<f64>,
    citizenship_requirements: Option<Vec<String>>,
    language_requirements: Option<Value>,
    application_url: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<OpportunityRow> for Opportunity {
    type Error = String;

    fn try_from(row: OpportunityRow) -> Result<Self, Self::Error> {
        Ok(normalize(Opportunity {
            category: row.category.parse()?,
            level: row.level.parse()?,
            id: row.id,
            title: row.title,
            institution: row.institution,
            field: row.field,
            country: row.country,
            deadline: row.deadline,
            funding_amount: row
                .funding_amount
                .as_deref()
                .map(parse_funding_amount)
                .unwrap_or(0.0),
            requirements: row.requirements.unwrap_or_default(),
            eligibility_criteria: object_or_empty(row.eligibility_criteria),
            gpa_requirement: row.gpa_requirement,
            citizenship_requirements: row.citizenship_requirements.unwrap_or_default(),
            language_requirements: object_or_empty(row.language_requirements),
            application_url: row.application_url.unwrap_or_default(),
            created_at: row.created_at.unwrap_or_else(Utc::now),
            updated_at: row.updated_at,
        }))
    }
}

fn object_or_empty(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Converts rows, skipping (and logging) any with an unknown category or level.
fn into_opportunities(rows: Vec<OpportunityRow>) -> Vec<Opportunity> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match Opportunity::try_from(row) {
                Ok(opp) => Some(opp),
                Err(e) => {
                    warn!("Skipping opportunity {id}: {e}");
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, FromRow)]
struct MatchRow {
    id: Uuid,
    user_id: Uuid,
    opportunity_id: String,
    match_score: i32,
    action_items: Vec<String>,
    application_status: String,
    profile_snapshot: Json<UserProfile>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MatchRow {
    fn into_match(self) -> OpportunityMatch {
        let application_status = self.application_status.parse().unwrap_or_else(|e| {
            warn!("Match {}: {e}, treating as not started", self.id);
            ApplicationStatus::NotStarted
        });
        OpportunityMatch {
            id: self.id,
            user_id: self.user_id,
            opportunity_id: self.opportunity_id,
            match_score: self.match_score.clamp(0, 100) as u32,
            action_items: self.action_items,
            application_status,
            profile_snapshot: self.profile_snapshot.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    academic_level: Option<String>,
    field_of_study: Option<String>,
    citizenship: Option<String>,
    country: Option<String>,
    current_gpa: Option<f64>,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        UserProfile {
            academic_level: row.academic_level.and_then(|l| l.parse().ok()),
            field_of_study: row.field_of_study,
            citizenship: row.citizenship,
            country: row.country,
            current_gpa: row.current_gpa,
        }
    }
}

/// Builds the search statement. Text comparisons are case-insensitive and
/// treat user input literally, matching `SearchFilters::matches`.
fn search_query(
    filters: &SearchFilters,
    today: NaiveDate,
    ruleset: &MatchRuleset,
) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE deadline >= "
    ));
    qb.push_bind(today);

    if let Some(level) = filters.level {
        qb.push(" AND level = ").push_bind(level.as_str());
    }
    if let Some(patterns) = filters.field_patterns(ruleset) {
        qb.push(" AND (");
        let mut separated = qb.separated(" OR ");
        for pattern in patterns {
            separated.push("field ILIKE ");
            separated.push_bind_unseparated(format!("%{}%", escape_like(&pattern)));
        }
        qb.push(")");
    }
    if let Some(country) = &filters.country {
        qb.push(" AND LOWER(country) = LOWER(")
            .push_bind(country.trim().to_string())
            .push(")");
    }
    if let Some(category) = filters.category {
        qb.push(" AND type = ").push_bind(category.as_str());
    }
    if let Some(gpa) = filters.gpa {
        qb.push(" AND (gpa_requirement IS NULL OR gpa_requirement <= ")
            .push_bind(gpa)
            .push(")");
    }
    if let Some(accepted) = filters.accepted_citizenships(ruleset) {
        let accepted: Vec<String> = accepted.iter().map(|a| a.trim().to_lowercase()).collect();
        qb.push(
            " AND (citizenship_requirements IS NULL \
             OR cardinality(citizenship_requirements) = 0 \
             OR EXISTS (SELECT 1 FROM unnest(citizenship_requirements) AS req \
             WHERE LOWER(TRIM(req)) = ANY(",
        )
        .push_bind(accepted)
        .push(")))");
    }
    qb.push(" ORDER BY deadline ASC");
    qb
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Postgres-backed opportunity and match store.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
    ruleset: Arc<MatchRuleset>,
}

impl PgRepository {
    pub fn new(pool: PgPool, ruleset: Arc<MatchRuleset>) -> Self {
        Self { pool, ruleset }
    }

    async fn opportunities_by_ids(&self, ids: &[String]) -> Result<Vec<Opportunity>, AppError> {
        let rows = sqlx::query_as::<_, OpportunityRow>(&format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(into_opportunities(rows))
    }
}

#[async_trait]
impl OpportunityRepository for PgRepository {
    async fn search(
        &self,
        filters: &SearchFilters,
        today: NaiveDate,
    ) -> Result<Vec<Opportunity>, AppError> {
        let mut qb = search_query(filters, today, &self.ruleset);
        let rows = qb
            .build_query_as::<OpportunityRow>()
            .fetch_all(&self.pool)
            .await?;
        debug!("Opportunity search returned {} rows", rows.len());
        Ok(into_opportunities(rows))
    }

    async fn get_opportunity(&self, id: &str) -> Result<Option<Opportunity>, AppError> {
        let row = sqlx::query_as::<_, OpportunityRow>(&format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(|r| into_opportunities(vec![r]).pop()))
    }

    async fn all_opportunities(&self) -> Result<Vec<Opportunity>, AppError> {
        let rows = sqlx::query_as::<_, OpportunityRow>(&format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities ORDER BY deadline ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(into_opportunities(rows))
    }
}

#[async_trait]
impl MatchStore for PgRepository {
    async fn save_match(&self, record: &OpportunityMatch) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO opportunity_matches
                (id, user_id, opportunity_id, match_score, action_items,
                 application_status, profile_snapshot, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, opportunity_id) DO UPDATE SET
                match_score = EXCLUDED.match_score,
                action_items = EXCLUDED.action_items,
                profile_snapshot = EXCLUDED.profile_snapshot,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.opportunity_id)
        .bind(record.match_score as i32)
        .bind(&record.action_items)
        .bind(record.application_status.as_str())
        .bind(Json(&record.profile_snapshot))
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn user_matches(&self, user_id: Uuid) -> Result<Vec<TrackedMatch>, AppError> {
        let rows = sqlx::query_as::<_, MatchRow>(
            "SELECT * FROM opportunity_matches WHERE user_id = $1 ORDER BY match_score DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<String> = rows.iter().map(|r| r.opportunity_id.clone()).collect();
        let opportunities: HashMap<String, Opportunity> = self
            .opportunities_by_ids(&ids)
            .await?
            .into_iter()
            .map(|o| (o.id.clone(), o))
            .collect();

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let opportunity = opportunities.get(&row.opportunity_id)?.clone();
                Some(TrackedMatch {
                    record: row.into_match(),
                    opportunity,
                })
            })
            .collect())
    }

    async fn update_match_status(
        &self,
        match_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE opportunity_matches SET application_status = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(status.as_str())
        .bind(match_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT academic_level, field_of_study, citizenship, country,
                   current_gpa::float8 AS current_gpa
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserProfile::from))
    }

    async fn upsert_profile(&self, user_id: Uuid, profile: &UserProfile) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles
                (user_id, academic_level, field_of_study, citizenship, country, current_gpa)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                academic_level = EXCLUDED.academic_level,
                field_of_study = EXCLUDED.field_of_study,
                citizenship = EXCLUDED.citizenship,
                country = EXCLUDED.country,
                current_gpa = EXCLUDED.current_gpa,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(profile.academic_level.map(|l| l.as_str()))
        .bind(&profile.field_of_study)
        .bind(&profile.citizenship)
        .bind(&profile.country)
        .bind(profile.current_gpa)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::opportunity::{AcademicLevel, OpportunityType};

    fn row() -> OpportunityRow {
        OpportunityRow {
            id: "chevening".to_string(),
            title: "Chevening Scholarship".to_string(),
            institution: "FCDO".to_string(),
            category: "scholarship".to_string(),
            field: "Various".to_string(),
            level: "graduate".to_string(),
            country: "United Kingdom".to_string(),
            deadline: NaiveDate::from_ymd_opt(2027, 11, 5).unwrap(),
            funding_amount: Some("$50,000".to_string()),
            requirements: None,
            eligibility_criteria: None,
            gpa_requirement: None,
            citizenship_requirements: None,
            language_requirements: Some(Value::String("n/a".to_string())),
            application_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_row_normalization() {
        let opp = Opportunity::try_from(row()).unwrap();
        assert_eq!(opp.category, OpportunityType::Scholarship);
        assert_eq!(opp.level, AcademicLevel::Graduate);
        assert_eq!(opp.funding_amount, 50000.0);
        assert_eq!(opp.application_url, "https://example.com/apply/chevening");
        assert!(opp.citizenship_requirements.is_empty());
        assert!(opp.language_requirements.is_empty());
        assert_eq!(opp.requirements, "");
    }

    #[test]
    fn test_unknown_level_row_is_skipped() {
        let mut bad = row();
        bad.level = "masters".to_string();
        let kept = into_opportunities(vec![bad, row()]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_profile_row_ignores_unknown_level() {
        let profile = UserProfile::from(ProfileRow {
            academic_level: Some("high school".to_string()),
            field_of_study: Some("Engineering".to_string()),
            citizenship: None,
            country: None,
            current_gpa: Some(3.1),
        });
        assert_eq!(profile.academic_level, None);
        assert_eq!(profile.field_of_study.as_deref(), Some("Engineering"));
    }

    #[test]
    fn test_search_query_compares_text_case_insensitively() {
        let filters = SearchFilters {
            country: Some("united_kingdom%".to_string()),
            citizenship: Some("Ghana".to_string()),
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let qb = search_query(&filters, today, &MatchRuleset::default());
        let sql = qb.sql();
        assert!(sql.contains("LOWER(country) = LOWER($2)"));
        assert!(!sql.contains("country ILIKE"));
        assert!(sql.contains("WHERE LOWER(TRIM(req)) = ANY($3)"));
        assert!(!sql.contains("citizenship_requirements &&"));
    }

    #[test]
    fn test_field_patterns_match_literally() {
        assert_eq!(escape_like("c++ 100%"), "c++ 100\\%");
        assert_eq!(escape_like("data_science"), "data\\_science");
        assert_eq!(escape_like("biology"), "biology");
    }
}
