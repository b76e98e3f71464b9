use serde::{Deserialize, Serialize};

use crate::models::opportunity::AcademicLevel;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

#[cfg(test)]
impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Profile accumulated over a conversation. Any field may stay unknown forever.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_level: Option<AcademicLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citizenship: Option<String>,
    /// Preferred destination country.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_gpa: Option<f64>,
}

impl UserProfile {
    pub fn is_empty(&self) -> bool {
        self.academic_level.is_none()
            && self.field_of_study.is_none()
            && self.citizenship.is_none()
            && self.country.is_none()
            && self.current_gpa.is_none()
    }

    /// Level, field and citizenship are known: enough to run a search.
    pub fn is_search_ready(&self) -> bool {
        self.academic_level.is_some() && self.field_of_study.is_some() && self.citizenship.is_some()
    }

    /// Fills fields still unknown in `self` from `other`. Known values are kept.
    pub fn fill_missing_from(&mut self, other: &UserProfile) {
        if self.academic_level.is_none() {
            self.academic_level = other.academic_level;
        }
        if self.field_of_study.is_none() {
            self.field_of_study = other.field_of_study.clone();
        }
        if self.citizenship.is_none() {
            self.citizenship = other.citizenship.clone();
        }
        if self.country.is_none() {
            self.country = other.country.clone();
        }
        if self.current_gpa.is_none() {
            self.current_gpa = other.current_gpa;
        }
    }

    /// Names of the fields a search still needs, in the order they should be asked for.
    pub fn missing_for_search(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.academic_level.is_none() {
            missing.push("academic_level");
        }
        if self.field_of_study.is_none() {
            missing.push("field_of_study");
        }
        if self.citizenship.is_none() {
            missing.push("citizenship");
        }
        missing
    }
}
