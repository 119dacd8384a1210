// src/models/environment.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, Utc};

use super::user::TeacherKind;

// ==================== ENVIRONMENT ====================

/// A training location (garden plot, nursery, poultry farm, ...).
/// `responsible_id` references a teacher in the roster; older records only
/// carried the free-text `responsible_teacher` label, which is kept for
/// display and for the backfill migration.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: i64,
    pub environment_name: String,
    pub environment_type: EnvironmentKind,
    #[serde(default)]
    pub responsible_id: Option<i64>,
    #[serde(default)]
    pub responsible_name: String,
    #[serde(default)]
    pub responsible_teacher: String,
    pub year: String,
    pub division: String,
    pub group: String,
    #[serde(default)]
    pub observations: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Environment {
    /// Display name of the responsible teacher, preferring the resolved
    /// roster name over the legacy free-text field.
    pub fn responsible_label(&self) -> &str {
        if self.responsible_name.is_empty() {
            &self.responsible_teacher
        } else {
            &self.responsible_name
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EnvironmentKind {
    #[serde(rename = "animal")]
    Animal,
    #[serde(rename = "vegetal")]
    Plant,
    #[serde(rename = "otro")]
    Other,
}

impl EnvironmentKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "animal" => Some(EnvironmentKind::Animal),
            "vegetal" => Some(EnvironmentKind::Plant),
            "otro" => Some(EnvironmentKind::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentKind::Animal => "animal",
            EnvironmentKind::Plant => "vegetal",
            EnvironmentKind::Other => "otro",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EnvironmentKind::Animal => "Animal",
            EnvironmentKind::Plant => "Vegetal",
            EnvironmentKind::Other => "Otro",
        }
    }

    /// The teacher subtype allowed to take responsibility for this kind.
    pub fn teacher_kind(&self) -> Option<TeacherKind> {
        match self {
            EnvironmentKind::Animal => Some(TeacherKind::Animal),
            EnvironmentKind::Plant => Some(TeacherKind::Plant),
            EnvironmentKind::Other => None,
        }
    }
}

impl std::fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==================== REQUEST STRUCTS ====================

#[derive(Debug, Deserialize, Validate, Clone)]
pub struct CreateEnvironmentRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub environment_name: String,

    pub environment_type: EnvironmentKind,

    /// Roster id of the responsible teacher.
    pub responsible_id: i64,

    #[validate(length(min = 1, max = 10, message = "Year is required"))]
    pub year: String,

    #[validate(length(min = 1, max = 10, message = "Division is required"))]
    pub division: String,

    #[validate(length(min = 1, max = 50, message = "Group is required"))]
    pub group: String,

    #[validate(length(max = 1000, message = "Observations cannot exceed 1000 characters"))]
    pub observations: Option<String>,
}
