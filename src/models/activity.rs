// src/models/activity.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use super::environment::EnvironmentKind;

// ==================== ACTIVITY ====================

/// A logged training activity. Environment data (name, kind, teacher,
/// year/division/group) is denormalized at registration time, so the
/// record stays readable even if the environment is later deleted.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub environment_id: i64,
    pub environment_name: String,
    pub environment_type: EnvironmentKind,
    pub responsible_teacher: String,
    pub year: String,
    pub division: String,
    pub group: String,
    pub activity_date: NaiveDate,
    pub activity_time: NaiveTime,
    pub duration: i64,
    pub activity_title: String,
    pub activity_description: String,
    #[serde(default)]
    pub observations: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==================== REQUEST STRUCTS ====================

#[derive(Debug, Deserialize, Validate, Clone)]
pub struct RegisterActivityRequest {
    pub environment_id: i64,

    pub activity_date: NaiveDate,
    pub activity_time: NaiveTime,

    #[validate(range(min = 15, max = 480, message = "Duration must be between 15 and 480 minutes"))]
    pub duration: i64,

    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub activity_title: String,

    #[validate(length(min = 1, max = 2000, message = "Description is required"))]
    pub activity_description: String,

    #[validate(length(max = 1000, message = "Observations cannot exceed 1000 characters"))]
    pub observations: Option<String>,
}

/// Partial edit; the environment link and its denormalized fields are
/// fixed once registered.
#[derive(Debug, Deserialize, Validate, Clone)]
pub struct UpdateActivityRequest {
    pub activity_date: NaiveDate,
    pub activity_time: NaiveTime,

    #[validate(range(min = 15, max = 480, message = "Duration must be between 15 and 480 minutes"))]
    pub duration: i64,

    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub activity_title: String,

    #[validate(length(min = 1, max = 2000, message = "Description is required"))]
    pub activity_description: String,

    #[validate(length(max = 1000, message = "Observations cannot exceed 1000 characters"))]
    pub observations: Option<String>,
}
