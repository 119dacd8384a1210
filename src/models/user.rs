// src/models/user.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, Utc};

// ==================== USER ====================

/// A roster entry, persisted verbatim in the `sistemaAgraria_users`
/// collection. The password is stored in plaintext: this system has no
/// trusted boundary and is insecure by construction.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub document: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub locality: String,
    #[serde(default)]
    pub party: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub alt_phone: String,
    pub role: Role,
    pub active: bool,
    pub security_question: String,
    pub security_answer: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn initials(&self) -> String {
        let first = self.first_name.chars().next().unwrap_or_default();
        let last = self.last_name.chars().next().unwrap_or_default();
        format!("{}{}", first, last).to_uppercase()
    }
}

/// Normalizes a teacher display name for matching: strips an optional
/// leading "Prof." marker, lowercases and trims. Legacy environment records
/// reference teachers by display name only.
pub fn normalize_teacher_name(name: &str) -> String {
    let trimmed = name.trim();
    let lower = trimmed.to_lowercase();
    let stripped = lower
        .strip_prefix("prof.")
        .or_else(|| lower.strip_prefix("prof"))
        .unwrap_or(&lower);
    stripped.trim().to_string()
}

// ==================== ROLE ====================

/// The closed set of operator roles. Permissions are decided here and
/// nowhere else; modules never compare role strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "administrador")]
    Administrator,
    #[serde(rename = "jefe_area")]
    AreaLead,
    #[serde(rename = "profesor_animal")]
    AnimalTeacher,
    #[serde(rename = "profesor_vegetal")]
    PlantTeacher,
    #[serde(rename = "estandar")]
    Standard,
}

/// Which of the two teacher subtypes a teacher role maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeacherKind {
    Animal,
    Plant,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "administrador" => Some(Role::Administrator),
            "jefe_area" => Some(Role::AreaLead),
            "profesor_animal" => Some(Role::AnimalTeacher),
            "profesor_vegetal" => Some(Role::PlantTeacher),
            "estandar" => Some(Role::Standard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrador",
            Role::AreaLead => "jefe_area",
            Role::AnimalTeacher => "profesor_animal",
            Role::PlantTeacher => "profesor_vegetal",
            Role::Standard => "estandar",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrator",
            Role::AreaLead => "Area Lead",
            Role::AnimalTeacher => "Teacher - Animal",
            Role::PlantTeacher => "Teacher - Plant",
            Role::Standard => "Standard User",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Administrator)
    }

    pub fn is_area_lead(&self) -> bool {
        matches!(self, Role::AreaLead)
    }

    pub fn is_teacher(&self) -> bool {
        matches!(self, Role::AnimalTeacher | Role::PlantTeacher)
    }

    pub fn teacher_kind(&self) -> Option<TeacherKind> {
        match self {
            Role::AnimalTeacher => Some(TeacherKind::Animal),
            Role::PlantTeacher => Some(TeacherKind::Plant),
            _ => None,
        }
    }

    // ======== USER ADMINISTRATION ========
    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::Administrator)
    }

    // ======== ENVIRONMENT PERMISSIONS ========
    pub fn can_view_environments(&self) -> bool {
        !matches!(self, Role::AreaLead)
    }

    pub fn can_manage_environments(&self) -> bool {
        matches!(self, Role::Administrator)
    }

    // ======== ACTIVITY PERMISSIONS ========
    pub fn can_register_activities(&self) -> bool {
        true // every authenticated role records activities
    }

    // ======== SALES PERMISSIONS ========
    pub fn can_view_sales(&self) -> bool {
        !self.is_teacher()
    }

    pub fn can_register_sales(&self) -> bool {
        matches!(self, Role::Administrator | Role::Standard)
    }

    // ======== INVENTORY PERMISSIONS ========
    pub fn can_view_inventory(&self) -> bool {
        !self.is_teacher()
    }

    pub fn can_manage_products(&self) -> bool {
        matches!(self, Role::Administrator)
    }

    pub fn can_record_movements(&self) -> bool {
        self.can_view_inventory()
    }

    // ======== REPORT PERMISSIONS ========
    pub fn can_export_reports(&self) -> bool {
        true // query views are open to every authenticated role
    }

    /// Get all available roles
    pub fn all_roles() -> Vec<Self> {
        vec![
            Role::Administrator,
            Role::AreaLead,
            Role::AnimalTeacher,
            Role::PlantTeacher,
            Role::Standard,
        ]
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==================== REQUEST STRUCTS ====================

#[derive(Debug, Deserialize, Validate, Clone)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,

    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 20, message = "Document is required"))]
    pub document: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub address: Option<String>,
    pub locality: Option<String>,
    pub party: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub alt_phone: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    pub role: Role,
    pub active: bool,

    #[validate(length(min = 1, message = "Security question is required"))]
    pub security_question: String,

    #[validate(length(min = 1, message = "Security answer is required"))]
    pub security_answer: String,
}

#[derive(Debug, Deserialize, Validate, Clone)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,

    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 20, message = "Document is required"))]
    pub document: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub address: Option<String>,
    pub locality: Option<String>,
    pub party: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub alt_phone: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Username is required"))]
    pub username: String,

    /// Empty or missing keeps the stored password.
    pub password: Option<String>,

    pub role: Role,
    pub active: bool,

    #[validate(length(min = 1, message = "Security question is required"))]
    pub security_question: String,

    #[validate(length(min = 1, message = "Security answer is required"))]
    pub security_answer: String,
}

// ==================== TESTS ====================
