// src/validator.rs - Centralized validation module
use std::collections::HashMap;
use serde::Serialize;
use regex::Regex;
use lazy_static::lazy_static;
use chrono::NaiveDate;
use crate::error::AppError;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

// ==================== VALIDATION RESULT ====================

/// Per-field validation outcome. Form handling never maps untyped records:
/// every check lands in a named field bucket that the host UI can render
/// next to its input.
#[derive(Debug, Default, Serialize)]
pub struct ValidationResult {
    pub errors: HashMap<String, Vec<String>>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        for (field, errors) in other.errors {
            self.errors.entry(field).or_default().extend(errors);
        }
    }

    pub fn to_app_error(&self) -> AppError {
        let mut fields: Vec<_> = self.errors.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        let message = fields
            .iter()
            .map(|(field, errors)| format!("{}: {}", field, errors.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");

        AppError::ValidationError(message)
    }

    /// Ok when clean, the aggregated error otherwise.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self.to_app_error())
        }
    }
}

// ==================== FIELD VALIDATORS ====================

pub struct FieldValidator;

impl FieldValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            Err(format!("{} cannot be empty", field))
        } else {
            Ok(())
        }
    }

    pub fn length(value: &str, field: &str, min: Option<usize>, max: Option<usize>) -> Result<(), String> {
        let len = value.chars().count();
        if let Some(min) = min {
            if len < min {
                return Err(format!("{} must be at least {} characters", field, min));
            }
        }
        if let Some(max) = max {
            if len > max {
                return Err(format!("{} cannot exceed {} characters", field, max));
            }
        }
        Ok(())
    }

    pub fn email(value: &str, field: &str) -> Result<(), String> {
        if EMAIL_REGEX.is_match(value) {
            Ok(())
        } else {
            Err(format!("{} is not a valid email address", field))
        }
    }

    pub fn range_f64(value: f64, field: &str, min: Option<f64>, max: Option<f64>) -> Result<(), String> {
        if let Some(min) = min {
            if value < min {
                return Err(format!("{} must be at least {}", field, min));
            }
        }
        if let Some(max) = max {
            if value > max {
                return Err(format!("{} cannot exceed {}", field, max));
            }
        }
        Ok(())
    }

    /// Dates are entered for things that already happened.
    pub fn not_in_future(value: NaiveDate, today: NaiveDate, field: &str) -> Result<(), String> {
        if value > today {
            Err(format!("{} cannot be in the future", field))
        } else {
            Ok(())
        }
    }
}

// ==================== TESTS ====================
