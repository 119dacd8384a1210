use std::fmt;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    MissingFields,
    InvalidCredentials,
    Unauthorized(String),
    Forbidden(String),
    ValidationError(String),
    StorageError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::MissingFields => write!(f, "Missing Fields: all fields are required"),
            AppError::InvalidCredentials => write!(f, "Invalid Credentials: wrong username or password"),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            AppError::StorageError(msg) => write!(f, "Storage Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::StorageError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageError(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::StorageError(err.to_string())
    }
}

// Domain-specific errors
impl AppError {
    pub fn user_not_found(username: &str) -> Self {
        AppError::NotFound(format!("User '{}' not found", username))
    }

    pub fn environment_not_found(id: i64) -> Self {
        AppError::NotFound(format!("Environment with ID '{}' not found", id))
    }

    pub fn activity_not_found(id: i64) -> Self {
        AppError::NotFound(format!("Activity with ID '{}' not found", id))
    }

    pub fn product_not_found(id: i64) -> Self {
        AppError::NotFound(format!("Product with ID '{}' not found", id))
    }

    pub fn sale_not_found(id: i64) -> Self {
        AppError::NotFound(format!("Sale with ID '{}' not found", id))
    }

    pub fn username_taken(username: &str) -> Self {
        AppError::BadRequest(format!("Username '{}' already exists", username))
    }

    pub fn document_taken(document: &str) -> Self {
        AppError::BadRequest(format!("Document '{}' is already registered", document))
    }

    pub fn email_taken(email: &str) -> Self {
        AppError::BadRequest(format!("Email '{}' is already registered", email))
    }

    pub fn environment_name_taken(name: &str) -> Self {
        AppError::BadRequest(format!("An environment named '{}' already exists", name))
    }

    pub fn product_name_taken(name: &str) -> Self {
        AppError::BadRequest(format!("A product named '{}' already exists", name))
    }

    pub fn insufficient_stock(available: f64, requested: f64) -> Self {
        AppError::BadRequest(format!(
            "Insufficient stock. Available: {}, Requested: {}",
            available, requested
        ))
    }

    pub fn date_in_future(field: &str) -> Self {
        AppError::ValidationError(format!("{} cannot be in the future", field))
    }

    pub fn validation_failed(field: &str) -> Self {
        AppError::ValidationError(format!("Validation failed for field: {}", field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            AppError::user_not_found("jefe").to_string(),
            "Not Found: User 'jefe' not found"
        );
        assert_eq!(
            AppError::insufficient_stock(3.0, 5.0).to_string(),
            "Bad Request: Insufficient stock. Available: 3, Requested: 5"
        );
        assert!(AppError::InvalidCredentials.to_string().contains("wrong username or password"));
    }
}
