// src/users.rs - User administration (admin only)
use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::auth::{load_or_seed_users, save_users, AuthService};
use crate::error::{AppError, AppResult};
use crate::models::{CreateUserRequest, UpdateUserRequest, User};
use crate::storage::Store;
use crate::validator::ValidationResult;

pub struct UsersService {
    store: Arc<Store>,
    auth: Arc<AuthService>,
}

impl UsersService {
    pub fn new(store: Arc<Store>, auth: Arc<AuthService>) -> Self {
        Self { store, auth }
    }

    pub fn list(&self) -> AppResult<Vec<User>> {
        self.auth.require_admin()?;
        Ok(load_or_seed_users(&self.store))
    }

    pub fn get(&self, id: i64) -> AppResult<User> {
        self.auth.require_admin()?;
        load_or_seed_users(&self.store)
            .into_iter()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound(format!("User with ID '{}' not found", id)))
    }

    pub fn create(&self, request: CreateUserRequest) -> AppResult<User> {
        self.auth.require_admin()?;
        request.validate()?;

        let mut users = load_or_seed_users(&self.store);
        check_uniqueness(&users, &request.username, &request.document, &request.email, None)
            .into_result()?;

        let now = Utc::now();
        let user = User {
            id: next_id(&users),
            username: request.username,
            password: request.password,
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            document: request.document,
            address: request.address.unwrap_or_default(),
            locality: request.locality.unwrap_or_default(),
            party: request.party.unwrap_or_default(),
            postal_code: request.postal_code.unwrap_or_default(),
            phone: request.phone.unwrap_or_default(),
            alt_phone: request.alt_phone.unwrap_or_default(),
            role: request.role,
            active: request.active,
            security_question: request.security_question,
            security_answer: request.security_answer,
            created_at: now,
            updated_at: now,
        };

        users.push(user.clone());
        save_users(&self.store, &users)?;

        log::info!("User '{}' created with role {}", user.username, user.role);
        Ok(user)
    }

    /// Full-record replace. A missing or empty password keeps the stored
    /// one; created_at survives the edit.
    pub fn update(&self, id: i64, request: UpdateUserRequest) -> AppResult<User> {
        self.auth.require_admin()?;
        request.validate()?;

        let mut users = load_or_seed_users(&self.store);
        let index = users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound(format!("User with ID '{}' not found", id)))?;

        check_uniqueness(&users, &request.username, &request.document, &request.email, Some(id))
            .into_result()?;

        let password = match request.password.as_deref() {
            Some(p) if !p.is_empty() => {
                if p.chars().count() < 6 {
                    return Err(AppError::ValidationError(
                        "Password must be at least 6 characters".to_string(),
                    ));
                }
                p.to_string()
            }
            _ => users[index].password.clone(),
        };

        let updated = User {
            id,
            username: request.username,
            password,
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            document: request.document,
            address: request.address.unwrap_or_default(),
            locality: request.locality.unwrap_or_default(),
            party: request.party.unwrap_or_default(),
            postal_code: request.postal_code.unwrap_or_default(),
            phone: request.phone.unwrap_or_default(),
            alt_phone: request.alt_phone.unwrap_or_default(),
            role: request.role,
            active: request.active,
            security_question: request.security_question,
            security_answer: request.security_answer,
            created_at: users[index].created_at,
            updated_at: Utc::now(),
        };

        users[index] = updated.clone();
        save_users(&self.store, &users)?;
        Ok(updated)
    }

    /// Hard delete. The logged-in operator cannot remove their own account.
    pub fn delete(&self, id: i64) -> AppResult<()> {
        let current = self.auth.require_admin()?;
        if current.id == id {
            return Err(AppError::BadRequest("You cannot delete your own user".to_string()));
        }

        let mut users = load_or_seed_users(&self.store);
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(AppError::NotFound(format!("User with ID '{}' not found", id)));
        }

        save_users(&self.store, &users)?;
        log::info!("User {} deleted", id);
        Ok(())
    }
}

fn next_id(users: &[User]) -> i64 {
    users.iter().map(|u| u.id).max().unwrap_or(0) + 1
}

fn check_uniqueness(
    users: &[User],
    username: &str,
    document: &str,
    email: &str,
    exclude_id: Option<i64>,
) -> ValidationResult {
    let mut result = ValidationResult::new();
    let others = users.iter().filter(|u| Some(u.id) != exclude_id);

    for user in others {
        if user.username.to_lowercase() == username.to_lowercase() {
            result.add_error("username", "This username already exists");
        }
        if !document.is_empty() && user.document == document {
            result.add_error("document", "This document is already registered");
        }
        if user.email == email {
            result.add_error("email", "This email is already registered");
        }
    }

    result
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::models::Role;

    async fn admin_service() -> UsersService {
        let store = Arc::new(Store::in_memory());
        let config = AuthConfig {
            login_delay_ms: 0,
            ..AuthConfig::default()
        };
        let auth = Arc::new(AuthService::new(store.clone(), config));
        auth.login("admin", "admin123", false).await.unwrap();
        UsersService::new(store, auth)
    }

    fn new_user_request(username: &str, document: &str, email: &str) -> CreateUserRequest {
        CreateUserRequest {
            last_name: "García".to_string(),
            first_name: "Juan".to_string(),
            document: document.to_string(),
            email: email.to_string(),
            address: None,
            locality: None,
            party: None,
            postal_code: None,
            phone: None,
            alt_phone: None,
            username: username.to_string(),
            password: "usuario123".to_string(),
            role: Role::Standard,
            active: true,
            security_question: "¿Cuál es el nombre de tu primera mascota?".to_string(),
            security_answer: "firulais".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_user() {
        let service = admin_service().await;
        let user = service
            .create(new_user_request("jgarcia", "87654321", "juan.garcia@email.com"))
            .unwrap();

        assert_eq!(user.id, 5); // four seeded users come first
        assert_eq!(service.list().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let service = admin_service().await;
        service
            .create(new_user_request("jgarcia", "87654321", "juan.garcia@email.com"))
            .unwrap();

        // Same username (case-insensitive), document and email
        let err = service
            .create(new_user_request("JGARCIA", "87654321", "juan.garcia@email.com"))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("username"));
        assert!(msg.contains("document"));
        assert!(msg.contains("email"));
    }

    #[tokio::test]
    async fn test_create_validates_fields() {
        let service = admin_service().await;

        let mut bad_email = new_user_request("nuevo", "111", "not-an-email");
        bad_email.email = "not-an-email".to_string();
        assert!(service.create(bad_email).is_err());

        let mut short_password = new_user_request("nuevo", "111", "nuevo@email.com");
        short_password.password = "abc".to_string();
        assert!(service.create(short_password).is_err());
    }

    #[tokio::test]
    async fn test_update_keeps_password_when_blank() {
        let service = admin_service().await;
        let user = service
            .create(new_user_request("jgarcia", "87654321", "juan.garcia@email.com"))
            .unwrap();

        let update = UpdateUserRequest {
            last_name: "García".to_string(),
            first_name: "Juan Manuel".to_string(),
            document: user.document.clone(),
            email: user.email.clone(),
            address: None,
            locality: None,
            party: None,
            postal_code: None,
            phone: None,
            alt_phone: None,
            username: user.username.clone(),
            password: None,
            role: Role::Standard,
            active: true,
            security_question: user.security_question.clone(),
            security_answer: user.security_answer.clone(),
        };

        let updated = service.update(user.id, update).unwrap();
        assert_eq!(updated.first_name, "Juan Manuel");
        assert_eq!(updated.password, "usuario123");
        assert_eq!(updated.created_at, user.created_at);
        assert!(updated.updated_at >= user.updated_at);
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let service = admin_service().await;
        let user = service
            .create(new_user_request("jgarcia", "87654321", "juan.garcia@email.com"))
            .unwrap();

        // No self-delete (admin is id 1)
        assert!(service.delete(1).is_err());

        service.delete(user.id).unwrap();
        assert!(service.delete(user.id).is_err()); // already gone
        assert_eq!(service.list().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_requires_admin() {
        let store = Arc::new(Store::in_memory());
        let config = AuthConfig {
            login_delay_ms: 0,
            ..AuthConfig::default()
        };
        let auth = Arc::new(AuthService::new(store.clone(), config));
        auth.login("prof.animal", "prof123", false).await.unwrap();

        let service = UsersService::new(store, auth);
        assert!(matches!(service.list().unwrap_err(), AppError::Forbidden(_)));
        assert!(matches!(
            service
                .create(new_user_request("x", "1", "x@email.com"))
                .unwrap_err(),
            AppError::Forbidden(_)
        ));
    }
}
