// src/auth.rs - Authentication, session management and route guards
use std::sync::{Arc, RwLock};
use std::time::Duration as StdDuration;

use chrono::Utc;

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Role, Session, TeacherKind, User};
use crate::storage::{keys, Store};

// ======== ROSTER ========

/// Reads the user roster, seeding the default demo users the first time
/// the collection is empty. The auth component owns the roster; the user
/// administration module goes through the same accessors.
pub fn load_or_seed_users(store: &Store) -> Vec<User> {
    if let Some(users) = store.get::<Vec<User>>(keys::USERS) {
        return users;
    }

    let users = default_users();
    if let Err(err) = store.put(keys::USERS, &users) {
        log::warn!("Could not persist seeded users: {}", err);
    }
    users
}

pub fn save_users(store: &Store, users: &[User]) -> AppResult<()> {
    store.put(keys::USERS, &users)
}

fn default_users() -> Vec<User> {
    let now = Utc::now();
    let user = |id: i64,
                username: &str,
                password: &str,
                email: &str,
                first_name: &str,
                last_name: &str,
                role: Role,
                question: &str,
                answer: &str| User {
        id,
        username: username.to_string(),
        password: password.to_string(),
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        document: String::new(),
        address: String::new(),
        locality: String::new(),
        party: String::new(),
        postal_code: String::new(),
        phone: String::new(),
        alt_phone: String::new(),
        role,
        active: true,
        security_question: question.to_string(),
        security_answer: answer.to_string(),
        created_at: now,
        updated_at: now,
    };

    vec![
        user(
            1,
            "admin",
            "admin123",
            "admin@sistemaagraria.com",
            "Administrador",
            "Sistema",
            Role::Administrator,
            "¿Cuál es el nombre de tu primera mascota?",
            "firulais",
        ),
        user(
            2,
            "jefe",
            "jefe123",
            "jefe.area@sistemaagraria.com",
            "Jefe",
            "Área",
            Role::AreaLead,
            "¿En qué ciudad naciste?",
            "buenos aires",
        ),
        user(
            3,
            "prof.animal",
            "prof123",
            "prof.animal@sistemaagraria.com",
            "Ana",
            "Martínez",
            Role::AnimalTeacher,
            "¿Cuál es tu color favorito?",
            "azul",
        ),
        user(
            4,
            "prof.vegetal",
            "prof123",
            "prof.vegetal@sistemaagraria.com",
            "María",
            "González",
            Role::PlantTeacher,
            "¿Cuál es tu comida favorita?",
            "milanesa",
        ),
    ]
}

// ======== AUTH SERVICE ========

pub struct AuthService {
    store: Arc<Store>,
    config: AuthConfig,
    current_user: RwLock<Option<User>>,
}

impl AuthService {
    pub fn new(store: Arc<Store>, config: AuthConfig) -> Self {
        let service = Self {
            store,
            config,
            current_user: RwLock::new(None),
        };
        load_or_seed_users(&service.store);
        service
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // ======== LOGIN / LOGOUT ========

    /// Authenticates against the roster: case-insensitive username, exact
    /// password, active account. The simulated network delay runs before
    /// the lookup regardless of outcome (loading-indicator UX, not retry
    /// logic); a blank field short-circuits without the delay.
    pub async fn login(&self, username: &str, password: &str, remember_me: bool) -> AppResult<Session> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AppError::MissingFields);
        }

        tokio::time::sleep(StdDuration::from_millis(self.config.login_delay_ms)).await;

        let users = load_or_seed_users(&self.store);
        let wanted = username.to_lowercase();
        let user = users
            .iter()
            .find(|u| u.username.to_lowercase() == wanted && u.password == password && u.active)
            .cloned()
            .ok_or(AppError::InvalidCredentials)?;

        let session = Session::for_user(&user, remember_me, Utc::now());
        self.store.put(keys::SESSION, &session)?;
        *self.current_user.write().unwrap() = Some(user.clone());

        log::info!("User '{}' logged in as {}", user.username, user.role);
        Ok(session)
    }

    /// Clears the session. The farewell toast and the delayed redirect to
    /// the entry page are host-UI concerns.
    pub fn logout(&self) {
        self.clear_session();
        log::info!("Session closed");
    }

    fn clear_session(&self) {
        if let Err(err) = self.store.remove(keys::SESSION) {
            log::warn!("Could not clear session: {}", err);
        }
        *self.current_user.write().unwrap() = None;
    }

    // ======== SESSION ========

    /// Re-validates the stored session, failing closed: a missing or
    /// malformed record, an unknown or inactive user, or an aged-out
    /// timestamp all clear the session and read as "not logged in".
    pub fn check_session(&self) -> Option<User> {
        let session: Session = match self.store.get(keys::SESSION) {
            Some(session) => session,
            None => {
                self.clear_session();
                return None;
            }
        };

        if !session.is_valid(Utc::now(), self.config.session_ttl_hours) {
            log::info!("Session for '{}' expired", session.username);
            self.clear_session();
            return None;
        }

        let users = load_or_seed_users(&self.store);
        match users.into_iter().find(|u| u.id == session.user_id && u.active) {
            Some(user) => {
                *self.current_user.write().unwrap() = Some(user.clone());
                Some(user)
            }
            None => {
                self.clear_session();
                None
            }
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.current_user.read().unwrap().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user.read().unwrap().is_some()
    }

    // ======== ROLE QUERIES ========

    pub fn is_admin(&self) -> bool {
        self.current_role().map(|r| r.is_admin()).unwrap_or(false)
    }

    pub fn is_area_lead(&self) -> bool {
        self.current_role().map(|r| r.is_area_lead()).unwrap_or(false)
    }

    pub fn is_teacher(&self) -> bool {
        self.current_role().map(|r| r.is_teacher()).unwrap_or(false)
    }

    pub fn teacher_kind(&self) -> Option<TeacherKind> {
        self.current_role().and_then(|r| r.teacher_kind())
    }

    fn current_role(&self) -> Option<Role> {
        self.current_user.read().unwrap().as_ref().map(|u| u.role)
    }

    // ======== ROUTE PROTECTION ========

    /// Guard called at the top of every protected operation.
    pub fn require_auth(&self) -> AppResult<User> {
        self.check_session()
            .ok_or_else(|| AppError::Unauthorized("Login required".to_string()))
    }

    pub fn require_admin(&self) -> AppResult<User> {
        let user = self.require_auth()?;
        if !user.role.is_admin() {
            return Err(AppError::Forbidden(
                "Administrator permissions required".to_string(),
            ));
        }
        Ok(user)
    }

    pub fn recovery(&self) -> PasswordRecovery<'_> {
        PasswordRecovery::new(self)
    }
}

// ======== PASSWORD RECOVERY ========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStep {
    IdentifyUser,
    AnswerQuestion,
    SetPassword,
    Done,
}

/// Linear three-step recovery flow. Steps only move forward; a wrong
/// answer keeps the machine where it is, and dropping the value discards
/// all progress (dismissing the recovery dialog).
pub struct PasswordRecovery<'a> {
    auth: &'a AuthService,
    step: RecoveryStep,
    user_id: Option<i64>,
}

impl<'a> PasswordRecovery<'a> {
    fn new(auth: &'a AuthService) -> Self {
        Self {
            auth,
            step: RecoveryStep::IdentifyUser,
            user_id: None,
        }
    }

    pub fn step(&self) -> RecoveryStep {
        self.step
    }

    /// Step 1: identify the account. Returns the stored security question
    /// to display.
    pub fn submit_username(&mut self, username: &str) -> AppResult<String> {
        if self.step != RecoveryStep::IdentifyUser {
            return Err(AppError::BadRequest("Recovery already past the username step".to_string()));
        }

        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::MissingFields);
        }

        let users = load_or_seed_users(self.auth.store());
        let wanted = username.to_lowercase();
        let user = users
            .iter()
            .find(|u| u.username.to_lowercase() == wanted)
            .ok_or_else(|| AppError::user_not_found(username))?;

        self.user_id = Some(user.id);
        self.step = RecoveryStep::AnswerQuestion;
        Ok(user.security_question.clone())
    }

    /// Step 2: case-insensitive exact match against the stored answer.
    pub fn submit_answer(&mut self, answer: &str) -> AppResult<()> {
        if self.step != RecoveryStep::AnswerQuestion {
            return Err(AppError::BadRequest("Identify the user before answering".to_string()));
        }

        let user_id = self.user_id.expect("user id set at the username step");
        let users = load_or_seed_users(self.auth.store());
        let user = users
            .iter()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::NotFound("User no longer exists".to_string()))?;

        if answer.trim().to_lowercase() != user.security_answer.to_lowercase() {
            return Err(AppError::BadRequest("Incorrect security answer".to_string()));
        }

        self.step = RecoveryStep::SetPassword;
        Ok(())
    }

    /// Step 3: overwrite the password and re-persist the roster. Any
    /// rejection leaves the stored password untouched.
    pub fn submit_new_password(&mut self, new_password: &str, confirmation: &str) -> AppResult<()> {
        if self.step != RecoveryStep::SetPassword {
            return Err(AppError::BadRequest("Answer the security question first".to_string()));
        }

        let min_len = self.auth.config.min_password_length;
        if new_password.chars().count() < min_len {
            return Err(AppError::ValidationError(format!(
                "Password must be at least {} characters",
                min_len
            )));
        }
        if new_password != confirmation {
            return Err(AppError::ValidationError("Passwords do not match".to_string()));
        }

        let user_id = self.user_id.expect("user id set at the username step");
        let mut users = load_or_seed_users(self.auth.store());
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::NotFound("User no longer exists".to_string()))?;

        user.password = new_password.to_string();
        user.updated_at = Utc::now();
        let username = user.username.clone();
        save_users(self.auth.store(), &users)?;

        self.step = RecoveryStep::Done;
        log::info!("Password reset for '{}'", username);
        Ok(())
    }
}

// ======== TESTS ========

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_auth() -> AuthService {
        let config = AuthConfig {
            login_delay_ms: 0,
            ..AuthConfig::default()
        };
        AuthService::new(Arc::new(Store::in_memory()), config)
    }

    #[tokio::test]
    async fn test_login_success() {
        let auth = test_auth();
        let session = auth.login("admin", "admin123", false).await.unwrap();

        assert_eq!(session.user_id, 1);
        assert_eq!(session.role, Role::Administrator);
        assert!(auth.is_logged_in());
        assert!(auth.is_admin());

        // Session persisted
        let stored: Session = auth.store().get(keys::SESSION).unwrap();
        assert_eq!(stored.username, "admin");
    }

    #[tokio::test]
    async fn test_login_username_case_insensitive() {
        let auth = test_auth();
        assert!(auth.login("ADMIN", "admin123", false).await.is_ok());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let auth = test_auth();
        let err = auth.login("ADMIN", "wrongpass", false).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
        assert!(!auth.is_logged_in());
    }

    #[tokio::test]
    async fn test_login_password_is_case_sensitive() {
        let auth = test_auth();
        let err = auth.login("admin", "ADMIN123", false).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_missing_fields() {
        let auth = test_auth();
        assert!(matches!(
            auth.login("   ", "admin123", false).await.unwrap_err(),
            AppError::MissingFields
        ));
        assert!(matches!(
            auth.login("admin", "", false).await.unwrap_err(),
            AppError::MissingFields
        ));
    }

    #[tokio::test]
    async fn test_login_inactive_user_rejected() {
        let auth = test_auth();
        let mut users = load_or_seed_users(auth.store());
        users[0].active = false;
        save_users(auth.store(), &users).unwrap();

        let err = auth.login("admin", "admin123", false).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_check_session_roundtrip() {
        let auth = test_auth();
        auth.login("jefe", "jefe123", true).await.unwrap();

        let user = auth.check_session().unwrap();
        assert_eq!(user.username, "jefe");
        assert_eq!(user.role, Role::AreaLead);
        assert!(auth.is_area_lead());
    }

    #[test]
    fn test_check_session_expired_after_24h() {
        let auth = test_auth();
        let users = load_or_seed_users(auth.store());
        let mut session = Session::for_user(&users[0], false, Utc::now());
        session.timestamp = Utc::now() - Duration::hours(25);
        auth.store().put(keys::SESSION, &session).unwrap();

        assert!(auth.check_session().is_none());
        // Fails closed: the stale record is gone
        assert!(auth.store().get::<Session>(keys::SESSION).is_none());
    }

    #[test]
    fn test_check_session_malformed_record() {
        let auth = test_auth();
        auth.store().put_raw(keys::SESSION, "{broken").unwrap();

        assert!(auth.check_session().is_none());
        assert!(auth.store().get::<Session>(keys::SESSION).is_none());
    }

    #[tokio::test]
    async fn test_check_session_user_deleted_or_inactive() {
        let auth = test_auth();
        auth.login("prof.animal", "prof123", false).await.unwrap();

        let mut users = load_or_seed_users(auth.store());
        users.retain(|u| u.username != "prof.animal");
        save_users(auth.store(), &users).unwrap();

        assert!(auth.check_session().is_none());
        assert!(!auth.is_logged_in());
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let auth = test_auth();
        auth.login("admin", "admin123", false).await.unwrap();
        auth.logout();

        assert!(!auth.is_logged_in());
        assert!(auth.check_session().is_none());
    }

    #[tokio::test]
    async fn test_require_admin() {
        let auth = test_auth();
        assert!(matches!(auth.require_auth().unwrap_err(), AppError::Unauthorized(_)));

        auth.login("prof.vegetal", "prof123", false).await.unwrap();
        assert!(auth.require_auth().is_ok());
        assert!(matches!(auth.require_admin().unwrap_err(), AppError::Forbidden(_)));
        assert_eq!(auth.teacher_kind(), Some(TeacherKind::Plant));

        auth.logout();
        auth.login("admin", "admin123", false).await.unwrap();
        assert!(auth.require_admin().is_ok());
    }

    #[tokio::test]
    async fn test_recovery_full_flow() {
        let auth = test_auth();
        let mut recovery = auth.recovery();

        let question = recovery.submit_username("jefe").unwrap();
        assert_eq!(question, "¿En qué ciudad naciste?");
        assert_eq!(recovery.step(), RecoveryStep::AnswerQuestion);

        // Wrong answer keeps the flow on the question step
        assert!(recovery.submit_answer("córdoba").is_err());
        assert_eq!(recovery.step(), RecoveryStep::AnswerQuestion);

        // Answer matching is case-insensitive
        recovery.submit_answer("BUENOS AIRES").unwrap();
        assert_eq!(recovery.step(), RecoveryStep::SetPassword);

        // Too short, then mismatched, both leave the old password working
        assert!(recovery.submit_new_password("abc", "abc").is_err());
        assert!(recovery.submit_new_password("abcdef", "abcdeg").is_err());
        assert!(auth.login("jefe", "jefe123", false).await.is_ok());
        auth.logout();

        recovery.submit_new_password("abcdef", "abcdef").unwrap();
        assert_eq!(recovery.step(), RecoveryStep::Done);

        // Old password is gone, new one works
        assert!(matches!(
            auth.login("jefe", "jefe123", false).await.unwrap_err(),
            AppError::InvalidCredentials
        ));
        assert!(auth.login("jefe", "abcdef", false).await.is_ok());
    }

    #[test]
    fn test_recovery_steps_cannot_be_skipped() {
        let auth = test_auth();
        let mut recovery = auth.recovery();

        // A correct answer submitted before a valid username is rejected
        assert!(recovery.submit_answer("buenos aires").is_err());
        assert!(recovery.submit_new_password("abcdef", "abcdef").is_err());
        assert_eq!(recovery.step(), RecoveryStep::IdentifyUser);

        // Unknown user stays on step 1
        assert!(recovery.submit_username("nadie").is_err());
        assert_eq!(recovery.step(), RecoveryStep::IdentifyUser);
    }

    #[test]
    fn test_recovery_terminal_state() {
        let auth = test_auth();
        let mut recovery = auth.recovery();

        recovery.submit_username("admin").unwrap();
        recovery.submit_answer("firulais").unwrap();
        recovery.submit_new_password("nuevo123", "nuevo123").unwrap();

        // The machine does not restart after completing
        assert!(recovery.submit_username("admin").is_err());
        assert!(recovery.submit_new_password("otra123", "otra123").is_err());
    }
}
