// src/models/session.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};

use super::user::{Role, User};

/// Proof of a prior successful login, persisted as a single record under
/// `sistemaAgraria_session`. The role is a snapshot taken at login time;
/// authorization decisions re-read the roster on every check.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    pub remember_me: bool,
}

impl Session {
    pub fn for_user(user: &User, remember_me: bool, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            timestamp: now,
            remember_me,
        }
    }

    /// A session lives for a fixed window from its creation timestamp.
    /// There is no sliding renewal.
    pub fn is_valid(&self, now: DateTime<Utc>, ttl_hours: i64) -> bool {
        now - self.timestamp < Duration::hours(ttl_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_at(timestamp: DateTime<Utc>) -> Session {
        Session {
            user_id: 1,
            username: "admin".to_string(),
            role: Role::Administrator,
            timestamp,
            remember_me: false,
        }
    }

    #[test]
    fn test_session_within_window() {
        let now = Utc::now();
        let session = session_at(now - Duration::hours(23));
        assert!(session.is_valid(now, 24));
    }

    #[test]
    fn test_session_expired_after_window() {
        let now = Utc::now();
        let session = session_at(now - Duration::hours(25));
        assert!(!session.is_valid(now, 24));

        // Exactly at the boundary counts as expired
        let boundary = session_at(now - Duration::hours(24));
        assert!(!boundary.is_valid(now, 24));
    }

    #[test]
    fn test_session_wire_shape() {
        let now = Utc::now();
        let session = session_at(now);
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("rememberMe").is_some());
        assert_eq!(json["role"], "administrador");
    }
}
