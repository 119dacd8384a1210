// src/dashboard.rs - Aggregated counters for the landing page
use std::sync::Arc;

use chrono::{Datelike, Local};
use serde::Serialize;

use crate::activities::load_or_seed_activities;
use crate::auth::{load_or_seed_users, AuthService};
use crate::environments::{is_assigned_to, load_or_seed_environments};
use crate::error::AppResult;
use crate::models::{Activity, Sale, User};
use crate::storage::{keys, Store};

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub active_users: i64,
    pub environments: i64,
    pub today_activities: i64,
    pub month_sales_total: f64,
    pub user_activities: i64,
    pub user_environments: i64,
    pub user_sales: i64,
}

pub struct DashboardService {
    store: Arc<Store>,
    auth: Arc<AuthService>,
}

impl DashboardService {
    pub fn new(store: Arc<Store>, auth: Arc<AuthService>) -> Self {
        Self { store, auth }
    }

    pub fn stats(&self) -> AppResult<DashboardStats> {
        let user = self.auth.require_auth()?;

        let users = load_or_seed_users(&self.store);
        let environments = load_or_seed_environments(&self.store);
        let activities = load_or_seed_activities(&self.store);
        let sales = self.store.get::<Vec<Sale>>(keys::SALES).unwrap_or_default();

        let today = Local::now().date_naive();
        let today_activities = activities.iter().filter(|a| a.activity_date == today).count() as i64;

        let month_sales_total = sales
            .iter()
            .filter(|s| s.sale_date.month() == today.month() && s.sale_date.year() == today.year())
            .map(|s| s.total)
            .sum();

        let user_environments = environments
            .iter()
            .filter(|e| e.responsible_id == Some(user.id))
            .count() as i64;

        let user_activities = match user.role.teacher_kind() {
            Some(kind) => {
                let assigned_envs: Vec<i64> = environments
                    .iter()
                    .filter(|e| e.environment_type.teacher_kind() == Some(kind) && is_assigned_to(e, &user))
                    .map(|e| e.id)
                    .collect();
                activities
                    .iter()
                    .filter(|a| {
                        a.environment_type.teacher_kind() == Some(kind)
                            && (assigned_envs.contains(&a.environment_id)
                                || teacher_name_matches(a, &user))
                    })
                    .count() as i64
            }
            // Activities carry no creator reference, so there is nothing to
            // count against a non-teacher
            None => 0,
        };

        let user_sales = sales.iter().filter(|s| s.created_by == user.username).count() as i64;

        Ok(DashboardStats {
            active_users: users.iter().filter(|u| u.active).count() as i64,
            environments: environments.len() as i64,
            today_activities,
            month_sales_total,
            user_activities,
            user_environments,
            user_sales,
        })
    }

    /// The newest activities for the landing page feed.
    pub fn recent_activities(&self, limit: usize) -> AppResult<Vec<Activity>> {
        self.auth.require_auth()?;

        let mut activities = load_or_seed_activities(&self.store);
        activities.sort_by(|a, b| b.activity_date.cmp(&a.activity_date));
        activities.truncate(limit);
        Ok(activities)
    }
}

fn teacher_name_matches(activity: &Activity, user: &User) -> bool {
    use crate::models::normalize_teacher_name;
    normalize_teacher_name(&activity.responsible_teacher)
        == normalize_teacher_name(&user.full_name())
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::activities::save_activities;
    use crate::config::AuthConfig;
    use crate::models::{EnvironmentKind, PaymentMethod, SaleItem};

    async fn service_as(username: &str, password: &str) -> DashboardService {
        let store = Arc::new(Store::in_memory());
        let config = AuthConfig {
            login_delay_ms: 0,
            ..AuthConfig::default()
        };
        let auth = Arc::new(AuthService::new(store.clone(), config));
        auth.login(username, password, false).await.unwrap();
        DashboardService::new(store, auth)
    }

    fn sale_today(id: i64, total: f64, created_by: &str) -> Sale {
        Sale {
            id,
            sale_date: Local::now().date_naive(),
            customer_name: "Juan Pérez".to_string(),
            customer_phone: String::new(),
            payment_method: PaymentMethod::Cash,
            items: vec![SaleItem {
                product_id: 1,
                product_name: "Semillas de Tomate".to_string(),
                unit: "paquete".to_string(),
                quantity: 1.0,
                unit_price: total,
                subtotal: total,
            }],
            subtotal: total,
            tax: 0.0,
            total,
            created_at: Utc::now(),
            created_by: created_by.to_string(),
        }
    }

    #[tokio::test]
    async fn test_global_counters() {
        let service = service_as("admin", "admin123").await;

        let sales = vec![sale_today(1, 100.0, "admin"), sale_today(2, 50.0, "jefe")];
        service.store.put(keys::SALES, &sales).unwrap();

        let stats = service.stats().unwrap();
        assert_eq!(stats.active_users, 4);
        assert_eq!(stats.environments, 3);
        assert_eq!(stats.today_activities, 0); // seeds are dated in the past
        assert!((stats.month_sales_total - 150.0).abs() < 1e-9);
        assert_eq!(stats.user_sales, 1); // created_by == "admin"
    }

    #[tokio::test]
    async fn test_today_activity_counter() {
        let service = service_as("admin", "admin123").await;

        let mut activities = load_or_seed_activities(&service.store);
        activities[0].activity_date = Local::now().date_naive();
        save_activities(&service.store, &activities).unwrap();

        let stats = service.stats().unwrap();
        assert_eq!(stats.today_activities, 1);
    }

    #[tokio::test]
    async fn test_teacher_stats() {
        let service = service_as("prof.animal", "prof123").await;
        let stats = service.stats().unwrap();

        // Granja Avícola is assigned to prof.animal (id 3)
        assert_eq!(stats.user_environments, 1);
        // The seeded animal activity names "Prof. Ana Martínez" and runs in
        // the assigned environment
        assert_eq!(stats.user_activities, 1);
    }

    #[tokio::test]
    async fn test_plant_teacher_sees_own_counts() {
        let service = service_as("prof.vegetal", "prof123").await;
        let stats = service.stats().unwrap();

        assert_eq!(stats.user_environments, 2); // Huerta + Vivero
        assert_eq!(stats.user_activities, 1); // the seeded plant activity
    }

    #[tokio::test]
    async fn test_recent_activities_sorted() {
        let service = service_as("admin", "admin123").await;
        let recent = service.recent_activities(5).unwrap();

        assert_eq!(recent.len(), 2);
        assert!(recent[0].activity_date >= recent[1].activity_date);

        let env_kinds: Vec<EnvironmentKind> =
            recent.iter().map(|a| a.environment_type).collect();
        assert!(env_kinds.contains(&EnvironmentKind::Animal));

        // Limit applies
        assert_eq!(service.recent_activities(1).unwrap().len(), 1);
    }
}
