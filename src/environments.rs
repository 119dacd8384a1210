// src/environments.rs - Training environments
use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::auth::{load_or_seed_users, AuthService};
use crate::error::{AppError, AppResult};
use crate::models::{
    normalize_teacher_name, CreateEnvironmentRequest, Environment, EnvironmentKind, User,
};
use crate::storage::{keys, Store};

// ==================== COLLECTION ACCESS ====================

/// Loads the environments collection, seeding the demo records on first
/// use and backfilling `responsible_id` on legacy records that only carry
/// a free-text teacher name.
pub fn load_or_seed_environments(store: &Store) -> Vec<Environment> {
    let mut environments = match store.get::<Vec<Environment>>(keys::ENVIRONMENTS) {
        Some(environments) => environments,
        None => {
            let seeded = default_environments();
            if let Err(err) = store.put(keys::ENVIRONMENTS, &seeded) {
                log::warn!("Could not persist seeded environments: {}", err);
            }
            return seeded;
        }
    };

    if backfill_responsibles(store, &mut environments) {
        if let Err(err) = store.put(keys::ENVIRONMENTS, &environments) {
            log::warn!("Could not persist environment migration: {}", err);
        }
    }

    environments
}

pub fn save_environments(store: &Store, environments: &[Environment]) -> AppResult<()> {
    store.put(keys::ENVIRONMENTS, &environments)
}

/// Resolves missing responsible ids: first by normalized teacher name,
/// then by assigning the first teacher of the matching kind. Returns
/// whether anything changed.
fn backfill_responsibles(store: &Store, environments: &mut [Environment]) -> bool {
    let users = load_or_seed_users(store);
    let mut changed = false;

    for env in environments.iter_mut().filter(|e| e.responsible_id.is_none()) {
        let label = if env.responsible_name.is_empty() {
            env.responsible_teacher.clone()
        } else {
            env.responsible_name.clone()
        };
        let wanted = normalize_teacher_name(&label);

        let candidate = users
            .iter()
            .find(|u| normalize_teacher_name(&u.full_name()) == wanted)
            .or_else(|| {
                let kind = env.environment_type.teacher_kind()?;
                users.iter().find(|u| u.role.teacher_kind() == Some(kind))
            });

        if let Some(user) = candidate {
            env.responsible_id = Some(user.id);
            env.responsible_name = user.full_name();
            if env.responsible_teacher.is_empty() {
                env.responsible_teacher = env.responsible_name.clone();
            }
            changed = true;
        }
    }

    changed
}

fn default_environments() -> Vec<Environment> {
    let now = Utc::now();
    let env = |id: i64,
               name: &str,
               kind: EnvironmentKind,
               responsible_id: i64,
               responsible_name: &str,
               year: &str,
               division: &str,
               group: &str,
               observations: &str| Environment {
        id,
        environment_name: name.to_string(),
        environment_type: kind,
        responsible_id: Some(responsible_id),
        responsible_name: responsible_name.to_string(),
        responsible_teacher: format!("Prof. {}", responsible_name),
        year: year.to_string(),
        division: division.to_string(),
        group: group.to_string(),
        observations: observations.to_string(),
        created_at: now,
        updated_at: now,
    };

    vec![
        env(
            1,
            "Huerta Principal",
            EnvironmentKind::Plant,
            4,
            "María González",
            "3",
            "A",
            "Grupo 1",
            "Huerta destinada al cultivo de hortalizas de estación",
        ),
        env(
            2,
            "Vivero Escolar",
            EnvironmentKind::Plant,
            4,
            "María González",
            "2",
            "B",
            "Grupo 2",
            "Espacio para la producción de plantines y plantas ornamentales",
        ),
        env(
            3,
            "Granja Avícola",
            EnvironmentKind::Animal,
            3,
            "Ana Martínez",
            "4",
            "A",
            "Grupo 3",
            "Cría y manejo de aves de corral",
        ),
    ]
}

/// Whether an environment is assigned to a user, by id or by the legacy
/// name fallback.
pub fn is_assigned_to(env: &Environment, user: &User) -> bool {
    if env.responsible_id == Some(user.id) {
        return true;
    }
    let full = normalize_teacher_name(&user.full_name());
    (!env.responsible_teacher.is_empty() && normalize_teacher_name(&env.responsible_teacher) == full)
        || (!env.responsible_name.is_empty() && normalize_teacher_name(&env.responsible_name) == full)
}

// ==================== SERVICE ====================

pub struct EnvironmentsService {
    store: Arc<Store>,
    auth: Arc<AuthService>,
}

impl EnvironmentsService {
    pub fn new(store: Arc<Store>, auth: Arc<AuthService>) -> Self {
        Self { store, auth }
    }

    /// The environments visible to the current operator: everything for
    /// admins and standard users, only assigned ones of their kind for
    /// teachers. Area leads have no access to this module.
    pub fn list(&self) -> AppResult<Vec<Environment>> {
        let user = self.auth.require_auth()?;
        if !user.role.can_view_environments() {
            return Err(AppError::Forbidden(
                "Area leads have no access to environments".to_string(),
            ));
        }

        let environments = load_or_seed_environments(&self.store);
        match user.role.teacher_kind() {
            Some(kind) => Ok(environments
                .into_iter()
                .filter(|e| e.environment_type.teacher_kind() == Some(kind) && is_assigned_to(e, &user))
                .collect()),
            None => Ok(environments),
        }
    }

    pub fn get(&self, id: i64) -> AppResult<Environment> {
        self.auth.require_auth()?;
        load_or_seed_environments(&self.store)
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| AppError::environment_not_found(id))
    }

    /// Teachers eligible for a given environment kind (form support).
    pub fn teachers_for_kind(&self, kind: EnvironmentKind) -> AppResult<Vec<User>> {
        self.auth.require_auth()?;
        let users = load_or_seed_users(&self.store);
        Ok(users
            .into_iter()
            .filter(|u| match kind.teacher_kind() {
                Some(wanted) => u.role.teacher_kind() == Some(wanted),
                None => u.role.is_teacher(),
            })
            .collect())
    }

    pub fn create(&self, request: CreateEnvironmentRequest) -> AppResult<Environment> {
        self.require_manager()?;
        request.validate()?;

        let mut environments = load_or_seed_environments(&self.store);
        self.check_name_unique(&environments, &request.environment_name, None)?;
        let responsible = self.resolve_responsible(request.responsible_id, request.environment_type)?;

        let now = Utc::now();
        let environment = Environment {
            id: next_id(&environments),
            environment_name: request.environment_name,
            environment_type: request.environment_type,
            responsible_id: Some(responsible.id),
            responsible_name: responsible.full_name(),
            responsible_teacher: responsible.full_name(),
            year: request.year,
            division: request.division,
            group: request.group,
            observations: request.observations.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        environments.push(environment.clone());
        save_environments(&self.store, &environments)?;

        log::info!("Environment '{}' created", environment.environment_name);
        Ok(environment)
    }

    pub fn update(&self, id: i64, request: CreateEnvironmentRequest) -> AppResult<Environment> {
        self.require_manager()?;
        request.validate()?;

        let mut environments = load_or_seed_environments(&self.store);
        let index = environments
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| AppError::environment_not_found(id))?;

        self.check_name_unique(&environments, &request.environment_name, Some(id))?;
        let responsible = self.resolve_responsible(request.responsible_id, request.environment_type)?;

        let updated = Environment {
            id,
            environment_name: request.environment_name,
            environment_type: request.environment_type,
            responsible_id: Some(responsible.id),
            responsible_name: responsible.full_name(),
            responsible_teacher: responsible.full_name(),
            year: request.year,
            division: request.division,
            group: request.group,
            observations: request.observations.unwrap_or_default(),
            created_at: environments[index].created_at,
            updated_at: Utc::now(),
        };

        environments[index] = updated.clone();
        save_environments(&self.store, &environments)?;
        Ok(updated)
    }

    pub fn delete(&self, id: i64) -> AppResult<()> {
        self.require_manager()?;

        let mut environments = load_or_seed_environments(&self.store);
        let before = environments.len();
        environments.retain(|e| e.id != id);
        if environments.len() == before {
            return Err(AppError::environment_not_found(id));
        }

        save_environments(&self.store, &environments)?;
        log::info!("Environment {} deleted", id);
        Ok(())
    }

    fn require_manager(&self) -> AppResult<User> {
        let user = self.auth.require_auth()?;
        if !user.role.can_manage_environments() {
            return Err(AppError::Forbidden(
                "Only administrators can modify environments".to_string(),
            ));
        }
        Ok(user)
    }

    fn check_name_unique(
        &self,
        environments: &[Environment],
        name: &str,
        exclude_id: Option<i64>,
    ) -> AppResult<()> {
        let wanted = name.to_lowercase();
        let clash = environments
            .iter()
            .any(|e| e.environment_name.to_lowercase() == wanted && Some(e.id) != exclude_id);
        if clash {
            Err(AppError::environment_name_taken(name))
        } else {
            Ok(())
        }
    }

    /// The responsible user must be a teacher whose subtype matches the
    /// environment kind; an "otro" environment accepts either subtype.
    fn resolve_responsible(&self, user_id: i64, kind: EnvironmentKind) -> AppResult<User> {
        let users = load_or_seed_users(&self.store);
        let user = users
            .into_iter()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("User with ID '{}' not found", user_id)))?;

        let teacher_kind = user.role.teacher_kind().ok_or_else(|| {
            AppError::ValidationError("The responsible user must be a teacher".to_string())
        })?;

        if let Some(wanted) = kind.teacher_kind() {
            if teacher_kind != wanted {
                return Err(AppError::ValidationError(format!(
                    "A {} environment needs a matching teacher",
                    kind.label()
                )));
            }
        }

        Ok(user)
    }
}

fn next_id(environments: &[Environment]) -> i64 {
    environments.iter().map(|e| e.id).max().unwrap_or(0) + 1
}

// ==================== TESTS ====================
