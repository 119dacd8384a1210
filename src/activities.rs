// src/activities.rs - Activity registration
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveTime, Utc};
use validator::Validate;

use crate::auth::AuthService;
use crate::environments::load_or_seed_environments;
use crate::error::{AppError, AppResult};
use crate::models::{Activity, EnvironmentKind, RegisterActivityRequest, UpdateActivityRequest};
use crate::storage::{keys, Store};
use crate::validator::{FieldValidator, ValidationResult};

// ==================== COLLECTION ACCESS ====================

pub fn load_or_seed_activities(store: &Store) -> Vec<Activity> {
    if let Some(activities) = store.get::<Vec<Activity>>(keys::ACTIVITIES) {
        return activities;
    }

    let activities = default_activities();
    if let Err(err) = store.put(keys::ACTIVITIES, &activities) {
        log::warn!("Could not persist seeded activities: {}", err);
    }
    activities
}

pub fn save_activities(store: &Store, activities: &[Activity]) -> AppResult<()> {
    store.put(keys::ACTIVITIES, &activities)
}

fn default_activities() -> Vec<Activity> {
    let now = Utc::now();
    vec![
        Activity {
            id: 1,
            environment_id: 1,
            environment_name: "Huerta Principal".to_string(),
            environment_type: EnvironmentKind::Plant,
            responsible_teacher: "Prof. María González".to_string(),
            year: "3".to_string(),
            division: "A".to_string(),
            group: "Grupo 1".to_string(),
            activity_date: NaiveDate::from_ymd_opt(2024, 1, 15).expect("valid seed date"),
            activity_time: NaiveTime::from_hms_opt(8, 0, 0).expect("valid seed time"),
            duration: 120,
            activity_title: "Siembra de Tomates".to_string(),
            activity_description: "Preparación del terreno y siembra de semillas de tomate en almácigos."
                .to_string(),
            observations: "Excelente participación de los estudiantes".to_string(),
            created_at: now,
            updated_at: now,
        },
        Activity {
            id: 2,
            environment_id: 3,
            environment_name: "Granja Avícola".to_string(),
            environment_type: EnvironmentKind::Animal,
            responsible_teacher: "Prof. Ana Martínez".to_string(),
            year: "4".to_string(),
            division: "A".to_string(),
            group: "Grupo 3".to_string(),
            activity_date: NaiveDate::from_ymd_opt(2024, 1, 16).expect("valid seed date"),
            activity_time: NaiveTime::from_hms_opt(9, 30, 0).expect("valid seed time"),
            duration: 90,
            activity_title: "Alimentación y Cuidado de Gallinas".to_string(),
            activity_description: "Actividad práctica de alimentación de gallinas ponedoras."
                .to_string(),
            observations: "Se observó mejora en la producción de huevos".to_string(),
            created_at: now,
            updated_at: now,
        },
    ]
}

// ==================== SERVICE ====================

pub struct ActivitiesService {
    store: Arc<Store>,
    auth: Arc<AuthService>,
}

impl ActivitiesService {
    pub fn new(store: Arc<Store>, auth: Arc<AuthService>) -> Self {
        Self { store, auth }
    }

    /// Stored newest-first; registration prepends.
    pub fn list(&self) -> AppResult<Vec<Activity>> {
        self.auth.require_auth()?;
        Ok(load_or_seed_activities(&self.store))
    }

    pub fn get(&self, id: i64) -> AppResult<Activity> {
        self.auth.require_auth()?;
        load_or_seed_activities(&self.store)
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| AppError::activity_not_found(id))
    }

    /// Registers an activity against an existing environment, copying its
    /// classification fields into the record.
    pub fn register(&self, request: RegisterActivityRequest) -> AppResult<Activity> {
        self.auth.require_auth()?;
        request.validate()?;
        check_date(request.activity_date)?;

        let environment = load_or_seed_environments(&self.store)
            .into_iter()
            .find(|e| e.id == request.environment_id)
            .ok_or_else(|| AppError::environment_not_found(request.environment_id))?;

        let mut activities = load_or_seed_activities(&self.store);
        let now = Utc::now();
        let activity = Activity {
            id: next_id(&activities),
            environment_id: environment.id,
            environment_name: environment.environment_name.clone(),
            environment_type: environment.environment_type,
            responsible_teacher: environment.responsible_label().to_string(),
            year: environment.year.clone(),
            division: environment.division.clone(),
            group: environment.group.clone(),
            activity_date: request.activity_date,
            activity_time: request.activity_time,
            duration: request.duration,
            activity_title: request.activity_title,
            activity_description: request.activity_description,
            observations: request.observations.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        activities.insert(0, activity.clone());
        save_activities(&self.store, &activities)?;

        log::info!("Activity '{}' registered", activity.activity_title);
        Ok(activity)
    }

    /// Edits the schedule and text fields; the environment link and its
    /// denormalized copies stay fixed.
    pub fn update(&self, id: i64, request: UpdateActivityRequest) -> AppResult<Activity> {
        self.auth.require_auth()?;
        request.validate()?;
        check_date(request.activity_date)?;

        let mut activities = load_or_seed_activities(&self.store);
        let index = activities
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| AppError::activity_not_found(id))?;

        let activity = &mut activities[index];
        activity.activity_date = request.activity_date;
        activity.activity_time = request.activity_time;
        activity.duration = request.duration;
        activity.activity_title = request.activity_title;
        activity.activity_description = request.activity_description;
        activity.observations = request.observations.unwrap_or_default();
        activity.updated_at = Utc::now();

        let updated = activity.clone();
        save_activities(&self.store, &activities)?;
        Ok(updated)
    }

    pub fn delete(&self, id: i64) -> AppResult<()> {
        self.auth.require_auth()?;

        let mut activities = load_or_seed_activities(&self.store);
        let before = activities.len();
        activities.retain(|a| a.id != id);
        if activities.len() == before {
            return Err(AppError::activity_not_found(id));
        }

        save_activities(&self.store, &activities)?;
        log::info!("Activity {} deleted", id);
        Ok(())
    }
}

fn check_date(date: NaiveDate) -> AppResult<()> {
    let mut result = ValidationResult::new();
    if let Err(msg) = FieldValidator::not_in_future(date, Local::now().date_naive(), "activityDate") {
        result.add_error("activityDate", msg);
    }
    result.into_result()
}

fn next_id(activities: &[Activity]) -> i64 {
    activities.iter().map(|a| a.id).max().unwrap_or(0) + 1
}

// ==================== TESTS ====================
