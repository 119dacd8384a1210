// src/lib.rs - Management core for a school agricultural program
//
// All state lives in a key-value store written wholesale per collection;
// each service backs one page of the host UI, with the auth service
// injected explicitly instead of hanging off a shared global.

use std::sync::Arc;

pub mod activities;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod environments;
pub mod error;
pub mod export;
pub mod inventory;
pub mod models;
pub mod reports;
pub mod sales;
pub mod storage;
pub mod users;
pub mod validator;

pub use crate::config::{load_config, Config};
pub use crate::error::{AppError, AppResult};

use crate::activities::ActivitiesService;
use crate::auth::AuthService;
use crate::dashboard::DashboardService;
use crate::environments::EnvironmentsService;
use crate::inventory::InventoryService;
use crate::reports::ReportsService;
use crate::sales::SalesService;
use crate::storage::Store;
use crate::users::UsersService;

/// The wired application: one store, one auth service, and the page-level
/// services built around them.
pub struct App {
    pub store: Arc<Store>,
    pub auth: Arc<AuthService>,
    pub users: UsersService,
    pub environments: EnvironmentsService,
    pub activities: ActivitiesService,
    pub inventory: InventoryService,
    pub sales: SalesService,
    pub reports: ReportsService,
    pub dashboard: DashboardService,
}

impl App {
    pub fn new(config: Config) -> AppResult<Self> {
        let store = if config.storage.ephemeral {
            Store::in_memory()
        } else {
            Store::open(&config.storage.data_file)?
        };
        Ok(Self::with_store(Arc::new(store), config))
    }

    /// Loads configuration from the environment and initializes logging.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = load_config()?;
        config.init_logging();
        Ok(Self::new(config)?)
    }

    fn with_store(store: Arc<Store>, config: Config) -> Self {
        let auth = Arc::new(AuthService::new(store.clone(), config.auth.clone()));

        Self {
            users: UsersService::new(store.clone(), auth.clone()),
            environments: EnvironmentsService::new(store.clone(), auth.clone()),
            activities: ActivitiesService::new(store.clone(), auth.clone()),
            inventory: InventoryService::new(store.clone(), auth.clone()),
            sales: SalesService::new(store.clone(), auth.clone()),
            reports: ReportsService::new(store.clone(), auth.clone()),
            dashboard: DashboardService::new(store.clone(), auth.clone()),
            store,
            auth,
        }
    }
}

// ==================== TESTS ====================
