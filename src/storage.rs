// src/storage.rs - Key-value persistence in the browser local-storage style

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppResult;

// ==================== STORAGE KEYS ====================

/// Fixed keys of the persisted state layout. Two product keys and two
/// sales keys coexist on purpose: different modules grew their own stores
/// and they are not unified here.
pub mod keys {
    pub const USERS: &str = "sistemaAgraria_users";
    pub const SESSION: &str = "sistemaAgraria_session";
    pub const ENVIRONMENTS: &str = "sistemaAgraria_environments";
    pub const ACTIVITIES: &str = "sistemaAgraria_activities";
    pub const SALES: &str = "sistemaAgraria_sales";
    pub const LEGACY_PRODUCTS: &str = "sistemaAgraria_products";
    pub const INVENTORY_PRODUCTS: &str = "inventory_products";
    pub const INVENTORY_MOVEMENTS: &str = "inventory_movements";
    pub const LEGACY_SALES: &str = "sales";
}

// ==================== BACKENDS ====================

/// A string-to-string map with localStorage semantics: synchronous,
/// whole-value reads and writes, no transactions.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
}

/// In-memory backend, used by tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryBackend {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Option<String> {
        self.map.read().unwrap().get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> AppResult<()> {
        self.map.write().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.map.write().unwrap().remove(key);
        Ok(())
    }
}

/// File backend: the whole key space lives in a single JSON file and is
/// rewritten on every mutation. Collections are small and writes are
/// whole-value, so there is no partial-write mode to recover from.
pub struct FileBackend {
    path: PathBuf,
    map: RwLock<HashMap<String, String>>,
}

impl FileBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let map = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(err) => {
                    // Malformed stored state reads as "no data"
                    log::warn!("Storage file {} is malformed ({}), starting empty", path.display(), err);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            path,
            map: RwLock::new(map),
        })
    }

    fn persist(&self, map: &HashMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Option<String> {
        self.map.read().unwrap().get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> AppResult<()> {
        let mut map = self.map.write().unwrap();
        map.insert(key.to_string(), value.to_string());
        self.persist(&map)
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let mut map = self.map.write().unwrap();
        if map.remove(key).is_some() {
            self.persist(&map)?;
        }
        Ok(())
    }
}

// ==================== TYPED STORE ====================

/// Typed access on top of a backend. Collections are always read and
/// written as whole units; a parse failure on read is logged and treated
/// as missing data rather than surfaced to the operator.
pub struct Store {
    backend: Box<dyn StorageBackend>,
}

impl Store {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        Ok(Self::new(Box::new(FileBackend::open(path)?)))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.backend.read(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("Ignoring malformed data under '{}': {}", key, err);
                None
            }
        }
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.write(key, &raw)
    }

    pub fn remove(&self, key: &str) -> AppResult<()> {
        self.backend.remove(key)
    }

    /// Raw write, used by tests to plant malformed data.
    pub fn put_raw(&self, key: &str, raw: &str) -> AppResult<()> {
        self.backend.write(key, raw)
    }
}

// ==================== TESTS ====================
