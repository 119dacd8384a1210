// src/config.rs - Configuration management
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the JSON file holding the whole key space.
    pub data_file: String,
    /// When true the store lives in memory only (tests, demos).
    pub ephemeral: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub session_ttl_hours: i64,
    /// Simulated network delay before every login result, in milliseconds.
    pub login_delay_ms: u64,
    pub min_password_length: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub console_enabled: bool,
}

// Dummy defaults for tests (no ENV read here)
impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: "agraria.json".to_string(),
            ephemeral: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24,
            login_delay_ms: 1000,
            min_password_length: 6,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_enabled: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

pub fn load_config() -> Result<Config> {
    load_env_file()?;

    let mut config = if let Ok(config_file) = env::var("CONFIG_FILE") {
        let path = Path::new(&config_file);
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", config_file))?;
        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", config_file))?
    } else {
        Config::default()
    };

    override_with_env(&mut config);

    config.validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

fn override_with_env(config: &mut Config) {
    if let Ok(data_file) = env::var("AGRARIA_DATA_FILE") {
        config.storage.data_file = data_file;
    }
    if let Ok(ttl_str) = env::var("AGRARIA_SESSION_TTL_HOURS") {
        if let Ok(ttl) = ttl_str.parse::<i64>() {
            config.auth.session_ttl_hours = ttl;
        }
    }
    if let Ok(delay_str) = env::var("AGRARIA_LOGIN_DELAY_MS") {
        if let Ok(delay) = delay_str.parse::<u64>() {
            config.auth.login_delay_ms = delay;
        }
    }
    if let Ok(min_str) = env::var("AGRARIA_MIN_PASSWORD_LENGTH") {
        if let Ok(min) = min_str.parse::<usize>() {
            config.auth.min_password_length = min;
        }
    }
    if let Ok(level) = env::var("RUST_LOG") {
        config.logging.level = level;
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.storage.data_file.trim().is_empty() && !self.storage.ephemeral {
            return Err(anyhow::anyhow!("storage.data_file must not be empty"));
        }

        if self.auth.session_ttl_hours <= 0 {
            return Err(anyhow::anyhow!(
                "auth.session_ttl_hours must be positive (current: {})",
                self.auth.session_ttl_hours
            ));
        }

        if self.auth.min_password_length == 0 {
            return Err(anyhow::anyhow!("auth.min_password_length must be at least 1"));
        }

        Ok(())
    }

    pub fn init_logging(&self) {
        if !self.logging.console_enabled {
            return;
        }
        let _ = env_logger::Builder::new()
            .parse_filters(&self.logging.level)
            .try_init();
    }
}

pub fn load_env_file() -> Result<()> {
    if let Ok(env_file) = env::var("ENV_FILE") {
        dotenvy::from_filename(&env_file)
            .with_context(|| format!("Failed to load environment file: {}", env_file))?;
    } else if Path::new(".env").exists() {
        dotenvy::dotenv().context("Failed to load .env file")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.auth.session_ttl_hours, 24);
        assert_eq!(config.auth.login_delay_ms, 1000);
        assert_eq!(config.auth.min_password_length, 6);
        assert_eq!(config.storage.data_file, "agraria.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.auth.session_ttl_hours = 0;
        assert!(config.validate().is_err());

        config.auth.session_ttl_hours = 24;
        config.storage.data_file = "   ".to_string();
        assert!(config.validate().is_err());

        // An ephemeral store does not need a data file
        config.storage.ephemeral = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_loading() {
        let toml_content = r#"
        [storage]
        data_file = "/tmp/escuela.json"

        [auth]
        session_ttl_hours = 12
        login_delay_ms = 0
        "#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.storage.data_file, "/tmp/escuela.json");
        assert_eq!(config.auth.session_ttl_hours, 12);
        assert_eq!(config.auth.login_delay_ms, 0);
        // Unspecified sections fall back to defaults
        assert_eq!(config.auth.min_password_length, 6);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_file_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agraria.toml");
        fs::write(&path, "[auth]\nsession_ttl_hours = 48\n").unwrap();

        env::set_var("CONFIG_FILE", path.to_str().unwrap());
        let config = load_config().unwrap();
        env::remove_var("CONFIG_FILE");

        assert_eq!(config.auth.session_ttl_hours, 48);
    }
}
