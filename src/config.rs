//! Configuration management for the inventory server

use std::env;
use std::path::Path;

use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection string, e.g. `sqlite://inventory.sqlite` or `sqlite::memory:`
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Configuration for a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

/// Every section and every key falls back to its default when unset
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `./config` and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), env::vars().collect())
    }

    /// Load configuration from `<root>/config` and the given environment.
    ///
    /// Section and key are split by a double underscore, so
    /// `INVENTORY_DATABASE__BUSY_TIMEOUT_SECS` sets `database.busy_timeout_secs`.
    /// `DATABASE_URL` overrides `database.url`.
    pub fn load_from(root: &Path, vars: Map<String, String>) -> Result<Self, ConfigError> {
        let run_mode = vars
            .get("RUN_MODE")
            .cloned()
            .unwrap_or_else(|| "development".into());
        let database_url = vars.get("DATABASE_URL").cloned();
        let config_dir = root.join("config");

        let config = Config::builder()
            .add_source(File::from(config_dir.join("default")).required(false))
            .add_source(File::from(config_dir.join(&run_mode)).required(false))
            .add_source(
                Environment::with_prefix("INVENTORY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars)),
            )
            .set_override_option("database.url", database_url)?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://inventory.sqlite".to_string(),
            max_connections: 10,
            min_connections: 1,
            busy_timeout_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
