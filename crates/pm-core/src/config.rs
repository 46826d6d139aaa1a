//! Configuration types and loading
//!
//! Settings are layered: built-in defaults, then an optional file
//! (`config/default.toml` unless a path is given), then `PM_*` environment
//! variables with `__` separating nested keys, e.g. `PM_DATABASE__URL`.

use std::path::Path;

use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_FILE: &str = "config/default";
const ENV_PREFIX: &str = "PM";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub seed: SeedConfig,
    pub services: ServicesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout for connections in seconds
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection in seconds
    pub max_lifetime_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/project_manager".to_string(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl DatabaseConfig {
    /// Create config with a specific URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Which backing store the services run against
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
}

/// Password rules applied by the account directory
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub password_min_length: usize,
    pub password_require_digit: bool,
    pub password_require_lowercase: bool,
    pub password_require_uppercase: bool,
    pub password_require_non_alphanumeric: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password_min_length: 5,
            password_require_digit: true,
            password_require_lowercase: false,
            password_require_uppercase: true,
            password_require_non_alphanumeric: true,
        }
    }
}

/// Data ensured at startup
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SeedConfig {
    pub enabled: bool,
    pub admin_email: String,
    pub admin_first_name: String,
    pub admin_password: String,
    pub default_project: DefaultProjectConfig,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            admin_email: "Admin@admin".to_string(),
            admin_first_name: "Admin".to_string(),
            admin_password: "1qa2ws#ED".to_string(),
            default_project: DefaultProjectConfig::default(),
        }
    }
}

/// Project created when the project table is empty
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultProjectConfig {
    pub enabled: bool,
    pub name: String,
    pub customer_name: String,
    pub performer_name: String,
    pub priority: i32,
}

impl Default for DefaultProjectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "Test".to_string(),
            customer_name: "ООО TestGrope".to_string(),
            performer_name: "OAO TestPerformer".to_string(),
            priority: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Reject objective assignees that are not members of the owning project.
    pub enforce_assignee_membership: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,pm_services=debug,pm_db=debug".to_string(),
            json: false,
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config source error: {0}")]
    Source(#[from] config::ConfigError),
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file (if present) and the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load configuration, reading `path` instead of the default file when given.
    /// An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_settings(settings)
    }

    /// Deserialize and validate already-built settings
    pub fn from_settings(settings: config::Config) -> Result<Self, ConfigError> {
        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.kind == StoreKind::Postgres && self.database.url.trim().is_empty() {
            return Err(ConfigError::invalid(
                "database.url",
                "must be set for the postgres store",
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::invalid(
                "database.min_connections",
                "must not exceed database.max_connections",
            ));
        }
        if self.auth.password_min_length == 0 {
            return Err(ConfigError::invalid(
                "auth.password_min_length",
                "must be at least 1",
            ));
        }
        if self.seed.enabled && self.seed.admin_email.trim().is_empty() {
            return Err(ConfigError::invalid("seed.admin_email", "must not be blank"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.store.kind, StoreKind::Memory);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.auth.password_min_length, 5);
        assert_eq!(config.seed.admin_email, "Admin@admin");
        assert_eq!(config.seed.default_project.priority, 100);
        assert!(!config.services.enforce_assignee_membership);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_settings_fall_back_to_defaults() {
        let settings = config::Config::builder().build().unwrap();
        let config = AppConfig::from_settings(settings).unwrap();
        assert_eq!(config.database.url, DatabaseConfig::default().url);
        assert_eq!(config.logging.filter, LoggingConfig::default().filter);
    }

    #[test]
    fn test_overrides() {
        let settings = config::Config::builder()
            .set_override("store.kind", "postgres")
            .unwrap()
            .set_override("database.url", "postgres://pm:pm@db/pm")
            .unwrap()
            .set_override("services.enforce_assignee_membership", true)
            .unwrap()
            .build()
            .unwrap();

        let config = AppConfig::from_settings(settings).unwrap();
        assert_eq!(config.store.kind, StoreKind::Postgres);
        assert_eq!(config.database.url, "postgres://pm:pm@db/pm");
        assert!(config.services.enforce_assignee_membership);
        // untouched sections keep their defaults
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn test_postgres_requires_url() {
        let mut config = AppConfig::default();
        config.store.kind = StoreKind::Postgres;
        config.database.url = "  ".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "database.url"));
    }

    #[test]
    fn test_pool_bounds() {
        let mut config = AppConfig::default();
        config.database.min_connections = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serializes_to_json() {
        let value = serde_json::to_value(AppConfig::default()).unwrap();
        assert_eq!(value["store"]["kind"], "memory");
    }
}
