//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `auth` - Refresh token lifetime, retention and cleanup schedule
//! - `database` - Database connection and pool configuration
//! - `environment` - Environment detection and logging configuration

pub mod auth;
pub mod database;
pub mod environment;

use ::config::{Config, Environment as EnvSource, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export commonly used types
pub use auth::{
    AuthConfig, CleanupConfig, RefreshTokenConfig, MAX_REFRESH_TOKEN_LIFETIME_SECONDS,
    MAX_RETENTION_DAYS, MIN_REFRESH_TOKEN_BYTES,
};
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};

/// Prefix for layered environment overrides, e.g. `BK__AUTH__REFRESH__RETENTION_DAYS=60`
pub const ENV_PREFIX: &str = "BK";

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig::new("mysql://localhost:3306/booking_dev"),
            auth: AuthConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Development),
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig::new("mysql://prod-db:3306/booking").with_max_connections(50),
            auth: AuthConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Production),
        }
    }

    /// Load configuration from plain environment variables
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        Self {
            environment,
            database: DatabaseConfig::from_env(),
            auth: AuthConfig::from_env(),
            logging: LoggingConfig::for_environment(environment).with_env_overrides(),
        }
    }

    /// Load layered configuration
    ///
    /// Sources, lowest precedence first:
    /// 1. [`AppConfig::from_env`], after loading `.env` into the process environment
    /// 2. the TOML file at `path`, or the environment's default file; missing files are skipped
    /// 3. `BK__`-prefixed environment variables (`__` separates nesting levels)
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = Environment::from_env();
        let path = path.unwrap_or_else(|| environment.config_file());

        let overrides = EnvSource::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true);

        Self::layered(&AppConfig::from_env(), path, Some(overrides))
    }

    /// Layer an optional TOML file and optional overrides over `base`, then validate
    fn layered(
        base: &AppConfig,
        path: &str,
        overrides: Option<EnvSource>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(base)?)
            .add_source(File::with_name(path).required(false));
        if let Some(overrides) = overrides {
            builder = builder.add_source(overrides);
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.refresh.validate()?;
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                field: "database.max_connections".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
