//! Refresh token and token maintenance configuration

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Minimum entropy carried by a refresh token (256 bits)
pub const MIN_REFRESH_TOKEN_BYTES: usize = 32;

/// Longest accepted refresh token lifetime (ten years)
pub const MAX_REFRESH_TOKEN_LIFETIME_SECONDS: i64 = 10 * 365 * 86400;

/// Longest accepted retention window
pub const MAX_RETENTION_DAYS: i64 = 3650;

/// Refresh token issuance and retention settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RefreshTokenConfig {
    /// Refresh token lifetime in seconds
    #[serde(default = "default_lifetime_seconds")]
    pub lifetime_seconds: i64,

    /// Days an expired token is kept for forensic review before it is purged
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Random bytes per raw token
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,
}

impl Default for RefreshTokenConfig {
    fn default() -> Self {
        Self {
            lifetime_seconds: default_lifetime_seconds(),
            retention_days: default_retention_days(),
            token_bytes: default_token_bytes(),
        }
    }
}

impl RefreshTokenConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lifetime_seconds: env_or("REFRESH_TOKEN_LIFETIME_SECONDS", defaults.lifetime_seconds),
            retention_days: env_or("REFRESH_TOKEN_RETENTION_DAYS", defaults.retention_days),
            token_bytes: env_or("REFRESH_TOKEN_BYTES", defaults.token_bytes),
        }
    }

    /// Set refresh token lifetime in days
    pub fn with_lifetime_days(mut self, days: i64) -> Self {
        self.lifetime_seconds = days.saturating_mul(86400);
        self
    }

    /// Set the retention window in days
    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    /// Reject settings the rotation engine cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lifetime_seconds <= 0 {
            return Err(ConfigError::Invalid {
                field: "auth.refresh.lifetime_seconds".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.lifetime_seconds > MAX_REFRESH_TOKEN_LIFETIME_SECONDS {
            return Err(ConfigError::Invalid {
                field: "auth.refresh.lifetime_seconds".to_string(),
                reason: format!("must be at most {}", MAX_REFRESH_TOKEN_LIFETIME_SECONDS),
            });
        }
        if self.retention_days < 0 {
            return Err(ConfigError::Invalid {
                field: "auth.refresh.retention_days".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        if self.retention_days > MAX_RETENTION_DAYS {
            return Err(ConfigError::Invalid {
                field: "auth.refresh.retention_days".to_string(),
                reason: format!("must be at most {}", MAX_RETENTION_DAYS),
            });
        }
        if self.token_bytes < MIN_REFRESH_TOKEN_BYTES {
            return Err(ConfigError::Invalid {
                field: "auth.refresh.token_bytes".to_string(),
                reason: format!("must be at least {}", MIN_REFRESH_TOKEN_BYTES),
            });
        }
        Ok(())
    }
}

/// Schedule for the expired-token sweep
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CleanupConfig {
    /// Whether the background sweep runs at all
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,

    /// Seconds between sweeps
    #[serde(default = "default_cleanup_interval")]
    pub interval_seconds: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: default_cleanup_enabled(),
            interval_seconds: default_cleanup_interval(),
        }
    }
}

impl CleanupConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_or("TOKEN_CLEANUP_ENABLED", defaults.enabled),
            interval_seconds: env_or("TOKEN_CLEANUP_INTERVAL_SECONDS", defaults.interval_seconds),
        }
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Refresh token settings
    #[serde(default)]
    pub refresh: RefreshTokenConfig,

    /// Cleanup schedule
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

impl AuthConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            refresh: RefreshTokenConfig::from_env(),
            cleanup: CleanupConfig::from_env(),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn default_lifetime_seconds() -> i64 {
    604800 // 7 days
}

fn default_retention_days() -> i64 {
    30
}

fn default_token_bytes() -> usize {
    MIN_REFRESH_TOKEN_BYTES
}

fn default_cleanup_enabled() -> bool {
    true
}

fn default_cleanup_interval() -> u64 {
    86400 // once a day
}
