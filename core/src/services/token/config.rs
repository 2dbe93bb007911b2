//! Configuration for the refresh token service

use bk_shared::config::auth::{
    MAX_REFRESH_TOKEN_LIFETIME_SECONDS, MAX_RETENTION_DAYS, MIN_REFRESH_TOKEN_BYTES,
};
use bk_shared::{CleanupConfig, RefreshTokenConfig};
use chrono::Duration;

/// Configuration for the refresh token service
#[derive(Debug, Clone)]
pub struct RefreshTokenServiceConfig {
    /// How long a freshly issued token stays valid
    pub token_lifetime: Duration,
    /// How long expired records are kept before the sweep deletes them
    pub retention: Duration,
    /// Random bytes per raw token
    pub token_bytes: usize,
}

impl Default for RefreshTokenServiceConfig {
    fn default() -> Self {
        Self::from(&RefreshTokenConfig::default())
    }
}

impl From<&RefreshTokenConfig> for RefreshTokenServiceConfig {
    fn from(config: &RefreshTokenConfig) -> Self {
        // Out-of-range values are clamped; `RefreshTokenConfig::validate` reports them at load time
        Self {
            token_lifetime: Duration::seconds(
                config
                    .lifetime_seconds
                    .clamp(1, MAX_REFRESH_TOKEN_LIFETIME_SECONDS),
            ),
            retention: Duration::days(config.retention_days.clamp(0, MAX_RETENTION_DAYS)),
            token_bytes: config.token_bytes.max(MIN_REFRESH_TOKEN_BYTES),
        }
    }
}

/// Configuration for the cleanup job
#[derive(Debug, Clone)]
pub struct TokenCleanupConfig {
    /// Whether the background loop runs at all
    pub enabled: bool,
    /// Time between sweeps
    pub interval: std::time::Duration,
}

impl Default for TokenCleanupConfig {
    fn default() -> Self {
        Self::from(&CleanupConfig::default())
    }
}

impl From<&CleanupConfig> for TokenCleanupConfig {
    fn from(config: &CleanupConfig) -> Self {
        Self {
            enabled: config.enabled,
            interval: std::time::Duration::from_secs(config.interval_seconds.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RefreshTokenServiceConfig::default();
        assert_eq!(config.token_lifetime, Duration::days(7));
        assert_eq!(config.retention, Duration::days(30));
        assert_eq!(config.token_bytes, 32);

        let cleanup = TokenCleanupConfig::default();
        assert!(cleanup.enabled);
        assert_eq!(cleanup.interval, std::time::Duration::from_secs(86_400));
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let raw = RefreshTokenConfig {
            lifetime_seconds: 3600,
            retention_days: -5,
            token_bytes: 8,
        };
        let config = RefreshTokenServiceConfig::from(&raw);

        assert_eq!(config.token_lifetime, Duration::hours(1));
        assert_eq!(config.retention, Duration::zero());
        assert_eq!(config.token_bytes, MIN_REFRESH_TOKEN_BYTES);
    }

    #[test]
    fn test_oversized_values_are_clamped_to_limits() {
        let raw = RefreshTokenConfig {
            lifetime_seconds: i64::MAX,
            retention_days: 100_000_000,
            token_bytes: 64,
        };
        let config = RefreshTokenServiceConfig::from(&raw);

        assert_eq!(
            config.token_lifetime,
            Duration::seconds(MAX_REFRESH_TOKEN_LIFETIME_SECONDS)
        );
        assert_eq!(config.retention, Duration::days(MAX_RETENTION_DAYS));
        assert_eq!(config.token_bytes, 64);
    }
}
