//! Shared configuration and logging for the booking platform server
//!
//! This crate provides functionality used across all server crates:
//! - Configuration types and layered loading
//! - Tracing subscriber initialisation

pub mod config;
pub mod logging;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthConfig, CleanupConfig, ConfigError, DatabaseConfig, Environment, LogFormat,
    LoggingConfig, RefreshTokenConfig,
};
pub use logging::{init_tracing, SECURITY_AUDIT_TARGET};
