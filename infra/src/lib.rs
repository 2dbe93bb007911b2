//! # Infrastructure Layer
//!
//! Concrete adapters for the booking platform's refresh token subsystem.
//!
//! ## Architecture
//!
//! - **Database**: MySQL connection pool and the `TokenStore` implementation using SQLx
//! - **Binaries**: `token-cleanup`, the scheduled retention sweep
//!
//! ## Features
//!
//! - `mysql`: Enable MySQL database support (default)

/// Database module - MySQL implementations using SQLx
#[cfg(feature = "mysql")]
pub mod database;

#[cfg(feature = "mysql")]
pub use database::{DatabasePool, MySqlTokenStore, PoolStatistics};

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
