//! # Booking Platform Core
//!
//! Refresh token lifecycle for the booking platform backend.
//! This crate contains the token domain types, the rotation engine with
//! reuse detection, the store contract every persistence adapter implements,
//! an in-memory store, and the error types shared by all of them.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::entities::{
    IssuedRefreshToken, NewRefreshToken, RawRefreshToken, RefreshTokenRecord, TokenFamily,
    TokenId, TokenState,
};
pub use errors::{StoreError, StoreResult, TokenError, TokenResult};
pub use repositories::{InMemoryTokenStore, TokenStore, TokenStoreTx};
pub use services::{
    CleanupReport, Clock, ManualClock, RefreshTokenService, RefreshTokenServiceConfig,
    SecureRandomSource, SystemClock, TokenCleanupConfig, TokenCleanupService, TokenHasher,
};
