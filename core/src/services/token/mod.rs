//! Refresh token service module
//!
//! This module handles the refresh token lifecycle:
//! - Issuing opaque single-use tokens
//! - Rotation with reuse detection per token family
//! - Logout, bulk and family revocation
//! - Background deletion of expired tokens

mod cleanup;
mod clock;
mod config;
mod crypto;
mod service;

#[cfg(test)]
mod tests;

pub use cleanup::{CleanupReport, TokenCleanupService};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RefreshTokenServiceConfig, TokenCleanupConfig};
pub use crypto::{encode_raw_token, OsRandomSource, SecureRandomSource, Sha256TokenHasher, TokenHasher};
pub use service::RefreshTokenService;
