//! Error taxonomy for the refresh token subsystem.
//!
//! `TokenError` is what callers of the rotation engine see; every kind is a
//! distinct variant so the HTTP layer can react to each one differently.
//! `StoreError` is what a `TokenStore` adapter reports.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::refresh_token::TokenFamily;

/// Failures reported by a token store adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The unique index on `token_hash` rejected an insert
    #[error("Refresh token hash already exists")]
    DuplicateHash,

    /// Any other storage-level failure (connection, timeout, deadlock, ...)
    #[error("Token store error: {message}")]
    Backend { message: String },
}

impl StoreError {
    /// Build a backend error from anything printable
    pub fn backend(message: impl std::fmt::Display) -> Self {
        StoreError::Backend {
            message: message.to_string(),
        }
    }
}

/// Failures surfaced by the refresh token service
#[derive(Error, Debug)]
pub enum TokenError {
    /// No record matches the presented token
    #[error("Invalid refresh token")]
    InvalidToken,

    /// The record is active but past its expiry
    #[error("Refresh token expired")]
    TokenExpired,

    /// An already revoked token was presented again; the whole family is now revoked
    #[error("Refresh token reuse detected for user {user_id}, family {token_family}")]
    TokenReuseDetected {
        user_id: Uuid,
        token_family: TokenFamily,
    },

    /// An expiry or retention cutoff fell outside the representable range
    #[error("Refresh token timestamp out of range")]
    TimestampOutOfRange,

    /// The store could not complete the operation
    #[error("Token storage failure: {0}")]
    StorageFailure(#[from] StoreError),
}

impl TokenError {
    /// Only storage failures may be retried, and never blindly for a rotation
    pub fn is_retryable(&self) -> bool {
        matches!(self, TokenError::StorageFailure(_))
    }

    /// Whether the caller must force a logout of the affected user/family
    pub fn is_security_incident(&self) -> bool {
        matches!(self, TokenError::TokenReuseDetected { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type TokenResult<T> = Result<T, TokenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_failure_is_the_only_retryable_kind() {
        let reuse = TokenError::TokenReuseDetected {
            user_id: Uuid::new_v4(),
            token_family: TokenFamily::generate(),
        };

        assert!(TokenError::from(StoreError::backend("timeout")).is_retryable());
        assert!(!TokenError::InvalidToken.is_retryable());
        assert!(!TokenError::TokenExpired.is_retryable());
        assert!(!TokenError::TimestampOutOfRange.is_retryable());
        assert!(!reuse.is_retryable());
        assert!(reuse.is_security_incident());
    }

    #[test]
    fn test_duplicate_hash_converts_to_storage_failure() {
        let err: TokenError = StoreError::DuplicateHash.into();
        assert!(matches!(err, TokenError::StorageFailure(StoreError::DuplicateHash)));
        assert_eq!(
            err.to_string(),
            "Token storage failure: Refresh token hash already exists"
        );
    }
}
