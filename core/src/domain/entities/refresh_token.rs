//! Refresh token records and the values exchanged with callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Store-assigned identifier of a refresh token record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub i64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier shared by every token descended from one login
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenFamily(pub Uuid);

impl TokenFamily {
    /// Start a new lineage
    pub fn generate() -> Self {
        TokenFamily(Uuid::new_v4())
    }
}

impl fmt::Display for TokenFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle position of a record at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Not revoked and not yet expired
    Active,
    /// Not revoked but past `expires_at`
    Expired,
    /// Revoked because it was exchanged for a successor
    Rotated,
    /// Revoked by logout, bulk revocation or reuse detection
    Revoked,
}

/// One issued or historical refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Store-assigned identifier
    pub id: TokenId,

    /// Owner of the token
    pub user_id: Uuid,

    /// SHA-256 digest of the raw token, hex encoded
    pub token_hash: String,

    /// Rotation lineage this record belongs to
    pub token_family: TokenFamily,

    /// When the token was issued
    pub created_at: DateTime<Utc>,

    /// Fixed at issue time; rotation never extends it
    pub expires_at: DateTime<Utc>,

    /// Set once, never cleared
    pub revoked_at: Option<DateTime<Utc>>,

    /// Successor issued when this token was rotated
    pub replaced_by_token_id: Option<TokenId>,
}

impl RefreshTokenRecord {
    /// Build a stored record from an insert payload and the id the store assigned
    pub fn from_new(id: TokenId, token: NewRefreshToken) -> Self {
        Self {
            id,
            user_id: token.user_id,
            token_hash: token.token_hash,
            token_family: token.token_family,
            created_at: token.created_at,
            expires_at: token.expires_at,
            revoked_at: None,
            replaced_by_token_id: None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Expiry is inclusive: a token is expired at exactly `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired_at(now)
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        match (self.revoked_at, self.replaced_by_token_id) {
            (Some(_), Some(_)) => TokenState::Rotated,
            (Some(_), None) => TokenState::Revoked,
            (None, _) if self.is_expired_at(now) => TokenState::Expired,
            (None, _) => TokenState::Active,
        }
    }

    /// Apply a revocation in place. Returns `false` if the record was already
    /// revoked, in which case nothing changes.
    pub fn revoke(&mut self, revoked_at: DateTime<Utc>, replaced_by: Option<TokenId>) -> bool {
        if self.is_revoked() {
            return false;
        }
        self.revoked_at = Some(revoked_at);
        self.replaced_by_token_id = replaced_by;
        true
    }
}

/// Insert payload for a new record; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRefreshToken {
    pub user_id: Uuid,
    pub token_hash: String,
    pub token_family: TokenFamily,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// The raw refresh token handed to the client exactly once
///
/// `Debug` is redacted so the value never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct RawRefreshToken(String);

impl RawRefreshToken {
    pub fn new(value: impl Into<String>) -> Self {
        RawRefreshToken(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for RawRefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawRefreshToken(<redacted>)")
    }
}

impl AsRef<str> for RawRefreshToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of creating or rotating a token
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    /// Raw value for the client; not retrievable again
    pub raw_token: RawRefreshToken,

    /// Persisted record, holding only the hash
    pub record: RefreshTokenRecord,
}
