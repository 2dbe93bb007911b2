//! Refresh token rotation engine

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use bk_shared::SECURITY_AUDIT_TARGET;

use crate::domain::entities::refresh_token::{
    IssuedRefreshToken, NewRefreshToken, RawRefreshToken, RefreshTokenRecord, TokenFamily,
};
use crate::errors::{StoreResult, TokenError, TokenResult};
use crate::repositories::{TokenStore, TokenStoreTx};

use super::clock::{Clock, SystemClock};
use super::config::RefreshTokenServiceConfig;
use super::crypto::{encode_raw_token, OsRandomSource, SecureRandomSource, Sha256TokenHasher, TokenHasher};

/// Service issuing, rotating and revoking refresh tokens
///
/// Every refresh token is single use. Presenting it returns a successor in
/// the same family and revokes the presented one. Presenting an already
/// revoked token is treated as theft: the whole family is revoked and the
/// caller gets [`TokenError::TokenReuseDetected`].
///
/// The service holds no mutable state; all coordination happens in the
/// store, one transaction per public operation.
pub struct RefreshTokenService<S: TokenStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn SecureRandomSource>,
    hasher: Arc<dyn TokenHasher>,
    config: RefreshTokenServiceConfig,
}

impl<S: TokenStore> RefreshTokenService<S> {
    /// Creates a service backed by the system clock, the OS random source
    /// and SHA-256 hashing
    pub fn new(store: Arc<S>, config: RefreshTokenServiceConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            random: Arc::new(OsRandomSource),
            hasher: Arc::new(Sha256TokenHasher),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_random_source(mut self, random: Arc<dyn SecureRandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn TokenHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn config(&self) -> &RefreshTokenServiceConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Issues a new token for `user_id`
    ///
    /// # Arguments
    ///
    /// * `user_id` - Owner of the token
    /// * `family` - Lineage to join; `None` starts a new one (fresh login)
    ///
    /// # Returns
    ///
    /// * `Ok(IssuedRefreshToken)` - The raw token (returned only here) and the stored record
    /// * `Err(TokenError::StorageFailure)` - The store rejected the insert
    /// * `Err(TokenError::TimestampOutOfRange)` - The expiry does not fit in a timestamp
    pub async fn create_refresh_token(
        &self,
        user_id: Uuid,
        family: Option<TokenFamily>,
    ) -> TokenResult<IssuedRefreshToken> {
        let now = self.clock.now();
        let family = family.unwrap_or_else(TokenFamily::generate);
        let (raw_token, token) = self.new_token(user_id, family, now)?;

        let mut tx = self.store.begin().await?;
        let record = tx.insert(token).await?;
        tx.commit().await?;

        debug!(
            user_id = %user_id,
            token_id = %record.id,
            token_family = %family,
            "Issued refresh token"
        );

        Ok(IssuedRefreshToken { raw_token, record })
    }

    /// Exchanges a presented raw token for its successor
    ///
    /// # Returns
    ///
    /// * `Ok(IssuedRefreshToken)` - Successor in the same family; the presented token is now revoked
    /// * `Err(TokenError::InvalidToken)` - No record matches the token
    /// * `Err(TokenError::TokenReuseDetected)` - The token was already revoked; its family is revoked
    ///   unless the store failed, in which case the failure is logged and a replay retries it
    /// * `Err(TokenError::TokenExpired)` - The token is active but past its expiry
    /// * `Err(TokenError::StorageFailure)` - The store failed; nothing was changed
    pub async fn validate_and_rotate(&self, raw_token: &str) -> TokenResult<IssuedRefreshToken> {
        let token_hash = self.hasher.hash(raw_token);
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let presented = match tx.find_by_hash(&token_hash).await? {
            Some(record) => record,
            None => {
                debug!("Rejected unknown refresh token");
                return Err(TokenError::InvalidToken);
            }
        };

        // Revocation is checked before expiry so that replaying a stale,
        // already rotated token still counts as reuse
        if presented.is_revoked() {
            return Err(self.revoke_reused_family(Some(tx), &presented, now).await);
        }

        if presented.is_expired_at(now) {
            debug!(
                user_id = %presented.user_id,
                token_id = %presented.id,
                "Rejected expired refresh token"
            );
            return Err(TokenError::TokenExpired);
        }

        let (raw_successor, successor) =
            self.new_token(presented.user_id, presented.token_family, now)?;
        let successor = tx.insert(successor).await?;

        if !tx.mark_revoked(presented.id, now, Some(successor.id)).await? {
            // A concurrent rotation revoked the record after we read it
            if let Err(e) = tx.rollback().await {
                warn!(error = %e, "Rollback of lost rotation failed");
            }
            return Err(self.revoke_reused_family(None, &presented, now).await);
        }
        tx.commit().await?;

        debug!(
            user_id = %presented.user_id,
            token_family = %presented.token_family,
            from_token_id = %presented.id,
            to_token_id = %successor.id,
            "Rotated refresh token"
        );

        Ok(IssuedRefreshToken {
            raw_token: raw_successor,
            record: successor,
        })
    }

    /// Revokes a single token (logout)
    ///
    /// Unknown or already revoked tokens are a silent no-op.
    pub async fn revoke_token(&self, raw_token: &str) -> TokenResult<()> {
        let token_hash = self.hasher.hash(raw_token);
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let record = match tx.find_by_hash(&token_hash).await? {
            Some(record) => record,
            None => {
                debug!("Logout with unknown refresh token ignored");
                return Ok(());
            }
        };

        if tx.mark_revoked(record.id, now, None).await? {
            tx.commit().await?;
            debug!(user_id = %record.user_id, token_id = %record.id, "Revoked refresh token");
        } else {
            tx.rollback().await?;
            debug!(token_id = %record.id, "Refresh token already revoked");
        }

        Ok(())
    }

    /// Revokes every active token of a user ("log out everywhere")
    pub async fn revoke_all_user_tokens(&self, user_id: Uuid) -> TokenResult<u64> {
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let revoked = tx.revoke_all_active_for_user(user_id, now).await?;
        tx.commit().await?;

        info!(user_id = %user_id, revoked, "Revoked all refresh tokens for user");
        Ok(revoked)
    }

    /// Revokes every active token of a family
    pub async fn revoke_token_family(&self, family: TokenFamily) -> TokenResult<u64> {
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let revoked = tx.revoke_all_active_for_family(family, now).await?;
        tx.commit().await?;

        warn!(token_family = %family, revoked, "Revoked refresh token family");
        Ok(revoked)
    }

    /// Deletes records that expired more than the retention period ago
    pub async fn cleanup_expired_tokens(&self) -> TokenResult<u64> {
        let cutoff = self.retention_cutoff(self.clock.now())?;
        self.delete_expired_before(cutoff).await
    }

    /// Number of tokens of a user that are neither revoked nor expired
    pub async fn get_active_token_count(&self, user_id: Uuid) -> TokenResult<u64> {
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let count = tx.count_active(user_id, now).await?;
        tx.commit().await?;

        Ok(count)
    }

    /// The most recently issued active token of a user
    pub async fn most_recent_active_token(
        &self,
        user_id: Uuid,
    ) -> TokenResult<Option<RefreshTokenRecord>> {
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let record = tx.find_most_recent_active(user_id, now).await?;
        tx.commit().await?;

        Ok(record)
    }

    /// Every retained record of a family, in issue order
    pub async fn token_lineage(&self, family: TokenFamily) -> TokenResult<Vec<RefreshTokenRecord>> {
        let mut tx = self.store.begin().await?;
        let lineage = tx.find_by_family(family).await?;
        tx.commit().await?;

        Ok(lineage)
    }

    /// Every retained record of a user across all families, oldest first
    ///
    /// Includes revoked and expired records still inside the retention window.
    pub async fn user_tokens(&self, user_id: Uuid) -> TokenResult<Vec<RefreshTokenRecord>> {
        let mut tx = self.store.begin().await?;
        let records = tx.find_by_user(user_id).await?;
        tx.commit().await?;

        Ok(records)
    }

    /// Instant before which expired records are eligible for deletion
    pub fn retention_cutoff(&self, now: DateTime<Utc>) -> TokenResult<DateTime<Utc>> {
        now.checked_sub_signed(self.config.retention)
            .ok_or(TokenError::TimestampOutOfRange)
    }

    pub(crate) async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> TokenResult<u64> {
        let mut tx = self.store.begin().await?;
        let deleted = tx.delete_expired_before(cutoff).await?;
        tx.commit().await?;

        debug!(deleted, cutoff = %cutoff, "Deleted expired refresh tokens");
        Ok(deleted)
    }

    /// Audits a replayed token and revokes its family
    ///
    /// Reuse is reported even when the revoke fails: the presented token is
    /// already revoked, so the next replay retries the family revoke.
    async fn revoke_reused_family(
        &self,
        tx: Option<Box<dyn TokenStoreTx>>,
        presented: &RefreshTokenRecord,
        now: DateTime<Utc>,
    ) -> TokenError {
        warn!(
            target: SECURITY_AUDIT_TARGET,
            user_id = %presented.user_id,
            token_family = %presented.token_family,
            token_id = %presented.id,
            "Refresh token reuse detected, revoking token family"
        );

        match self.revoke_family_in(tx, presented.token_family, now).await {
            Ok(revoked) => warn!(
                target: SECURITY_AUDIT_TARGET,
                user_id = %presented.user_id,
                token_family = %presented.token_family,
                revoked,
                "Token family revoked after reuse"
            ),
            Err(e) => error!(
                target: SECURITY_AUDIT_TARGET,
                user_id = %presented.user_id,
                token_family = %presented.token_family,
                error = %e,
                "Failed to revoke token family after reuse"
            ),
        }

        TokenError::TokenReuseDetected {
            user_id: presented.user_id,
            token_family: presented.token_family,
        }
    }

    async fn revoke_family_in(
        &self,
        tx: Option<Box<dyn TokenStoreTx>>,
        family: TokenFamily,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut tx = match tx {
            Some(tx) => tx,
            None => self.store.begin().await?,
        };
        let revoked = tx.revoke_all_active_for_family(family, now).await?;
        tx.commit().await?;
        Ok(revoked)
    }

    fn new_token(
        &self,
        user_id: Uuid,
        family: TokenFamily,
        now: DateTime<Utc>,
    ) -> TokenResult<(RawRefreshToken, NewRefreshToken)> {
        let expires_at = now
            .checked_add_signed(self.config.token_lifetime)
            .ok_or(TokenError::TimestampOutOfRange)?;

        let mut bytes = vec![0u8; self.config.token_bytes];
        self.random.fill_bytes(&mut bytes);
        let raw_token = RawRefreshToken::new(encode_raw_token(&bytes));

        let token = NewRefreshToken {
            user_id,
            token_hash: self.hasher.hash(raw_token.as_str()),
            token_family: family,
            created_at: now,
            expires_at,
        };

        Ok((raw_token, token))
    }
}
