//! Token store traits defining the persistence contract for refresh tokens.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::refresh_token::{
    NewRefreshToken, RefreshTokenRecord, TokenFamily, TokenId,
};
use crate::errors::StoreResult;

/// Entry point of a refresh token store
///
/// Every engine operation runs inside exactly one transaction obtained from
/// [`TokenStore::begin`]. Implementations must provide:
/// - a hard uniqueness constraint on `token_hash`
/// - isolation such that two transactions cannot both move the same record
///   from active to revoked
///
/// # Example
/// ```no_run
/// # use bk_core::repositories::{TokenStore, TokenStoreTx};
/// # use bk_core::errors::StoreResult;
/// # async fn example(store: &impl TokenStore) -> StoreResult<()> {
/// let mut tx = store.begin().await?;
/// if let Some(record) = tx.find_by_hash("3f1a...").await? {
///     println!("found token {} in family {}", record.id, record.token_family);
/// }
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> StoreResult<Box<dyn TokenStoreTx>>;
}

/// A unit of work against the token store
///
/// Dropping a transaction without calling [`TokenStoreTx::commit`] discards
/// every write made through it.
#[async_trait]
pub trait TokenStoreTx: Send {
    /// Find a record by token hash
    ///
    /// Adapters that support row locking lock the returned row until the
    /// transaction ends.
    async fn find_by_hash(&mut self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Persist a new active record and return it with its assigned id
    ///
    /// # Returns
    /// * `Err(StoreError::DuplicateHash)` - the hash is already stored
    async fn insert(&mut self, token: NewRefreshToken) -> StoreResult<RefreshTokenRecord>;

    /// Revoke a record if it is still active
    ///
    /// # Returns
    /// * `Ok(true)` - this call moved the record from active to revoked
    /// * `Ok(false)` - the record was already revoked or does not exist; nothing changed
    async fn mark_revoked(
        &mut self,
        id: TokenId,
        revoked_at: DateTime<Utc>,
        replaced_by: Option<TokenId>,
    ) -> StoreResult<bool>;

    /// Revoke every non-revoked record of a family, returning how many changed
    async fn revoke_all_active_for_family(
        &mut self,
        family: TokenFamily,
        revoked_at: DateTime<Utc>,
    ) -> StoreResult<u64>;

    /// Revoke every non-revoked record of a user, returning how many changed
    async fn revoke_all_active_for_user(
        &mut self,
        user_id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> StoreResult<u64>;

    /// Count records that are neither revoked nor expired at `now`
    async fn count_active(&mut self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<u64>;

    /// The newest active record of a user, by `created_at` then `id`
    async fn find_most_recent_active(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Every retained record of a family, oldest first
    async fn find_by_family(&mut self, family: TokenFamily) -> StoreResult<Vec<RefreshTokenRecord>>;

    /// Every retained record of a user across all families, oldest first
    async fn find_by_user(&mut self, user_id: Uuid) -> StoreResult<Vec<RefreshTokenRecord>>;

    /// Hard-delete records whose `expires_at` is strictly before `cutoff`
    async fn delete_expired_before(&mut self, cutoff: DateTime<Utc>) -> StoreResult<u64>;

    /// Make every write of this transaction visible atomically
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discard every write of this transaction
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
