//! In-memory implementation of `TokenStore` for development and tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::entities::refresh_token::{
    NewRefreshToken, RefreshTokenRecord, TokenFamily, TokenId,
};
use crate::errors::{StoreError, StoreResult};

use super::r#trait::{TokenStore, TokenStoreTx};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    records: BTreeMap<TokenId, RefreshTokenRecord>,
    by_hash: HashMap<String, TokenId>,
    last_id: i64,
}

/// In-memory token store for development and tests
///
/// Transactions are fully serialised: `begin` takes a single async lock and
/// holds it until the transaction ends. Writes go to a staged copy of the
/// state that replaces the committed state on commit, so an abandoned
/// transaction leaves no trace.
///
/// Every `begin` clones the whole committed state, read-only operations
/// included, so each operation costs O(N) in the number of retained records.
/// Not meant for production volumes; use a database-backed store there.
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryTokenStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retained records
    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Committed record by id
    pub async fn get(&self, id: TokenId) -> Option<RefreshTokenRecord> {
        self.state.lock().await.records.get(&id).cloned()
    }

    /// Committed records, ordered by id
    pub async fn snapshot(&self) -> Vec<RefreshTokenRecord> {
        self.state.lock().await.records.values().cloned().collect()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn begin(&self) -> StoreResult<Box<dyn TokenStoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTokenStoreTx { guard, staged }))
    }
}

struct InMemoryTokenStoreTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

impl InMemoryTokenStoreTx {
    fn revoke_matching<F>(&mut self, revoked_at: DateTime<Utc>, predicate: F) -> u64
    where
        F: Fn(&RefreshTokenRecord) -> bool,
    {
        self.staged
            .records
            .values_mut()
            .filter(|record| predicate(&**record))
            .map(|record| record.revoke(revoked_at, None))
            .filter(|changed| *changed)
            .count() as u64
    }

    fn oldest_first<F>(&self, predicate: F) -> Vec<RefreshTokenRecord>
    where
        F: Fn(&RefreshTokenRecord) -> bool,
    {
        let mut records: Vec<RefreshTokenRecord> = self
            .staged
            .records
            .values()
            .filter(|record| predicate(record))
            .cloned()
            .collect();
        records.sort_by_key(|record| (record.created_at, record.id));
        records
    }
}

#[async_trait]
impl TokenStoreTx for InMemoryTokenStoreTx {
    async fn find_by_hash(&mut self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        Ok(self
            .staged
            .by_hash
            .get(token_hash)
            .and_then(|id| self.staged.records.get(id))
            .cloned())
    }

    async fn insert(&mut self, token: NewRefreshToken) -> StoreResult<RefreshTokenRecord> {
        if self.staged.by_hash.contains_key(&token.token_hash) {
            return Err(StoreError::DuplicateHash);
        }

        self.staged.last_id += 1;
        let id = TokenId(self.staged.last_id);
        let record = RefreshTokenRecord::from_new(id, token);

        self.staged.by_hash.insert(record.token_hash.clone(), id);
        self.staged.records.insert(id, record.clone());
        Ok(record)
    }

    async fn mark_revoked(
        &mut self,
        id: TokenId,
        revoked_at: DateTime<Utc>,
        replaced_by: Option<TokenId>,
    ) -> StoreResult<bool> {
        Ok(self
            .staged
            .records
            .get_mut(&id)
            .map(|record| record.revoke(revoked_at, replaced_by))
            .unwrap_or(false))
    }

    async fn revoke_all_active_for_family(
        &mut self,
        family: TokenFamily,
        revoked_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        Ok(self.revoke_matching(revoked_at, |record| record.token_family == family))
    }

    async fn revoke_all_active_for_user(
        &mut self,
        user_id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        Ok(self.revoke_matching(revoked_at, |record| record.user_id == user_id))
    }

    async fn count_active(&mut self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<u64> {
        Ok(self
            .staged
            .records
            .values()
            .filter(|record| record.user_id == user_id && record.is_active_at(now))
            .count() as u64)
    }

    async fn find_most_recent_active(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<RefreshTokenRecord>> {
        Ok(self
            .staged
            .records
            .values()
            .filter(|record| record.user_id == user_id && record.is_active_at(now))
            .max_by_key(|record| (record.created_at, record.id))
            .cloned())
    }

    async fn find_by_family(&mut self, family: TokenFamily) -> StoreResult<Vec<RefreshTokenRecord>> {
        Ok(self.oldest_first(|record| record.token_family == family))
    }

    async fn find_by_user(&mut self, user_id: Uuid) -> StoreResult<Vec<RefreshTokenRecord>> {
        Ok(self.oldest_first(|record| record.user_id == user_id))
    }

    async fn delete_expired_before(&mut self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let doomed: Vec<TokenId> = self
            .staged
            .records
            .values()
            .filter(|record| record.expires_at < cutoff)
            .map(|record| record.id)
            .collect();

        for id in &doomed {
            if let Some(record) = self.staged.records.remove(id) {
                self.staged.by_hash.remove(&record.token_hash);
            }
        }

        Ok(doomed.len() as u64)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let InMemoryTokenStoreTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
