//! Test doubles for the refresh token service

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::refresh_token::{
    NewRefreshToken, RefreshTokenRecord, TokenFamily, TokenId,
};
use crate::errors::{StoreError, StoreResult};
use crate::repositories::{InMemoryTokenStore, TokenStore, TokenStoreTx};
use crate::services::token::{
    ManualClock, RefreshTokenService, RefreshTokenServiceConfig, SecureRandomSource,
};

/// Fixed instant so tests never depend on the wall clock
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Random source that always yields the same byte
pub struct FixedRandomSource(pub u8);

impl SecureRandomSource for FixedRandomSource {
    fn fill_bytes(&self, dest: &mut [u8]) {
        dest.fill(self.0);
    }
}

/// Store wrapper with switchable faults
///
/// * `fail_inserts` - every insert fails with a backend error
/// * `stale_reads` - `find_by_hash` reports revoked records as active,
///   like a read without a row lock racing a concurrent rotation
/// * `fail_family_revokes` - every family revoke fails with a backend error
#[derive(Clone, Default)]
pub struct FaultyTokenStore {
    pub inner: InMemoryTokenStore,
    pub fail_inserts: Arc<AtomicBool>,
    pub stale_reads: Arc<AtomicBool>,
    pub fail_family_revokes: Arc<AtomicBool>,
}

impl FaultyTokenStore {
    pub fn new(inner: InMemoryTokenStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }
}

#[async_trait]
impl TokenStore for FaultyTokenStore {
    async fn begin(&self) -> StoreResult<Box<dyn TokenStoreTx>> {
        Ok(Box::new(FaultyTokenStoreTx {
            inner: self.inner.begin().await?,
            fail_inserts: self.fail_inserts.load(Ordering::SeqCst),
            stale_reads: self.stale_reads.load(Ordering::SeqCst),
            fail_family_revokes: self.fail_family_revokes.load(Ordering::SeqCst),
        }))
    }
}

struct FaultyTokenStoreTx {
    inner: Box<dyn TokenStoreTx>,
    fail_inserts: bool,
    stale_reads: bool,
    fail_family_revokes: bool,
}

#[async_trait]
impl TokenStoreTx for FaultyTokenStoreTx {
    async fn find_by_hash(&mut self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let found = self.inner.find_by_hash(token_hash).await?;
        if !self.stale_reads {
            return Ok(found);
        }
        Ok(found.map(|mut record| {
            record.revoked_at = None;
            record.replaced_by_token_id = None;
            record
        }))
    }

    async fn insert(&mut self, token: NewRefreshToken) -> StoreResult<RefreshTokenRecord> {
        if self.fail_inserts {
            return Err(StoreError::backend("injected insert failure"));
        }
        self.inner.insert(token).await
    }

    async fn mark_revoked(
        &mut self,
        id: TokenId,
        revoked_at: DateTime<Utc>,
        replaced_by: Option<TokenId>,
    ) -> StoreResult<bool> {
        self.inner.mark_revoked(id, revoked_at, replaced_by).await
    }

    async fn revoke_all_active_for_family(
        &mut self,
        family: TokenFamily,
        revoked_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        if self.fail_family_revokes {
            return Err(StoreError::backend("injected family revoke failure"));
        }
        self.inner.revoke_all_active_for_family(family, revoked_at).await
    }

    async fn revoke_all_active_for_user(
        &mut self,
        user_id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        self.inner.revoke_all_active_for_user(user_id, revoked_at).await
    }

    async fn count_active(&mut self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<u64> {
        self.inner.count_active(user_id, now).await
    }

    async fn find_most_recent_active(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<RefreshTokenRecord>> {
        self.inner.find_most_recent_active(user_id, now).await
    }

    async fn find_by_family(&mut self, family: TokenFamily) -> StoreResult<Vec<RefreshTokenRecord>> {
        self.inner.find_by_family(family).await
    }

    async fn find_by_user(&mut self, user_id: Uuid) -> StoreResult<Vec<RefreshTokenRecord>> {
        self.inner.find_by_user(user_id).await
    }

    async fn delete_expired_before(&mut self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        self.inner.delete_expired_before(cutoff).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.inner.rollback().await
    }
}

/// Service over a fresh in-memory store with a manual clock at [`epoch`]
pub fn test_service() -> (
    Arc<RefreshTokenService<InMemoryTokenStore>>,
    InMemoryTokenStore,
    Arc<ManualClock>,
) {
    let store = InMemoryTokenStore::new();
    let clock = Arc::new(ManualClock::new(epoch()));
    let service = RefreshTokenService::new(
        Arc::new(store.clone()),
        RefreshTokenServiceConfig::default(),
    )
    .with_clock(clock.clone());

    (Arc::new(service), store, clock)
}
