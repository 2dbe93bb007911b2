//! MySQL implementation of the `TokenStore` trait.
//!
//! Each store transaction is a SQLx transaction on a pooled connection.
//! `find_by_hash` locks the matched row with `SELECT ... FOR UPDATE`, so two
//! concurrent rotations of the same token are serialised by InnoDB and the
//! second one sees the record already revoked.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, Row, Transaction};
use uuid::Uuid;

use bk_core::domain::entities::refresh_token::{
    NewRefreshToken, RefreshTokenRecord, TokenFamily, TokenId,
};
use bk_core::errors::{StoreError, StoreResult};
use bk_core::repositories::{TokenStore, TokenStoreTx};

use super::util::store_error;

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, token_hash, token_family, created_at, expires_at,
           revoked_at, replaced_by_token_id
    FROM refresh_tokens
"#;

/// MySQL-backed token store
#[derive(Clone)]
pub struct MySqlTokenStore {
    pool: MySqlPool,
}

impl MySqlTokenStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for MySqlTokenStore {
    async fn begin(&self) -> StoreResult<Box<dyn TokenStoreTx>> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(Box::new(MySqlTokenStoreTx { tx }))
    }
}

/// One open MySQL transaction
///
/// Dropping it without commit rolls back when the connection returns to the pool.
pub struct MySqlTokenStoreTx {
    tx: Transaction<'static, MySql>,
}

/// Convert database row to a token record
fn row_to_record(row: &MySqlRow) -> StoreResult<RefreshTokenRecord> {
    let user_id: String = row.try_get("user_id").map_err(store_error)?;
    let token_family: String = row.try_get("token_family").map_err(store_error)?;
    let replaced_by: Option<i64> = row.try_get("replaced_by_token_id").map_err(store_error)?;

    Ok(RefreshTokenRecord {
        id: TokenId(row.try_get("id").map_err(store_error)?),
        user_id: Uuid::parse_str(&user_id)
            .map_err(|e| StoreError::backend(format!("Invalid user UUID: {}", e)))?,
        token_hash: row.try_get("token_hash").map_err(store_error)?,
        token_family: TokenFamily(
            Uuid::parse_str(&token_family)
                .map_err(|e| StoreError::backend(format!("Invalid token family UUID: {}", e)))?,
        ),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(store_error)?,
        expires_at: row.try_get::<DateTime<Utc>, _>("expires_at").map_err(store_error)?,
        revoked_at: row
            .try_get::<Option<DateTime<Utc>>, _>("revoked_at")
            .map_err(store_error)?,
        replaced_by_token_id: replaced_by.map(TokenId),
    })
}

#[async_trait]
impl TokenStoreTx for MySqlTokenStoreTx {
    async fn find_by_hash(&mut self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let query = format!("{} WHERE token_hash = ? FOR UPDATE", SELECT_COLUMNS);

        let row = sqlx::query(&query)
            .bind(token_hash)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn insert(&mut self, token: NewRefreshToken) -> StoreResult<RefreshTokenRecord> {
        // DATETIME(6) keeps microseconds; return exactly what is stored
        let token = NewRefreshToken {
            created_at: token.created_at.trunc_subsecs(6),
            expires_at: token.expires_at.trunc_subsecs(6),
            ..token
        };

        let query = r#"
            INSERT INTO refresh_tokens (
                user_id, token_hash, token_family, created_at, expires_at
            ) VALUES (?, ?, ?, ?, ?)
        "#;

        let result = sqlx::query(query)
            .bind(token.user_id.to_string())
            .bind(&token.token_hash)
            .bind(token.token_family.0.to_string())
            .bind(token.created_at)
            .bind(token.expires_at)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;

        let id = i64::try_from(result.last_insert_id())
            .map_err(|e| StoreError::backend(format!("Token id out of range: {}", e)))?;

        Ok(RefreshTokenRecord::from_new(TokenId(id), token))
    }

    async fn mark_revoked(
        &mut self,
        id: TokenId,
        revoked_at: DateTime<Utc>,
        replaced_by: Option<TokenId>,
    ) -> StoreResult<bool> {
        let query = r#"
            UPDATE refresh_tokens
            SET revoked_at = ?, replaced_by_token_id = ?
            WHERE id = ? AND revoked_at IS NULL
        "#;

        let result = sqlx::query(query)
            .bind(revoked_at)
            .bind(replaced_by.map(|successor| successor.0))
            .bind(id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_active_for_family(
        &mut self,
        family: TokenFamily,
        revoked_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let query = r#"
            UPDATE refresh_tokens
            SET revoked_at = ?
            WHERE token_family = ? AND revoked_at IS NULL
        "#;

        let result = sqlx::query(query)
            .bind(revoked_at)
            .bind(family.0.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected())
    }

    async fn revoke_all_active_for_user(
        &mut self,
        user_id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let query = r#"
            UPDATE refresh_tokens
            SET revoked_at = ?
            WHERE user_id = ? AND revoked_at IS NULL
        "#;

        let result = sqlx::query(query)
            .bind(revoked_at)
            .bind(user_id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected())
    }

    async fn count_active(&mut self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<u64> {
        let query = r#"
            SELECT COUNT(*)
            FROM refresh_tokens
            WHERE user_id = ? AND revoked_at IS NULL AND expires_at > ?
        "#;

        let count: i64 = sqlx::query_scalar(query)
            .bind(user_id.to_string())
            .bind(now)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(store_error)?;

        Ok(count.max(0) as u64)
    }

    async fn find_most_recent_active(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<RefreshTokenRecord>> {
        let query = format!(
            "{} WHERE user_id = ? AND revoked_at IS NULL AND expires_at > ? \
             ORDER BY created_at DESC, id DESC LIMIT 1",
            SELECT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(user_id.to_string())
            .bind(now)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_by_family(&mut self, family: TokenFamily) -> StoreResult<Vec<RefreshTokenRecord>> {
        let query = format!(
            "{} WHERE token_family = ? ORDER BY created_at ASC, id ASC",
            SELECT_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(family.0.to_string())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error)?;

        rows.iter().map(row_to_record).collect()
    }

    async fn find_by_user(&mut self, user_id: Uuid) -> StoreResult<Vec<RefreshTokenRecord>> {
        let query = format!(
            "{} WHERE user_id = ? ORDER BY created_at ASC, id ASC",
            SELECT_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error)?;

        rows.iter().map(row_to_record).collect()
    }

    async fn delete_expired_before(&mut self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
            .bind(cutoff)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(store_error)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await.map_err(store_error)
    }
}
