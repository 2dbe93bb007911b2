use bk_core::errors::StoreError;
use sqlx::mysql::MySqlDatabaseError;

/// MySQL `ER_DUP_ENTRY`
const ER_DUP_ENTRY: u16 = 1062;

pub fn is_dup_key(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return mysql_err.number() == ER_DUP_ENTRY;
        }
    }

    false
}

pub fn store_error(err: sqlx::Error) -> StoreError {
    if is_dup_key(&err) {
        StoreError::DuplicateHash
    } else {
        StoreError::backend(err)
    }
}
