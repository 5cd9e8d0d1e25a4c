//! # User Record Repository
//!
//! Stores one [`UserRecord`] per chat user as a pretty-printed JSON document.
//!
//! ## Atomic Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   update(user_id, f)                                    │
//! │                                                                         │
//! │  write_lock ──► BEGIN                                                  │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │            SELECT record WHERE user_id = ?                             │
//! │                   │                                                     │
//! │          ┌────────┴────────┐                                            │
//! │          │ absent          │ present                                    │
//! │          ▼                 ▼                                            │
//! │    UserRecord::default   serde_json::from_str ── fails? CorruptRecord  │
//! │          └────────┬────────┘                                            │
//! │                   ▼                                                     │
//! │             f(&mut record)                                             │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │        changed? UPSERT record                                          │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │                COMMIT                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A read never persists anything: a user who only ever loads stays absent
//! from the table.

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use invoice_core::{UserId, UserRecord};

/// Repository for user records.
#[derive(Debug, Clone)]
pub struct UserRecordRepository {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl UserRecordRepository {
    /// Creates a new UserRecordRepository.
    pub fn new(pool: SqlitePool, write_lock: Arc<Mutex<()>>) -> Self {
        UserRecordRepository { pool, write_lock }
    }

    /// Loads a user's record, or the default record if none is stored.
    pub async fn load(&self, user_id: &UserId) -> DbResult<UserRecord> {
        debug!(user_id = %user_id, "Loading user record");

        let raw: Option<String> =
            sqlx::query_scalar("SELECT record FROM user_records WHERE user_id = ?1")
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match raw {
            Some(json) => decode(user_id, &json),
            None => Ok(UserRecord::default()),
        }
    }

    /// Loads, mutates and saves a user's record as one atomic unit.
    ///
    /// `f` runs while the store-wide write lock is held, so it must not block.
    /// Whatever `f` returns is handed back to the caller. The record is only
    /// written when `f` actually changed it.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let product = repo
    ///     .update(&user_id, |record| catalog::define_product(record, &user_id, "Widget", 1000))
    ///     .await??;
    /// ```
    pub async fn update<T, F>(&self, user_id: &UserId, f: F) -> DbResult<T>
    where
        F: FnOnce(&mut UserRecord) -> T,
    {
        let _guard = self.write_lock.lock().await;

        let mut tx = self.pool.begin().await?;

        let raw: Option<String> =
            sqlx::query_scalar("SELECT record FROM user_records WHERE user_id = ?1")
                .bind(user_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;

        let before = match raw {
            Some(json) => decode(user_id, &json)?,
            None => UserRecord::default(),
        };

        let mut record = before.clone();
        let output = f(&mut record);

        if record != before {
            let json = serde_json::to_string_pretty(&record)?;

            sqlx::query(
                r#"
                INSERT INTO user_records (user_id, record, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(user_id) DO UPDATE SET
                    record = excluded.record,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(user_id.as_str())
            .bind(&json)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

            debug!(user_id = %user_id, state = ?record.state, "User record saved");
        }

        tx.commit().await?;

        Ok(output)
    }

    /// Number of stored user records.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_records")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn decode(user_id: &UserId, json: &str) -> DbResult<UserRecord> {
    serde_json::from_str(json).map_err(|e| {
        warn!(user_id = %user_id, error = %e, "Stored user record is corrupt");
        DbError::corrupt(user_id.as_str(), e)
    })
}
