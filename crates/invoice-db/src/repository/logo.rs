//! # Logo Repository
//!
//! One logo per user, stored as PNG bytes. The bot decodes and re-encodes
//! whatever image the user uploads before it gets here.

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::DbResult;
use invoice_core::UserId;

/// Repository for user logos.
#[derive(Debug, Clone)]
pub struct LogoRepository {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl LogoRepository {
    /// Creates a new LogoRepository.
    pub fn new(pool: SqlitePool, write_lock: Arc<Mutex<()>>) -> Self {
        LogoRepository { pool, write_lock }
    }

    /// Stores (or replaces) a user's logo.
    pub async fn save(&self, user_id: &UserId, png: &[u8]) -> DbResult<()> {
        let _guard = self.write_lock.lock().await;

        sqlx::query(
            r#"
            INSERT INTO logos (user_id, image, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                image = excluded.image,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id.as_str())
        .bind(png)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!(user_id = %user_id, bytes = png.len(), "Logo stored");
        Ok(())
    }

    /// Returns the user's logo, if one was uploaded.
    pub async fn get(&self, user_id: &UserId) -> DbResult<Option<Vec<u8>>> {
        debug!(user_id = %user_id, "Fetching logo");

        let image: Option<Vec<u8>> = sqlx::query_scalar("SELECT image FROM logos WHERE user_id = ?1")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(image)
    }

    /// Returns true if the user has uploaded a logo.
    pub async fn exists(&self, user_id: &UserId) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM logos WHERE user_id = ?1")
            .bind(user_id.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }
}
