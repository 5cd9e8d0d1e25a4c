//! # Issued Invoice Registry
//!
//! Records every invoice number handed out so the same number is never
//! issued twice for a user.
//!
//! ## Number Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two invoices for customer 12 in the same minute                       │
//! │                                                                         │
//! │  reserve_number(base = "230603094112")                                 │
//! │       │                                                                 │
//! │       ├── INSERT "230603094112"    ── inserted ──► "230603094112"      │
//! │                                                                         │
//! │  reserve_number(base = "230603094112")                                 │
//! │       │                                                                 │
//! │       ├── INSERT "230603094112"    ── conflict                         │
//! │       ├── INSERT "230603094112-2"  ── inserted ──► "230603094112-2"    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use invoice_core::{Invoice, Money, UserId};

/// Upper bound on `-n` suffixes tried before giving up.
const MAX_SUFFIX: u32 = 100;

/// A row of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedInvoice {
    pub invoice_number: String,
    pub customer_code: String,
    pub grand_total: Money,
    pub issued_at: NaiveDateTime,
    /// Where the rendered document was archived, once it has been written.
    pub document_path: Option<String>,
}

/// Repository for issued invoice numbers.
#[derive(Debug, Clone)]
pub struct InvoiceRegistry {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl InvoiceRegistry {
    /// Creates a new InvoiceRegistry.
    pub fn new(pool: SqlitePool, write_lock: Arc<Mutex<()>>) -> Self {
        InvoiceRegistry { pool, write_lock }
    }

    /// Reserves a unique number for `invoice` and returns it.
    ///
    /// The invoice's own number is tried first, then `-2`, `-3`, ... appended
    /// to it until one is free for this user.
    pub async fn reserve_number(&self, invoice: &Invoice) -> DbResult<String> {
        let _guard = self.write_lock.lock().await;

        let base = invoice.number.as_str();

        for attempt in 1..=MAX_SUFFIX {
            let candidate = if attempt == 1 {
                base.to_string()
            } else {
                format!("{base}-{attempt}")
            };

            let result = sqlx::query(
                r#"
                INSERT INTO issued_invoices (
                    user_id, invoice_number, customer_code, grand_total, issued_at
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(user_id, invoice_number) DO NOTHING
                "#,
            )
            .bind(invoice.user_id.as_str())
            .bind(&candidate)
            .bind(&invoice.customer.code)
            .bind(invoice.grand_total.minor())
            .bind(invoice.issued_at)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                if attempt > 1 {
                    warn!(
                        user_id = %invoice.user_id,
                        base = %base,
                        number = %candidate,
                        "Invoice number taken, suffix appended"
                    );
                }
                info!(user_id = %invoice.user_id, number = %candidate, "Invoice number reserved");
                return Ok(candidate);
            }
        }

        Err(DbError::duplicate("invoice_number", base))
    }

    /// Records where the rendered document for `number` was archived.
    pub async fn set_document_path(
        &self,
        user_id: &UserId,
        number: &str,
        path: &str,
    ) -> DbResult<()> {
        let _guard = self.write_lock.lock().await;

        sqlx::query(
            "UPDATE issued_invoices SET document_path = ?3 WHERE user_id = ?1 AND invoice_number = ?2",
        )
        .bind(user_id.as_str())
        .bind(number)
        .bind(path)
        .execute(&self.pool)
        .await?;

        debug!(user_id = %user_id, number = %number, path = %path, "Document path recorded");
        Ok(())
    }

    /// Gives a reserved number back after the document could not be produced.
    pub async fn release(&self, user_id: &UserId, number: &str) -> DbResult<()> {
        let _guard = self.write_lock.lock().await;

        sqlx::query("DELETE FROM issued_invoices WHERE user_id = ?1 AND invoice_number = ?2")
            .bind(user_id.as_str())
            .bind(number)
            .execute(&self.pool)
            .await?;

        warn!(user_id = %user_id, number = %number, "Invoice number released");
        Ok(())
    }

    /// Invoices issued to a user, oldest first.
    pub async fn list_for_user(&self, user_id: &UserId) -> DbResult<Vec<IssuedInvoice>> {
        let rows: Vec<(String, String, i64, NaiveDateTime, Option<String>)> = sqlx::query_as(
            r#"
            SELECT invoice_number, customer_code, grand_total, issued_at, document_path
            FROM issued_invoices
            WHERE user_id = ?1
            ORDER BY issued_at ASC, id ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(invoice_number, customer_code, grand_total, issued_at, document_path)| {
                    IssuedInvoice {
                        invoice_number,
                        customer_code,
                        grand_total: Money::from_minor(grand_total),
                        issued_at,
                        document_path,
                    }
                },
            )
            .collect())
    }
}
