//! # invoice-db: Record Store for the Invoice Bot
//!
//! Durable per-user state: the user record (phone, store, state, catalog),
//! the uploaded logo, and the registry of invoice numbers already issued.
//! SQLite via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Invoice Bot Data Flow                            │
//! │                                                                         │
//! │  Dispatcher (one inbound message)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     invoice-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │    Repositories    │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │  │   │
//! │  │   │               │    │ UserRecordRepo     │  │            │  │   │
//! │  │   │ SqlitePool    │◄───│ LogoRepo           │  │ 001_init   │  │   │
//! │  │   │ write_lock    │    │ InvoiceRegistry    │  │            │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/invoice-bot.db                                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and the store-wide write lock
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - User records, logos, issued invoices
//!
//! ## Usage
//!
//! ```rust,ignore
//! use invoice_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/invoice-bot.db")).await?;
//!
//! let reply = db
//!     .user_records()
//!     .update(&user_id, |record| machine.handle(&mut turn_for(record), inbound))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::invoice::{InvoiceRegistry, IssuedInvoice};
pub use repository::logo::LogoRepository;
pub use repository::user_record::UserRecordRepository;
