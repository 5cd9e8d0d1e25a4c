//! # Repository Module
//!
//! Database repository implementations for the invoice bot.
//!
//! ## Write Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Writer, Many Readers                             │
//! │                                                                         │
//! │  Dispatcher                                                            │
//! │       │                                                                 │
//! │       │  db.user_records().update(&user_id, |record| ...)              │
//! │       ▼                                                                 │
//! │  write_lock.lock()          ← shared by all three repositories         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN → SELECT → mutate in memory → UPSERT (if changed) → COMMIT     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock released                                                         │
//! │                                                                         │
//! │  Readers (load, get, list) go straight to the pool.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRecordRepository`](user_record::UserRecordRepository) - Atomic load/mutate/save of user records
//! - [`LogoRepository`](logo::LogoRepository) - Logo blobs
//! - [`InvoiceRegistry`](invoice::InvoiceRegistry) - Issued invoice numbers

pub mod invoice;
pub mod logo;
pub mod user_record;
