//! # invoice-core: Pure Business Logic for the Invoice Bot
//!
//! This crate is the **heart** of the invoice bot. It contains the
//! conversation protocol, the pricing arithmetic and the table layout as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Invoice Bot Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Chat transport (JSON lines)                     │   │
//! │  │    text ──► contact ──► photo ──► /start                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 apps/invoice-bot (dispatcher)                   │   │
//! │  │    sessions, logo intake, document renderer, archive            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ invoice-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────┐   │   │
//! │  │  │ conversation │ │ catalog  │ │ invoice  │ │    layout    │   │   │
//! │  │  │   Machine    │ │ Product  │ │ Invoice  │ │ DrawInstr.   │   │   │
//! │  │  │   Locale     │ │ Customer │ │ PricedLn │ │ Row / Cell   │   │   │
//! │  │  └──────────────┘ └──────────┘ └──────────┘ └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 invoice-db (Record Store)                       │   │
//! │  │        SQLite, atomic load/mutate/save, logos, registry         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (UserRecord, Product, Customer, LineItem, StateTag)
//! - [`money`] - Money type with integer arithmetic and half-up rounding
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`catalog`] - Product and customer definition
//! - [`cart`] - The per-session draft invoice
//! - [`invoice`] - Invoice Computation Engine
//! - [`calendar`] - Display calendar (Persian / Gregorian)
//! - [`layout`] - Table Layout Engine
//! - [`words`] - Amounts spelled out for the invoice footer
//! - [`conversation`] - Conversation State Machine and locale
//!
//! ## Example Usage
//!
//! ```rust
//! use invoice_core::money::Money;
//! use invoice_core::types::FeeMultiplier;
//!
//! // Raw price 10 with the default multiplier
//! let unit = Money::from_minor(10).apply_fee(FeeMultiplier::default()).unwrap();
//! assert_eq!(unit.minor(), 836_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calendar;
pub mod cart;
pub mod catalog;
pub mod conversation;
pub mod error;
pub mod invoice;
pub mod layout;
pub mod money;
pub mod types;
pub mod validation;
pub mod words;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::Cart;
pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{compute_invoice, Invoice, InvoiceRequest, PricedLine};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Fee multiplier used when configuration does not override it.
pub const DEFAULT_FEE_MULTIPLIER: i64 = 83_600;

/// Adjusted prices and fees are rounded to a multiple of this unit.
pub const ROUNDING_UNIT: i64 = 1_000;

/// Installation fee as basis points of the subtotal (20%).
pub const INSTALLATION_FEE_BPS: u32 = 2_000;

/// Customer code placeholder in invoice numbers.
pub const NO_CUSTOMER_CODE: &str = "0000";
