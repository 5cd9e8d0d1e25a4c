//! # Domain Types
//!
//! Core domain types used throughout the invoice bot.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  UserRecord (one per chat user, persisted)                      │   │
//! │  │  ───────────────────────────────────────────                    │   │
//! │  │  phone_number, store_name, seller_name                          │   │
//! │  │  state: StateTag                                                │   │
//! │  │  products:  id   → Product                                      │   │
//! │  │  customers: code → Customer                                     │   │
//! │  │  last_product_sequence                                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │    LineItem     │       │
//! │  │  id "{uid}-{n}" │   │  code (key)     │   │  name (frozen)  │       │
//! │  │  name           │   │  name, phone    │   │  quantity       │       │
//! │  │  unit_price     │   │  address        │   │  unit_price     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;
use crate::DEFAULT_FEE_MULTIPLIER;

// =============================================================================
// Fee Multiplier
// =============================================================================

/// Linear scaling factor applied to raw unit prices before rounding.
///
/// `adjusted = round(price × multiplier / 1000) × 1000`, so a multiplier of
/// 83600 turns a price of 10 into 836,000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeMultiplier(i64);

impl FeeMultiplier {
    /// Creates a fee multiplier.
    #[inline]
    pub const fn new(value: i64) -> Self {
        FeeMultiplier(value)
    }

    /// Returns the raw multiplier.
    #[inline]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl Default for FeeMultiplier {
    fn default() -> Self {
        FeeMultiplier(DEFAULT_FEE_MULTIPLIER)
    }
}

// =============================================================================
// User Identity
// =============================================================================

/// Opaque chat-platform user identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId(id.to_string())
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id.to_string())
    }
}

// =============================================================================
// Conversation State
// =============================================================================

/// The conversational mode gating which free-text parser may consume the
/// next message.
///
/// ## State Diagram
/// ```text
///             contact shared
///  (no phone) ──────────────► AwaitingStoreInfo ──"Store: X - Seller: Y"──┐
///                                                                          ▼
///   ┌──────────────────────────────── Ready ◄──────────────────────────────┘
///   │  "add product"    ──► AddingProduct     ──"Name-Price"──────────► Ready
///   │  "add item"       ──► SelectingProduct  ──"(ID: x)"──► AwaitingQuantity
///   │                                                   └──"Q3"───────► Ready
///   │  "add customer"   ──► AddingCustomer    ──"N - P - A - C"───────► Ready
///   │  "select customer"──► SelectingCustomer ──name / C123──────────► Ready
///   │  "upload logo"    ──► AwaitingLogoUpload──photo─────────────────► Ready
///   └─ "issue invoice"  ──► Ready
/// ```
///
/// Stored as a snake_case string. Unknown values fail deserialization rather
/// than falling back to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateTag {
    #[default]
    Ready,
    AwaitingStoreInfo,
    AddingProduct,
    SelectingProduct,
    AwaitingQuantity,
    AddingCustomer,
    SelectingCustomer,
    AwaitingLogoUpload,
}

impl StateTag {
    /// All eight states, in declaration order.
    pub const ALL: [StateTag; 8] = [
        StateTag::Ready,
        StateTag::AwaitingStoreInfo,
        StateTag::AddingProduct,
        StateTag::SelectingProduct,
        StateTag::AwaitingQuantity,
        StateTag::AddingCustomer,
        StateTag::SelectingCustomer,
        StateTag::AwaitingLogoUpload,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            StateTag::Ready => "ready",
            StateTag::AwaitingStoreInfo => "awaiting_store_info",
            StateTag::AddingProduct => "adding_product",
            StateTag::SelectingProduct => "selecting_product",
            StateTag::AwaitingQuantity => "awaiting_quantity",
            StateTag::AddingCustomer => "adding_customer",
            StateTag::SelectingCustomer => "selecting_customer",
            StateTag::AwaitingLogoUpload => "awaiting_logo_upload",
        }
    }
}

impl fmt::Display for StateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateTag {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "state".to_string(),
                allowed: StateTag::ALL.iter().map(|t| t.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Catalog Entities
// =============================================================================

/// A product in a user's catalog. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// `"{user_id}-{sequence}"`, unique per user.
    pub id: String,

    /// Display name shown in the picker and on the invoice.
    pub name: String,

    /// Raw unit price before the fee multiplier.
    pub unit_price: Money,
}

impl Product {
    /// Sequence number encoded in the id suffix, if the id is well formed.
    pub fn sequence(&self) -> Option<u64> {
        self.id.rsplit_once('-').and_then(|(_, seq)| seq.parse().ok())
    }
}

/// A customer in a user's address book. Keyed by `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub code: String,
    pub name: String,
    pub phone: String,
    pub address: String,
}

// =============================================================================
// User Record
// =============================================================================

/// Everything persisted for one chat user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Set once when the user shares a contact; gates onboarding.
    #[serde(default)]
    pub phone_number: Option<String>,

    #[serde(default)]
    pub store_name: Option<String>,

    #[serde(default)]
    pub seller_name: Option<String>,

    #[serde(default)]
    pub state: StateTag,

    #[serde(default)]
    pub products: BTreeMap<String, Product>,

    #[serde(default)]
    pub customers: BTreeMap<String, Customer>,

    /// Monotonic counter for product id minting. Never reused.
    #[serde(default)]
    pub last_product_sequence: u64,
}

impl UserRecord {
    /// Returns true once the user has shared a phone number.
    pub fn is_onboarded(&self) -> bool {
        self.phone_number.is_some()
    }

    /// Seller identity printed in the invoice header.
    pub fn seller(&self) -> SellerInfo {
        SellerInfo {
            store_name: self.store_name.clone(),
            seller_name: self.seller_name.clone(),
        }
    }
}

/// Seller identity as captured during onboarding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerInfo {
    pub store_name: Option<String>,
    pub seller_name: Option<String>,
}

// =============================================================================
// Line Item
// =============================================================================

/// A frozen `(name, quantity, unit_price)` snapshot taken when an item is
/// added to the cart. Later catalog changes never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl LineItem {
    /// Snapshots a catalog product.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        LineItem {
            name: product.name.clone(),
            quantity,
            unit_price: product.unit_price,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_tag_round_trips_through_str() {
        for tag in StateTag::ALL {
            assert_eq!(tag.as_str().parse::<StateTag>().unwrap(), tag);
        }
        assert!("shopping".parse::<StateTag>().is_err());
    }

    #[test]
    fn test_state_tag_default_is_ready() {
        assert_eq!(StateTag::default(), StateTag::Ready);
        assert_eq!(UserRecord::default().state, StateTag::Ready);
    }

    #[test]
    fn test_unknown_state_fails_deserialization() {
        let json = r#"{"state":"awaiting_payment"}"#;
        assert!(serde_json::from_str::<UserRecord>(json).is_err());

        let json = r#"{"state":"adding_customer"}"#;
        let record: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.state, StateTag::AddingCustomer);
    }

    #[test]
    fn test_product_sequence() {
        let product = Product {
            id: "42-7".to_string(),
            name: "Widget".to_string(),
            unit_price: Money::from_minor(10),
        };
        assert_eq!(product.sequence(), Some(7));
    }

    #[test]
    fn test_line_item_is_a_snapshot() {
        let mut product = Product {
            id: "42-1".to_string(),
            name: "Widget".to_string(),
            unit_price: Money::from_minor(10),
        };
        let item = LineItem::from_product(&product, 2);
        product.unit_price = Money::from_minor(99);
        product.name = "Gadget".to_string();

        assert_eq!(item.name, "Widget");
        assert_eq!(item.unit_price, Money::from_minor(10));
    }
}
