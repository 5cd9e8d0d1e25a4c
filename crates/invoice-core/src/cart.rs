//! # Cart
//!
//! The draft invoice being assembled in one conversation. Process-local and
//! never persisted; a restart starts every user with an empty cart.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Message                  Handler                  Cart Change          │
//! │  ───────                  ───────                  ───────────          │
//! │                                                                         │
//! │  "... (ID: 7-3)" ───────► product selection ─────► stage_product()     │
//! │                                                                         │
//! │  "Q2" ──────────────────► quantity ──────────────► add_line()          │
//! │                                                    clear staged slot   │
//! │                                                                         │
//! │  "Reza" ────────────────► customer selection ────► select_customer()   │
//! │                                                                         │
//! │  "issue invoice" ───────► (runtime, on success) ─► clear()             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{Customer, LineItem};
use crate::validation::{validate_quantity, ValidationResult};

/// The draft invoice for one user session.
///
/// ## Invariants
/// - Every line has quantity > 0
/// - Lines keep insertion order; the same product may appear twice
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Lines in the order they were added.
    pub line_items: Vec<LineItem>,

    /// Customer the invoice will be addressed to.
    pub selected_customer: Option<Customer>,

    /// Staging slot between "select product" and "enter quantity".
    pub selected_product_id: Option<String>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line after validating its quantity.
    pub fn add_line(&mut self, item: LineItem) -> ValidationResult<()> {
        validate_quantity(item.quantity)?;
        self.line_items.push(item);
        Ok(())
    }

    /// Stages a product id until the quantity arrives.
    pub fn stage_product(&mut self, product_id: impl Into<String>) {
        self.selected_product_id = Some(product_id.into());
    }

    /// Returns the staged product id, if any.
    pub fn staged_product(&self) -> Option<&str> {
        self.selected_product_id.as_deref()
    }

    /// Clears the staging slot.
    pub fn clear_staged(&mut self) {
        self.selected_product_id = None;
    }

    pub fn select_customer(&mut self, customer: Customer) {
        self.selected_customer = Some(customer);
    }

    /// Empties lines and the selected customer (and the staging slot).
    pub fn clear(&mut self) {
        self.line_items.clear();
        self.selected_customer = None;
        self.selected_product_id = None;
    }

    /// Returns the number of lines in the cart.
    pub fn item_count(&self) -> usize {
        self.line_items.len()
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> i64 {
        self.line_items.iter().map(|i| i.quantity).sum()
    }

    /// Checks if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }
}
