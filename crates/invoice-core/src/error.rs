//! # Error Types
//!
//! Domain-specific error types for invoice-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  invoice-core errors (this file)                                       │
//! │  ├── ValidationError  - Malformed free-text input                      │
//! │  └── CoreError        - Preconditions + wrapped validation             │
//! │                                                                         │
//! │  invoice-db errors (separate crate)                                    │
//! │  └── DbError          - Store failures                                 │
//! │                                                                         │
//! │  bot errors (in app)                                                   │
//! │  └── BotError         - What the user is told                          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → BotError → reply text             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recovery Classes
//! - `ValidationError`: corrective prompt, state unchanged, user retries
//! - Precondition variants of `CoreError`: rejection prompt, nothing mutated

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id is not in the user's catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// No customer matches the given name or code.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Invoice requested with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Invoice requested before a customer was selected.
    #[error("No customer selected")]
    NoCustomerSelected,

    /// Quantity entered without a product staged by the picker.
    #[error("No product selected")]
    NoProductStaged,

    /// An amount left the i64 range during pricing.
    #[error("Amount overflow while pricing {item}")]
    AmountOverflow { item: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true for the precondition class (cart/customer/catalog lookups).
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            CoreError::ProductNotFound(_)
                | CoreError::CustomerNotFound(_)
                | CoreError::EmptyCart
                | CoreError::NoCustomerSelected
                | CoreError::NoProductStaged
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Delimited input has the wrong number of fields.
    #[error("expected {expected} fields separated by '{separator}', got {actual}")]
    FieldCount {
        expected: usize,
        actual: usize,
        separator: char,
    },

    /// Value must be greater than zero.
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., non-numeric price).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid_format(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be greater than zero");

        let err = ValidationError::FieldCount {
            expected: 4,
            actual: 2,
            separator: '-',
        };
        assert_eq!(err.to_string(), "expected 4 fields separated by '-', got 2");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert!(!core_err.is_precondition());
    }

    #[test]
    fn test_precondition_class() {
        assert!(CoreError::EmptyCart.is_precondition());
        assert!(CoreError::NoCustomerSelected.is_precondition());
        assert!(CoreError::ProductNotFound("1-9".into()).is_precondition());
        assert!(!CoreError::AmountOverflow { item: "x".into() }.is_precondition());
    }
}
