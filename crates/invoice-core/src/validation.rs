//! # Validation Module
//!
//! Input validation utilities shared by the message parsers and the catalog.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Message parser (conversation::parse)                         │
//! │  ├── Field count, delimiters                                           │
//! │  └── Numeric syntax                                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: Business rule validation                        │
//! │  ├── Empty names / fields                                              │
//! │  └── Price ≥ 0, quantity > 0                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Record store (serde)                                         │
//! │  └── State tag must be one of the known states                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::borrow::Cow;

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name and returns it trimmed.
///
/// ## Example
/// ```rust
/// use invoice_core::validation::validate_product_name;
///
/// assert_eq!(validate_product_name("  Ali ").unwrap(), "Ali");
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    validate_required("name", name)
}

/// Validates a required text field and returns it trimmed.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    Ok(value.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Rewrites Persian (`۰`-`۹`) and Arabic-Indic (`٠`-`٩`) digits as ASCII.
///
/// ## Example
/// ```rust
/// use invoice_core::validation::normalize_digits;
///
/// assert_eq!(normalize_digits("Q۱۲"), "Q12");
/// assert_eq!(normalize_digits("٣٠"), "30");
/// ```
pub fn normalize_digits(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|c| native_digit(c).is_some()) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.chars().map(|c| native_digit(c).unwrap_or(c)).collect())
}

fn native_digit(c: char) -> Option<char> {
    let zero = match c {
        '\u{06F0}'..='\u{06F9}' => 0x06F0,
        '\u{0660}'..='\u{0669}' => 0x0660,
        _ => return None,
    };
    char::from_digit(c as u32 - zero, 10)
}

/// Parses a base-10 integer field. Persian digits are accepted.
pub fn parse_integer(field: &str, text: &str) -> ValidationResult<i64> {
    let text = normalize_digits(text.trim());

    if text.is_empty() {
        return Err(ValidationError::required(field));
    }

    text.parse::<i64>()
        .map_err(|e| ValidationError::invalid_format(field, e.to_string()))
}

/// Validates a raw unit price.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
///
/// ## Example
/// ```rust
/// use invoice_core::validation::validate_price;
///
/// assert!(validate_price(5000).is_ok());
/// assert!(validate_price(0).is_ok());
/// assert!(validate_price(-1).is_err());
/// ```
pub fn validate_price(price: i64) -> ValidationResult<()> {
    if price < 0 {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  State: awaiting_quantity                                               │
/// │                                                                         │
/// │  User sends "Q0"                                                       │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(0) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → "quantity must be greater than zero"             │
/// │       │               (state stays awaiting_quantity)                  │
/// │       │                                                                 │
/// │       └── OK → line item appended, state → ready                       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert_eq!(validate_required("phone", " 0912 ").unwrap(), "0912");
        assert!(matches!(
            validate_required("phone", "  "),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("price", " 5000 ").unwrap(), 5000);
        assert!(matches!(
            parse_integer("price", "five"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            parse_integer("price", ""),
            Err(ValidationError::Required { .. })
        ));
        assert!(parse_integer("price", "99999999999999999999").is_err());
        assert_eq!(parse_integer("price", "۵۰۰۰").unwrap(), 5000);
        assert_eq!(parse_integer("quantity", "١٢").unwrap(), 12);
    }

    #[test]
    fn test_normalize_digits_leaves_other_text_alone() {
        assert!(matches!(normalize_digits("Widget 12"), Cow::Borrowed(_)));
        assert_eq!(normalize_digits("لوله ۳ اینچ"), "لوله 3 اینچ");
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(0).is_ok());
        assert!(validate_price(1099).is_ok());
        assert!(validate_price(-100).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(1000).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
    }
}
