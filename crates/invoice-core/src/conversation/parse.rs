//! Free-text message parsers.
//!
//! Each parser only looks at the text; state gating and catalog lookups
//! happen in the handler chain.
//!
//! | Input                               | Parser                      |
//! |-------------------------------------|-----------------------------|
//! | `Store: X - Seller: Y`              | [`parse_store_info`]        |
//! | `Name-Price`                        | [`parse_product_definition`]|
//! | `... (ID: 501-3)`                   | [`extract_product_id`]      |
//! | `Q3` / `q3`                         | [`parse_quantity`]          |
//! | `Name - Phone - Address - Code`     | [`parse_customer_definition`]|
//! | `C12` / `c12`                       | [`parse_customer_code`]     |
//! | `Name: Qty - Price`                 | [`parse_quick_item`]        |
//!
//! Digits may be ASCII or Persian (`Q۳`).

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::validation::{
    normalize_digits, parse_integer, validate_price, validate_quantity, validate_required,
    ValidationResult,
};

static QUANTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[Qq]([0-9۰-۹٠-٩]+)$").expect("Invalid regex"));

static CUSTOMER_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[Cc]([0-9۰-۹٠-٩]+)$").expect("Invalid regex"));

static PRODUCT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(ID:\s*([^)\s]+)\s*\)").expect("Invalid regex"));

static QUICK_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:\-]+):\s*([0-9۰-۹٠-٩]+)\s*-\s*([0-9۰-۹٠-٩]+)$").expect("Invalid regex"));

/// Splits on `separator` and trims each field, requiring exactly `expected`.
fn split_fields(text: &str, separator: char, expected: usize) -> ValidationResult<Vec<&str>> {
    let fields: Vec<&str> = text.split(separator).map(str::trim).collect();
    if fields.len() != expected {
        return Err(ValidationError::FieldCount {
            expected,
            actual: fields.len(),
            separator,
        });
    }
    Ok(fields)
}

/// Parses `"Store: X - Seller: Y"` into `(store, seller)`.
///
/// The text before each `:` is a free label, so translated labels work too.
pub fn parse_store_info(text: &str) -> ValidationResult<(String, String)> {
    let fields = split_fields(text, '-', 2)?;

    let value = |field: &str, name: &str| -> ValidationResult<String> {
        let (_, value) = field
            .split_once(':')
            .ok_or_else(|| ValidationError::invalid_format(name, "missing ':'"))?;
        validate_required(name, value)
    };

    Ok((value(fields[0], "store")?, value(fields[1], "seller")?))
}

/// Parses `"Name-Price"`. Exactly one `-`; the price is an integer ≥ 0.
///
/// ## Example
/// ```rust
/// use invoice_core::conversation::parse::parse_product_definition;
///
/// assert_eq!(parse_product_definition("Ali-5000").unwrap(), ("Ali".to_string(), 5000));
/// assert!(parse_product_definition("Ali").is_err());
/// ```
pub fn parse_product_definition(text: &str) -> ValidationResult<(String, i64)> {
    let fields = split_fields(text, '-', 2)?;
    let name = validate_required("name", fields[0])?;
    let price = parse_integer("price", fields[1])?;
    validate_price(price)?;
    Ok((name, price))
}

/// Extracts the id from a picker label such as `"Widget - 10 (ID: 501-1)"`.
pub fn extract_product_id(text: &str) -> Option<&str> {
    PRODUCT_ID
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parses `"Q3"`. The digits must form a quantity greater than zero.
pub fn parse_quantity(text: &str) -> ValidationResult<i64> {
    let text = text.trim();
    let caps = QUANTITY
        .captures(text)
        .ok_or_else(|| ValidationError::invalid_format("quantity", "expected Q followed by digits"))?;
    let quantity = parse_integer("quantity", &caps[1])?;
    validate_quantity(quantity)?;
    Ok(quantity)
}

/// Customer definition fields in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerFields {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub code: String,
}

/// Parses `"Name - Phone - Address - Code"`.
pub fn parse_customer_definition(text: &str) -> ValidationResult<CustomerFields> {
    let fields = split_fields(text, '-', 4)?;
    Ok(CustomerFields {
        name: validate_required("name", fields[0])?,
        phone: validate_required("phone", fields[1])?,
        address: validate_required("address", fields[2])?,
        code: validate_required("code", fields[3])?,
    })
}

/// Returns the digits of a `"C12"` style customer code, as ASCII, if `text`
/// has that shape.
pub fn parse_customer_code(text: &str) -> Option<String> {
    CUSTOMER_CODE
        .captures(text.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| normalize_digits(m.as_str()).into_owned())
}

/// A cart line entered directly as `"Name: Qty - Price"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price: i64,
}

/// Parses `"Name: Qty - Price"`.
///
/// Returns `None` when the text does not have this shape at all, so the
/// handler can decline it. Shape matches with bad numbers are errors.
pub fn parse_quick_item(text: &str) -> Option<ValidationResult<QuickItem>> {
    let caps = QUICK_ITEM.captures(text.trim())?;

    let parsed = (|| -> ValidationResult<QuickItem> {
        let name = validate_required("name", &caps[1])?;
        let quantity = parse_integer("quantity", &caps[2])?;
        validate_quantity(quantity)?;
        let unit_price = parse_integer("price", &caps[3])?;
        Ok(QuickItem {
            name,
            quantity,
            unit_price,
        })
    })();

    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_info() {
        assert_eq!(
            parse_store_info("Store: Tehran Pumps - Seller: Sara").unwrap(),
            ("Tehran Pumps".to_string(), "Sara".to_string())
        );
        assert_eq!(
            parse_store_info("فروشگاه: پمپ - فروشنده: سارا").unwrap(),
            ("پمپ".to_string(), "سارا".to_string())
        );
        assert!(parse_store_info("Tehran Pumps").is_err());
        assert!(parse_store_info("Store Tehran - Seller Sara").is_err());
        assert!(parse_store_info("Store: - Seller: Sara").is_err());
    }

    #[test]
    fn test_product_definition() {
        assert_eq!(parse_product_definition(" Pump - 120 ").unwrap(), ("Pump".to_string(), 120));
        assert!(matches!(
            parse_product_definition("Pump-12-3"),
            Err(ValidationError::FieldCount { actual: 3, .. })
        ));
        assert!(matches!(
            parse_product_definition("Pump-ten"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            parse_product_definition("-10"),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_extract_product_id() {
        assert_eq!(extract_product_id("Widget - 10 (ID: 501-1)"), Some("501-1"));
        assert_eq!(extract_product_id("(ID:77-12)"), Some("77-12"));
        assert_eq!(extract_product_id("Widget"), None);
    }

    #[test]
    fn test_quantity() {
        assert_eq!(parse_quantity("Q3").unwrap(), 3);
        assert_eq!(parse_quantity("q12").unwrap(), 12);

        let err = parse_quantity("q0").unwrap_err();
        assert_eq!(err.to_string(), "quantity must be greater than zero");

        assert!(parse_quantity("3").is_err());
        assert!(parse_quantity("Q-1").is_err());
        assert!(parse_quantity("Q 3").is_err());
        assert!(parse_quantity("Q99999999999999999999").is_err());

        assert_eq!(parse_quantity("Q۳").unwrap(), 3);
        assert_eq!(parse_quantity("q٢٠").unwrap(), 20);
        // Other Unicode digits do not match the shape at all.
        assert!(matches!(
            parse_quantity("Q३"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_customer_definition() {
        let fields = parse_customer_definition("Reza - 0912 - Tehran - 12").unwrap();
        assert_eq!(fields.name, "Reza");
        assert_eq!(fields.address, "Tehran");
        assert_eq!(fields.code, "12");

        assert!(matches!(
            parse_customer_definition("Reza - 0912 - Tehran"),
            Err(ValidationError::FieldCount { expected: 4, actual: 3, .. })
        ));
        assert!(parse_customer_definition("Reza - 0912 - Tehran - ").is_err());
    }

    #[test]
    fn test_customer_code() {
        assert_eq!(parse_customer_code("C12").as_deref(), Some("12"));
        assert_eq!(parse_customer_code("c7").as_deref(), Some("7"));
        assert_eq!(parse_customer_code("C۱۲").as_deref(), Some("12"));
        assert_eq!(parse_customer_code("C"), None);
        assert_eq!(parse_customer_code("Cyrus"), None);
    }

    #[test]
    fn test_quick_item_shape() {
        let item = parse_quick_item("Nozzle: 3 - 250").unwrap().unwrap();
        assert_eq!(
            item,
            QuickItem {
                name: "Nozzle".to_string(),
                quantity: 3,
                unit_price: 250,
            }
        );

        // Not this shape at all: declined.
        assert!(parse_quick_item("hello").is_none());
        assert!(parse_quick_item("Store: X - Seller: Y").is_none());

        // Right shape, invalid quantity.
        assert!(parse_quick_item("Nozzle: 0 - 250").unwrap().is_err());

        let item = parse_quick_item("نازل: ۳ - ۲۵۰").unwrap().unwrap();
        assert_eq!((item.quantity, item.unit_price), (3, 250));
    }
}
