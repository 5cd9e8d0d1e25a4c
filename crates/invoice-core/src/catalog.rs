//! # Catalog Manager
//!
//! Owns the per-user `Product` and `Customer` collections nested inside a
//! `UserRecord` and mints stable identifiers.
//!
//! ## Identity Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product id   = "{user_id}-{last_product_sequence + 1}"                 │
//! │                 counter lives in the record, survives restarts,         │
//! │                 never reused                                            │
//! │                                                                         │
//! │  Customer key = user-supplied code                                      │
//! │                 same code again → previous customer overwritten         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Re-submitting identical product input therefore creates a *new* product,
//! while identical customer input replaces the existing entry.

use tracing::{debug, warn};

use crate::money::Money;
use crate::types::{Customer, Product, UserId, UserRecord};
use crate::validation::{
    normalize_digits, validate_price, validate_product_name, validate_required, ValidationResult,
};

/// Defines a new product and advances the record's sequence counter.
///
/// ## Example
/// ```rust
/// use invoice_core::catalog::define_product;
/// use invoice_core::types::{UserId, UserRecord};
///
/// let mut record = UserRecord::default();
/// let product = define_product(&mut record, &UserId::from("77"), "Ali", 5000).unwrap();
/// assert_eq!(product.id, "77-1");
/// assert_eq!(record.last_product_sequence, 1);
/// ```
pub fn define_product(
    record: &mut UserRecord,
    user_id: &UserId,
    name: &str,
    price: i64,
) -> ValidationResult<Product> {
    let name = validate_product_name(name)?;
    validate_price(price)?;

    let sequence = record.last_product_sequence + 1;
    let product = Product {
        id: format!("{}-{}", user_id, sequence),
        name,
        unit_price: Money::from_minor(price),
    };

    record.last_product_sequence = sequence;
    record.products.insert(product.id.clone(), product.clone());

    debug!(user_id = %user_id, product_id = %product.id, "Product defined");
    Ok(product)
}

/// Defines (or replaces) a customer keyed by `code`.
///
/// Every field is trimmed and must be non-empty. A colliding code silently
/// overwrites the earlier customer.
pub fn define_customer(
    record: &mut UserRecord,
    name: &str,
    phone: &str,
    address: &str,
    code: &str,
) -> ValidationResult<Customer> {
    let customer = Customer {
        name: validate_required("name", name)?,
        phone: validate_required("phone", phone)?,
        address: validate_required("address", address)?,
        code: validate_required("code", code)?,
    };

    if let Some(previous) = record.customers.insert(customer.code.clone(), customer.clone()) {
        warn!(code = %customer.code, previous = %previous.name, "Customer code reused, entry overwritten");
    }

    Ok(customer)
}

/// Products in the order they were defined.
pub fn products_in_order(record: &UserRecord) -> Vec<&Product> {
    let mut products: Vec<&Product> = record.products.values().collect();
    products.sort_by_key(|p| (p.sequence().unwrap_or(u64::MAX), p.id.clone()));
    products
}

/// Customers ordered by name, then code.
pub fn customers_by_name(record: &UserRecord) -> Vec<&Customer> {
    let mut customers: Vec<&Customer> = record.customers.values().collect();
    customers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
    customers
}

/// First customer (in name order) whose name equals `name` exactly.
pub fn find_customer_by_name<'a>(record: &'a UserRecord, name: &str) -> Option<&'a Customer> {
    customers_by_name(record).into_iter().find(|c| c.name == name)
}

/// Customer stored under `code`. Persian and ASCII digits compare equal.
pub fn find_customer_by_code<'a>(record: &'a UserRecord, code: &str) -> Option<&'a Customer> {
    record.customers.get(code).or_else(|| {
        let wanted = normalize_digits(code);
        record
            .customers
            .values()
            .find(|c| normalize_digits(&c.code) == wanted)
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
