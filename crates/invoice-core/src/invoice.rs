//! # Invoice Computation Engine
//!
//! Pure function from a cart snapshot to a fully priced `Invoice`.
//!
//! ## Pricing Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each line:                                                         │
//! │    unit_price  = round(raw_price × fee / 1000) × 1000                   │
//! │    line_total  = quantity × unit_price                                  │
//! │                                                                         │
//! │  subtotal          = Σ line_total                                       │
//! │  installation_fee  = round(subtotal × 0.20 / 1000) × 1000               │
//! │  grand_total       = subtotal + installation_fee                        │
//! │                                                                         │
//! │  number = yyMMddHHmm ++ (customer code | "0000")                        │
//! │                                                                         │
//! │  Rounding: half up, exact integer arithmetic (see money.rs)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures are preconditions or validation errors reported to the caller;
//! there is never partial output.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::calendar::DisplayCalendar;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Customer, FeeMultiplier, LineItem, SellerInfo, UserId};
use crate::validation::{validate_price, validate_quantity};
use crate::{INSTALLATION_FEE_BPS, NO_CUSTOMER_CODE};

// =============================================================================
// Types
// =============================================================================

/// Everything the engine needs, borrowed from the cart and the user record.
#[derive(Debug, Clone, Copy)]
pub struct InvoiceRequest<'a> {
    pub lines: &'a [LineItem],
    pub fee: FeeMultiplier,
    pub customer: Option<&'a Customer>,
    pub seller: &'a SellerInfo,
    pub user_id: &'a UserId,
    /// Local wall-clock time of issuance.
    pub now: NaiveDateTime,
    pub calendar: DisplayCalendar,
}

/// A line after the fee transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub name: String,
    pub quantity: i64,
    /// Unit price after the fee transform, rounded to the thousand.
    pub unit_price: Money,
    pub line_total: Money,
}

/// A priced invoice, ready for layout. Never persisted as such.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub number: String,
    pub issued_at: NaiveDateTime,
    /// Issue date in the configured display calendar.
    pub display_date: String,
    pub user_id: UserId,
    pub seller: SellerInfo,
    pub customer: Customer,
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub installation_fee: Money,
    pub grand_total: Money,
}

impl Invoice {
    /// Replaces the invoice number (after the registry disambiguated it).
    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = number.into();
        self
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Builds the invoice number: `yyMMddHHmm` followed by the customer code,
/// or `0000` when there is none.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use invoice_core::invoice::invoice_number;
///
/// let now = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap().and_hms_opt(14, 5, 0).unwrap();
/// assert_eq!(invoice_number(now, Some("12")), "240320140512");
/// assert_eq!(invoice_number(now, None), "24032014050000");
/// ```
pub fn invoice_number(now: NaiveDateTime, customer_code: Option<&str>) -> String {
    let code = customer_code
        .filter(|c| !c.is_empty())
        .unwrap_or(NO_CUSTOMER_CODE);
    format!("{}{}", now.format("%y%m%d%H%M"), code)
}

/// Prices a single cart line.
pub fn price_line(line: &LineItem, fee: FeeMultiplier) -> CoreResult<PricedLine> {
    validate_quantity(line.quantity)?;
    validate_price(line.unit_price.minor())?;

    let overflow = || CoreError::AmountOverflow {
        item: line.name.clone(),
    };
    let unit_price = line.unit_price.apply_fee(fee).ok_or_else(overflow)?;
    let line_total = unit_price
        .checked_multiply_quantity(line.quantity)
        .ok_or_else(overflow)?;

    Ok(PricedLine {
        name: line.name.clone(),
        quantity: line.quantity,
        unit_price,
        line_total,
    })
}

/// Computes the full invoice.
///
/// ## Preconditions
/// - at least one line (`CoreError::EmptyCart`)
/// - a customer (`CoreError::NoCustomerSelected`)
/// - every price ≥ 0 and every quantity > 0 (`CoreError::Validation`)
pub fn compute_invoice(request: InvoiceRequest<'_>) -> CoreResult<Invoice> {
    if request.lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }
    let customer = request.customer.ok_or(CoreError::NoCustomerSelected)?;

    let lines = request
        .lines
        .iter()
        .map(|line| price_line(line, request.fee))
        .collect::<CoreResult<Vec<_>>>()?;

    let subtotal = lines
        .iter()
        .try_fold(Money::zero(), |acc, l| acc.checked_add(l.line_total))
        .ok_or_else(|| CoreError::AmountOverflow {
            item: "subtotal".to_string(),
        })?;

    let installation_fee =
        subtotal
            .share_bps(INSTALLATION_FEE_BPS)
            .ok_or_else(|| CoreError::AmountOverflow {
                item: "installation fee".to_string(),
            })?;

    let grand_total =
        subtotal
            .checked_add(installation_fee)
            .ok_or_else(|| CoreError::AmountOverflow {
                item: "grand total".to_string(),
            })?;

    Ok(Invoice {
        number: invoice_number(request.now, Some(customer.code.as_str())),
        issued_at: request.now,
        display_date: request.calendar.format(request.now.date()),
        user_id: request.user_id.clone(),
        seller: request.seller.clone(),
        customer: customer.clone(),
        lines,
        subtotal,
        installation_fee,
        grand_total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 3)
            .unwrap()
            .and_hms_opt(9, 41, 30)
            .unwrap()
    }

    fn customer() -> Customer {
        Customer {
            code: "12".to_string(),
            name: "Reza".to_string(),
            phone: "0912".to_string(),
            address: "Tehran".to_string(),
        }
    }

    fn line(name: &str, quantity: i64, price: i64) -> LineItem {
        LineItem {
            name: name.to_string(),
            quantity,
            unit_price: Money::from_minor(price),
        }
    }

    fn compute(lines: &[LineItem], fee: i64, customer: Option<&Customer>) -> CoreResult<Invoice> {
        compute_invoice(InvoiceRequest {
            lines,
            fee: FeeMultiplier::new(fee),
            customer,
            seller: &SellerInfo::default(),
            user_id: &UserId::from("501"),
            now: now(),
            calendar: DisplayCalendar::Persian,
        })
    }

    #[test]
    fn test_widget_example() {
        let c = customer();
        let invoice = compute(&[line("Widget", 2, 10)], 83_600, Some(&c)).unwrap();

        assert_eq!(invoice.lines[0].unit_price.minor(), 836_000);
        assert_eq!(invoice.lines[0].line_total.minor(), 1_672_000);
        assert_eq!(invoice.subtotal.minor(), 1_672_000);
        assert_eq!(invoice.installation_fee.minor(), 334_000);
        assert_eq!(invoice.grand_total.minor(), 2_006_000);
        assert_eq!(invoice.number, "230603094112");
        assert_eq!(invoice.display_date, "1402/03/13");
        assert_eq!(invoice.customer, c);
    }

    #[test]
    fn test_totals_hold_for_multiple_lines() {
        let c = customer();
        let lines = [line("A", 3, 7), line("B", 1, 0), line("C", 5, 123)];
        let invoice = compute(&lines, 83_600, Some(&c)).unwrap();

        let expected_subtotal: i64 = lines
            .iter()
            .map(|l| {
                let unit = (l.unit_price.minor() * 83_600 + 500) / 1000 * 1000;
                l.quantity * unit
            })
            .sum();
        let expected_fee = (expected_subtotal * 2000 + 5_000_000) / 10_000_000 * 1000;

        assert_eq!(invoice.subtotal.minor(), expected_subtotal);
        assert_eq!(invoice.installation_fee.minor(), expected_fee);
        assert_eq!(
            invoice.grand_total.minor(),
            expected_subtotal + expected_fee
        );
        assert_eq!(invoice.lines.len(), 3);
        assert_eq!(invoice.lines[1].line_total, Money::zero());
    }

    #[test]
    fn test_unit_price_half_boundary_rounds_up() {
        let c = customer();
        // 5 × 500 / 1000 = 2.5 → 3
        let invoice = compute(&[line("Half", 1, 5)], 500, Some(&c)).unwrap();
        assert_eq!(invoice.lines[0].unit_price.minor(), 3_000);
    }

    #[test]
    fn test_installation_fee_half_boundary_rounds_up() {
        let c = customer();
        // subtotal 3,000 → 20% = 600 → 0.6 thousand → 1,000
        let invoice = compute(&[line("Half", 1, 5)], 500, Some(&c)).unwrap();
        assert_eq!(invoice.subtotal.minor(), 3_000);
        assert_eq!(invoice.installation_fee.minor(), 1_000);

        // subtotal 5,000 → 20% = 1,000 exactly
        let invoice = compute(&[line("Half", 5, 1)], 500, Some(&c)).unwrap();
        assert_eq!(invoice.subtotal.minor(), 5_000);
        assert_eq!(invoice.installation_fee.minor(), 1_000);

        // Subtotals are always whole thousands, so the x.5 point of the fee
        // is only reachable through the money helper.
        let half = Money::from_minor(2_500).share_bps(INSTALLATION_FEE_BPS).unwrap();
        assert_eq!(half.minor(), 1_000);
        let one_and_half = Money::from_minor(7_500).share_bps(INSTALLATION_FEE_BPS).unwrap();
        assert_eq!(one_and_half.minor(), 2_000);
    }

    #[test]
    fn test_preconditions() {
        let c = customer();
        assert!(matches!(compute(&[], 83_600, Some(&c)), Err(CoreError::EmptyCart)));
        assert!(matches!(
            compute(&[line("Widget", 1, 10)], 83_600, None),
            Err(CoreError::NoCustomerSelected)
        ));
        assert!(matches!(
            compute(&[line("Widget", 1, -10)], 83_600, Some(&c)),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            compute(&[line("Widget", 0, 10)], 83_600, Some(&c)),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_overflow_is_reported() {
        let c = customer();
        let result = compute(&[line("Gold", 1, i64::MAX / 1000)], 83_600, Some(&c));
        assert!(matches!(result, Err(CoreError::AmountOverflow { .. })));
    }

    #[test]
    fn test_invoice_number_format() {
        assert_eq!(invoice_number(now(), Some("C7")), "2306030941C7");
        assert_eq!(invoice_number(now(), Some("")), "23060309410000");
        assert_eq!(invoice_number(now(), None), "23060309410000");
    }
}
