//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  10 × 83600 / 1000 = 836.0   (fine)                                     │
//! │  3 × 0.1 × 1000   = 300.00000000000006  ❌ rounds differently per CPU   │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units + integer rounding                   │
//! │    (10 × 83600 + 500) / 1000 = 836  → × 1000 = 836,000                 │
//! │    Every intermediate product is computed in i128                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding Rule
//! All rounding in this crate is **round half up** (away from zero) on exact
//! integer fractions: `0.5 → 1`, `1.5 → 2`, `2.5 → 3`. Every amount on an
//! invoice is non-negative, so "up" and "away from zero" coincide.
//!
//! ## Usage
//! ```rust
//! use invoice_core::money::Money;
//! use invoice_core::types::FeeMultiplier;
//!
//! let price = Money::from_minor(10);
//! let adjusted = price.apply_fee(FeeMultiplier::new(83_600)).unwrap();
//! assert_eq!(adjusted.minor(), 836_000);
//! assert_eq!(adjusted.to_string(), "836,000");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::types::FeeMultiplier;
use crate::ROUNDING_UNIT;

// =============================================================================
// Rounding
// =============================================================================

/// Divides `numerator` by `denominator`, rounding half away from zero.
///
/// `denominator` must be positive.
///
/// ## Example
/// ```rust
/// use invoice_core::money::div_round_half_up;
///
/// assert_eq!(div_round_half_up(5, 10), 1);   // 0.5 → 1
/// assert_eq!(div_round_half_up(15, 10), 2);  // 1.5 → 2
/// assert_eq!(div_round_half_up(25, 10), 3);  // 2.5 → 3
/// assert_eq!(div_round_half_up(14, 10), 1);  // 1.4 → 1
/// ```
pub fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0);
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;

    if remainder.abs() * 2 >= denominator {
        quotient + numerator.signum()
    } else {
        quotient
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (rials on the invoice).
///
/// ## Design Decisions
/// - **i64 (signed)**: Same width as the stored prices
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Checked fee math**: every multiplication that can overflow returns `Option`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Applies the fee multiplier to a raw unit price.
    ///
    /// ## Formula
    /// ```text
    /// adjusted = round(price × fee / 1000) × 1000
    /// ```
    ///
    /// ## User Workflow
    /// ```text
    /// Product "Widget" entered at 10
    ///      │
    ///      ▼
    /// apply_fee(83600) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Unit price on invoice: 836,000
    /// ```
    ///
    /// Returns `None` if the result does not fit in an i64.
    pub fn apply_fee(&self, fee: FeeMultiplier) -> Option<Money> {
        let unit = ROUNDING_UNIT as i128;
        let scaled = (self.0 as i128).checked_mul(fee.value() as i128)?;
        let rounded = div_round_half_up(scaled, unit).checked_mul(unit)?;
        i64::try_from(rounded).ok().map(Money)
    }

    /// Takes a basis-point share of this amount, rounded to the nearest
    /// thousand.
    ///
    /// ## Formula
    /// ```text
    /// share = round(amount × bps / 10000 / 1000) × 1000
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use invoice_core::money::Money;
    ///
    /// // 20% of 1,672,000 = 334,400 → 334,000
    /// let fee = Money::from_minor(1_672_000).share_bps(2000).unwrap();
    /// assert_eq!(fee.minor(), 334_000);
    /// ```
    pub fn share_bps(&self, bps: u32) -> Option<Money> {
        let unit = ROUNDING_UNIT as i128;
        let scaled = (self.0 as i128).checked_mul(bps as i128)?;
        let rounded = div_round_half_up(scaled, 10_000 * unit).checked_mul(unit)?;
        i64::try_from(rounded).ok().map(Money)
    }

    /// Multiplies money by a quantity, or `None` on overflow.
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Money> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Adds two amounts, or `None` on overflow.
    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount with thousands separators: `1,672,000`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        if self.0 < 0 {
            write!(f, "-{}", grouped)
        } else {
            f.write_str(&grouped)
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
