//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Integer Minor Units, Decimal In Between
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Stored / displayed values        Intermediate math                     │
//! │  ─────────────────────────        ─────────────────                     │
//! │  Money(i64 cents)                 rust_decimal::Decimal (unrounded)     │
//! │                                                                         │
//! │  rate ──► to_decimal() ──► × quantity ──► ÷ (1 + tax) ──► from_decimal │
//! │                                                              │          │
//! │                                 round half to even, 2 dp ◄───┘          │
//! │                                                                         │
//! │  Rounding happens once per OUTPUT value, never on intermediates, so     │
//! │  repeated edits do not compound error.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let rate = Money::from_cents(10050); // 100.50
//! let total = rate + Money::from_cents(50);
//! assert_eq!(total.cents(), 10100);
//! assert_eq!(total.to_string(), "101.00");
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Quantity;

/// Number of minor units kept for every monetary output.
pub const MONEY_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents / paise).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for markups shown as negative
///   discounts and for credit adjustments
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **No float constructor**: values enter as cents or as a `Decimal` that
///   gets banker's-rounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let rate = Money::from_cents(1099);
    /// assert_eq!(rate.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole major units.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Rounds an exact decimal amount to cents using Bankers Rounding.
    ///
    /// ## Bankers Rounding
    /// ```text
    /// 0.125 → 0.12   (half, 2 is even)
    /// 0.135 → 0.14   (half, 4 is even)
    /// 0.126 → 0.13   (not a tie, normal rounding)
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(Decimal::new(125, 3)).cents(), 12);
    /// assert_eq!(Money::from_decimal(Decimal::new(135, 3)).cents(), 14);
    /// ```
    ///
    /// Amounts beyond the i64 cent range saturate at `i64::MIN` / `i64::MAX`
    /// instead of wrapping; use [`Money::checked_from_decimal`] to detect it.
    pub fn from_decimal(amount: Decimal) -> Self {
        Self::checked_from_decimal(amount).unwrap_or(if amount.is_sign_negative() {
            Money(i64::MIN)
        } else {
            Money(i64::MAX)
        })
    }

    /// Like [`Money::from_decimal`], but `None` when the rounded amount does
    /// not fit in i64 cents.
    ///
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::money::Money;
    ///
    /// assert!(Money::checked_from_decimal(Decimal::from(i64::MAX)).is_none());
    /// assert_eq!(Money::checked_from_decimal(Decimal::new(1099, 2)), Some(Money::from_cents(1099)));
    /// ```
    pub fn checked_from_decimal(amount: Decimal) -> Option<Self> {
        let mut rounded =
            amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven);
        // After rescaling to exactly two places the mantissa is the cent count.
        rounded.rescale(MONEY_SCALE);
        i64::try_from(rounded.mantissa()).ok().map(Money)
    }

    /// Returns the exact decimal value in major units (1099 cents → 10.99).
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, MONEY_SCALE)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
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

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit rate by a (possibly fractional) quantity.
    ///
    /// Returns the UNROUNDED product so callers can keep deriving from it;
    /// wrap with [`Money::from_decimal`] when a stored value is needed.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::money::Money;
    /// use tally_core::types::Quantity;
    ///
    /// let rate = Money::from_cents(4999); // 49.99 per kg
    /// let qty = Quantity::new(Decimal::new(25, 1)); // 2.5 kg
    /// assert_eq!(rate.multiply_quantity(qty), Decimal::new(124975, 3));
    /// ```
    #[inline]
    pub fn multiply_quantity(&self, qty: Quantity) -> Decimal {
        self.to_decimal() * qty.value()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain `major.minor` rendering; currency symbols are a presentation concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
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

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
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
