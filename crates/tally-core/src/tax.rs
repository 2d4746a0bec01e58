//! # Tax Calculator
//!
//! Splits a tax-inclusive line total into taxable base and tax amount.
//!
//! ## Formula
//! ```text
//! total        = rate × quantity
//! taxable_base = total ÷ (1 + p/100)        (p > 0)
//! tax_amount   = taxable_base × p/100       (p > 0)
//!
//! p = 0 → taxable_base = total, tax_amount = 0
//! ```
//!
//! Each output is rounded half-to-even to cents from the UNROUNDED value it
//! derives from, so `taxable_base + tax_amount` can differ from `total` by at
//! most one cent.
//!
//! The calculator is stateless: the tax rate comes from the caller on every
//! call and may change between calls.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Quantity, TaxRate};

/// Result of splitting a tax-inclusive line total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TaxBreakdown {
    pub taxable_base: Money,
    pub tax_amount: Money,
    pub total: Money,
}

/// Computes the tax breakdown of `rate × quantity` at `tax_rate`.
///
/// ## Example
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::tax::compute_tax;
/// use tally_core::types::{Quantity, TaxRate};
///
/// let b = compute_tax(Money::from_major(100), Quantity::ONE, TaxRate::from_bps(1800));
/// assert_eq!(b.total.cents(), 10000);
/// assert_eq!(b.taxable_base.cents(), 8475); // 100 / 1.18 = 84.7457…
/// assert_eq!(b.tax_amount.cents(), 1525);   // 84.7457… × 0.18 = 15.2542…
/// ```
pub fn compute_tax(rate: Money, quantity: Quantity, tax_rate: TaxRate) -> TaxBreakdown {
    let exact_total = rate.multiply_quantity(quantity);
    let total = Money::from_decimal(exact_total);

    if tax_rate.is_zero() {
        return TaxBreakdown {
            taxable_base: total,
            tax_amount: Money::zero(),
            total,
        };
    }

    let fraction = tax_rate.fraction();
    let exact_base = exact_total / (rust_decimal::Decimal::ONE + fraction);
    let exact_tax = exact_base * fraction;

    TaxBreakdown {
        taxable_base: Money::from_decimal(exact_base),
        tax_amount: Money::from_decimal(exact_tax),
        total,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
