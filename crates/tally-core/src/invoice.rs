//! # Invoice Aggregate
//!
//! Totals over the engine's rows and the persisted record shape.
//!
//! The aggregate only consumes line item outputs: it never recomputes tax or
//! touches flags. Numbering, workflow and payments live elsewhere.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::line_item::LineItem;
use crate::money::Money;
use crate::types::TaxRate;

/// Invoice totals summary for display and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceTotals {
    pub item_count: usize,
    /// Sum of quantities across rows (mixed units, informational only).
    #[ts(type = "string")]
    pub total_quantity: Decimal,
    pub taxable_total: Money,
    pub tax_total: Money,
    pub grand_total: Money,
    /// Rows whose rate deviates from catalog price.
    pub override_count: usize,
    /// Rows flagged for low or exceeded stock.
    pub stock_warning_count: usize,
}

impl InvoiceTotals {
    /// Sums the already-derived fields of `items`.
    pub fn from_items(items: &[LineItem]) -> Self {
        InvoiceTotals {
            item_count: items.len(),
            total_quantity: items.iter().map(|i| i.quantity.value()).sum(),
            taxable_total: items.iter().map(|i| i.taxable_base).sum(),
            tax_total: items.iter().map(|i| i.tax_amount).sum(),
            grand_total: items.iter().map(|i| i.total).sum(),
            override_count: items.iter().filter(|i| i.price_override.is_some()).count(),
            stock_warning_count: items.iter().filter(|i| i.stock_warning).count(),
        }
    }
}

/// Persisted form of one invoice's line items.
///
/// ## Compatibility
/// Rows without `productRef` / `catalogSnapshot` (manual entries and rows
/// written before catalog integration) must deserialize and serialize back
/// unchanged. [`LineItem`] skips absent optional fields for that reason.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceRecord {
    /// Invoice-level tax configuration, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<TaxRate>,

    /// Rows in display/print order.
    pub items: Vec<LineItem>,
}

impl InvoiceRecord {
    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals::from_items(&self.items)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
