//! # Line Items
//!
//! One editable invoice row, plus the pure rules that derive its flags.
//!
//! ## Row States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   add_manual()                        bind_product(none, p)            │
//! │        │                                     │                          │
//! │        ▼          bind_product(row, p)       ▼                          │
//! │   ┌─────────┐ ─────────────────────────► ┌─────────┐ ──┐ rebind(p')    │
//! │   │ Unbound │                            │  Bound  │   │ fresh snapshot│
//! │   │ manual  │ ◄───────────────────────── │ catalog │ ◄─┘ flags reset   │
//! │   └─────────┘          unbind()          └─────────┘                   │
//! │                                                                         │
//! │   Bound rows re-derive {stock_warning, price_override} on every        │
//! │   quantity/rate edit. Unbound rows never carry either flag.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::tax::{compute_tax, TaxBreakdown};
use crate::types::{CatalogSnapshot, LineItemId, Product, Quantity, TaxRate};

// =============================================================================
// Price Override
// =============================================================================

/// Record of a charged rate that deviates from the catalog price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PriceOverride {
    /// Catalog base price from the snapshot.
    pub original_price: Money,

    /// Rate actually charged.
    pub override_price: Money,

    /// `(original - override) / original × 100`, 2 dp. Negative = markup.
    #[ts(type = "string")]
    pub discount_percent: Decimal,

    /// Optional justification entered by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PriceOverride {
    /// Decides whether `rate` deviates from `base_price` by MORE than
    /// `threshold_percent`, returning the override record if so.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::line_item::PriceOverride;
    /// use tally_core::money::Money;
    ///
    /// let ten = Decimal::from(10);
    /// let o = PriceOverride::evaluate(Money::from_major(100), Money::from_major(80), ten).unwrap();
    /// assert_eq!(o.discount_percent, Decimal::from(20));
    ///
    /// // exactly at the threshold is not an override
    /// assert!(PriceOverride::evaluate(Money::from_major(100), Money::from_major(90), ten).is_none());
    /// ```
    pub fn evaluate(base_price: Money, rate: Money, threshold_percent: Decimal) -> Option<Self> {
        if !base_price.is_positive() {
            return None;
        }

        let base = base_price.to_decimal();
        let signed = (base - rate.to_decimal()) / base * Decimal::ONE_HUNDRED;

        if signed.abs() <= threshold_percent {
            return None;
        }

        Some(PriceOverride {
            original_price: base_price,
            override_price: rate,
            discount_percent: signed.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven),
            reason: None,
        })
    }

    /// True when the charged rate is above the catalog price.
    pub fn is_markup(&self) -> bool {
        self.discount_percent.is_sign_negative() && !self.discount_percent.is_zero()
    }
}

// =============================================================================
// Stock Assessment
// =============================================================================

/// Where a quantity sits relative to catalog stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    /// Comfortably within stock.
    Clear,
    /// Within stock, but the remainder falls below the low-stock band.
    Low,
    /// More than the catalog stock level.
    Exceeded,
}

impl StockStatus {
    /// Classifies `quantity` against `stock_level` with a `band` margin.
    ///
    /// ```text
    /// quantity > stock            → Exceeded
    /// stock - quantity < band     → Low
    /// otherwise                   → Clear
    /// ```
    pub fn assess(quantity: Quantity, stock_level: Quantity, band: Quantity) -> Self {
        if quantity > stock_level {
            StockStatus::Exceeded
        } else if stock_level.value() - quantity.value() < band.value() {
            StockStatus::Low
        } else {
            StockStatus::Clear
        }
    }

    /// Whether this status raises the row's stock warning.
    pub fn warns(&self) -> bool {
        !matches!(self, StockStatus::Clear)
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One invoice row.
///
/// ## Design Notes
/// - `product_ref` / `catalog_snapshot` are both set (bound) or both absent
///   (manual / legacy row)
/// - `taxable_base`, `tax_amount`, `total` are derived; they are only ever
///   written by [`LineItem::recompute`]
/// - Optional fields are skipped when absent so legacy records without them
///   read back byte-for-byte
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineItem {
    pub id: LineItemId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_snapshot: Option<CatalogSnapshot>,

    pub description: String,

    #[serde(default)]
    pub tax_code: String,

    #[serde(default)]
    pub unit: String,

    #[ts(type = "string")]
    pub quantity: Quantity,

    /// Tax-inclusive unit rate actually charged.
    pub rate: Money,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_override: Option<PriceOverride>,

    pub taxable_base: Money,

    pub tax_amount: Money,

    pub total: Money,

    #[serde(default)]
    pub stock_warning: bool,
}

impl LineItem {
    /// A blank manual row: no product, quantity 1, rate 0.
    pub fn manual(id: LineItemId) -> Self {
        LineItem {
            id,
            product_ref: None,
            catalog_snapshot: None,
            description: String::new(),
            tax_code: String::new(),
            unit: String::new(),
            quantity: Quantity::ONE,
            rate: Money::zero(),
            price_override: None,
            taxable_base: Money::zero(),
            tax_amount: Money::zero(),
            total: Money::zero(),
            stock_warning: false,
        }
    }

    /// A freshly bound row initialised from `product`.
    ///
    /// Everything product-derived is reset: quantity 1, rate = base price,
    /// no override, editable strings pre-filled from the snapshot. Totals
    /// and the stock flag are NOT computed here; the engine does that.
    pub fn bound(id: LineItemId, product: &Product) -> Self {
        let snapshot = CatalogSnapshot::capture(product);

        LineItem {
            id,
            product_ref: Some(product.id.clone()),
            description: snapshot.name.clone(),
            tax_code: snapshot.tax_code.clone(),
            unit: snapshot.unit.clone(),
            quantity: Quantity::ONE,
            rate: snapshot.base_price,
            price_override: None,
            taxable_base: Money::zero(),
            tax_amount: Money::zero(),
            total: Money::zero(),
            stock_warning: false,
            catalog_snapshot: Some(snapshot),
        }
    }

    /// Whether the row is attached to a catalog product.
    #[inline]
    pub fn is_catalog_bound(&self) -> bool {
        self.catalog_snapshot.is_some()
    }

    /// Tax rate used for this row.
    ///
    /// Invoice-level tax configuration wins; a bound row falls back to its
    /// snapshot's rate; a manual row without invoice tax is untaxed.
    pub fn effective_tax_rate(&self, invoice_tax: Option<TaxRate>) -> TaxRate {
        invoice_tax
            .or_else(|| self.catalog_snapshot.as_ref().map(|s| s.tax_rate))
            .unwrap_or_default()
    }

    /// Recomputes `total`, `taxable_base` and `tax_amount`.
    pub fn recompute(&mut self, tax_rate: TaxRate) -> TaxBreakdown {
        let breakdown = compute_tax(self.rate, self.quantity, tax_rate);
        self.taxable_base = breakdown.taxable_base;
        self.tax_amount = breakdown.tax_amount;
        self.total = breakdown.total;
        breakdown
    }

    /// Re-derives the price override from the snapshot. Keeps an existing
    /// reason while the row stays overridden.
    pub fn refresh_override(&mut self, threshold_percent: Decimal) {
        let Some(snapshot) = &self.catalog_snapshot else {
            self.price_override = None;
            return;
        };

        let reason = self.price_override.take().and_then(|o| o.reason);
        self.price_override = PriceOverride::evaluate(snapshot.base_price, self.rate, threshold_percent)
            .map(|o| PriceOverride { reason, ..o });
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: "prod-7".to_string(),
            sku: "CEM-OPC-50".to_string(),
            name: "OPC Cement 50kg".to_string(),
            description: None,
            tax_code: Some("2523".to_string()),
            base_price: Money::from_major(100),
            unit: "bag".to_string(),
            stock_level: Quantity::from_units(40),
            category: Some("Building".to_string()),
            tax_rate: TaxRate::from_bps(2800),
        }
    }

    #[test]
    fn test_manual_row_defaults() {
        let item = LineItem::manual(LineItemId::from("a"));
        assert!(!item.is_catalog_bound());
        assert_eq!(item.quantity, Quantity::ONE);
        assert!(item.rate.is_zero());
        assert!(item.description.is_empty());
        assert_eq!(item.effective_tax_rate(None), TaxRate::zero());
    }

    #[test]
    fn test_bound_row_prefills_from_snapshot() {
        let item = LineItem::bound(LineItemId::from("b"), &product());
        assert!(item.is_catalog_bound());
        assert_eq!(item.product_ref.as_deref(), Some("prod-7"));
        assert_eq!(item.description, "OPC Cement 50kg");
        assert_eq!(item.tax_code, "2523");
        assert_eq!(item.unit, "bag");
        assert_eq!(item.rate, Money::from_major(100));
    }

    #[test]
    fn test_effective_tax_rate_prefers_invoice() {
        let item = LineItem::bound(LineItemId::from("c"), &product());
        assert_eq!(item.effective_tax_rate(None), TaxRate::from_bps(2800));
        assert_eq!(
            item.effective_tax_rate(Some(TaxRate::from_bps(1800))),
            TaxRate::from_bps(1800)
        );
    }

    #[test]
    fn test_stock_assessment() {
        let band = Quantity::from_units(10);
        let stock = Quantity::from_units(20);

        assert_eq!(StockStatus::assess(Quantity::from_units(5), stock, band), StockStatus::Clear);
        assert_eq!(StockStatus::assess(Quantity::from_units(10), stock, band), StockStatus::Clear);
        assert_eq!(StockStatus::assess(Quantity::from_units(11), stock, band), StockStatus::Low);
        assert_eq!(StockStatus::assess(Quantity::from_units(20), stock, band), StockStatus::Low);
        assert_eq!(StockStatus::assess(Quantity::from_units(21), stock, band), StockStatus::Exceeded);
    }

    #[test]
    fn test_override_evaluation() {
        let ten = Decimal::from(10);
        let base = Money::from_major(100);

        let discount = PriceOverride::evaluate(base, Money::from_major(80), ten).unwrap();
        assert_eq!(discount.original_price, base);
        assert_eq!(discount.override_price, Money::from_major(80));
        assert_eq!(discount.discount_percent, Decimal::from(20));
        assert!(!discount.is_markup());

        let markup = PriceOverride::evaluate(base, Money::from_major(125), ten).unwrap();
        assert_eq!(markup.discount_percent, Decimal::from(-25));
        assert!(markup.is_markup());

        assert!(PriceOverride::evaluate(base, Money::from_major(110), ten).is_none());
        assert!(PriceOverride::evaluate(base, Money::from_cents(8999), ten).is_some());
    }

    #[test]
    fn test_refresh_override_keeps_reason() {
        let mut item = LineItem::bound(LineItemId::from("d"), &product());
        let ten = Decimal::from(10);

        item.rate = Money::from_major(80);
        item.refresh_override(ten);
        item.price_override.as_mut().unwrap().reason = Some("bulk deal".to_string());

        item.rate = Money::from_major(75);
        item.refresh_override(ten);
        let o = item.price_override.as_ref().unwrap();
        assert_eq!(o.override_price, Money::from_major(75));
        assert_eq!(o.reason.as_deref(), Some("bulk deal"));

        item.rate = Money::from_major(100);
        item.refresh_override(ten);
        assert!(item.price_override.is_none());
    }

    #[test]
    fn test_manual_row_never_overrides() {
        let mut item = LineItem::manual(LineItemId::from("e"));
        item.rate = Money::from_major(5000);
        item.refresh_override(Decimal::from(10));
        assert!(item.price_override.is_none());
    }
}
