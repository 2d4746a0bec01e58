//! # Line Item Engine
//!
//! Owns one invoice's ordered rows and applies every edit to them.
//!
//! ## Edit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      One Engine Operation                               │
//! │                                                                         │
//! │  caller ──► validate input ──► clone row ──► apply edit to clone        │
//! │                   │                               │                     │
//! │                   ▼                               ▼                     │
//! │          Err(Invalid*)                  re-derive flags + totals        │
//! │          (row untouched)                          │                     │
//! │                                                   ▼                     │
//! │                                  swap clone into place, return copy     │
//! │                                                                         │
//! │  A failed operation never leaves a half-edited row behind.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Operations take `&mut self` and run to completion. One engine per
//! invoice; engines share nothing.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;

use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};
use crate::invoice::{InvoiceRecord, InvoiceTotals};
use crate::line_item::{LineItem, StockStatus};
use crate::money::Money;
use crate::types::{LineItemId, Product, Quantity, TaxRate};
use crate::validation::{validate_description, validate_quantity, validate_rate, validate_tax_rate};

// =============================================================================
// Signals
// =============================================================================

/// Strict-mode notice: the requested quantity was clamped to catalog stock.
///
/// Informational only. The edit succeeded; the caller decides how to tell
/// the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockExceeded {
    pub line_item_id: LineItemId,
    pub sku: String,
    #[ts(type = "string")]
    pub requested: Quantity,
    #[ts(type = "string")]
    pub available: Quantity,
}

/// Result of a quantity edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct QuantityUpdate {
    pub item: LineItem,
    pub stock_exceeded: Option<StockExceeded>,
}

/// Partial update of a row's free-text fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineItemDetails {
    pub description: Option<String>,
    pub tax_code: Option<String>,
    pub unit: Option<String>,
}

// =============================================================================
// Engine
// =============================================================================

/// Line item engine for a single invoice.
///
/// ## Usage
/// ```rust
/// use tally_core::config::EngineConfig;
/// use tally_core::engine::LineItemEngine;
/// use tally_core::money::Money;
/// use tally_core::types::Quantity;
///
/// let mut engine = LineItemEngine::new(EngineConfig::default());
/// let row = engine.add_manual();
/// engine.set_rate(&row.id, Money::from_major(250)).unwrap();
/// let update = engine.set_quantity(&row.id, Quantity::from_units(2)).unwrap();
///
/// assert_eq!(update.item.total, Money::from_major(500));
/// assert!(update.stock_exceeded.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct LineItemEngine {
    config: EngineConfig,
    /// `product_integration && !emergency_disable`, fixed at construction.
    catalog_enabled: bool,
    invoice_tax: Option<TaxRate>,
    items: Vec<LineItem>,
}

impl LineItemEngine {
    /// Creates an engine for a new, empty invoice.
    pub fn new(config: EngineConfig) -> Self {
        let catalog_enabled = config.catalog_enabled();
        info!(
            catalog_enabled,
            strict = config.is_strict(),
            "Line item engine created"
        );

        LineItemEngine {
            config,
            catalog_enabled,
            invoice_tax: None,
            items: Vec::new(),
        }
    }

    /// Rebuilds an engine from a persisted record.
    ///
    /// Rows are taken verbatim; nothing is recomputed, so the restored
    /// invoice matches what was saved even if rules changed since.
    pub fn restore(config: EngineConfig, record: InvoiceRecord) -> Self {
        let mut engine = LineItemEngine::new(config);
        engine.invoice_tax = record.tax_rate;
        engine.items = record.items;
        debug!(items = engine.items.len(), "Restored invoice record");
        engine
    }

    /// Persistable snapshot of the current rows and tax configuration.
    pub fn to_record(&self) -> InvoiceRecord {
        InvoiceRecord {
            tax_rate: self.invoice_tax,
            items: self.items.clone(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether product binding is available for this engine.
    pub fn catalog_enabled(&self) -> bool {
        self.catalog_enabled
    }

    /// Current invoice-level tax rate.
    pub fn invoice_tax(&self) -> Option<TaxRate> {
        self.invoice_tax
    }

    /// Rows in display order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn get(&self, id: &LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals::from_items(&self.items)
    }

    // -------------------------------------------------------------------------
    // Invoice-level tax
    // -------------------------------------------------------------------------

    /// Changes the invoice tax configuration and recomputes every row.
    ///
    /// `None` makes bound rows fall back to their snapshot tax rate and
    /// leaves manual rows untaxed.
    pub fn set_invoice_tax(&mut self, tax_rate: Option<TaxRate>) -> CoreResult<()> {
        if let Some(rate) = tax_rate {
            validate_tax_rate(rate)?;
        }

        self.invoice_tax = tax_rate;
        for item in &mut self.items {
            let effective = item.effective_tax_rate(tax_rate);
            item.recompute(effective);
        }

        debug!(bps = ?tax_rate.map(|r| r.bps()), "Invoice tax updated");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Row creation / removal
    // -------------------------------------------------------------------------

    /// Binds `product` to a row.
    ///
    /// - `target = None` appends a new row
    /// - `target = Some(id)` rebinds that row in place (same id and position);
    ///   previous snapshot, override and stock flag are discarded
    ///
    /// ## Stock
    /// The new row (quantity 1) is assessed with the same rule as
    /// [`LineItemEngine::set_quantity`], so binding and then setting the
    /// quantity to 1 never disagree about the warning.
    ///
    /// ## Errors
    /// - `ProductIntegrationDisabled` when binding is switched off
    /// - `InvalidProduct` for a blank SKU or name, a non-positive or
    ///   oversized price, or a missing tax code
    /// - `LineItemNotFound` for an unknown target
    pub fn bind_product(
        &mut self,
        target: Option<&LineItemId>,
        product: &Product,
    ) -> CoreResult<LineItem> {
        if !self.catalog_enabled {
            return Err(CoreError::ProductIntegrationDisabled);
        }

        product.validate()?;
        validate_tax_rate(product.tax_rate).map_err(|e| CoreError::InvalidProduct {
            sku: product.sku.clone(),
            reason: e.to_string(),
        })?;

        let slot = match target {
            Some(id) => Some(self.position(id)?),
            None => None,
        };
        let id = match slot {
            Some(idx) => self.items[idx].id.clone(),
            None => LineItemId::generate(),
        };

        let mut item = LineItem::bound(id, product);
        item.stock_warning =
            StockStatus::assess(item.quantity, product.stock_level, self.config.low_stock_band)
                .warns();
        let tax = item.effective_tax_rate(self.invoice_tax);
        item.recompute(tax);

        debug!(
            line_item_id = %item.id,
            sku = %product.sku,
            rebind = slot.is_some(),
            stock_warning = item.stock_warning,
            "Bound catalog product"
        );

        Ok(match slot {
            Some(idx) => self.commit(idx, item),
            None => {
                self.items.push(item.clone());
                item
            }
        })
    }

    /// Appends a blank manual row (no product, quantity 1, rate 0).
    pub fn add_manual(&mut self) -> LineItem {
        let mut item = LineItem::manual(LineItemId::generate());
        let tax = item.effective_tax_rate(self.invoice_tax);
        item.recompute(tax);

        debug!(line_item_id = %item.id, "Added manual line item");
        self.items.push(item.clone());
        item
    }

    /// Removes a row. Removing an absent id is a no-op returning `None`.
    pub fn remove(&mut self, id: &LineItemId) -> Option<LineItem> {
        let idx = self.items.iter().position(|i| &i.id == id)?;
        debug!(line_item_id = %id, "Removed line item");
        Some(self.items.remove(idx))
    }

    /// Detaches a bound row from its product, turning it into a manual row.
    ///
    /// Quantity, rate and the editable strings are kept; snapshot, override
    /// and stock flag go away.
    pub fn unbind(&mut self, id: &LineItemId) -> CoreResult<LineItem> {
        let idx = self.position(id)?;
        let mut next = self.items[idx].clone();

        next.product_ref = None;
        next.catalog_snapshot = None;
        next.price_override = None;
        next.stock_warning = false;
        let tax = next.effective_tax_rate(self.invoice_tax);
        next.recompute(tax);

        debug!(line_item_id = %id, "Unbound line item");
        Ok(self.commit(idx, next))
    }

    // -------------------------------------------------------------------------
    // Row edits
    // -------------------------------------------------------------------------

    /// Changes a row's quantity.
    ///
    /// ## Stock Rules (bound rows only)
    /// ```text
    /// quantity > stock ──► warning
    ///                      strict: clamp to stock + StockExceeded signal
    /// stock - quantity < band ──► warning
    /// otherwise ──► no warning
    /// ```
    /// Manual rows skip stock logic entirely.
    ///
    /// ## Errors
    /// - `InvalidQuantity` for `quantity <= 0` or above the per-line maximum
    /// - `OutOfStock` in strict mode when stock is zero or negative
    pub fn set_quantity(
        &mut self,
        id: &LineItemId,
        quantity: Quantity,
    ) -> CoreResult<QuantityUpdate> {
        validate_quantity(quantity).map_err(|e| CoreError::InvalidQuantity {
            requested: quantity.to_string(),
            reason: e.to_string(),
        })?;

        let idx = self.position(id)?;
        let mut next = self.items[idx].clone();
        let mut stock_exceeded = None;

        match next.catalog_snapshot.as_ref() {
            None => {
                next.quantity = quantity;
                next.stock_warning = false;
            }
            Some(snapshot) => {
                let stock = snapshot.stock_level;
                let status = StockStatus::assess(quantity, stock, self.config.low_stock_band);

                if status == StockStatus::Exceeded && self.config.is_strict() {
                    if !stock.is_positive() {
                        return Err(CoreError::OutOfStock {
                            sku: snapshot.sku.clone(),
                        });
                    }

                    info!(
                        line_item_id = %id,
                        sku = %snapshot.sku,
                        requested = %quantity,
                        available = %stock,
                        "Quantity clamped to stock"
                    );
                    stock_exceeded = Some(StockExceeded {
                        line_item_id: id.clone(),
                        sku: snapshot.sku.clone(),
                        requested: quantity,
                        available: stock,
                    });
                    next.quantity = stock;
                } else {
                    next.quantity = quantity;
                }

                next.stock_warning = status.warns();
            }
        }

        let tax = next.effective_tax_rate(self.invoice_tax);
        next.recompute(tax);

        debug!(
            line_item_id = %id,
            quantity = %next.quantity,
            stock_warning = next.stock_warning,
            "Quantity updated"
        );

        Ok(QuantityUpdate {
            item: self.commit(idx, next),
            stock_exceeded,
        })
    }

    /// Changes a row's tax-inclusive unit rate.
    ///
    /// On bound rows the price override is re-derived: a deviation above
    /// the configured threshold records it, anything within clears it.
    ///
    /// ## Errors
    /// - `InvalidRate` for a negative rate or one above the per-line maximum
    pub fn set_rate(&mut self, id: &LineItemId, rate: Money) -> CoreResult<LineItem> {
        validate_rate(rate).map_err(|e| CoreError::InvalidRate {
            requested: rate.to_string(),
            reason: e.to_string(),
        })?;

        let idx = self.position(id)?;
        let mut next = self.items[idx].clone();

        next.rate = rate;
        next.refresh_override(self.config.override_threshold_percent);
        let tax = next.effective_tax_rate(self.invoice_tax);
        next.recompute(tax);

        debug!(
            line_item_id = %id,
            rate = %rate,
            overridden = next.price_override.is_some(),
            "Rate updated"
        );
        Ok(self.commit(idx, next))
    }

    /// Attaches a justification to the row's current price override.
    pub fn set_override_reason(
        &mut self,
        id: &LineItemId,
        reason: impl Into<String>,
    ) -> CoreResult<LineItem> {
        let idx = self.position(id)?;
        let mut next = self.items[idx].clone();

        let reason = reason.into();
        validate_description(&reason)?;

        match next.price_override.as_mut() {
            Some(o) => {
                let trimmed = reason.trim();
                o.reason = (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
            None => return Err(CoreError::NoPriceOverride(id.to_string())),
        }

        Ok(self.commit(idx, next))
    }

    /// Overwrites the editable strings. The catalog snapshot is untouched.
    pub fn edit_details(
        &mut self,
        id: &LineItemId,
        details: LineItemDetails,
    ) -> CoreResult<LineItem> {
        let idx = self.position(id)?;
        let mut next = self.items[idx].clone();

        if let Some(description) = details.description {
            validate_description(&description)?;
            next.description = description;
        }
        if let Some(tax_code) = details.tax_code {
            next.tax_code = tax_code.trim().to_string();
        }
        if let Some(unit) = details.unit {
            next.unit = unit.trim().to_string();
        }

        Ok(self.commit(idx, next))
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn position(&self, id: &LineItemId) -> CoreResult<usize> {
        self.items
            .iter()
            .position(|i| &i.id == id)
            .ok_or_else(|| CoreError::LineItemNotFound(id.to_string()))
    }

    fn commit(&mut self, idx: usize, item: LineItem) -> LineItem {
        self.items[idx] = item.clone();
        item
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StockPolicy;
    use rust_decimal::Decimal;

    fn product(sku: &str, price_major: i64, stock: i64) -> Product {
        Product {
            id: format!("prod-{}", sku),
            sku: sku.to_string(),
            name: format!("Product {}", sku),
            description: None,
            tax_code: Some("8481".to_string()),
            base_price: Money::from_major(price_major),
            unit: "pcs".to_string(),
            stock_level: Quantity::from_units(stock),
            category: None,
            tax_rate: TaxRate::from_bps(1800),
        }
    }

    fn strict() -> EngineConfig {
        EngineConfig::default().stock_policy(StockPolicy::Strict)
    }

    /// 100.00 at 18%, only 5 pairs left.
    fn hinge() -> Product {
        Product {
            id: "prod-hinge".to_string(),
            sku: "HNG-SS-4".to_string(),
            name: "Steel Hinge 4in".to_string(),
            description: Some("Stainless, pair".to_string()),
            tax_code: Some("8302".to_string()),
            base_price: Money::from_major(100),
            unit: "pair".to_string(),
            stock_level: Quantity::from_units(5),
            category: Some("Hardware".to_string()),
            tax_rate: TaxRate::from_bps(1800),
        }
    }

    /// 40.00 at 12%, plenty in stock.
    fn screws() -> Product {
        Product {
            id: "prod-screw".to_string(),
            sku: "SCR-WD-8".to_string(),
            name: "Wood Screw No.8".to_string(),
            description: None,
            tax_code: Some("7318".to_string()),
            base_price: Money::from_major(40),
            unit: "box".to_string(),
            stock_level: Quantity::from_units(500),
            category: Some("Hardware".to_string()),
            tax_rate: TaxRate::from_bps(1200),
        }
    }

    #[test]
    fn test_bind_appends_row() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let item = engine.bind_product(None, &product("VALVE", 100, 50)).unwrap();

        assert_eq!(engine.len(), 1);
        assert_eq!(item.quantity, Quantity::ONE);
        assert_eq!(item.rate, Money::from_major(100));
        assert!(!item.stock_warning);
        assert!(item.price_override.is_none());
        assert_eq!(engine.get(&item.id), Some(&item));
    }

    #[test]
    fn test_bind_low_stock_product() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let item = engine.bind_product(None, &hinge()).unwrap();

        assert_eq!(item.quantity, Quantity::ONE);
        assert_eq!(item.rate, Money::from_major(100));
        assert_eq!(item.total, Money::from_major(100));
        assert_eq!(item.taxable_base, Money::from_cents(8475));
        assert_eq!(item.tax_amount, Money::from_cents(1525));
        assert!(item.stock_warning);
    }

    #[test]
    fn test_bind_warning_agrees_with_quantity_rule() {
        // band 10: stock 10 leaves 9 after one unit, stock 11 leaves 10
        for (stock, warns) in [(10, true), (11, false)] {
            let mut engine = LineItemEngine::new(EngineConfig::default());
            let bound = engine.bind_product(None, &product("EDGE", 100, stock)).unwrap();
            assert_eq!(bound.stock_warning, warns, "stock {}", stock);

            let update = engine.set_quantity(&bound.id, Quantity::ONE).unwrap();
            assert_eq!(update.item, bound);
        }
    }

    #[test]
    fn test_bind_accepts_free_form_sku() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let mut elbow = product("PVC 1/2", 35, 200);
        elbow.name = "PVC Elbow 1/2\" (Grey)".to_string();

        let item = engine.bind_product(None, &elbow).unwrap();
        assert_eq!(item.catalog_snapshot.unwrap().sku, "PVC 1/2");
        assert_eq!(item.description, "PVC Elbow 1/2\" (Grey)");

        let mut blank = product("  ", 35, 200);
        blank.name = "Nameless".to_string();
        assert!(matches!(
            engine.bind_product(None, &blank),
            Err(CoreError::InvalidProduct { .. })
        ));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_bind_rejects_invalid_product() {
        let mut engine = LineItemEngine::new(EngineConfig::default());

        let mut no_price = product("FREE", 0, 5);
        no_price.base_price = Money::zero();
        assert!(matches!(
            engine.bind_product(None, &no_price),
            Err(CoreError::InvalidProduct { .. })
        ));

        let mut no_code = product("NOCODE", 10, 5);
        no_code.tax_code = None;
        assert!(matches!(
            engine.bind_product(None, &no_code),
            Err(CoreError::InvalidProduct { .. })
        ));

        let mut pricey = product("YACHT", 0, 1);
        pricey.base_price = Money::from_cents(crate::MAX_LINE_RATE_CENTS + 1);
        assert!(matches!(
            engine.bind_product(None, &pricey),
            Err(CoreError::InvalidProduct { .. })
        ));

        assert!(engine.is_empty());
    }

    #[test]
    fn test_bind_when_integration_disabled() {
        let mut engine = LineItemEngine::new(EngineConfig::default().emergency_disable(true));
        assert!(!engine.catalog_enabled());
        assert!(matches!(
            engine.bind_product(None, &product("VALVE", 100, 50)),
            Err(CoreError::ProductIntegrationDisabled)
        ));

        // manual entry still works
        engine.add_manual();
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_bind_unknown_target() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let missing = LineItemId::from("missing");
        assert!(matches!(
            engine.bind_product(Some(&missing), &product("VALVE", 100, 50)),
            Err(CoreError::LineItemNotFound(_))
        ));
    }

    #[test]
    fn test_rebind_clears_previous_flags() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let item = engine.bind_product(None, &hinge()).unwrap();
        engine.set_rate(&item.id, Money::from_major(50)).unwrap();
        engine.set_quantity(&item.id, Quantity::from_units(9)).unwrap();

        let rebound = engine.bind_product(Some(&item.id), &screws()).unwrap();

        assert_eq!(rebound.id, item.id);
        assert!(rebound.price_override.is_none());
        assert!(!rebound.stock_warning);
        assert_eq!(rebound.quantity, Quantity::ONE);
        assert_eq!(rebound.rate, Money::from_major(40));
        assert_eq!(rebound.product_ref.as_deref(), Some("prod-screw"));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_rebind_keeps_id_and_position() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let first = engine.add_manual();
        let second = engine.add_manual();

        let rebound = engine
            .bind_product(Some(&first.id), &product("VALVE", 100, 50))
            .unwrap();

        assert_eq!(rebound.id, first.id);
        assert_eq!(engine.items()[0].id, first.id);
        assert_eq!(engine.items()[1].id, second.id);
        assert!(engine.items()[0].is_catalog_bound());
    }

    #[test]
    fn test_set_quantity_rejects_non_positive() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let item = engine.bind_product(None, &product("VALVE", 100, 50)).unwrap();

        for bad in [Quantity::ZERO, Quantity::from_units(-3)] {
            assert!(matches!(
                engine.set_quantity(&item.id, bad),
                Err(CoreError::InvalidQuantity { .. })
            ));
        }
        assert_eq!(engine.get(&item.id), Some(&item));
    }

    #[test]
    fn test_set_quantity_low_band_and_clear() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let item = engine.bind_product(None, &product("VALVE", 100, 50)).unwrap();

        let low = engine.set_quantity(&item.id, Quantity::from_units(45)).unwrap();
        assert!(low.item.stock_warning);
        assert!(low.stock_exceeded.is_none());

        let clear = engine.set_quantity(&item.id, Quantity::from_units(40)).unwrap();
        assert!(!clear.item.stock_warning);
    }

    #[test]
    fn test_advisory_accepts_quantity_above_stock() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let item = engine.bind_product(None, &hinge()).unwrap();

        let update = engine.set_quantity(&item.id, Quantity::from_units(6)).unwrap();
        assert!(update.stock_exceeded.is_none());
        assert_eq!(update.item.quantity, Quantity::from_units(6));
        assert_eq!(update.item.total, Money::from_major(600));
        assert!(update.item.stock_warning);
    }

    #[test]
    fn test_strict_clamps_and_signals() {
        let mut engine = LineItemEngine::new(strict());
        let item = engine.bind_product(None, &hinge()).unwrap();

        let update = engine.set_quantity(&item.id, Quantity::from_units(6)).unwrap();
        assert_eq!(update.item.quantity, Quantity::from_units(5));
        assert_eq!(update.item.total, Money::from_major(500));
        assert!(update.item.stock_warning);

        let signal = update.stock_exceeded.unwrap();
        assert_eq!(signal.line_item_id, item.id);
        assert_eq!(signal.requested, Quantity::from_units(6));
        assert_eq!(signal.available, Quantity::from_units(5));
    }

    #[test]
    fn test_set_quantity_is_idempotent() {
        for policy in [StockPolicy::Advisory, StockPolicy::Strict] {
            let mut engine = LineItemEngine::new(EngineConfig::default().stock_policy(policy));
            let item = engine.bind_product(None, &hinge()).unwrap();

            let once = engine.set_quantity(&item.id, Quantity::from_units(7)).unwrap();
            let twice = engine.set_quantity(&item.id, Quantity::from_units(7)).unwrap();
            assert_eq!(once.item, twice.item);
        }
    }

    #[test]
    fn test_manual_rows_never_flagged() {
        let config = strict().override_threshold_percent(Decimal::ZERO);
        let mut engine = LineItemEngine::new(config);
        let item = engine.add_manual();

        for qty in [1, 9, 50_000] {
            let update = engine.set_quantity(&item.id, Quantity::from_units(qty)).unwrap();
            assert!(!update.item.stock_warning);
            assert!(update.stock_exceeded.is_none());
        }
        for rate in [0, 1, 999_999] {
            let row = engine.set_rate(&item.id, Money::from_cents(rate)).unwrap();
            assert!(row.price_override.is_none());
            assert!(!row.stock_warning);
        }
    }

    #[test]
    fn test_failed_edits_leave_row_untouched() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let item = engine.bind_product(None, &screws()).unwrap();

        assert!(engine.set_quantity(&item.id, Quantity::ZERO).is_err());
        assert!(engine.set_rate(&item.id, Money::from_cents(-500)).is_err());
        assert_eq!(engine.get(&item.id), Some(&item));
    }

    #[test]
    fn test_largest_line_stays_in_range() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let item = engine.add_manual();
        engine
            .set_quantity(&item.id, Quantity::from_units(crate::MAX_LINE_QUANTITY))
            .unwrap();
        let before = engine.get(&item.id).cloned();

        // 100 billion per unit × a million units would not fit in i64 cents
        assert!(matches!(
            engine.set_rate(&item.id, Money::from_cents(10_000_000_000_000)),
            Err(CoreError::InvalidRate { .. })
        ));
        assert_eq!(engine.get(&item.id).cloned(), before);

        let row = engine
            .set_rate(&item.id, Money::from_cents(crate::MAX_LINE_RATE_CENTS))
            .unwrap();
        assert_eq!(
            row.total.cents(),
            crate::MAX_LINE_RATE_CENTS * crate::MAX_LINE_QUANTITY
        );
        assert!(row.taxable_base.is_positive());
    }

    #[test]
    fn test_strict_out_of_stock_rejects() {
        let mut engine = LineItemEngine::new(strict());
        let item = engine.bind_product(None, &product("GONE", 100, 0)).unwrap();
        assert!(item.stock_warning);

        assert!(matches!(
            engine.set_quantity(&item.id, Quantity::from_units(2)),
            Err(CoreError::OutOfStock { .. })
        ));
        assert_eq!(engine.get(&item.id), Some(&item));
    }

    #[test]
    fn test_strict_clamp_with_fractional_stock() {
        let mut engine = LineItemEngine::new(strict());
        let mut p = product("WIRE", 20, 0);
        p.stock_level = Quantity::new(Decimal::new(125, 1)); // 12.5 m
        let item = engine.bind_product(None, &p).unwrap();

        let update = engine
            .set_quantity(&item.id, Quantity::from_units(20))
            .unwrap();
        assert_eq!(update.item.quantity, Quantity::new(Decimal::new(125, 1)));
        assert_eq!(update.item.total, Money::from_major(250));
        let signal = update.stock_exceeded.unwrap();
        assert_eq!(signal.requested, Quantity::from_units(20));
        assert_eq!(signal.sku, "WIRE");
    }

    #[test]
    fn test_set_rate_rejects_negative() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let item = engine.add_manual();
        assert!(matches!(
            engine.set_rate(&item.id, Money::from_cents(-1)),
            Err(CoreError::InvalidRate { .. })
        ));
        assert_eq!(engine.get(&item.id), Some(&item));
    }

    #[test]
    fn test_set_rate_override_cycle() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let item = engine.bind_product(None, &product("VALVE", 100, 50)).unwrap();

        let discounted = engine.set_rate(&item.id, Money::from_major(80)).unwrap();
        let o = discounted.price_override.unwrap();
        assert_eq!(o.original_price, Money::from_major(100));
        assert_eq!(o.override_price, Money::from_major(80));
        assert_eq!(o.discount_percent, Decimal::from(20));

        let within = engine.set_rate(&item.id, Money::from_major(95)).unwrap();
        assert!(within.price_override.is_none());
    }

    #[test]
    fn test_custom_override_threshold() {
        let config = EngineConfig::default().override_threshold_percent(Decimal::from(25));
        let mut engine = LineItemEngine::new(config);
        let item = engine.bind_product(None, &product("VALVE", 100, 50)).unwrap();

        let at_20 = engine.set_rate(&item.id, Money::from_major(80)).unwrap();
        assert!(at_20.price_override.is_none());

        let at_30 = engine.set_rate(&item.id, Money::from_major(70)).unwrap();
        assert_eq!(
            at_30.price_override.unwrap().discount_percent,
            Decimal::from(30)
        );
    }

    #[test]
    fn test_override_reason() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let item = engine.bind_product(None, &product("VALVE", 100, 50)).unwrap();

        assert!(matches!(
            engine.set_override_reason(&item.id, "loyal customer"),
            Err(CoreError::NoPriceOverride(_))
        ));

        engine.set_rate(&item.id, Money::from_major(70)).unwrap();
        let annotated = engine.set_override_reason(&item.id, " loyal customer ").unwrap();
        assert_eq!(
            annotated.price_override.unwrap().reason.as_deref(),
            Some("loyal customer")
        );

        // reason survives another deviating edit, disappears with the override
        let still = engine.set_rate(&item.id, Money::from_major(60)).unwrap();
        assert!(still.price_override.unwrap().reason.is_some());
        let back = engine.set_rate(&item.id, Money::from_major(100)).unwrap();
        assert!(back.price_override.is_none());
    }

    #[test]
    fn test_edit_details_keeps_snapshot() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let item = engine.bind_product(None, &product("VALVE", 100, 50)).unwrap();

        let edited = engine
            .edit_details(
                &item.id,
                LineItemDetails {
                    description: Some("Brass valve, 1 inch".to_string()),
                    tax_code: Some(" 848180 ".to_string()),
                    unit: None,
                },
            )
            .unwrap();

        assert_eq!(edited.description, "Brass valve, 1 inch");
        assert_eq!(edited.tax_code, "848180");
        assert_eq!(edited.unit, "pcs");
        assert_eq!(edited.catalog_snapshot, item.catalog_snapshot);
        assert_eq!(edited.total, item.total);
    }

    #[test]
    fn test_edit_details_rejects_long_description() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let item = engine.add_manual();
        let result = engine.edit_details(
            &item.id,
            LineItemDetails {
                description: Some("x".repeat(501)),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(CoreError::Validation(_))));
        assert_eq!(engine.get(&item.id), Some(&item));
    }

    #[test]
    fn test_unbind_drops_catalog_state() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let item = engine.bind_product(None, &product("VALVE", 100, 5)).unwrap();
        engine.set_rate(&item.id, Money::from_major(50)).unwrap();

        let manual = engine.unbind(&item.id).unwrap();
        assert!(!manual.is_catalog_bound());
        assert!(manual.product_ref.is_none());
        assert!(manual.price_override.is_none());
        assert!(!manual.stock_warning);
        assert_eq!(manual.rate, Money::from_major(50));
        // no invoice tax and no snapshot: untaxed
        assert!(manual.tax_amount.is_zero());
    }

    #[test]
    fn test_invoice_tax_recomputes_rows() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let bound = engine.bind_product(None, &product("VALVE", 100, 50)).unwrap();
        let manual = engine.add_manual();
        engine.set_rate(&manual.id, Money::from_major(100)).unwrap();

        assert!(engine.get(&manual.id).unwrap().tax_amount.is_zero());
        assert_eq!(engine.get(&bound.id).unwrap().tax_amount, Money::from_cents(1525));

        engine.set_invoice_tax(Some(TaxRate::from_bps(500))).unwrap();
        assert_eq!(engine.get(&manual.id).unwrap().taxable_base, Money::from_cents(9524));
        assert_eq!(engine.get(&bound.id).unwrap().taxable_base, Money::from_cents(9524));

        assert!(engine.set_invoice_tax(Some(TaxRate::from_bps(20000))).is_err());
        assert_eq!(engine.invoice_tax(), Some(TaxRate::from_bps(500)));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let a = engine.add_manual();
        let b = engine.add_manual();

        assert!(engine.remove(&a.id).is_some());
        assert!(engine.remove(&a.id).is_none());
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.items()[0].id, b.id);
    }

    #[test]
    fn test_edits_on_unknown_row() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let missing = LineItemId::from("nope");
        assert!(matches!(
            engine.set_quantity(&missing, Quantity::ONE),
            Err(CoreError::LineItemNotFound(_))
        ));
        assert!(matches!(
            engine.set_rate(&missing, Money::zero()),
            Err(CoreError::LineItemNotFound(_))
        ));
        assert!(matches!(
            engine.unbind(&missing),
            Err(CoreError::LineItemNotFound(_))
        ));
    }

    #[test]
    fn test_record_round_trip_is_verbatim() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        engine.set_invoice_tax(Some(TaxRate::from_bps(1800))).unwrap();
        let bound = engine.bind_product(None, &product("VALVE", 100, 5)).unwrap();
        engine.set_rate(&bound.id, Money::from_major(70)).unwrap();
        engine.add_manual();

        let record = engine.to_record();
        let restored = LineItemEngine::restore(EngineConfig::default(), record.clone());

        assert_eq!(restored.items(), engine.items());
        assert_eq!(restored.invoice_tax(), engine.invoice_tax());
        assert_eq!(restored.to_record(), record);
        assert_eq!(restored.totals(), engine.totals());
    }

    #[test]
    fn test_mixed_invoice_survives_json_restore() {
        let mut engine = LineItemEngine::new(EngineConfig::default());
        let bound = engine.bind_product(None, &screws()).unwrap();
        engine
            .set_quantity(&bound.id, Quantity::new(Decimal::new(25, 1)))
            .unwrap();
        engine.set_rate(&bound.id, Money::from_major(30)).unwrap();
        let manual = engine.add_manual();
        engine.set_rate(&manual.id, Money::from_major(250)).unwrap();

        let json = serde_json::to_string(&engine.to_record()).unwrap();
        let record: InvoiceRecord = serde_json::from_str(&json).unwrap();
        let restored = LineItemEngine::restore(EngineConfig::default(), record);

        assert_eq!(restored.items(), engine.items());
        let totals = restored.totals();
        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.override_count, 1);
        assert_eq!(totals.grand_total, Money::from_major(75 + 250));
    }
}
