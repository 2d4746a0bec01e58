//! # Domain Types
//!
//! Core domain types shared by the engine, the catalog contract and the
//! persistence layer.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   bind    ┌─────────────────┐                     │
//! │  │    Product      │ ────────► │ CatalogSnapshot │  (frozen copy,      │
//! │  │  (live catalog) │           │  on LineItem)   │   audit trail)      │
//! │  │  ─────────────  │           │  ─────────────  │                     │
//! │  │  sku, name      │           │  sku, name      │                     │
//! │  │  tax_code (HSN) │           │  tax_code       │                     │
//! │  │  base_price     │           │  base_price     │                     │
//! │  │  stock_level    │           │  stock_level    │                     │
//! │  │  tax_rate       │           │  captured_at    │                     │
//! │  └─────────────────┘           └─────────────────┘                     │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │    Quantity     │   │   LineItemId    │       │
//! │  │  bps (u32)      │   │  Decimal        │   │  UUID v4 string │       │
//! │  │  1800 = 18%     │   │  2.5 (kg) ok    │   │  never reused   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::MAX_LINE_RATE_CENTS;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18% (GST slab), 250 bps = 2.5%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage such as `18` or `2.5`.
    ///
    /// Returns `None` for negative percentages. Fractions of a basis point
    /// are rounded half to even.
    pub fn from_percentage(pct: Decimal) -> Option<Self> {
        if pct.is_sign_negative() && !pct.is_zero() {
            return None;
        }
        let bps = (pct * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointNearestEven);
        bps.to_u32().map(TaxRate)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (1800 bps → 18.00).
    #[inline]
    pub fn percentage(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 2)
    }

    /// Returns the rate as a fraction of one (1800 bps → 0.1800).
    #[inline]
    pub fn fraction(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 4)
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// A line quantity in the product's unit of measure.
///
/// Fractional values are allowed for weight/volume based units
/// (2.5 kg of cement, 0.75 m of cable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// One unit; the quantity every new line starts with.
    pub const ONE: Quantity = Quantity(Decimal::ONE);

    /// Zero; never a valid line quantity, used for stock arithmetic.
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    #[inline]
    pub const fn new(value: Decimal) -> Self {
        Quantity(value)
    }

    /// Whole units.
    #[inline]
    pub fn from_units(units: i64) -> Self {
        Quantity(Decimal::from(units))
    }

    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Quantity {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Quantity)
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Quantity(value)
    }
}

// =============================================================================
// Line Item Identity
// =============================================================================

/// Opaque, stable identifier of a line item (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct LineItemId(String);

impl LineItemId {
    /// Generates a fresh identifier. UUID v4 keeps ids unique across
    /// invoices without coordination, so ids are never reused.
    pub fn generate() -> Self {
        LineItemId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for LineItemId {
    fn from(value: String) -> Self {
        LineItemId(value)
    }
}

impl From<&str> for LineItemId {
    fn from(value: &str) -> Self {
        LineItemId(value.to_string())
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product as returned by the catalog lookup.
///
/// Stock is advisory: it reflects the catalog at read time and may already be
/// stale when the user binds the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Catalog identifier; becomes the line item's `product_ref`.
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name; pre-fills the line description.
    pub name: String,

    /// Optional long description.
    pub description: Option<String>,

    /// HSN / tax classification code. Required for binding.
    pub tax_code: Option<String>,

    /// Catalog unit price (tax-inclusive).
    pub base_price: Money,

    /// Unit of measure ("pcs", "kg", "m", ...).
    pub unit: String,

    /// Available stock in `unit`.
    #[ts(type = "string")]
    pub stock_level: Quantity,

    /// Optional catalog category.
    pub category: Option<String>,

    /// Tax rate attached to the product in the catalog.
    pub tax_rate: TaxRate,
}

impl Product {
    /// Checks the fields binding relies on.
    ///
    /// ## Rules
    /// - SKU and name must be present; their format is the catalog's
    ///   business, checked on insert
    /// - Base price must be positive (override math divides by it) and no
    ///   larger than a line rate may be
    /// - Tax code must be present and non-blank
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |reason: String| CoreError::InvalidProduct {
            sku: self.sku.clone(),
            reason,
        };

        if self.sku.trim().is_empty() {
            return Err(invalid("sku is required".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name is required".to_string()));
        }

        if !self.base_price.is_positive() {
            return Err(invalid(format!(
                "base price must be positive, got {}",
                self.base_price
            )));
        }
        if self.base_price.cents() > MAX_LINE_RATE_CENTS {
            return Err(invalid(format!(
                "base price {} exceeds the per-line maximum",
                self.base_price
            )));
        }

        match self.tax_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Ok(()),
            _ => Err(invalid("tax code is required".to_string())),
        }
    }
}

// =============================================================================
// Catalog Snapshot
// =============================================================================

/// Frozen copy of a product, captured at bind time.
///
/// ## Snapshot Pattern
/// The snapshot is never mutated after capture, even if the catalog price,
/// stock or tax code changes later. It is persisted verbatim with the
/// invoice for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CatalogSnapshot {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub tax_code: String,
    pub base_price: Money,
    pub unit: String,
    #[ts(type = "string")]
    pub stock_level: Quantity,
    pub category: Option<String>,
    pub tax_rate: TaxRate,
    /// When the snapshot was taken.
    #[ts(as = "String")]
    pub captured_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Captures a snapshot of a (validated) product.
    pub fn capture(product: &Product) -> Self {
        CatalogSnapshot {
            sku: product.sku.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            tax_code: product
                .tax_code
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            base_price: product.base_price,
            unit: product.unit.clone(),
            stock_level: product.stock_level,
            category: product.category.clone(),
            tax_rate: product.tax_rate,
            captured_at: Utc::now(),
        }
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
            id: "prod-1".to_string(),
            sku: "PIPE-PVC-20".to_string(),
            name: "PVC Pipe 20mm".to_string(),
            description: Some("Schedule 40".to_string()),
            tax_code: Some("3917".to_string()),
            base_price: Money::from_major(100),
            unit: "m".to_string(),
            stock_level: Quantity::from_units(5),
            category: Some("Plumbing".to_string()),
            tax_rate: TaxRate::from_bps(1800),
        }
    }

    #[test]
    fn test_tax_rate_conversions() {
        let rate = TaxRate::from_bps(1800);
        assert_eq!(rate.bps(), 1800);
        assert_eq!(rate.percentage(), Decimal::from(18));
        assert_eq!(rate.fraction(), Decimal::new(18, 2));
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(
            TaxRate::from_percentage(Decimal::new(25, 1)),
            Some(TaxRate::from_bps(250))
        );
        assert_eq!(TaxRate::from_percentage(Decimal::ZERO), Some(TaxRate::zero()));
        assert_eq!(TaxRate::from_percentage(Decimal::from(-5)), None);
    }

    #[test]
    fn test_quantity_parse_and_display() {
        let qty: Quantity = " 2.50 ".parse().unwrap();
        assert_eq!(qty, Quantity::new(Decimal::new(25, 1)));
        assert_eq!(qty.to_string(), "2.5");
        assert!(qty.is_positive());
        assert!(!Quantity::ZERO.is_positive());
        assert!("abc".parse::<Quantity>().is_err());
    }

    #[test]
    fn test_line_item_ids_are_unique() {
        let a = LineItemId::generate();
        let b = LineItemId::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_product_validation() {
        assert!(product().validate().is_ok());

        let mut free = product();
        free.base_price = Money::zero();
        assert!(matches!(free.validate(), Err(CoreError::InvalidProduct { .. })));

        let mut no_code = product();
        no_code.tax_code = Some("   ".to_string());
        assert!(matches!(no_code.validate(), Err(CoreError::InvalidProduct { .. })));

        let mut missing_code = product();
        missing_code.tax_code = None;
        assert!(missing_code.validate().is_err());

        let mut no_sku = product();
        no_sku.sku = String::new();
        assert!(no_sku.validate().is_err());

        let mut no_name = product();
        no_name.name = "  ".to_string();
        assert!(no_name.validate().is_err());

        let mut pricey = product();
        pricey.base_price = Money::from_cents(MAX_LINE_RATE_CENTS + 1);
        assert!(pricey.validate().is_err());
    }

    #[test]
    fn test_product_validation_ignores_sku_format() {
        let mut fitting = product();
        fitting.sku = "PVC 1/2".to_string();
        fitting.name = "PVC Elbow 1/2\" (Grey)".to_string();
        assert!(fitting.validate().is_ok());
    }

    #[test]
    fn test_snapshot_copies_product() {
        let product = product();
        let snapshot = CatalogSnapshot::capture(&product);

        assert_eq!(snapshot.sku, product.sku);
        assert_eq!(snapshot.tax_code, "3917");
        assert_eq!(snapshot.base_price, product.base_price);
        assert_eq!(snapshot.stock_level, product.stock_level);
        assert_eq!(snapshot.tax_rate, product.tax_rate);
    }
}
