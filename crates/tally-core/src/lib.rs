//! # tally-core: Invoice Line Item Reconciliation
//!
//! Pure business logic for catalog-backed invoice rows. No I/O lives here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Invoice Editor (UI)                          │   │
//! │  │   Product search ──► Row edits ──► Totals ──► Save              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  engine   │  │ line_item │  │    tax    │  │  catalog  │  │   │
//! │  │   │ bind/edit │  │  stock +  │  │ inclusive │  │  lookup   │  │   │
//! │  │   │  remove   │  │ override  │  │   split   │  │ + seq no. │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │       Catalog queries, invoice persistence, migrations          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - Line item operations (bind, quantity, rate, manual, remove)
//! - [`line_item`] - The row type, stock assessment, price overrides
//! - [`tax`] - Tax-inclusive base/tax split
//! - [`catalog`] - Catalog lookup contract and stale response discard
//! - [`invoice`] - Totals and the persisted record
//! - [`config`] - Engine configuration
//! - [`types`] - Product, snapshot, quantity, tax rate, ids
//! - [`money`] - Integer cents
//! - [`error`] - Domain error types
//! - [`validation`] - Field rules
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::config::EngineConfig;
//! use tally_core::engine::LineItemEngine;
//! use tally_core::money::Money;
//! use tally_core::types::{Product, Quantity, TaxRate};
//!
//! let valve = Product {
//!     id: "p-1".to_string(),
//!     sku: "VALVE-BR-25".to_string(),
//!     name: "Brass Valve 25mm".to_string(),
//!     description: None,
//!     tax_code: Some("8481".to_string()),
//!     base_price: Money::from_major(100),
//!     unit: "pcs".to_string(),
//!     stock_level: Quantity::from_units(50),
//!     category: None,
//!     tax_rate: TaxRate::from_bps(1800),
//! };
//!
//! let mut engine = LineItemEngine::new(EngineConfig::default());
//! let row = engine.bind_product(None, &valve).unwrap();
//!
//! // 100.00 inclusive of 18% GST
//! assert_eq!(row.taxable_base.cents(), 8475);
//! assert_eq!(row.tax_amount.cents(), 1525);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod invoice;
pub mod line_item;
pub mod money;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{CatalogLookup, SearchSession};
pub use config::{EngineConfig, StockPolicy};
pub use engine::{LineItemDetails, LineItemEngine, QuantityUpdate, StockExceeded};
pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{InvoiceRecord, InvoiceTotals};
pub use line_item::{LineItem, PriceOverride};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on a single line.
///
/// Catches typos like 10000 for 10. Larger orders split across lines.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Maximum unit rate on a single line, in cents (100,000,000.00).
///
/// `MAX_LINE_RATE_CENTS × MAX_LINE_QUANTITY` stays well inside i64 cents.
pub const MAX_LINE_RATE_CENTS: i64 = 10_000_000_000;

/// Default low-stock warning band, in units.
pub const DEFAULT_LOW_STOCK_BAND: i64 = 10;

/// Default price deviation, in percent, before an override is recorded.
pub const DEFAULT_OVERRIDE_THRESHOLD_PERCENT: i64 = 10;
