//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Line item operation failures                   │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database failures (→ LookupFailed at the       │
//! │                         catalog boundary)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recovery
//! Nothing here is fatal. Every failure is scoped to one operation and leaves
//! the line item exactly as it was; the caller re-prompts, re-enters the value
//! or retries the lookup.
//!
//! Stock overruns in strict mode are NOT errors: they come back as a
//! [`crate::engine::StockExceeded`] signal next to a successful result.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Line item engine errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Catalog product is unusable for binding.
    ///
    /// ## When This Occurs
    /// - Base price is zero or negative
    /// - Tax (HSN) code is missing or blank
    /// - SKU or name is blank
    #[error("Invalid product {sku}: {reason}")]
    InvalidProduct { sku: String, reason: String },

    /// Quantity is not positive or exceeds the per-line maximum.
    #[error("Invalid quantity {requested}: {reason}")]
    InvalidQuantity { requested: String, reason: String },

    /// Rate is negative.
    #[error("Invalid rate {requested}: {reason}")]
    InvalidRate { requested: String, reason: String },

    /// Catalog lookup collaborator failed.
    #[error("Catalog lookup failed: {0}")]
    LookupFailed(String),

    /// No line item with this id in the invoice.
    #[error("Line item not found: {0}")]
    LineItemNotFound(String),

    /// Product binding is switched off (feature flag or emergency disable).
    #[error("Product integration is disabled; only manual line items can be added")]
    ProductIntegrationDisabled,

    /// Strict mode would clamp the quantity to a non-positive stock level.
    ///
    /// ## User Workflow
    /// ```text
    /// Strict mode, catalog stock = 0
    ///      │
    ///      ▼
    /// setQuantity(2) → clamp target would be 0 (not a valid quantity)
    ///      │
    ///      ▼
    /// OutOfStock { sku } - row keeps its previous quantity
    /// ```
    #[error("{sku} is out of stock")]
    OutOfStock { sku: String },

    /// Override reason given for a row that carries no price override.
    #[error("Line item {0} has no price override")]
    NoPriceOverride(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
