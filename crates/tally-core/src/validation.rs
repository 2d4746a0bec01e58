//! # Validation Module
//!
//! Input validation for line item edits and catalog data.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Invoice editor (frontend)                                    │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Field rules (sku, name, search query, tax rate)                   │
//! │  └── Numeric rules (quantity > 0, rate >= 0)                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Line item engine                                             │
//! │  └── Maps failures to InvalidQuantity / InvalidRate / InvalidProduct   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::types::Quantity;
//! use tally_core::validation::{validate_quantity, validate_sku};
//!
//! validate_sku("PIPE-PVC-20").unwrap();
//! validate_quantity(Quantity::from_units(5)).unwrap();
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Quantity, TaxRate};
use crate::{MAX_LINE_QUANTITY, MAX_LINE_RATE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Should contain only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_sku;
///
/// assert!(validate_sku("PIPE-PVC-20").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name (1-200 characters after trimming).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a catalog search query.
///
/// ## Rules
/// - Can be empty (returns default results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates a free-text line description (at most 500 characters).
pub fn validate_description(description: &str) -> ValidationResult<()> {
    if description.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: 500,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0); fractions are fine
/// - Must not exceed MAX_LINE_QUANTITY
///
/// ## User Workflow
/// ```text
/// User types quantity: 2.5
///      │
///      ▼
/// validate_quantity(2.5) ← THIS FUNCTION
///      │
///      ├── qty <= 0?        → MustBePositive
///      ├── qty > 1,000,000? → OutOfRange
///      └── OK → engine applies stock rules
/// ```
pub fn validate_quantity(qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty.value() > Decimal::from(MAX_LINE_QUANTITY) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit rate.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free line, sample)
/// - Must not exceed MAX_LINE_RATE_CENTS
///
/// ## Example
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::validation::validate_rate;
///
/// assert!(validate_rate(Money::from_cents(1099)).is_ok());
/// assert!(validate_rate(Money::zero()).is_ok());
/// assert!(validate_rate(Money::from_cents(-100)).is_err());
/// ```
pub fn validate_rate(rate: Money) -> ValidationResult<()> {
    if rate.is_negative() || rate.cents() > MAX_LINE_RATE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "rate".to_string(),
            min: 0,
            max: MAX_LINE_RATE_CENTS,
        });
    }

    Ok(())
}

/// Validates a tax rate (0% to 100%).
pub fn validate_tax_rate(rate: TaxRate) -> ValidationResult<()> {
    if rate.bps() > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
