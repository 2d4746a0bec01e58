//! # Engine Configuration
//!
//! Operating mode for the line item engine, resolved once at construction.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`TALLY_*`)
//! 2. Defaults (this file)
//!
//! ## Environment Variables
//! ```text
//! TALLY_PRODUCT_INTEGRATION   true/false  catalog binding on/off
//! TALLY_EMERGENCY_DISABLE     true/false  kill switch, wins over the above
//! TALLY_STRICT_STOCK          true/false  clamp quantities to stock
//! TALLY_LOW_STOCK_BAND        decimal     warning margin (units)
//! TALLY_OVERRIDE_THRESHOLD    decimal     price deviation percent
//! ```
//!
//! Configuration is a plain value handed to [`crate::engine::LineItemEngine::new`].
//! Nothing reads process state after that, so two engines with different
//! configs behave independently.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;
use ts_rs::TS;

use crate::types::Quantity;
use crate::{DEFAULT_LOW_STOCK_BAND, DEFAULT_OVERRIDE_THRESHOLD_PERCENT};

/// What happens when a quantity edit exceeds catalog stock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StockPolicy {
    /// Accept the quantity and raise the stock warning.
    #[default]
    Advisory,
    /// Clamp the quantity to the stock level and signal `StockExceeded`.
    Strict,
}

/// Line item engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EngineConfig {
    /// Catalog product binding enabled.
    pub product_integration: bool,

    /// Emergency kill switch for product binding. When set, the engine
    /// behaves as if `product_integration` were off.
    pub emergency_disable: bool,

    /// Advisory or strict stock handling.
    pub stock_policy: StockPolicy,

    /// Remaining stock below this margin raises the stock warning.
    #[ts(type = "string")]
    pub low_stock_band: Quantity,

    /// Percent deviation from catalog price that starts override tracking.
    #[ts(type = "string")]
    pub override_threshold_percent: Decimal,
}

impl Default for EngineConfig {
    /// ## Default Values
    /// - Product integration: on
    /// - Emergency disable: off
    /// - Stock: advisory
    /// - Low-stock band: 10 units
    /// - Override threshold: 10%
    fn default() -> Self {
        EngineConfig {
            product_integration: true,
            emergency_disable: false,
            stock_policy: StockPolicy::Advisory,
            low_stock_band: Quantity::from_units(DEFAULT_LOW_STOCK_BAND),
            override_threshold_percent: Decimal::from(DEFAULT_OVERRIDE_THRESHOLD_PERCENT),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from `TALLY_*` environment variables over defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparseable values keep the default and log a warning.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::config::{EngineConfig, StockPolicy};
    ///
    /// let config = EngineConfig::from_lookup(|key| match key {
    ///     "TALLY_STRICT_STOCK" => Some("true".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.stock_policy, StockPolicy::Strict);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = EngineConfig::default();

        if let Some(value) = parse_var(&lookup, "TALLY_PRODUCT_INTEGRATION", parse_flag) {
            config.product_integration = value;
        }

        if let Some(value) = parse_var(&lookup, "TALLY_EMERGENCY_DISABLE", parse_flag) {
            config.emergency_disable = value;
        }

        if let Some(strict) = parse_var(&lookup, "TALLY_STRICT_STOCK", parse_flag) {
            config.stock_policy = if strict {
                StockPolicy::Strict
            } else {
                StockPolicy::Advisory
            };
        }

        if let Some(band) = parse_var(&lookup, "TALLY_LOW_STOCK_BAND", parse_non_negative) {
            config.low_stock_band = Quantity::new(band);
        }

        if let Some(threshold) = parse_var(&lookup, "TALLY_OVERRIDE_THRESHOLD", parse_non_negative)
        {
            config.override_threshold_percent = threshold;
        }

        config
    }

    /// Sets the stock policy.
    pub fn stock_policy(mut self, policy: StockPolicy) -> Self {
        self.stock_policy = policy;
        self
    }

    /// Sets the low-stock band.
    pub fn low_stock_band(mut self, band: Quantity) -> Self {
        self.low_stock_band = band;
        self
    }

    /// Sets the override threshold percent.
    pub fn override_threshold_percent(mut self, percent: Decimal) -> Self {
        self.override_threshold_percent = percent;
        self
    }

    /// Sets the emergency kill switch.
    pub fn emergency_disable(mut self, disabled: bool) -> Self {
        self.emergency_disable = disabled;
        self
    }

    /// Sets the product integration flag.
    pub fn product_integration(mut self, enabled: bool) -> Self {
        self.product_integration = enabled;
        self
    }

    /// Whether catalog binding is available under this configuration.
    pub fn catalog_enabled(&self) -> bool {
        self.product_integration && !self.emergency_disable
    }

    /// Whether quantities are clamped to stock.
    pub fn is_strict(&self) -> bool {
        self.stock_policy == StockPolicy::Strict
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, parse: fn(&str) -> Option<T>) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!(key = %key, value = %raw, "Ignoring unparseable configuration value");
    }
    parsed
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_non_negative(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .ok()
        .filter(|value| !value.is_sign_negative() || value.is_zero())
}

// =============================================================================
// Unit Tests
// =============================================================================
