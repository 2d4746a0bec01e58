//! # Catalog Lookup
//!
//! The seam between the engine and whatever serves product data, plus the
//! bookkeeping that discards out-of-order search responses.
//!
//! ## Stale Response Handling
//! ```text
//! keystroke "va"   ──► issue() seq=1 ──► search ─────────────────┐ (slow)
//! keystroke "val"  ──► issue() seq=2 ──► search ──┐              │
//!                                                 ▼              ▼
//!                                   resolve(seq=2) → Some   resolve(seq=1) → None
//! ```
//! Only the response for the most recently issued ticket is delivered.
//! Older responses, including failures, are dropped silently.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::types::Product;
use crate::validation::validate_search_query;

/// Source of catalog products (database, remote service, test fake).
///
/// Failures surface as [`CoreError::LookupFailed`]; the engine never sees
/// storage-specific errors.
#[allow(async_fn_in_trait)]
pub trait CatalogLookup {
    /// Finds active products matching `query` (already trimmed, may be empty).
    async fn search_products(&self, query: &str) -> CoreResult<Vec<Product>>;
}

/// A numbered search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTicket {
    pub seq: u64,
    pub query: String,
}

/// A finished search, still tagged with the ticket it answers.
#[derive(Debug)]
pub struct SearchResponse {
    pub ticket: SearchTicket,
    pub result: CoreResult<Vec<Product>>,
}

/// Per-editor search sequencing.
///
/// Sequence numbers increase strictly; each editor session owns one.
#[derive(Debug, Default)]
pub struct SearchSession {
    latest: u64,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `query` and numbers a new request.
    pub fn issue(&mut self, query: &str) -> CoreResult<SearchTicket> {
        let query = validate_search_query(query)?;
        self.latest += 1;

        Ok(SearchTicket {
            seq: self.latest,
            query,
        })
    }

    /// Whether `ticket` is still the latest request.
    pub fn is_current(&self, ticket: &SearchTicket) -> bool {
        ticket.seq == self.latest
    }

    /// Delivers a response if it answers the latest request.
    ///
    /// - current + Ok  → `Ok(Some(products))`
    /// - current + Err → `Err(LookupFailed)`
    /// - stale         → `Ok(None)`
    pub fn resolve(&self, response: SearchResponse) -> CoreResult<Option<Vec<Product>>> {
        if !self.is_current(&response.ticket) {
            debug!(
                seq = response.ticket.seq,
                latest = self.latest,
                "Discarding stale search response"
            );
            return Ok(None);
        }

        match response.result {
            Ok(products) => Ok(Some(products)),
            Err(CoreError::LookupFailed(msg)) => Err(CoreError::LookupFailed(msg)),
            Err(other) => Err(CoreError::LookupFailed(other.to_string())),
        }
    }
}

/// Runs `ticket` against `catalog`, tagging the result for [`SearchSession::resolve`].
pub async fn search<C: CatalogLookup>(catalog: &C, ticket: SearchTicket) -> SearchResponse {
    let result = catalog.search_products(&ticket.query).await;
    SearchResponse { ticket, result }
}

// =============================================================================
// Unit Tests
// =============================================================================
