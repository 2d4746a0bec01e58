//! # tally-db: Database Layer for Tally
//!
//! Catalog lookup and invoice record persistence on SQLite, via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  Invoice editor (search box, Save button)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ CatalogRepo   │    │ 001_catalog  │  │   │
//! │  │   │ SqlitePool    │◄───│ InvoiceRepo   │    │ 002_invoices │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (tally.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Pool, embedded migrations, repository access
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (catalog, invoice)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! // Migrations run on connect
//! let db = Database::new(DbConfig::new("path/to/tally.db")).await?;
//!
//! // Use repositories
//! let products = db.catalog().search("valve", 20).await?;
//! db.invoices().save("inv-42", &engine.to_record()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::invoice::InvoiceRepository;
