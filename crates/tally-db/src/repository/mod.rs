//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Invoice editor                                                        │
//! │       │                                                                 │
//! │       │  db.catalog().search("valve", 20)                              │
//! │       │  db.invoices().save(id, &record)                               │
//! │       ▼                                                                 │
//! │  CatalogRepository                InvoiceRepository                    │
//! │  ├── search / get_by_id           ├── save (one transaction)           │
//! │  ├── insert / deactivate          ├── load                             │
//! │  ├── update_stock / count         └── delete                           │
//! │  └── validate_stock                                                    │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  CatalogRepository also implements tally_core's CatalogLookup, so the  │
//! │  search session can drive it without knowing about SQL.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`](catalog::CatalogRepository) - Product search, CRUD, stock
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoice record persistence

pub mod catalog;
pub mod invoice;
