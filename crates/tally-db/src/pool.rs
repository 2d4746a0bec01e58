//! # Database Handle
//!
//! Opens the SQLite pool, applies the embedded schema and hands out the
//! catalog and invoice repositories.
//!
//! ```text
//! DbConfig::new(path) ──► Database::new ──► WAL pool ──► migrations/sqlite/*
//!                                              │
//!                          db.catalog() ◄──────┴──────► db.invoices()
//! ```
//!
//! The schema is always brought up to date on open: invoice saves and
//! catalog lookups both assume `catalog_products`, `invoices` and
//! `invoice_line_items` exist.

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::repository::catalog::CatalogRepository;
use crate::repository::invoice::InvoiceRepository;

/// `001_catalog.sql`, `002_invoices.sql`; applied in filename order.
static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/sqlite");

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives and how many connections may reach it.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file; created on first open. `:memory:` for a scratch database.
    pub database_path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// How long a lookup or save waits for a free connection. Default: 30s
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Private in-memory database, used by tests.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            // every extra connection would open its own empty database
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the catalog/invoice database. Clones share one pool.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./tally.db")).await?;
/// let hits = db.catalog().search("valve", 20).await?;
/// db.invoices().save("inv-42", &engine.to_record()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database and applies pending
    /// migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let url = if config.is_in_memory() {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}?mode=rwc", config.database_path.display())
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // line items cascade with their invoice
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        MIGRATOR.run(&pool).await?;

        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Database ready"
        );
        Ok(Database { pool })
    }

    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone())
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    /// Closes the pool; repositories handed out earlier stop working.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
