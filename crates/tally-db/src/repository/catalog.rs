//! # Catalog Repository
//!
//! Database operations for catalog products.
//!
//! ## Key Operations
//! - Substring search for the invoice editor's product picker
//! - CRUD operations
//! - Stock updates and the pre-save stock check
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Catalog Search Works                             │
//! │                                                                         │
//! │  User types: "valve"                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LIKE '%valve%' across: sku, name, tax_code, category                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────┐                       │
//! │  │ catalog_products                            │                       │
//! │  │                                             │                       │
//! │  │ VLV-BR-25 | Brass Ball Valve 25mm | 8481   │ ← MATCH!              │
//! │  │ VLV-GT-50 | Gate Valve 50mm       | 8481   │ ← MATCH!              │
//! │  │ PIP-PVC-20| PVC Pipe 20mm         | 3917   │                       │
//! │  └─────────────────────────────────────────────┘                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Results: active rows only, ordered by name                           │
//! │                                                                         │
//! │  Stock in results is advisory: it may change before the invoice saves. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::catalog::CatalogLookup;
use tally_core::validation::{validate_product_name, validate_sku};
use tally_core::{CoreResult, Money, Product, Quantity, TaxRate};

/// Results returned to the editor's product picker per search.
pub const SEARCH_LIMIT: u32 = 50;

const PRODUCT_COLUMNS: &str = r#"
    id,
    sku,
    name,
    description,
    tax_code,
    base_price_cents,
    unit,
    stock_level,
    category,
    tax_rate_bps
"#;

/// Repository for catalog product operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = CatalogRepository::new(pool);
///
/// // Search products
/// let results = repo.search("valve", 20).await?;
///
/// // Pre-save stock check
/// let ok = repo.validate_stock("prod-id", Quantity::from_units(3)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Searches active products by substring.
    ///
    /// ## Arguments
    /// * `query` - Search term (trimmed; empty lists active products)
    /// * `limit` - Maximum results to return
    ///
    /// ## Example
    /// ```rust,ignore
    /// let products = repo.search("8481", 20).await?; // by tax code
    /// let products = repo.search("", 20).await?;     // everything active
    /// ```
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching catalog");

        if query.is_empty() {
            return self.list_active(limit).await;
        }

        let pattern = format!("%{}%", escape_like(query));

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM catalog_products
            WHERE is_active = 1
            AND (
                sku LIKE ?1 ESCAPE '\'
                OR name LIKE ?1 ESCAPE '\'
                OR tax_code LIKE ?1 ESCAPE '\'
                OR category LIKE ?1 ESCAPE '\'
            )
            ORDER BY name
            LIMIT ?2
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let products = rows.iter().map(product_from_row).collect::<DbResult<Vec<_>>>()?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists active products sorted by name.
    async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM catalog_products
            WHERE is_active = 1
            ORDER BY name
            LIMIT ?1
            "#
        );

        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;
        rows.iter().map(product_from_row).collect()
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM catalog_products WHERE id = ?1");

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM catalog_products WHERE sku = ?1");

        let row = sqlx::query(&sql)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    /// Inserts a new active product.
    ///
    /// New SKUs and names must pass the catalog format rules. Rows already
    /// in the table (imported, legacy) are read back whatever they contain.
    ///
    /// ## Returns
    /// * `Err(DbError::Validation)` - SKU or name fails the format rules
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        validate_sku(&product.sku)?;
        validate_product_name(&product.name)?;

        debug!(sku = %product.sku, "Inserting catalog product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO catalog_products (
                id, sku, name, description, tax_code,
                base_price_cents, unit, stock_level, category, tax_rate_bps,
                is_active, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                1, ?11, ?12
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.tax_code)
        .bind(product.base_price.cents())
        .bind(&product.unit)
        .bind(product.stock_level.value().to_string())
        .bind(&product.category)
        .bind(product.tax_rate.bps())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => match DbError::from(err) {
                DbError::UniqueViolation { field, .. } => {
                    Err(DbError::duplicate(field, product.sku.clone()))
                }
                other => Err(other),
            },
        }
    }

    /// Adjusts a product's stock level by `delta` and returns the new level.
    ///
    /// Read and write run in one transaction so concurrent adjustments do
    /// not lose updates. Stock may go negative; the engine treats anything
    /// at or below zero as out of stock.
    pub async fn update_stock(&self, id: &str, delta: Decimal) -> DbResult<Quantity> {
        debug!(id = %id, delta = %delta, "Updating stock");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT stock_level FROM catalog_products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let current = current.ok_or_else(|| DbError::not_found("Product", id))?;
        let next = parse_quantity("stock_level", &current)?.value() + delta;

        sqlx::query("UPDATE catalog_products SET stock_level = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(next.normalize().to_string())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(Quantity::new(next))
    }

    /// Hides a product from search. Existing invoice rows keep their snapshot.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE catalog_products SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog_products WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Pre-save stock check: whether `quantity` is available right now.
    ///
    /// The live editing path never calls this; stock shown while editing is
    /// advisory. Inactive products report `false`.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - unknown product
    pub async fn validate_stock(&self, product_ref: &str, quantity: Quantity) -> DbResult<bool> {
        let row = sqlx::query("SELECT stock_level, is_active FROM catalog_products WHERE id = ?1")
            .bind(product_ref)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_ref))?;

        let active: bool = row.try_get("is_active")?;
        let stock: String = row.try_get("stock_level")?;
        let stock = parse_quantity("stock_level", &stock)?;

        let available = active && quantity <= stock;
        debug!(
            product_ref = %product_ref,
            requested = %quantity,
            stock = %stock,
            available,
            "Stock check"
        );
        Ok(available)
    }
}

impl CatalogLookup for CatalogRepository {
    async fn search_products(&self, query: &str) -> CoreResult<Vec<Product>> {
        Ok(self.search(query, SEARCH_LIMIT).await?)
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

fn product_from_row(row: &SqliteRow) -> DbResult<Product> {
    let stock: String = row.try_get("stock_level")?;
    let bps: i64 = row.try_get("tax_rate_bps")?;
    let bps = u32::try_from(bps).map_err(|e| DbError::invalid_column("tax_rate_bps", e))?;

    Ok(Product {
        id: row.try_get("id")?,
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        tax_code: row.try_get("tax_code")?,
        base_price: Money::from_cents(row.try_get("base_price_cents")?),
        unit: row.try_get("unit")?,
        stock_level: parse_quantity("stock_level", &stock)?,
        category: row.try_get("category")?,
        tax_rate: TaxRate::from_bps(bps),
    })
}

pub(crate) fn parse_quantity(column: &str, raw: &str) -> DbResult<Quantity> {
    Decimal::from_str(raw.trim())
        .map(Quantity::new)
        .map_err(|e| DbError::invalid_column(column, e))
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
