//! # Invoice Repository
//!
//! Saves and restores the line items of an invoice.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Invoice Record Storage                            │
//! │                                                                         │
//! │  invoices                         invoice_line_items                   │
//! │  ┌──────────────────────┐         ┌──────────────────────────────────┐ │
//! │  │ id                   │ 1 ───── │ invoice_id, position             │ │
//! │  │ tax_rate_bps (NULL)  │       * │ product_ref       (NULL = manual)│ │
//! │  │ totals (cached)      │         │ catalog_snapshot  (JSON / NULL)  │ │
//! │  └──────────────────────┘         │ price_override    (JSON / NULL)  │ │
//! │                                   │ quantity (TEXT), *_cents          │ │
//! │                                   └──────────────────────────────────┘ │
//! │                                                                         │
//! │  save() replaces every row of the invoice in ONE transaction.          │
//! │  load() returns the rows verbatim: nothing is recomputed.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows written before catalog integration have NULL product columns and
//! load back as manual rows, unchanged.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::catalog::parse_quantity;
use tally_core::{
    CatalogSnapshot, InvoiceRecord, LineItem, LineItemId, Money, PriceOverride, TaxRate,
};

/// Repository for invoice line item records.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Stores `record` under `invoice_id`, replacing any previous version.
    ///
    /// ## Transaction
    /// ```text
    /// BEGIN
    ///   UPSERT invoices (tax rate, cached totals)
    ///   DELETE invoice_line_items WHERE invoice_id = ?
    ///   INSERT invoice_line_items × N (position = display order)
    /// COMMIT
    /// ```
    /// A failure anywhere rolls back the whole save.
    pub async fn save(&self, invoice_id: &str, record: &InvoiceRecord) -> DbResult<()> {
        let totals = record.totals();
        let now = Utc::now();

        debug!(invoice_id = %invoice_id, items = record.items.len(), "Saving invoice record");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, tax_rate_bps, item_count,
                taxable_total_cents, tax_total_cents, grand_total_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (id) DO UPDATE SET
                tax_rate_bps = excluded.tax_rate_bps,
                item_count = excluded.item_count,
                taxable_total_cents = excluded.taxable_total_cents,
                tax_total_cents = excluded.tax_total_cents,
                grand_total_cents = excluded.grand_total_cents,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(invoice_id)
        .bind(record.tax_rate.map(|r| r.bps()))
        .bind(totals.item_count as i64)
        .bind(totals.taxable_total.cents())
        .bind(totals.tax_total.cents())
        .bind(totals.grand_total.cents())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM invoice_line_items WHERE invoice_id = ?1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await?;

        for (position, item) in record.items.iter().enumerate() {
            let snapshot = item
                .catalog_snapshot
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            let price_override = item
                .price_override
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            sqlx::query(
                r#"
                INSERT INTO invoice_line_items (
                    id, invoice_id, position, product_ref, catalog_snapshot,
                    description, tax_code, unit, quantity, rate_cents,
                    price_override, taxable_base_cents, tax_amount_cents, total_cents,
                    stock_warning
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5,
                    ?6, ?7, ?8, ?9, ?10,
                    ?11, ?12, ?13, ?14,
                    ?15
                )
                "#,
            )
            .bind(item.id.as_str())
            .bind(invoice_id)
            .bind(position as i64)
            .bind(&item.product_ref)
            .bind(snapshot)
            .bind(&item.description)
            .bind(&item.tax_code)
            .bind(&item.unit)
            .bind(item.quantity.value().to_string())
            .bind(item.rate.cents())
            .bind(price_override)
            .bind(item.taxable_base.cents())
            .bind(item.tax_amount.cents())
            .bind(item.total.cents())
            .bind(item.stock_warning)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            invoice_id = %invoice_id,
            items = totals.item_count,
            grand_total = %totals.grand_total,
            "Invoice record saved"
        );
        Ok(())
    }

    /// Loads the record stored under `invoice_id`.
    ///
    /// ## Returns
    /// * `Ok(None)` - no such invoice
    pub async fn load(&self, invoice_id: &str) -> DbResult<Option<InvoiceRecord>> {
        let header = sqlx::query("SELECT tax_rate_bps FROM invoices WHERE id = ?1")
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let bps: Option<i64> = header.try_get("tax_rate_bps")?;
        let tax_rate = bps
            .map(|b| u32::try_from(b).map(TaxRate::from_bps))
            .transpose()
            .map_err(|e| DbError::invalid_column("tax_rate_bps", e))?;

        let rows = sqlx::query(
            r#"
            SELECT
                id, product_ref, catalog_snapshot,
                description, tax_code, unit, quantity, rate_cents,
                price_override, taxable_base_cents, tax_amount_cents, total_cents,
                stock_warning
            FROM invoice_line_items
            WHERE invoice_id = ?1
            ORDER BY position
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(line_item_from_row).collect::<DbResult<Vec<_>>>()?;

        debug!(invoice_id = %invoice_id, items = items.len(), "Loaded invoice record");
        Ok(Some(InvoiceRecord { tax_rate, items }))
    }

    /// Deletes an invoice and its line items.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no such invoice
    pub async fn delete(&self, invoice_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(invoice_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", invoice_id));
        }

        debug!(invoice_id = %invoice_id, "Invoice record deleted");
        Ok(())
    }
}

fn line_item_from_row(row: &SqliteRow) -> DbResult<LineItem> {
    let id: String = row.try_get("id")?;
    let quantity: String = row.try_get("quantity")?;
    let snapshot: Option<String> = row.try_get("catalog_snapshot")?;
    let price_override: Option<String> = row.try_get("price_override")?;

    let catalog_snapshot = snapshot
        .as_deref()
        .map(serde_json::from_str::<CatalogSnapshot>)
        .transpose()?;
    let price_override = price_override
        .as_deref()
        .map(serde_json::from_str::<PriceOverride>)
        .transpose()?;

    Ok(LineItem {
        id: LineItemId::from(id),
        product_ref: row.try_get("product_ref")?,
        catalog_snapshot,
        description: row.try_get("description")?,
        tax_code: row.try_get("tax_code")?,
        unit: row.try_get("unit")?,
        quantity: parse_quantity("quantity", &quantity)?,
        rate: Money::from_cents(row.try_get("rate_cents")?),
        price_override,
        taxable_base: Money::from_cents(row.try_get("taxable_base_cents")?),
        tax_amount: Money::from_cents(row.try_get("tax_amount_cents")?),
        total: Money::from_cents(row.try_get("total_cents")?),
        stock_warning: row.try_get("stock_warning")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
