use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::db;
use crate::error::BillingResult;

use super::models::{Invoice, InvoiceLineItem};

/// key: billing-invoice-store -> read side of generated invoices
#[derive(Clone)]
pub struct InvoiceStore {
    pool: SqlitePool,
}

impl InvoiceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Invoices for a customer with nested line items, most recently generated first.
    pub async fn list_for_customer(&self, customer_id: i64) -> BillingResult<Vec<Invoice>> {
        // Both reads share one snapshot so an invoice is never paired with another run's items.
        let mut tx = self.pool.begin().await?;
        let records = db::invoices::invoices_for_customer(&mut *tx, customer_id).await?;
        let items = db::invoices::line_items_for_customer(&mut *tx, customer_id).await?;
        tx.commit().await?;

        let mut items_by_invoice: HashMap<i64, Vec<InvoiceLineItem>> = HashMap::new();
        for item in items {
            items_by_invoice
                .entry(item.invoice_id)
                .or_default()
                .push(item.into());
        }

        Ok(records
            .into_iter()
            .map(|record| Invoice {
                line_items: items_by_invoice.remove(&record.id).unwrap_or_default(),
                id: record.id,
                customer_id: record.customer_id,
                period_start: record.period_start,
                period_end: record.period_end,
                total: record.total,
                generated_at: record.generated_at,
            })
            .collect())
    }
}
