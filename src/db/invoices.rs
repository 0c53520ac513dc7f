use sqlx::{Executor, FromRow, Sqlite, SqliteConnection};

use crate::billing::models::InvoiceLineItem;

#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRecord {
    pub id: i64,
    pub customer_id: i64,
    pub period_start: String,
    pub period_end: String,
    pub total: f64,
    pub generated_at: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct LineItemRecord {
    pub invoice_id: i64,
    pub feature: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: f64,
}

impl From<LineItemRecord> for InvoiceLineItem {
    fn from(record: LineItemRecord) -> Self {
        InvoiceLineItem {
            feature: record.feature,
            quantity: record.quantity,
            unit_price: record.unit_price,
            amount: record.amount,
        }
    }
}

/// Removes the invoice for `(customer_id, period_start)` along with its line items.
pub async fn delete_for_period(
    conn: &mut SqliteConnection,
    customer_id: i64,
    period_start: &str,
) -> Result<u64, sqlx::Error> {
    sqlx::query(
        r#"
        DELETE FROM invoice_line_items
        WHERE invoice_id IN (
            SELECT id FROM invoices WHERE customer_id = ? AND period_start = ?
        )
        "#,
    )
    .bind(customer_id)
    .bind(period_start)
    .execute(&mut *conn)
    .await?;

    let result = sqlx::query("DELETE FROM invoices WHERE customer_id = ? AND period_start = ?")
        .bind(customer_id)
        .bind(period_start)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn insert_invoice<'c, E>(
    executor: E,
    customer_id: i64,
    period_start: &str,
    period_end: &str,
    generated_at: &str,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO invoices (customer_id, period_start, period_end, total, generated_at)
        VALUES (?, ?, ?, 0.0, ?)
        "#,
    )
    .bind(customer_id)
    .bind(period_start)
    .bind(period_end)
    .bind(generated_at)
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_line_item<'c, E>(
    executor: E,
    invoice_id: i64,
    item: &InvoiceLineItem,
) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO invoice_line_items (invoice_id, feature, quantity, unit_price, amount)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(invoice_id)
    .bind(&item.feature)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.amount)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn update_total<'c, E>(executor: E, invoice_id: i64, total: f64) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query("UPDATE invoices SET total = ? WHERE id = ?")
        .bind(total)
        .bind(invoice_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn invoices_for_customer<'c, E>(
    executor: E,
    customer_id: i64,
) -> Result<Vec<InvoiceRecord>, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as::<_, InvoiceRecord>(
        r#"
        SELECT id, customer_id, period_start, period_end, total, generated_at
        FROM invoices
        WHERE customer_id = ?
        ORDER BY generated_at DESC, id DESC
        "#,
    )
    .bind(customer_id)
    .fetch_all(executor)
    .await
}

pub async fn line_items_for_customer<'c, E>(
    executor: E,
    customer_id: i64,
) -> Result<Vec<LineItemRecord>, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as::<_, LineItemRecord>(
        r#"
        SELECT li.invoice_id, li.feature, li.quantity, li.unit_price, li.amount
        FROM invoice_line_items li
        JOIN invoices i ON i.id = li.invoice_id
        WHERE i.customer_id = ?
        ORDER BY li.invoice_id, li.feature
        "#,
    )
    .bind(customer_id)
    .fetch_all(executor)
    .await
}
