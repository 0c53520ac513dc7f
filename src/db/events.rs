use sqlx::{Executor, Sqlite};

use crate::billing::models::{FeatureUsage, UsageEvent};

#[derive(Debug, Clone)]
pub struct InsertUsageEvent<'a> {
    pub customer_id: i64,
    pub feature: &'a str,
    pub quantity: f64,
    pub ts_event: &'a str,
    pub ts_ingested: &'a str,
}

pub async fn insert_event<'c, E>(executor: E, input: InsertUsageEvent<'_>) -> Result<i64, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO events (customer_id, feature, quantity, ts_event, ts_ingested)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.customer_id)
    .bind(input.feature)
    .bind(input.quantity)
    .bind(input.ts_event)
    .bind(input.ts_ingested)
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Sum of quantity per feature for `start <= ts_event < end`.
pub async fn usage_by_feature<'c, E>(
    executor: E,
    customer_id: i64,
    start: &str,
    end: &str,
) -> Result<Vec<FeatureUsage>, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as::<_, FeatureUsage>(
        r#"
        SELECT feature, SUM(quantity) AS quantity
        FROM events
        WHERE customer_id = ?
          AND ts_event >= ?
          AND ts_event < ?
        GROUP BY feature
        ORDER BY feature
        "#,
    )
    .bind(customer_id)
    .bind(start)
    .bind(end)
    .fetch_all(executor)
    .await
}

pub async fn customers_with_events<'c, E>(
    executor: E,
    start: &str,
    end: &str,
) -> Result<Vec<i64>, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_scalar(
        r#"
        SELECT DISTINCT customer_id
        FROM events
        WHERE ts_event >= ?
          AND ts_event < ?
        ORDER BY customer_id
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(executor)
    .await
}

/// Customers with events in `[start, end)` and no invoice for the period starting at `start`.
pub async fn uninvoiced_customers_with_events<'c, E>(
    executor: E,
    start: &str,
    end: &str,
) -> Result<Vec<i64>, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_scalar(
        r#"
        SELECT DISTINCT e.customer_id
        FROM events e
        WHERE e.ts_event >= ?
          AND e.ts_event < ?
          AND NOT EXISTS (
              SELECT 1 FROM invoices i
              WHERE i.customer_id = e.customer_id
                AND i.period_start = ?
          )
        ORDER BY e.customer_id
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(start)
    .fetch_all(executor)
    .await
}

pub async fn events_in_range<'c, E>(
    executor: E,
    customer_id: i64,
    start: &str,
    end: &str,
) -> Result<Vec<UsageEvent>, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as::<_, UsageEvent>(
        r#"
        SELECT id, customer_id, feature, quantity, ts_event, ts_ingested
        FROM events
        WHERE customer_id = ?
          AND ts_event >= ?
          AND ts_event < ?
        ORDER BY ts_event, id
        "#,
    )
    .bind(customer_id)
    .bind(start)
    .bind(end)
    .fetch_all(executor)
    .await
}
