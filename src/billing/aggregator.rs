use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::db;
use crate::error::BillingResult;
use crate::timestamp;

use super::models::FeatureUsage;

/// key: billing-aggregator -> usage per feature over `[start, end)`
///
/// Events stamped exactly at `end` belong to the next interval. Features are grouped by exact,
/// case-sensitive name and returned in ascending order. No matching events yields an empty list.
#[derive(Clone)]
pub struct UsageAggregator {
    pool: SqlitePool,
}

impl UsageAggregator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Aggregates over client supplied ISO-8601 bounds.
    pub async fn usage(
        &self,
        customer_id: i64,
        start: &str,
        end: &str,
    ) -> BillingResult<Vec<FeatureUsage>> {
        let start = timestamp::normalize(start)?;
        let end = timestamp::normalize(end)?;
        Ok(db::events::usage_by_feature(&self.pool, customer_id, &start, &end).await?)
    }

    pub async fn aggregate(
        &self,
        customer_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BillingResult<Vec<FeatureUsage>> {
        let start = timestamp::canonical(&start);
        let end = timestamp::canonical(&end);
        Ok(db::events::usage_by_feature(&self.pool, customer_id, &start, &end).await?)
    }
}

/// Aggregates on a caller owned connection so the read joins the caller's transaction.
pub(crate) async fn aggregate_on(
    conn: &mut SqliteConnection,
    customer_id: i64,
    start: &str,
    end: &str,
) -> Result<Vec<FeatureUsage>, sqlx::Error> {
    db::events::usage_by_feature(conn, customer_id, start, end).await
}
