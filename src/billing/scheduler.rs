use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::time::{self, Duration};
use tracing::{info, warn};

use crate::config::BillingSettings;

use super::period::BillingPeriod;
use super::service::InvoiceGenerator;

/// key: billing-invoice-scheduler -> periodic runs for closed months
pub fn spawn(pool: SqlitePool, settings: BillingSettings) {
    let interval = Duration::from_secs(settings.invoice_scan_interval_secs.max(1));

    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(err) = process_tick(&pool, Utc::now(), &settings).await {
                warn!(?err, "invoice automation tick failed");
            }
        }
    });
}

/// key: billing-invoice-scheduler -> tick handler
///
/// Invoices the month before the one containing `now`. That month has ended, so no further
/// events can land inside it through normal ingestion. Customers already invoiced for it are
/// skipped, so repeated ticks and earlier manual runs are left alone.
pub async fn process_tick(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    settings: &BillingSettings,
) -> Result<u64> {
    let period = BillingPeriod::containing(now).previous();
    let generator = InvoiceGenerator::new(pool.clone(), *settings);
    let generated = generator
        .run_period_uninvoiced(period, settings.default_unit_price)
        .await?;
    info!(%period, generated, "scheduled invoice run completed");
    Ok(generated)
}
