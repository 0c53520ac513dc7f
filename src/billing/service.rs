use futures_util::{stream, StreamExt, TryStreamExt};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::config::BillingSettings;
use crate::db;
use crate::error::{BillingError, BillingResult};
use crate::timestamp;

use super::aggregator::aggregate_on;
use super::models::{Invoice, InvoiceLineItem};
use super::period::BillingPeriod;

/// key: billing-invoice-generator -> idempotent per period invoice runs
#[derive(Clone)]
pub struct InvoiceGenerator {
    pool: SqlitePool,
    settings: BillingSettings,
}

/// Bounds and pricing shared by every customer in one run.
#[derive(Debug, Clone)]
struct RunWindow {
    period_start: String,
    period_end: String,
    generated_at: String,
    unit_price: f64,
}

impl RunWindow {
    fn new(period: BillingPeriod, unit_price: f64) -> Self {
        Self {
            period_start: period.start_canonical(),
            period_end: period.end_canonical(),
            generated_at: timestamp::now_canonical(),
            unit_price,
        }
    }
}

impl InvoiceGenerator {
    pub fn new(pool: SqlitePool, settings: BillingSettings) -> Self {
        Self { pool, settings }
    }

    /// Invoices every customer with usage in `period` (`YYYY-MM`) and returns how many invoices
    /// were written. Falls back to the configured unit price when none is given.
    pub async fn run(&self, period: &str, unit_price: Option<f64>) -> BillingResult<u64> {
        let period = BillingPeriod::parse(period)?;
        let unit_price = unit_price.unwrap_or(self.settings.default_unit_price);
        self.run_period(period, unit_price).await
    }

    pub async fn run_period(&self, period: BillingPeriod, unit_price: f64) -> BillingResult<u64> {
        validate_unit_price(unit_price)?;
        let window = RunWindow::new(period, unit_price);
        let customers =
            db::events::customers_with_events(&self.pool, &window.period_start, &window.period_end)
                .await?;
        self.supersede_all(period, customers, &window).await
    }

    /// Like `run_period`, but leaves customers that already hold an invoice for the period
    /// untouched, so an earlier run at an explicit price survives.
    pub async fn run_period_uninvoiced(
        &self,
        period: BillingPeriod,
        unit_price: f64,
    ) -> BillingResult<u64> {
        validate_unit_price(unit_price)?;
        let window = RunWindow::new(period, unit_price);
        let customers = db::events::uninvoiced_customers_with_events(
            &self.pool,
            &window.period_start,
            &window.period_end,
        )
        .await?;
        self.supersede_all(period, customers, &window).await
    }

    async fn supersede_all(
        &self,
        period: BillingPeriod,
        customers: Vec<i64>,
        window: &RunWindow,
    ) -> BillingResult<u64> {
        info!(
            %period,
            unit_price = window.unit_price,
            candidates = customers.len(),
            "starting invoice run"
        );

        let generated = stream::iter(customers)
            .map(|customer_id| self.supersede(customer_id, window))
            .buffer_unordered(self.settings.invoice_concurrency.max(1))
            .try_fold(0_u64, |count, invoice| async move {
                Ok::<_, BillingError>(count + u64::from(invoice.is_some()))
            })
            .await
            .map_err(|err| {
                warn!(?err, %period, "invoice run aborted");
                err
            })?;

        info!(%period, generated, "invoice run finished");
        Ok(generated)
    }

    /// Regenerates the invoice for a single customer and period. Returns `None` when the
    /// customer has no non-zero usage in the period, in which case nothing is written.
    pub async fn generate_for_customer(
        &self,
        customer_id: i64,
        period: BillingPeriod,
        unit_price: f64,
    ) -> BillingResult<Option<Invoice>> {
        validate_unit_price(unit_price)?;
        self.supersede(customer_id, &RunWindow::new(period, unit_price))
            .await
    }

    /// Deletes any prior invoice for the customer/period and writes a fresh one in one
    /// transaction. The delete comes first so the write lock is held before usage is read.
    /// Features whose usage sums to zero get no line item.
    async fn supersede(&self, customer_id: i64, window: &RunWindow) -> BillingResult<Option<Invoice>> {
        let mut tx = self.pool.begin().await?;

        let replaced =
            db::invoices::delete_for_period(&mut *tx, customer_id, &window.period_start).await?;
        let mut usage = aggregate_on(
            &mut *tx,
            customer_id,
            &window.period_start,
            &window.period_end,
        )
        .await?;
        usage.retain(|feature| feature.quantity > 0.0);
        if usage.is_empty() {
            tx.rollback().await?;
            debug!(customer_id, "no usage in period; invoice skipped");
            return Ok(None);
        }

        let invoice_id = db::invoices::insert_invoice(
            &mut *tx,
            customer_id,
            &window.period_start,
            &window.period_end,
            &window.generated_at,
        )
        .await?;

        let line_items: Vec<InvoiceLineItem> = usage
            .iter()
            .map(|feature| InvoiceLineItem::priced(feature, window.unit_price))
            .collect();
        for item in &line_items {
            db::invoices::insert_line_item(&mut *tx, invoice_id, item).await?;
        }
        let total: f64 = line_items.iter().map(|item| item.amount).sum();
        db::invoices::update_total(&mut *tx, invoice_id, total).await?;

        tx.commit().await?;

        info!(
            customer_id,
            invoice_id,
            total,
            line_items = line_items.len(),
            superseded = replaced > 0,
            "invoice generated"
        );

        Ok(Some(Invoice {
            id: invoice_id,
            customer_id,
            period_start: window.period_start.clone(),
            period_end: window.period_end.clone(),
            total,
            generated_at: window.generated_at.clone(),
            line_items,
        }))
    }
}

pub fn validate_unit_price(unit_price: f64) -> BillingResult<()> {
    if unit_price.is_finite() && unit_price >= 0.0 {
        Ok(())
    } else {
        Err(BillingError::validation(
            "unit_price must be a non-negative number",
        ))
    }
}
