use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::config::BillingSettings;
use crate::error::{BillingError, BillingResult};

use super::{EventStore, FeatureUsage, Invoice, InvoiceGenerator, InvoiceStore, UsageAggregator};

/// key: billing-api -> rest endpoints
pub async fn ingest_events(
    Extension(pool): Extension<SqlitePool>,
    payload: Result<Json<Value>, JsonRejection>,
) -> BillingResult<(StatusCode, Json<IngestResponse>)> {
    let Json(payload) = payload?;
    let inserted = EventStore::new(pool).ingest(&payload).await?;
    Ok((StatusCode::CREATED, Json(IngestResponse { inserted })))
}

pub async fn get_usage(
    Extension(pool): Extension<SqlitePool>,
    customer_id: Result<Path<i64>, PathRejection>,
    query: Result<Query<UsageQuery>, QueryRejection>,
) -> BillingResult<Json<Vec<FeatureUsage>>> {
    let Path(customer_id) = customer_id?;
    let Query(query) = query?;
    let (Some(start), Some(end)) = (query.start, query.end) else {
        return Err(BillingError::validation(
            "start and end query parameters are required",
        ));
    };
    let usage = UsageAggregator::new(pool)
        .usage(customer_id, &start, &end)
        .await?;
    Ok(Json(usage))
}

pub async fn list_invoices(
    Extension(pool): Extension<SqlitePool>,
    customer_id: Result<Path<i64>, PathRejection>,
) -> BillingResult<Json<Vec<Invoice>>> {
    let Path(customer_id) = customer_id?;
    let invoices = InvoiceStore::new(pool)
        .list_for_customer(customer_id)
        .await?;
    Ok(Json(invoices))
}

pub async fn run_invoices(
    Extension(pool): Extension<SqlitePool>,
    Extension(settings): Extension<BillingSettings>,
    query: Result<Query<RunInvoicesQuery>, QueryRejection>,
) -> BillingResult<(StatusCode, Json<RunInvoicesResponse>)> {
    let Query(query) = query?;
    let period = query
        .period
        .filter(|period| !period.trim().is_empty())
        .ok_or_else(|| BillingError::validation("period parameter is required"))?;
    let unit_price = query
        .unit_price
        .map(|raw| {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| BillingError::validation("unit_price must be a number"))
        })
        .transpose()?;

    let invoices_generated = InvoiceGenerator::new(pool, settings)
        .run(&period, unit_price)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RunInvoicesResponse { invoices_generated }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunInvoicesQuery {
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub unit_price: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub inserted: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunInvoicesResponse {
    pub invoices_generated: u64,
}
