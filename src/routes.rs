use axum::{
    routing::{get, post},
    Extension, Router,
};
use sqlx::SqlitePool;

use crate::billing;
use crate::config::BillingSettings;
use crate::customers;

async fn root() -> &'static str {
    "Usage Billing API"
}

pub fn api_routes() -> Router {
    Router::new()
        .route("/v1/customers", post(customers::create_customer))
        .route("/v1/customers/:id/usage", get(billing::billing_get_usage))
        .route(
            "/v1/customers/:id/invoices",
            get(billing::billing_list_invoices),
        )
        .route("/v1/events/batch", post(billing::billing_ingest_events))
        .route("/v1/invoices/run", post(billing::billing_run_invoices))
}

/// Full application router with the store handle and billing settings injected.
pub fn app(pool: SqlitePool, settings: BillingSettings) -> Router {
    Router::new()
        .route("/", get(root))
        .merge(api_routes())
        .layer(Extension(pool))
        .layer(Extension(settings))
}
