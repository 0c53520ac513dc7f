use axum::{extract::rejection::JsonRejection, http::StatusCode, Extension, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::billing::models::Customer;
use crate::db;
use crate::error::{BillingError, BillingResult};

pub const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Default, Deserialize)]
pub struct NewCustomer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// key: billing-customers -> minimal record needed for invoicing
pub async fn register(pool: &SqlitePool, payload: NewCustomer) -> BillingResult<Customer> {
    let name = required(payload.name, "name")?;
    let email = required(payload.email, "email")?;
    let timezone = payload
        .timezone
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

    let id = db::customers::insert_customer(pool, &name, &email, &timezone)
        .await
        .map_err(|err| {
            if db::is_unique_violation(&err) {
                BillingError::Conflict(format!("a customer with email `{email}` already exists"))
            } else {
                tracing::error!(?err, "DB error creating customer");
                BillingError::Storage(err)
            }
        })?;

    tracing::info!(customer_id = id, "registered billing customer");
    Ok(Customer {
        id,
        name,
        email,
        timezone,
    })
}

pub async fn find(pool: &SqlitePool, id: i64) -> BillingResult<Option<Customer>> {
    Ok(db::customers::get_customer(pool, id).await?)
}

pub async fn create_customer(
    Extension(pool): Extension<SqlitePool>,
    payload: Result<Json<NewCustomer>, JsonRejection>,
) -> BillingResult<(StatusCode, Json<Customer>)> {
    let Json(payload) = payload?;
    let customer = register(&pool, payload).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

fn required(value: Option<String>, field: &str) -> BillingResult<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| BillingError::validation(format!("{field} is required")))
}
