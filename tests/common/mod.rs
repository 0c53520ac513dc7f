#![allow(dead_code)]

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use usage_billing::billing::UsageEventInput;
use usage_billing::customers::{self, NewCustomer};
use usage_billing::{db, timestamp};

pub async fn store() -> SqlitePool {
    db::connect_in_memory().await.unwrap()
}

pub async fn customer(pool: &SqlitePool, email: &str) -> i64 {
    customers::register(
        pool,
        NewCustomer {
            name: Some(format!("Customer {email}")),
            email: Some(email.to_string()),
            timezone: None,
        },
    )
    .await
    .unwrap()
    .id
}

pub fn at(value: &str) -> DateTime<Utc> {
    timestamp::parse_iso8601(value).unwrap()
}

pub fn event(customer_id: i64, feature: &str, quantity: f64, ts: &str) -> UsageEventInput {
    UsageEventInput::new(customer_id, feature, quantity, at(ts)).unwrap()
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
