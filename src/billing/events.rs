use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db;
use crate::db::events::InsertUsageEvent;
use crate::error::{BillingError, BillingResult};
use crate::timestamp::{self, TimestampError};

use super::models::UsageEvent;

pub const DEFAULT_QUANTITY: f64 = 1.0;

#[derive(Debug, Error, PartialEq)]
pub enum EventValidationError {
    #[error("request body must be an array of events")]
    NotAnArray,
    #[error("event {index} must be a JSON object")]
    NotAnObject { index: usize },
    #[error("event {index} missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("event {index} field `{field}` {reason}")]
    InvalidField {
        index: usize,
        field: &'static str,
        reason: &'static str,
    },
    #[error("event {index} field `ts_event`: {source}")]
    InvalidTimestamp {
        index: usize,
        #[source]
        source: TimestampError,
    },
}

/// key: billing-event-input -> validated usage event ready for persistence
///
/// Only constructible through `new` or `parse`, so a value in hand always carries a non-empty
/// feature and a finite, non-negative quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageEventInput {
    customer_id: i64,
    feature: String,
    quantity: f64,
    occurred_at: DateTime<Utc>,
}

impl UsageEventInput {
    pub fn new(
        customer_id: i64,
        feature: impl Into<String>,
        quantity: f64,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, EventValidationError> {
        Self::checked(0, customer_id, feature.into(), quantity, occurred_at)
    }

    fn checked(
        index: usize,
        customer_id: i64,
        feature: String,
        quantity: f64,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, EventValidationError> {
        if feature.is_empty() {
            return Err(EventValidationError::InvalidField {
                index,
                field: "feature",
                reason: "must be a non-empty string",
            });
        }
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(EventValidationError::InvalidField {
                index,
                field: "quantity",
                reason: "must be a non-negative number",
            });
        }
        Ok(Self {
            customer_id,
            feature,
            quantity,
            occurred_at,
        })
    }

    pub fn customer_id(&self) -> i64 {
        self.customer_id
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Converts one raw event object into its typed form.
    pub fn parse(index: usize, raw: &Value) -> Result<Self, EventValidationError> {
        if !raw.is_object() {
            return Err(EventValidationError::NotAnObject { index });
        }

        let customer_id = require_field(raw, index, "customer_id")?
            .as_i64()
            .ok_or(EventValidationError::InvalidField {
                index,
                field: "customer_id",
                reason: "must be an integer",
            })?;

        let feature = require_field(raw, index, "feature")?
            .as_str()
            .ok_or(EventValidationError::InvalidField {
                index,
                field: "feature",
                reason: "must be a non-empty string",
            })?
            .to_string();

        let ts_event = require_field(raw, index, "ts_event")?.as_str().ok_or(
            EventValidationError::InvalidField {
                index,
                field: "ts_event",
                reason: "must be an ISO-8601 string",
            },
        )?;
        let occurred_at = timestamp::parse_iso8601(ts_event)
            .map_err(|source| EventValidationError::InvalidTimestamp { index, source })?;

        let quantity = parse_quantity(raw.get("quantity"), index)?;

        Self::checked(index, customer_id, feature, quantity, occurred_at)
    }

    pub fn parse_batch(raw: &Value) -> Result<Vec<Self>, EventValidationError> {
        let events = raw.as_array().ok_or(EventValidationError::NotAnArray)?;
        events
            .iter()
            .enumerate()
            .map(|(index, event)| Self::parse(index, event))
            .collect()
    }
}

/// key: billing-event-store -> append-only usage log
#[derive(Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Parses and appends a raw JSON batch. Nothing is written unless every event is valid.
    pub async fn ingest(&self, raw: &Value) -> BillingResult<u64> {
        let events = UsageEventInput::parse_batch(raw)?;
        self.append(&events).await
    }

    /// Appends a batch atomically, stamping every event with the same ingestion time.
    pub async fn append(&self, events: &[UsageEventInput]) -> BillingResult<u64> {
        if events.is_empty() {
            return Ok(0);
        }

        let ts_ingested = timestamp::now_canonical();
        let mut tx = self.pool.begin().await?;
        for event in events {
            let ts_event = timestamp::canonical(&event.occurred_at);
            db::events::insert_event(
                &mut *tx,
                InsertUsageEvent {
                    customer_id: event.customer_id,
                    feature: &event.feature,
                    quantity: event.quantity,
                    ts_event: &ts_event,
                    ts_ingested: &ts_ingested,
                },
            )
            .await
            .map_err(|err| {
                if db::is_foreign_key_violation(&err) {
                    BillingError::Reference(format!(
                        "customer {} does not exist",
                        event.customer_id
                    ))
                } else {
                    BillingError::Storage(err)
                }
            })?;
        }
        tx.commit().await?;

        let inserted = events.len() as u64;
        tracing::info!(inserted, %ts_ingested, "usage event batch committed");
        Ok(inserted)
    }

    /// Raw events for a customer in `[start, end)`, oldest first.
    pub async fn events_for_customer(
        &self,
        customer_id: i64,
        start: &str,
        end: &str,
    ) -> BillingResult<Vec<UsageEvent>> {
        let start = timestamp::normalize(start)?;
        let end = timestamp::normalize(end)?;
        Ok(db::events::events_in_range(&self.pool, customer_id, &start, &end).await?)
    }
}

fn require_field<'a>(
    payload: &'a Value,
    index: usize,
    field: &'static str,
) -> Result<&'a Value, EventValidationError> {
    payload
        .get(field)
        .filter(|value| !value.is_null())
        .ok_or(EventValidationError::MissingField { index, field })
}

fn parse_quantity(value: Option<&Value>, index: usize) -> Result<f64, EventValidationError> {
    let invalid = EventValidationError::InvalidField {
        index,
        field: "quantity",
        reason: "must be a non-negative number",
    };
    match value {
        None | Some(Value::Null) => Ok(DEFAULT_QUANTITY),
        Some(Value::Number(number)) => number.as_f64().ok_or(invalid),
        Some(Value::String(text)) => text.trim().parse::<f64>().map_err(|_| invalid),
        Some(_) => Err(invalid),
    }
}
