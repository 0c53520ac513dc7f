use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// key: billing-customer-model -> identity anchor for invoices
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub timezone: String,
}

/// key: billing-event-model -> immutable usage fact
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct UsageEvent {
    pub id: i64,
    pub customer_id: i64,
    pub feature: String,
    pub quantity: f64,
    pub ts_event: String,
    pub ts_ingested: String,
}

/// key: billing-usage-model -> aggregated quantity per feature
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct FeatureUsage {
    pub feature: String,
    pub quantity: f64,
}

/// key: billing-invoice-model -> one customer, one period
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: i64,
    pub customer_id: i64,
    pub period_start: String,
    pub period_end: String,
    pub total: f64,
    pub generated_at: String,
    pub line_items: Vec<InvoiceLineItem>,
}

/// key: billing-line-item-model -> owned by its invoice
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct InvoiceLineItem {
    pub feature: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: f64,
}

impl InvoiceLineItem {
    pub fn priced(usage: &FeatureUsage, unit_price: f64) -> Self {
        Self {
            feature: usage.feature.clone(),
            quantity: usage.quantity,
            unit_price,
            amount: usage.quantity * unit_price,
        }
    }
}
