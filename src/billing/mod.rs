pub mod aggregator;
pub mod api;
pub mod events;
pub mod invoices;
pub mod models;
pub mod period;
pub mod scheduler;
pub mod service;

pub use aggregator::UsageAggregator;
pub use api::{
    get_usage as billing_get_usage, ingest_events as billing_ingest_events,
    list_invoices as billing_list_invoices, run_invoices as billing_run_invoices,
    IngestResponse, RunInvoicesQuery, RunInvoicesResponse, UsageQuery,
};
pub use events::{EventStore, EventValidationError, UsageEventInput};
pub use invoices::InvoiceStore;
pub use models::{Customer, FeatureUsage, Invoice, InvoiceLineItem, UsageEvent};
pub use period::{BillingPeriod, PeriodError};
pub use scheduler::{process_tick as run_invoice_automation_tick, spawn as spawn_invoice_scheduler};
pub use service::InvoiceGenerator;
