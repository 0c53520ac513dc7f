use once_cell::sync::Lazy;

/// Location of the billing store. Defaults to a `billing.db` file in the working directory.
pub static DATABASE_URL: Lazy<String> = Lazy::new(|| {
    read_optional_env("DATABASE_URL").unwrap_or_else(|| "sqlite://billing.db".to_string())
});

/// Upper bound on pooled store connections. Defaults to `5`.
pub static DATABASE_MAX_CONNECTIONS: Lazy<u32> = Lazy::new(|| {
    std::env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(5)
});

/// Address the HTTP server should bind to. Defaults to `0.0.0.0`.
pub static BIND_ADDRESS: Lazy<String> =
    Lazy::new(|| std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()));

/// Port the HTTP server should listen on. Defaults to `8000`.
pub static BIND_PORT: Lazy<u16> = Lazy::new(|| {
    std::env::var("BIND_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8000)
});

/// When set to a truthy value, allows the application to continue running even if database
/// migrations fail. Defaults to `false`.
pub static ALLOW_MIGRATION_FAILURE: Lazy<bool> =
    Lazy::new(|| read_flag_env("ALLOW_MIGRATION_FAILURE"));

/// key: billing-config -> unit price applied when a run omits one
pub static BILLING_DEFAULT_UNIT_PRICE: Lazy<f64> = Lazy::new(|| {
    std::env::var("BILLING_DEFAULT_UNIT_PRICE")
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value >= 0.0)
        .unwrap_or(DEFAULT_UNIT_PRICE)
});

/// key: billing-config -> customers superseded in parallel per run
pub static BILLING_INVOICE_CONCURRENCY: Lazy<usize> = Lazy::new(|| {
    std::env::var("BILLING_INVOICE_CONCURRENCY")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_INVOICE_CONCURRENCY)
});

/// key: billing-config -> enable the periodic invoice scheduler
pub static BILLING_AUTO_INVOICE: Lazy<bool> = Lazy::new(|| read_flag_env("BILLING_AUTO_INVOICE"));

/// key: billing-config -> invoice scheduler cadence
pub static BILLING_INVOICE_SCAN_INTERVAL_SECS: Lazy<u64> = Lazy::new(|| {
    std::env::var("BILLING_INVOICE_SCAN_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_INVOICE_SCAN_INTERVAL_SECS)
});

pub const DEFAULT_UNIT_PRICE: f64 = 0.01;
pub const DEFAULT_INVOICE_CONCURRENCY: usize = 4;
pub const DEFAULT_INVOICE_SCAN_INTERVAL_SECS: u64 = 3600;

/// Snapshot of the billing knobs handed to the invoicing components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillingSettings {
    pub default_unit_price: f64,
    pub invoice_concurrency: usize,
    pub invoice_scan_interval_secs: u64,
}

impl BillingSettings {
    pub fn from_env() -> Self {
        Self {
            default_unit_price: *BILLING_DEFAULT_UNIT_PRICE,
            invoice_concurrency: *BILLING_INVOICE_CONCURRENCY,
            invoice_scan_interval_secs: *BILLING_INVOICE_SCAN_INTERVAL_SECS,
        }
    }
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            default_unit_price: DEFAULT_UNIT_PRICE,
            invoice_concurrency: DEFAULT_INVOICE_CONCURRENCY,
            invoice_scan_interval_secs: DEFAULT_INVOICE_SCAN_INTERVAL_SECS,
        }
    }
}

fn read_optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_flag_env(key: &str) -> bool {
    std::env::var(key)
        .ok()
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes")
        })
        .unwrap_or(false)
}
