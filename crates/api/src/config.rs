//! Application configuration loaded from environment variables.

use domain::{Money, Pricing};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — PostgreSQL connection string; in-memory store if unset
/// - `WEBHOOK_SECRET` — shared secret for webhook signatures
/// - `GATEWAY_TIMEOUT_MS` — payment gateway call timeout (default: `10000`)
/// - `TAX_RATE_BP` — tax rate in basis points (default: `2100`)
/// - `FREE_SHIPPING_CENTS` — free-shipping threshold (default: `5000`)
/// - `FLAT_SHIPPING_CENTS` — flat shipping fee (default: `499`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub webhook_secret: String,
    pub gateway_timeout_ms: u64,
    pub tax_rate_bp: i64,
    pub free_shipping_cents: i64,
    pub flat_shipping_cents: i64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("PORT", 3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .unwrap_or_else(|_| "whsec_dev_only".to_string()),
            gateway_timeout_ms: env_parse("GATEWAY_TIMEOUT_MS", 10_000),
            tax_rate_bp: env_parse("TAX_RATE_BP", 2100),
            free_shipping_cents: env_parse("FREE_SHIPPING_CENTS", 5000),
            flat_shipping_cents: env_parse("FLAT_SHIPPING_CENTS", 499),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the pricing policy built from this configuration.
    pub fn pricing(&self) -> Pricing {
        Pricing {
            tax_rate_bp: self.tax_rate_bp,
            free_shipping_threshold: Money::from_cents(self.free_shipping_cents),
            flat_shipping_fee: Money::from_cents(self.flat_shipping_cents),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            webhook_secret: "whsec_dev_only".to_string(),
            gateway_timeout_ms: 10_000,
            tax_rate_bp: 2100,
            free_shipping_cents: 5000,
            flat_shipping_cents: 499,
        }
    }
}
