use anyhow::{Context, Result};
use std::time::Duration;

// ============================================================================
// Application Configuration
// ============================================================================
//
// Read once at startup from the environment (a `.env` file is loaded first
// when present). Required keys fail startup with the key name; everything
// else has a default.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct CarrierConfig {
    pub base_url: String,
    pub email: String,
    pub password: String,
    /// Per-request timeout for every carrier call
    pub timeout: Duration,
    pub pickup_location: String,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    pub http_bind: String,
    pub carrier: CarrierConfig,
    pub gateway: GatewayConfig,
    pub tracking_poll_interval: Duration,
    /// Upper bound on in-flight carrier calls during one tracking sweep
    pub tracking_concurrency: usize,
    pub payment_reconcile_interval: Duration,
    pub otp_ttl: Duration,
}

fn required(name: &str) -> Result<String> {
    let value = std::env::var(name).with_context(|| format!("{} must be set", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} must not be empty", name);
    }
    Ok(value)
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn number<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a number, got '{}'", name, raw)),
        _ => Ok(default),
    }
}

fn seconds(name: &str, default: u64) -> Result<Duration> {
    Ok(Duration::from_secs(number(name, default)?))
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: number("DATABASE_MAX_CONNECTIONS", 10)?,
            redis_url: optional("REDIS_URL", "redis://127.0.0.1:6379"),
            http_bind: optional("HTTP_BIND", "0.0.0.0:8080"),
            carrier: CarrierConfig {
                base_url: optional("CARRIER_BASE_URL", "https://apiv2.shiprocket.in"),
                email: required("CARRIER_EMAIL")?,
                password: required("CARRIER_PASSWORD")?,
                timeout: seconds("CARRIER_TIMEOUT_SECS", 15)?,
                pickup_location: optional("PICKUP_LOCATION", "Primary"),
            },
            gateway: GatewayConfig {
                base_url: optional("RAZORPAY_BASE_URL", "https://api.razorpay.com"),
                key_id: required("RAZORPAY_KEY_ID")?,
                key_secret: required("RAZORPAY_KEY_SECRET")?,
                webhook_secret: required("RAZORPAY_WEBHOOK_SECRET")?,
                timeout: seconds("RAZORPAY_TIMEOUT_SECS", 15)?,
            },
            tracking_poll_interval: seconds("TRACKING_POLL_INTERVAL_SECS", 1800)?,
            tracking_concurrency: number("TRACKING_CONCURRENCY", 4)?,
            payment_reconcile_interval: seconds("PAYMENT_RECONCILE_INTERVAL_SECS", 600)?,
            otp_ttl: seconds("OTP_TTL_SECS", 300)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_falls_back_to_default() {
        assert_eq!(number("PRINT_ORDERS_TEST_UNSET_KEY", 42u32).unwrap(), 42);
    }

    #[test]
    fn test_required_names_missing_key() {
        let err = required("PRINT_ORDERS_TEST_MISSING_KEY").unwrap_err();
        assert!(err.to_string().contains("PRINT_ORDERS_TEST_MISSING_KEY"));
    }
}
