use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::domain::payment::paise_to_rupees;
use crate::domain::Money;
use crate::utils::{BreakerError, CircuitBreaker, CircuitBreakerConfig, IsTransient};

const ORDERS_PATH: &str = "/v1/orders";
const CURRENCY: &str = "INR";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("Amount must be positive with at most two decimal places")]
    InvalidAmount,

    #[error("Payment gateway request timed out")]
    Timeout,

    #[error("Payment gateway unreachable: {0}")]
    Transport(String),

    #[error("Payment gateway rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected payment gateway response: {0}")]
    Decode(String),

    #[error("Payment gateway temporarily unavailable (circuit open)")]
    Unavailable,
}

impl IsTransient for GatewayError {
    fn is_transient(&self) -> bool {
        match self {
            GatewayError::Timeout | GatewayError::Transport(_) => true,
            GatewayError::Rejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

impl From<BreakerError<GatewayError>> for GatewayError {
    fn from(err: BreakerError<GatewayError>) -> Self {
        match err {
            BreakerError::Open(_) => GatewayError::Unavailable,
            BreakerError::Inner(e) => e,
        }
    }
}

/// Order created at the gateway, before the customer pays
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrder {
    pub id: String,
    pub amount: Money,
    pub currency: String,
    /// Public key the checkout widget needs
    pub key_id: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, amount: Money, receipt: &str) -> Result<GatewayOrder, GatewayError>;
}

/// Rupees → paise; refuses sub-paise precision and non-positive amounts
pub fn rupees_to_paise(amount: Money) -> Result<i64, GatewayError> {
    if amount <= Decimal::ZERO || amount.normalize().scale() > 2 {
        return Err(GatewayError::InvalidAmount);
    }
    (amount * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or(GatewayError::InvalidAmount)
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Deserialize)]
struct CreateOrderResponse {
    id: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    status: Option<String>,
}

pub struct RazorpayClient {
    http: Client,
    config: GatewayConfig,
    breaker: CircuitBreaker,
}

impl RazorpayClient {
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            breaker: CircuitBreaker::new("payment_gateway", CircuitBreakerConfig::default()),
        })
    }

    async fn post_order(&self, body: &CreateOrderBody<'_>) -> Result<CreateOrderResponse, GatewayError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), ORDERS_PATH);
        let response = self
            .http
            .post(url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status != StatusCode::OK {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["description"].as_str().map(str::to_string))
                .unwrap_or_else(|| text.chars().take(200).collect());
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    /// Not retried: a resent create would open a second gateway order
    async fn create_order(&self, amount: Money, receipt: &str) -> Result<GatewayOrder, GatewayError> {
        let body = CreateOrderBody {
            amount: rupees_to_paise(amount)?,
            currency: CURRENCY,
            receipt,
        };

        let created = self.breaker.call(self.post_order(&body)).await?;

        if created.status.as_deref().is_some_and(|s| s != "created") {
            tracing::warn!(
                gateway_order_id = %created.id,
                status = ?created.status,
                "Gateway order created in unexpected state"
            );
        }

        Ok(GatewayOrder {
            id: created.id,
            amount: paise_to_rupees(created.amount),
            currency: created.currency,
            key_id: self.config.key_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rupees_to_paise() {
        assert_eq!(rupees_to_paise(Decimal::new(24000, 2)), Ok(24000));
        assert_eq!(rupees_to_paise(Decimal::new(5, 0)), Ok(500));
        assert_eq!(rupees_to_paise(Decimal::new(12340, 3)), Ok(1234));
    }

    #[test]
    fn test_rupees_to_paise_rejects_bad_amounts() {
        assert_eq!(rupees_to_paise(Decimal::ZERO), Err(GatewayError::InvalidAmount));
        assert_eq!(rupees_to_paise(Decimal::new(-100, 2)), Err(GatewayError::InvalidAmount));
        assert_eq!(rupees_to_paise(Decimal::new(1001, 3)), Err(GatewayError::InvalidAmount));
    }
}
