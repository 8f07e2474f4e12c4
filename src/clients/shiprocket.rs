use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use super::carrier::{CarrierClient, CarrierError};
use crate::config::CarrierConfig;
use crate::domain::shipment::{
    ShipmentReceipt, ShipmentRequest, TrackingEvent, TrackingSnapshot,
};
use crate::domain::Money;
use crate::utils::{
    retry_transient, CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryPolicy,
};

// ============================================================================
// Shiprocket Carrier Client
// ============================================================================
//
// Endpoints:
// - POST /v1/external/auth/login                          email/password → token
// - POST /v1/external/shipments/create/forward-shipment   order → AWB
// - GET  /v1/external/courier/track/awb/{awb}             AWB → status/events
//
// The bearer token is shared process-wide and replaced whole on refresh.
// Two callers refreshing at once may both log in; neither can observe a
// half-written token. A 401 triggers exactly one re-login and resend.
//
// ============================================================================

const LOGIN_PATH: &str = "/v1/external/auth/login";
const FORWARD_SHIPMENT_PATH: &str = "/v1/external/shipments/create/forward-shipment";
const TRACK_AWB_PATH: &str = "/v1/external/courier/track/awb";

pub struct ShiprocketClient {
    http: Client,
    config: CarrierConfig,
    token: RwLock<Option<Arc<str>>>,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
}

impl ShiprocketClient {
    pub fn new(config: CarrierConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            config,
            token: RwLock::new(None),
            breaker: CircuitBreaker::new("carrier", CircuitBreakerConfig::default()),
            retry: RetryPolicy::default(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn login(&self) -> Result<Arc<str>, CarrierError> {
        let response = self
            .http
            .post(self.url(LOGIN_PATH))
            .json(&LoginBody {
                email: &self.config.email,
                password: &self.config.password,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let text = response.text().await.unwrap_or_default();
            return Err(CarrierError::Auth(error_message(&text)));
        }

        let body: LoginResponse = serde_json::from_value(read_body(response).await?)
            .map_err(|e| CarrierError::Decode(e.to_string()))?;

        let token: Arc<str> = body
            .token
            .filter(|t| !t.trim().is_empty())
            .map(Arc::from)
            .ok_or_else(|| CarrierError::Auth("login response carried no token".to_string()))?;

        *self.token.write().await = Some(token.clone());
        tracing::info!("🔑 Carrier session established");
        Ok(token)
    }

    /// Cached token, logging in on first use
    async fn session(&self) -> Result<Arc<str>, CarrierError> {
        let cached = self.token.read().await.clone();
        if let Some(token) = cached {
            return Ok(token);
        }
        retry_transient(&self.retry, "carrier_login", |_| self.login()).await
    }

    /// Drop the cached token, unless someone already replaced it
    async fn invalidate(&self, stale: &Arc<str>) {
        let mut guard = self.token.write().await;
        if guard.as_ref().is_some_and(|t| Arc::ptr_eq(t, stale)) {
            *guard = None;
        }
    }

    async fn send_authed<F>(&self, build: F) -> Result<Value, CarrierError>
    where
        F: Fn(&str) -> RequestBuilder + Sync,
    {
        let token = self.session().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return read_body(response).await;
        }

        tracing::warn!("Carrier rejected session token, logging in again");
        self.invalidate(&token).await;
        let token = self.login().await?;

        let response = build(&token).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(CarrierError::Auth("token rejected after re-login".to_string()));
        }
        read_body(response).await
    }
}

#[async_trait]
impl CarrierClient for ShiprocketClient {
    async fn create_shipment(&self, request: &ShipmentRequest) -> Result<ShipmentReceipt, CarrierError> {
        let body = ForwardShipmentBody::from_request(request);
        let url = self.url(FORWARD_SHIPMENT_PATH);

        let value = self
            .breaker
            .call(self.send_authed(|token| self.http.post(&url).bearer_auth(token).json(&body)))
            .await?;

        parse_shipment_response(&value)
    }

    async fn track(&self, awb: &str) -> Result<TrackingSnapshot, CarrierError> {
        let awb = awb.trim();
        if awb.is_empty() || !awb.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(CarrierError::NoTrackingData(awb.to_string()));
        }

        let url = format!("{}/{}", self.url(TRACK_AWB_PATH), awb);
        let url = url.as_str();
        let this = self;

        let value = retry_transient(&self.retry, "carrier_track", move |_| async move {
            this.breaker
                .call(this.send_authed(|token| this.http.get(url).bearer_auth(token)))
                .await
                .map_err(CarrierError::from)
        })
        .await?;

        parse_tracking_response(awb, &value)
    }

    fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }
}

// ============================================================================
// Wire formats
// ============================================================================

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct OrderItem {
    name: String,
    sku: String,
    units: u32,
    #[serde(with = "rust_decimal::serde::float")]
    selling_price: Money,
}

#[derive(Debug, Serialize)]
struct ForwardShipmentBody {
    order_id: String,
    order_date: String,
    pickup_location: String,
    billing_customer_name: String,
    billing_last_name: String,
    billing_address: String,
    billing_address_2: String,
    billing_city: String,
    billing_pincode: String,
    billing_state: String,
    billing_country: String,
    billing_email: String,
    billing_phone: String,
    shipping_is_billing: bool,
    order_items: Vec<OrderItem>,
    payment_method: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    sub_total: Money,
    length: u32,
    breadth: u32,
    height: u32,
    #[serde(with = "rust_decimal::serde::float")]
    weight: Money,
}

impl ForwardShipmentBody {
    fn from_request(request: &ShipmentRequest) -> Self {
        let address = &request.address;
        let short_id: String = request.order_id.simple().to_string().chars().take(8).collect();

        Self {
            order_id: request.order_id.to_string(),
            order_date: request.order_date.format("%Y-%m-%d %H:%M").to_string(),
            pickup_location: request.pickup_location.clone(),
            billing_customer_name: request.customer.name.clone(),
            billing_last_name: String::new(),
            billing_address: address.line1.clone(),
            billing_address_2: address.line2.clone().unwrap_or_default(),
            billing_city: address.city.clone(),
            billing_pincode: address.pincode.trim().to_string(),
            billing_state: address.state.clone(),
            billing_country: address.country.clone(),
            billing_email: request.customer.email.clone(),
            billing_phone: address.phone.clone(),
            shipping_is_billing: true,
            order_items: vec![OrderItem {
                name: format!("Printed documents ({} pages)", request.total_pages),
                sku: format!("PRINT-{}", short_id.to_ascii_uppercase()),
                units: 1,
                selling_price: request.sub_total,
            }],
            payment_method: request.payment_mode.as_carrier_str(),
            sub_total: request.sub_total,
            length: request.package.length_cm,
            breadth: request.package.breadth_cm,
            height: request.package.height_cm,
            weight: request.package.weight_kg,
        }
    }
}

#[derive(Deserialize)]
struct ForwardShipmentResponse {
    #[serde(default)]
    status: Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    payload: Option<ForwardShipmentPayload>,
}

#[derive(Deserialize)]
struct ForwardShipmentPayload {
    #[serde(default)]
    awb_code: Option<String>,
    #[serde(default)]
    shipment_id: Option<Value>,
    #[serde(default)]
    courier_name: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct TrackingEnvelope {
    #[serde(default)]
    tracking_data: Option<TrackingData>,
}

#[derive(Deserialize)]
struct TrackingData {
    #[serde(default)]
    track_status: Value,
    #[serde(default)]
    shipment_track: Vec<ShipmentTrack>,
    #[serde(default)]
    shipment_track_activities: Option<Vec<TrackActivity>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ShipmentTrack {
    #[serde(default)]
    current_status: Option<String>,
}

#[derive(Deserialize)]
struct TrackActivity {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    activity: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default, rename = "sr-status-label")]
    status_label: Option<String>,
}

/// Success flags arrive as 1, "1" or true depending on the endpoint
fn flag_set(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s.trim() == "1",
        _ => false,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("NA"))
}

fn parse_carrier_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))
        .ok()
}

fn error_message(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| text.chars().take(200).collect())
}

async fn read_body(response: Response) -> Result<Value, CarrierError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(CarrierError::Rejected {
            status: status.as_u16(),
            message: error_message(&text),
        });
    }
    serde_json::from_str(&text).map_err(|e| CarrierError::Decode(e.to_string()))
}

fn parse_shipment_response(value: &Value) -> Result<ShipmentReceipt, CarrierError> {
    let response: ForwardShipmentResponse =
        serde_json::from_value(value.clone()).map_err(|e| CarrierError::Decode(e.to_string()))?;

    let payload = response.payload;
    let awb = payload.as_ref().and_then(|p| non_blank(p.awb_code.clone()));

    match (flag_set(&response.status), awb) {
        (true, Some(awb_number)) => {
            let payload = payload.as_ref();
            Ok(ShipmentReceipt {
                awb_number,
                carrier_shipment_id: payload
                    .and_then(|p| p.shipment_id.as_ref())
                    .map(|id| match id {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    }),
                courier_name: payload.and_then(|p| non_blank(p.courier_name.clone())),
            })
        }
        _ => {
            let message = payload
                .and_then(|p| non_blank(p.error_message))
                .or(response.message)
                .unwrap_or_else(|| "carrier did not assign an AWB".to_string());
            Err(CarrierError::Rejected {
                status: StatusCode::OK.as_u16(),
                message,
            })
        }
    }
}

/// Build a snapshot from a track-by-AWB response. Accepts the body either
/// bare or keyed by AWB.
fn parse_tracking_response(awb: &str, value: &Value) -> Result<TrackingSnapshot, CarrierError> {
    let envelope = value.get(awb).filter(|v| v.get("tracking_data").is_some()).unwrap_or(value);
    let envelope: TrackingEnvelope =
        serde_json::from_value(envelope.clone()).map_err(|e| CarrierError::Decode(e.to_string()))?;

    let data = envelope
        .tracking_data
        .ok_or_else(|| CarrierError::NoTrackingData(awb.to_string()))?;

    let current_status = data
        .shipment_track
        .into_iter()
        .find_map(|t| non_blank(t.current_status));

    let events: Vec<TrackingEvent> = data
        .shipment_track_activities
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let description = non_blank(a.activity);
            let status = non_blank(a.status_label)
                .or_else(|| description.clone())
                .or_else(|| non_blank(a.status))?;
            Some(TrackingEvent {
                occurred_at: a.date.as_deref().and_then(parse_carrier_time),
                status,
                location: non_blank(a.location),
                description,
            })
        })
        .collect();

    if !flag_set(&data.track_status) && current_status.is_none() && events.is_empty() {
        if let Some(error) = non_blank(data.error) {
            tracing::debug!(awb = %awb, error = %error, "Carrier has no tracking data");
        }
        return Err(CarrierError::NoTrackingData(awb.to_string()));
    }

    Ok(TrackingSnapshot::from_events(awb, current_status, events))
}
