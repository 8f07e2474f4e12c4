use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;

use super::errors::PaymentError;
use super::value_objects::{GatewayPaymentStatus, PaymentStatus};
use crate::domain::Money;

// ============================================================================
// Gateway Webhook
// ============================================================================
//
// Shape: { "event": "...", "payload": { "payment": { "entity": {
//            "id": "pay_..", "order_id": "order_..", "amount": 24000,
//            "status": "captured" } } } }
//
// Amounts arrive in paise.
//
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub payment: Option<PaymentEnvelope>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEnvelope {
    pub entity: PaymentEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub amount: i64,
    pub status: String,
}

/// What a webhook says about one gateway order
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentUpdate {
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount: Money,
    pub status: PaymentStatus,
    pub gateway_status: GatewayPaymentStatus,
}

impl WebhookPayload {
    pub fn parse(body: &[u8]) -> Result<Self, PaymentError> {
        serde_json::from_slice(body).map_err(|e| PaymentError::MalformedPayload(e.to_string()))
    }

    pub fn payment_update(&self) -> Result<PaymentUpdate, PaymentError> {
        let entity = self
            .payload
            .payment
            .as_ref()
            .map(|p| &p.entity)
            .ok_or_else(|| PaymentError::NoPaymentEntity(self.event.clone()))?;

        let gateway_order_id = entity
            .order_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PaymentError::MalformedPayload("payment entity has no order_id".to_string()))?
            .to_string();

        let gateway_status = GatewayPaymentStatus::parse(&entity.status);

        Ok(PaymentUpdate {
            gateway_order_id,
            gateway_payment_id: entity.id.clone().filter(|id| !id.trim().is_empty()),
            amount: paise_to_rupees(entity.amount),
            status: gateway_status.to_payment_status(),
            gateway_status,
        })
    }
}

pub fn paise_to_rupees(paise: i64) -> Money {
    Decimal::new(paise, 2)
}

/// HMAC-SHA256 of the raw body, hex encoded, compared in constant time
pub fn verify_signature(body: &[u8], signature: Option<&str>, secret: &str) -> Result<(), PaymentError> {
    let signature = signature
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(PaymentError::MissingSignature)?;

    let expected = hex::decode(signature).map_err(|_| PaymentError::BadSignature)?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| PaymentError::BadSignature)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| PaymentError::BadSignature)
}

#[cfg(test)]
pub(crate) fn sign(body: &[u8], secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPTURED: &str = r#"{
        "event": "payment.captured",
        "payload": { "payment": { "entity": {
            "id": "pay_9", "order_id": "rzp_1", "amount": 24000, "status": "captured"
        } } }
    }"#;

    #[test]
    fn test_captured_payload_maps_to_success() {
        let update = WebhookPayload::parse(CAPTURED.as_bytes())
            .unwrap()
            .payment_update()
            .unwrap();

        assert_eq!(update.gateway_order_id, "rzp_1");
        assert_eq!(update.gateway_payment_id.as_deref(), Some("pay_9"));
        assert_eq!(update.amount, Decimal::new(24000, 2));
        assert_eq!(update.status, PaymentStatus::Success);
    }

    #[test]
    fn test_event_without_payment_is_rejected() {
        let payload = WebhookPayload::parse(br#"{"event":"order.paid","payload":{}}"#).unwrap();
        assert_eq!(
            payload.payment_update().unwrap_err(),
            PaymentError::NoPaymentEntity("order.paid".to_string())
        );
    }

    #[test]
    fn test_missing_order_id_is_malformed() {
        let raw = br#"{"event":"payment.failed","payload":{"payment":{"entity":{"id":"pay_1","status":"failed"}}}}"#;
        let payload = WebhookPayload::parse(raw).unwrap();
        assert!(matches!(payload.payment_update(), Err(PaymentError::MalformedPayload(_))));
    }

    #[test]
    fn test_garbage_body_is_malformed() {
        assert!(matches!(WebhookPayload::parse(b"not json"), Err(PaymentError::MalformedPayload(_))));
    }

    #[test]
    fn test_signature_round_trip() {
        let body = CAPTURED.as_bytes();
        let signature = sign(body, "whsec");
        assert_eq!(verify_signature(body, Some(&signature), "whsec"), Ok(()));
    }

    #[test]
    fn test_signature_mismatch_and_absence() {
        let body = CAPTURED.as_bytes();
        let signature = sign(body, "other-secret");
        assert_eq!(verify_signature(body, Some(&signature), "whsec"), Err(PaymentError::BadSignature));
        assert_eq!(verify_signature(body, Some("zz"), "whsec"), Err(PaymentError::BadSignature));
        assert_eq!(verify_signature(body, None, "whsec"), Err(PaymentError::MissingSignature));
    }

    #[test]
    fn test_paise_conversion() {
        assert_eq!(paise_to_rupees(12345).to_string(), "123.45");
    }
}
