use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::PaymentError;
use super::value_objects::PaymentStatus;
use super::webhook::PaymentUpdate;
use crate::domain::Money;

// ============================================================================
// Payment
// ============================================================================
//
// One row per gateway order. Status is only ever changed by webhook updates.
// The link to a local order is made later, by matching the gateway order id.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: Option<String>,
    pub amount: Money,
    pub status: PaymentStatus,
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Created alongside a gateway order, before the user pays
    pub fn pending(razorpay_order_id: impl Into<String>, amount: Money) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            razorpay_order_id: razorpay_order_id.into(),
            razorpay_payment_id: None,
            amount,
            status: PaymentStatus::Pending,
            order_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record for a webhook whose gateway order we never saw being created
    pub fn from_update(update: &PaymentUpdate) -> Self {
        let mut payment = Self::pending(update.gateway_order_id.clone(), update.amount);
        payment.apply_update(update);
        payment
    }

    /// Apply a webhook update. SUCCESS is final: later non-success updates
    /// for the same gateway order are ignored. Returns whether anything
    /// changed, so a redelivered webhook is a no-op.
    pub fn apply_update(&mut self, update: &PaymentUpdate) -> bool {
        if self.status == PaymentStatus::Success && update.status != PaymentStatus::Success {
            return false;
        }

        let mut changed = false;

        if self.status != update.status {
            self.status = update.status;
            changed = true;
        }
        if update.gateway_payment_id.is_some() && self.razorpay_payment_id != update.gateway_payment_id {
            self.razorpay_payment_id = update.gateway_payment_id.clone();
            changed = true;
        }
        if !update.amount.is_zero() && self.amount != update.amount {
            self.amount = update.amount;
            changed = true;
        }

        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }

    /// Attach to an order. Linking twice to the same order is a no-op;
    /// linking to a different order is refused.
    pub fn link_to(&mut self, order_id: Uuid) -> Result<bool, PaymentError> {
        match self.order_id {
            Some(existing) if existing == order_id => Ok(false),
            Some(existing) => Err(PaymentError::AlreadyLinked {
                gateway_order_id: self.razorpay_order_id.clone(),
                linked_order: existing,
            }),
            None => {
                self.order_id = Some(order_id);
                self.updated_at = Utc::now();
                Ok(true)
            }
        }
    }

    /// Money collected with no order to show for it
    pub fn is_orphaned(&self) -> bool {
        self.status == PaymentStatus::Success && self.order_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::GatewayPaymentStatus;
    use rust_decimal::Decimal;

    fn update(status: &str, amount_paise: i64) -> PaymentUpdate {
        let gateway_status = GatewayPaymentStatus::parse(status);
        PaymentUpdate {
            gateway_order_id: "rzp_1".to_string(),
            gateway_payment_id: Some("pay_1".to_string()),
            amount: Decimal::new(amount_paise, 2),
            status: gateway_status.to_payment_status(),
            gateway_status,
        }
    }

    #[test]
    fn test_captured_webhook_marks_success() {
        let mut payment = Payment::pending("rzp_1", Decimal::new(24000, 2));
        assert!(payment.apply_update(&update("captured", 24000)));
        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.razorpay_payment_id.as_deref(), Some("pay_1"));
        assert_eq!(payment.amount, Decimal::new(24000, 2));
    }

    #[test]
    fn test_redelivered_webhook_is_noop() {
        let mut payment = Payment::pending("rzp_1", Decimal::new(24000, 2));
        payment.apply_update(&update("captured", 24000));
        let snapshot = payment.clone();

        assert!(!payment.apply_update(&update("captured", 24000)));
        assert_eq!(payment, snapshot);
    }

    #[test]
    fn test_success_is_final() {
        let mut payment = Payment::pending("rzp_1", Decimal::ZERO);
        payment.apply_update(&update("captured", 100));
        assert!(!payment.apply_update(&update("failed", 100)));
        assert_eq!(payment.status, PaymentStatus::Success);
    }

    #[test]
    fn test_failed_payment_can_later_succeed() {
        let mut payment = Payment::pending("rzp_1", Decimal::ZERO);
        payment.apply_update(&update("failed", 100));
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert!(payment.apply_update(&update("captured", 100)));
        assert_eq!(payment.status, PaymentStatus::Success);
    }

    #[test]
    fn test_from_update_builds_record() {
        let payment = Payment::from_update(&update("failed", 5000));
        assert_eq!(payment.razorpay_order_id, "rzp_1");
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.amount, Decimal::new(5000, 2));
    }

    #[test]
    fn test_link_is_idempotent_and_exclusive() {
        let mut payment = Payment::pending("rzp_1", Decimal::ONE);
        let order = Uuid::new_v4();

        assert_eq!(payment.link_to(order), Ok(true));
        assert_eq!(payment.link_to(order), Ok(false));
        assert!(matches!(
            payment.link_to(Uuid::new_v4()),
            Err(PaymentError::AlreadyLinked { .. })
        ));
    }

    #[test]
    fn test_orphan_detection() {
        let mut payment = Payment::pending("rzp_1", Decimal::ONE);
        assert!(!payment.is_orphaned());
        payment.apply_update(&update("captured", 100));
        assert!(payment.is_orphaned());
        payment.link_to(Uuid::new_v4()).unwrap();
        assert!(!payment.is_orphaned());
    }
}
