use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clients::{GatewayOrder, PaymentGateway};
use crate::domain::payment::{
    verify_signature, Payment, PaymentError, PaymentStatus, PaymentUpdate, WebhookPayload,
};
use crate::domain::Money;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::store::{FailedPaymentOrder, OrderRepository, PaymentRepository};
use crate::utils::KeyedLocks;

// ============================================================================
// Payment Service
// ============================================================================
//
// A payment and the order that references it can be written from three
// places: the webhook, order placement, and the reconciliation sweep. All
// three take the per-gateway-order lock before touching the pair, and the
// link itself is a conditional update, so a payment is never attached to two
// orders and never loses a status written by a concurrent webhook.
//
// ============================================================================

/// Result of trying to attach a payment to an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOutcome {
    Linked,
    AlreadyLinked,
    /// No payment recorded yet; the reconciliation sweep retries later
    PaymentMissing,
    LinkedElsewhere,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOutcome {
    pub razorpay_order_id: String,
    pub status: PaymentStatus,
    /// False for a redelivered webhook that changed nothing
    pub changed: bool,
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub checked: usize,
    pub linked: usize,
    pub waiting: usize,
}

pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    orders: Arc<dyn OrderRepository>,
    gateway: Arc<dyn PaymentGateway>,
    webhook_secret: String,
    locks: KeyedLocks,
    metrics: Arc<Metrics>,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        orders: Arc<dyn OrderRepository>,
        gateway: Arc<dyn PaymentGateway>,
        webhook_secret: impl Into<String>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            payments,
            orders,
            gateway,
            webhook_secret: webhook_secret.into(),
            locks: KeyedLocks::new(),
            metrics,
        }
    }

    /// Open a gateway order for checkout and record it as a PENDING payment
    pub async fn create_gateway_order(&self, amount: Money, receipt: &str) -> AppResult<GatewayOrder> {
        let gateway_order = self.gateway.create_order(amount, receipt).await?;

        let payment = Payment::pending(gateway_order.id.clone(), amount);
        let _guard = self.locks.lock(&gateway_order.id).await;
        if !self.payments.insert_payment(&payment).await? {
            // A webhook beat us to it; the stored row is newer than ours
            debug!(razorpay_order_id = %gateway_order.id, "Payment already recorded");
        }

        info!(
            razorpay_order_id = %gateway_order.id,
            amount = %amount,
            "Gateway order created"
        );
        Ok(gateway_order)
    }

    /// Verify, apply and link one gateway webhook.
    ///
    /// Redelivery of the same payload leaves the payment as it is and reports
    /// `changed: false`.
    pub async fn handle_webhook(&self, body: &[u8], signature: Option<&str>) -> AppResult<WebhookOutcome> {
        if let Err(e) = verify_signature(body, signature, &self.webhook_secret) {
            warn!(error = %e, "Rejected payment webhook");
            self.metrics.record_webhook("rejected");
            return Err(e.into());
        }

        let update = match WebhookPayload::parse(body).and_then(|p| p.payment_update()) {
            Ok(update) => update,
            Err(e) => {
                warn!(error = %e, "Unusable payment webhook");
                self.metrics.record_webhook("malformed");
                return Err(e.into());
            }
        };

        let _guard = self.locks.lock(&update.gateway_order_id).await;

        let (mut payment, changed) = match self.payments.find_payment(&update.gateway_order_id).await? {
            Some(existing) => self.apply_to_stored(existing, &update).await?,
            None => {
                let created = Payment::from_update(&update);
                if self.payments.insert_payment(&created).await? {
                    info!(
                        razorpay_order_id = %update.gateway_order_id,
                        "Webhook for unseen gateway order, payment recorded"
                    );
                    (created, true)
                } else {
                    // Another writer stored the row after our lookup
                    debug!(
                        razorpay_order_id = %update.gateway_order_id,
                        "Payment appeared during webhook, applying to stored row"
                    );
                    let stored = self
                        .payments
                        .find_payment(&update.gateway_order_id)
                        .await?
                        .ok_or_else(|| {
                            AppError::Internal(anyhow::anyhow!(
                                "payment {} refused insert but cannot be read",
                                update.gateway_order_id
                            ))
                        })?;
                    self.apply_to_stored(stored, &update).await?
                }
            }
        };

        if payment.order_id.is_none() {
            if let Some(order) = self.orders.find_by_gateway_order_id(&payment.razorpay_order_id).await? {
                if self.link_locked(&mut payment, order.id, "webhook").await? == LinkOutcome::Linked {
                    debug!(order_id = %order.id, "Payment linked from webhook");
                }
            }
        }

        info!(
            razorpay_order_id = %payment.razorpay_order_id,
            status = payment.status.as_str(),
            changed,
            "Payment webhook processed"
        );
        self.metrics
            .record_webhook(if changed { "applied" } else { "duplicate" });

        Ok(WebhookOutcome {
            razorpay_order_id: payment.razorpay_order_id,
            status: payment.status,
            changed,
            order_id: payment.order_id,
        })
    }

    async fn apply_to_stored(&self, mut payment: Payment, update: &PaymentUpdate) -> AppResult<(Payment, bool)> {
        let changed = payment.apply_update(update);
        if changed {
            self.payments.save_payment_state(&payment).await?;
        }
        Ok((payment, changed))
    }

    /// Attach the payment for `gateway_order_id` to a freshly saved order.
    /// A missing payment is not an error: the webhook or the sweep links it
    /// once it exists.
    pub async fn link_order_payment(&self, order_id: Uuid, gateway_order_id: &str) -> AppResult<LinkOutcome> {
        let _guard = self.locks.lock(gateway_order_id).await;

        let Some(mut payment) = self.payments.find_payment(gateway_order_id).await? else {
            info!(
                order_id = %order_id,
                razorpay_order_id = %gateway_order_id,
                "No payment recorded yet, leaving link to reconciliation"
            );
            return Ok(LinkOutcome::PaymentMissing);
        };

        self.link_locked(&mut payment, order_id, "order").await
    }

    /// Caller must hold the lock for the payment's gateway order id
    async fn link_locked(&self, payment: &mut Payment, order_id: Uuid, source: &str) -> AppResult<LinkOutcome> {
        match payment.link_to(order_id) {
            Ok(false) => return Ok(LinkOutcome::AlreadyLinked),
            Ok(true) => {}
            Err(PaymentError::AlreadyLinked { linked_order, .. }) => {
                warn!(
                    razorpay_order_id = %payment.razorpay_order_id,
                    order_id = %order_id,
                    linked_order = %linked_order,
                    "Payment already belongs to another order"
                );
                return Ok(LinkOutcome::LinkedElsewhere);
            }
            Err(e) => return Err(e.into()),
        }

        if !self.payments.link_order(&payment.razorpay_order_id, order_id).await? {
            warn!(
                razorpay_order_id = %payment.razorpay_order_id,
                order_id = %order_id,
                "Conditional link refused by storage"
            );
            return Ok(LinkOutcome::LinkedElsewhere);
        }

        self.metrics.record_payment_link(source);
        info!(
            razorpay_order_id = %payment.razorpay_order_id,
            order_id = %order_id,
            source,
            "🔗 Payment linked to order"
        );
        Ok(LinkOutcome::Linked)
    }

    /// Link every unlinked payment whose order now exists
    pub async fn reconcile_unlinked(&self) -> AppResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for payment in self.payments.unlinked_payments().await? {
            report.checked += 1;

            let order = match self.orders.find_by_gateway_order_id(&payment.razorpay_order_id).await {
                Ok(Some(order)) => order,
                Ok(None) => {
                    report.waiting += 1;
                    continue;
                }
                Err(e) => {
                    warn!(
                        razorpay_order_id = %payment.razorpay_order_id,
                        error = ?e,
                        "Order lookup failed during reconciliation"
                    );
                    report.waiting += 1;
                    continue;
                }
            };

            let _guard = self.locks.lock(&payment.razorpay_order_id).await;
            // Re-read under the lock; a webhook may have linked it meanwhile
            let mut current = match self.payments.find_payment(&payment.razorpay_order_id).await {
                Ok(Some(current)) => current,
                Ok(None) => continue,
                Err(e) => {
                    warn!(razorpay_order_id = %payment.razorpay_order_id, error = ?e, "Payment reload failed");
                    report.waiting += 1;
                    continue;
                }
            };

            match self.link_locked(&mut current, order.id, "reconciliation").await {
                Ok(LinkOutcome::Linked) => report.linked += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!(razorpay_order_id = %payment.razorpay_order_id, error = %e, "Reconciliation link failed");
                    report.waiting += 1;
                }
            }
        }

        Ok(report)
    }

    pub async fn failed_payment_orders(&self) -> AppResult<Vec<FailedPaymentOrder>> {
        Ok(self.payments.orders_with_failed_payments().await?)
    }

    pub async fn orphaned_payments(&self) -> AppResult<Vec<Payment>> {
        Ok(self.payments.orphaned_payments().await?)
    }

    pub async fn find_payment(&self, gateway_order_id: &str) -> AppResult<Payment> {
        self.payments
            .find_payment(gateway_order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Payment for gateway order", gateway_order_id))
    }
}
