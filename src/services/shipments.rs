use std::sync::Arc;
use std::time::Duration;

use futures_util::{stream, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clients::{CarrierClient, CarrierError};
use crate::domain::order::{Order, OrderError, OrderStatus, ShipmentTracking};
use crate::domain::shipment::{
    reconcile_tracking, CustomerContact, ShipmentReceipt, ShipmentRequest, TrackedShipment,
    TrackingSnapshot, TrackingUpdate,
};
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::store::OrderRepository;
use crate::utils::KeyedLocks;

// ============================================================================
// Shipment Service
// ============================================================================
//
// Booking: one carrier call per order, under a per-order lock, followed by a
// conditional write of the AWB. A failed booking is reported to the caller
// and never retried here.
//
// Tracking sweep: every order with a booked shipment is polled with bounded
// concurrency and a per-call timeout. A failure on one AWB is logged and
// counted; the rest of the batch carries on. Only changed carrier statuses
// are written.
//
// ============================================================================

const DEFAULT_TRACK_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SWEEP_CONCURRENCY: usize = 4;

/// Per-order outcome counts of one tracking sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub checked: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Tracking answer for the order and AWB queries
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentView {
    pub order_id: Uuid,
    pub order_status: OrderStatus,
    pub tracking: TrackingSnapshot,
}

enum SyncOutcome {
    Updated,
    Unchanged,
    Failed,
}

pub struct ShipmentService {
    orders: Arc<dyn OrderRepository>,
    carrier: Arc<dyn CarrierClient>,
    pickup_location: String,
    track_timeout: Duration,
    sweep_concurrency: usize,
    locks: KeyedLocks,
    metrics: Arc<Metrics>,
}

impl ShipmentService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        carrier: Arc<dyn CarrierClient>,
        pickup_location: impl Into<String>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            orders,
            carrier,
            pickup_location: pickup_location.into(),
            track_timeout: DEFAULT_TRACK_TIMEOUT,
            sweep_concurrency: DEFAULT_SWEEP_CONCURRENCY,
            locks: KeyedLocks::new(),
            metrics,
        }
    }

    /// Upper bound for one tracking call (retries included) and the number
    /// of AWBs polled at once during a sweep
    pub fn with_sweep_limits(mut self, track_timeout: Duration, concurrency: usize) -> Self {
        self.track_timeout = track_timeout;
        self.sweep_concurrency = concurrency.max(1);
        self
    }

    // ========================================================================
    // Booking
    // ========================================================================

    pub async fn create_shipment(&self, order_id: Uuid, customer: CustomerContact) -> AppResult<ShipmentReceipt> {
        if customer.name.trim().is_empty() || customer.phone.trim().is_empty() {
            return Err(AppError::Validation(
                "Customer name and phone are required for shipping".to_string(),
            ));
        }

        let _guard = self.locks.lock(&order_id.to_string()).await;

        let order = self.find_order(order_id).await?;
        let request = ShipmentRequest::for_order(&order, customer, &self.pickup_location)?;

        let receipt = match self.carrier.create_shipment(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.metrics.record_shipment(false);
                error!(order_id = %order.id, error = %e, "❌ Shipment creation failed");
                return Err(e.into());
            }
        };

        match self.orders.record_shipment(order.id, &receipt.awb_number).await {
            Ok(true) => {}
            Ok(false) => {
                // Only reachable when another process booked in parallel
                error!(
                    order_id = %order.id,
                    awb = %receipt.awb_number,
                    "Carrier booked a second shipment for this order, cancel it manually"
                );
                return Err(OrderError::ShipmentAlreadyCreated.into());
            }
            Err(e) => {
                error!(
                    order_id = %order.id,
                    awb = %receipt.awb_number,
                    error = ?e,
                    "Shipment booked but AWB could not be stored"
                );
                return Err(e.into());
            }
        }

        self.metrics.record_shipment(true);
        info!(
            order_id = %order.id,
            awb = %receipt.awb_number,
            courier = receipt.courier_name.as_deref().unwrap_or("-"),
            "🚚 Shipment created"
        );
        Ok(receipt)
    }

    // ========================================================================
    // Tracking queries
    // ========================================================================

    pub async fn track_order(&self, order_id: Uuid) -> AppResult<ShipmentView> {
        let order = self.find_order(order_id).await?;
        self.track(order).await
    }

    pub async fn track_awb(&self, awb: &str) -> AppResult<ShipmentView> {
        let order = self
            .orders
            .find_by_awb(awb.trim())
            .await?
            .ok_or_else(|| AppError::not_found("Shipment with AWB", awb))?;
        self.track(order).await
    }

    /// Live carrier state for one order. The fresh status is recorded the
    /// same way the sweep records it.
    async fn track(&self, order: Order) -> AppResult<ShipmentView> {
        if !order.tracking.is_trackable() {
            return Err(AppError::NotFound(format!("Order {} has no shipment", order.id)));
        }
        let awb = order.tracking.awb_number.as_deref().unwrap_or_default();

        let snapshot = self.fetch_tracking(awb).await?;
        let order_status = match self
            .apply_snapshot(order.id, order.status, &order.tracking, &snapshot)
            .await?
        {
            Some(TrackingUpdate {
                order_status: Some(next),
                ..
            }) => next,
            _ => order.status,
        };

        Ok(ShipmentView {
            order_id: order.id,
            order_status,
            tracking: snapshot,
        })
    }

    // ========================================================================
    // Tracking sweep
    // ========================================================================

    pub async fn sync_tracking(&self) -> AppResult<SweepReport> {
        let shipments = self.orders.list_tracked_shipments().await?;
        let mut report = SweepReport {
            checked: shipments.len(),
            ..SweepReport::default()
        };

        let mut outcomes = stream::iter(shipments)
            .map(|shipment| async move { self.sync_one(&shipment).await })
            .buffer_unordered(self.sweep_concurrency);

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                SyncOutcome::Updated => report.updated += 1,
                SyncOutcome::Unchanged => report.unchanged += 1,
                SyncOutcome::Failed => report.failed += 1,
            }
        }

        self.metrics
            .record_tracking_sweep(report.updated, report.unchanged, report.failed);
        self.metrics
            .update_carrier_circuit_state(self.carrier.circuit_state().as_gauge());
        Ok(report)
    }

    async fn sync_one(&self, shipment: &TrackedShipment) -> SyncOutcome {
        let awb = shipment.awb();

        let snapshot = match self.fetch_tracking(awb).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(order_id = %shipment.order_id, awb = %awb, error = %e, "Tracking poll failed, skipping");
                return SyncOutcome::Failed;
            }
        };

        match self
            .apply_snapshot(shipment.order_id, shipment.status, &shipment.tracking, &snapshot)
            .await
        {
            Ok(Some(_)) => SyncOutcome::Updated,
            Ok(None) => SyncOutcome::Unchanged,
            Err(e) => {
                error!(order_id = %shipment.order_id, awb = %awb, error = ?e, "Failed to store tracking update");
                SyncOutcome::Failed
            }
        }
    }

    async fn fetch_tracking(&self, awb: &str) -> Result<TrackingSnapshot, CarrierError> {
        match tokio::time::timeout(self.track_timeout, self.carrier.track(awb)).await {
            Ok(result) => result,
            Err(_) => Err(CarrierError::Timeout),
        }
    }

    /// Write the snapshot when the carrier status moved. `None` means
    /// nothing was written.
    async fn apply_snapshot(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        tracking: &ShipmentTracking,
        snapshot: &TrackingSnapshot,
    ) -> anyhow::Result<Option<TrackingUpdate>> {
        let Some(update) = reconcile_tracking(status, tracking, snapshot) else {
            debug!(order_id = %order_id, awb = %snapshot.awb_number, "Carrier status unchanged");
            return Ok(None);
        };

        self.orders
            .update_tracking(order_id, &update.tracking, update.order_status)
            .await?;

        info!(
            order_id = %order_id,
            awb = %snapshot.awb_number,
            carrier_status = update.tracking.last_status.as_deref().unwrap_or_default(),
            order_status = ?update.order_status,
            "Tracking updated"
        );
        Ok(Some(update))
    }

    async fn find_order(&self, order_id: Uuid) -> AppResult<Order> {
        self.orders
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order", order_id))
    }
}
