use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::commands::PlaceOrder;
use super::errors::OrderError;
use super::value_objects::{
    DeliveryType, OrderStatus, ShipmentTracking, ShippingAddress, TransitionMode,
};
use crate::domain::print_job::{PrintJob, PrintJobStatus, PrintOptions};
use crate::domain::Money;

// ============================================================================
// Order Aggregate
// ============================================================================

/// A print job request after its file has been resolved
#[derive(Debug, Clone)]
pub struct ResolvedJob {
    pub file_id: Uuid,
    pub pages: u32,
    pub options: PrintOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    // Identity
    pub id: Uuid,
    pub user_id: Uuid,

    pub status: OrderStatus,
    pub delivery_type: DeliveryType,
    pub address: Option<ShippingAddress>,
    pub total: Money,

    /// File-id groups bound together; only affects invoice layout
    pub binding_groups: Option<Vec<Vec<Uuid>>>,
    /// Gateway order this order was paid through, if any
    pub razorpay_order_id: Option<String>,
    pub tracking: ShipmentTracking,

    /// Owned jobs, in placement order
    pub print_jobs: Vec<PrintJob>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a PENDING order with every job QUEUED
    pub fn place(
        user_id: Uuid,
        command: &PlaceOrder,
        jobs: Vec<ResolvedJob>,
    ) -> Result<Self, OrderError> {
        command.validate()?;

        let id = Uuid::now_v7();
        let mut print_jobs = Vec::with_capacity(jobs.len());
        for job in jobs {
            if job.pages == 0 {
                return Err(OrderError::EmptyFile(job.file_id));
            }
            let queued = PrintJob::queued(job.file_id, user_id, id, job.pages, &job.options)
                .map_err(|e| OrderError::OptionsEncoding(e.to_string()))?;
            print_jobs.push(queued);
        }

        let now = Utc::now();
        Ok(Self {
            id,
            user_id,
            status: OrderStatus::Pending,
            delivery_type: command.delivery_type,
            address: command.address.clone(),
            total: command.total,
            binding_groups: command.normalized_binding_groups(),
            razorpay_order_id: command
                .razorpay_order_id
                .as_ref()
                .map(|id| id.trim().to_string()),
            tracking: ShipmentTracking::default(),
            print_jobs,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a status change. Returns `false` when the order already has
    /// `next`, so callers can skip the write.
    pub fn transition(&mut self, next: OrderStatus, mode: TransitionMode) -> Result<bool, OrderError> {
        if self.status == next {
            return Ok(false);
        }

        if mode == TransitionMode::Forward && !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.updated_at = Utc::now();
        Ok(true)
    }

    pub fn total_pages(&self) -> u32 {
        self.print_jobs.iter().map(|j| j.pages).sum()
    }

    /// Prepaid when the order went through the payment gateway
    pub fn is_prepaid(&self) -> bool {
        self.razorpay_order_id.is_some()
    }

    /// Preconditions for booking a carrier shipment
    pub fn ensure_shippable(&self) -> Result<&ShippingAddress, OrderError> {
        if self.tracking.shipping_created {
            return Err(OrderError::ShipmentAlreadyCreated);
        }
        if self.delivery_type != DeliveryType::Delivery {
            return Err(OrderError::NotShippable("order is for pickup"));
        }
        if self.status.is_terminal() {
            return Err(OrderError::NotShippable("order is closed"));
        }
        self.address
            .as_ref()
            .ok_or(OrderError::NotShippable("order has no shipping address"))
    }

    pub fn can_be_deleted(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Cancelled)
    }
}

/// Check a print job status change against the job lifecycle
pub fn check_job_transition(from: PrintJobStatus, to: PrintJobStatus) -> Result<(), OrderError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(OrderError::InvalidJobTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{ColorMode, PaperQuality, PaperSize, PrintSide};
    use crate::domain::order::PrintJobRequest;
    use rust_decimal::Decimal;

    fn options() -> PrintOptions {
        PrintOptions {
            color: ColorMode::BlackWhite,
            paper_size: PaperSize::A4,
            paper_quality: PaperQuality::Gsm70,
            side: PrintSide::Double,
            binding: None,
        }
    }

    fn pickup_command(file_id: Uuid) -> PlaceOrder {
        PlaceOrder {
            delivery_type: DeliveryType::Pickup,
            address: None,
            print_jobs: vec![PrintJobRequest { file_id, options: options() }],
            total: Decimal::new(5000, 2),
            binding_groups: None,
            razorpay_order_id: Some(" order_abc ".to_string()),
        }
    }

    fn placed() -> Order {
        let file_id = Uuid::new_v4();
        Order::place(
            Uuid::new_v4(),
            &pickup_command(file_id),
            vec![ResolvedJob { file_id, pages: 10, options: options() }],
        )
        .unwrap()
    }

    #[test]
    fn test_place_order_starts_pending_with_queued_jobs() {
        let order = placed();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.print_jobs.len(), 1);
        assert_eq!(order.print_jobs[0].status, PrintJobStatus::Queued);
        assert_eq!(order.print_jobs[0].order_id, Some(order.id));
        assert_eq!(order.razorpay_order_id.as_deref(), Some("order_abc"));
        assert_eq!(order.total_pages(), 10);
        assert!(order.is_prepaid());
    }

    #[test]
    fn test_zero_page_file_rejected() {
        let file_id = Uuid::new_v4();
        let result = Order::place(
            Uuid::new_v4(),
            &pickup_command(file_id),
            vec![ResolvedJob { file_id, pages: 0, options: options() }],
        );
        assert_eq!(result.unwrap_err(), OrderError::EmptyFile(file_id));
    }

    #[test]
    fn test_forward_transition_and_noop() {
        let mut order = placed();
        assert_eq!(order.transition(OrderStatus::Processing, TransitionMode::Forward), Ok(true));
        assert_eq!(order.transition(OrderStatus::Processing, TransitionMode::Forward), Ok(false));
    }

    #[test]
    fn test_backward_transition_needs_override() {
        let mut order = placed();
        order.transition(OrderStatus::Completed, TransitionMode::Forward).unwrap();

        let err = order.transition(OrderStatus::Pending, TransitionMode::Forward).unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidStatusTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::Pending
            }
        );

        assert_eq!(order.transition(OrderStatus::Pending, TransitionMode::AdminOverride), Ok(true));
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_pickup_order_is_not_shippable() {
        let order = placed();
        assert_eq!(
            order.ensure_shippable().unwrap_err(),
            OrderError::NotShippable("order is for pickup")
        );
    }

    #[test]
    fn test_shipment_is_one_shot() {
        let mut order = placed();
        order.tracking.shipping_created = true;
        assert_eq!(order.ensure_shippable().unwrap_err(), OrderError::ShipmentAlreadyCreated);
    }

    #[test]
    fn test_job_transition_check() {
        assert!(check_job_transition(PrintJobStatus::Queued, PrintJobStatus::Printing).is_ok());
        assert!(check_job_transition(PrintJobStatus::Completed, PrintJobStatus::Queued).is_err());
    }
}
