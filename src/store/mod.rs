use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::catalog::{BindingOption, CatalogKey, DiscountRule, ServiceCombination};
use crate::domain::order::{Order, OrderStatus, ShipmentTracking};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::print_job::{PrintJob, PrintJobStatus};
use crate::domain::shipment::TrackedShipment;
use crate::domain::Money;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

// ============================================================================
// Repository Traits
// ============================================================================
//
// One trait per aggregate. Services only see these traits; `PgStore`
// implements them against PostgreSQL and `MemoryStore` keeps everything in
// process for tests.
//
// Infrastructure failures come back as `anyhow::Error`. "Not found" is
// `Ok(None)` / `Ok(false)`, never an error.
//
// ============================================================================

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_combination(&self, key: &CatalogKey) -> Result<Option<ServiceCombination>>;

    /// Rules for `key` with `min_pages <= pages`, largest threshold first,
    /// admin position breaking ties
    async fn qualifying_discounts(&self, key: &CatalogKey, pages: u32) -> Result<Vec<DiscountRule>>;

    /// Binding type names are compared ignoring case and surrounding spaces
    async fn find_binding(&self, binding_type: &str) -> Result<Option<BindingOption>>;

    async fn save_combination(&self, combination: &ServiceCombination) -> Result<()>;
    async fn save_discount(&self, rule: &DiscountRule) -> Result<()>;
    async fn save_binding(&self, binding: &BindingOption) -> Result<()>;
}

/// Uploaded document as seen by the order flow. The blob itself lives in an
/// external store; only its URL is kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub url: String,
    pub pages: u32,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn find_file(&self, id: Uuid) -> Result<Option<StoredFile>>;
    async fn insert_file(&self, file: &StoredFile) -> Result<()>;
    /// Whether any print job still points at the file
    async fn is_referenced(&self, id: Uuid) -> Result<bool>;
    async fn delete_file(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Order and its print jobs in one transaction
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Order with its print jobs loaded
    async fn find_order(&self, id: Uuid) -> Result<Option<Order>>;
    async fn find_by_awb(&self, awb: &str) -> Result<Option<Order>>;
    async fn find_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>>;

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<bool>;

    /// Store the AWB and set `shipping_created`, only if no shipment was
    /// recorded yet. Returns `false` when another caller got there first.
    async fn record_shipment(&self, id: Uuid, awb: &str) -> Result<bool>;

    /// Persist a tracking poll result, with an optional status move
    async fn update_tracking(
        &self,
        id: Uuid,
        tracking: &ShipmentTracking,
        status: Option<OrderStatus>,
    ) -> Result<()>;

    /// Orders with `shipping_created` and a non-empty AWB
    async fn list_tracked_shipments(&self) -> Result<Vec<TrackedShipment>>;

    async fn find_print_job(&self, id: Uuid) -> Result<Option<PrintJob>>;
    async fn update_job_status(&self, id: Uuid, status: PrintJobStatus) -> Result<bool>;

    /// Deletes the order's print jobs, then the order
    async fn delete_order(&self, id: Uuid) -> Result<bool>;
}

/// Admin report row: an order whose payment failed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedPaymentOrder {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub order_status: OrderStatus,
    pub total: Money,
    pub razorpay_order_id: String,
    pub payment_status: PaymentStatus,
    pub payment_updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert unless a payment for the gateway order exists. Returns whether
    /// a row was written.
    async fn insert_payment(&self, payment: &Payment) -> Result<bool>;

    async fn find_payment(&self, gateway_order_id: &str) -> Result<Option<Payment>>;

    /// Overwrite status, gateway payment id and amount
    async fn save_payment_state(&self, payment: &Payment) -> Result<()>;

    /// Attach the order if the payment is unlinked or already linked to it.
    /// Returns `false` when the payment is missing or linked elsewhere.
    async fn link_order(&self, gateway_order_id: &str, order_id: Uuid) -> Result<bool>;

    async fn unlinked_payments(&self) -> Result<Vec<Payment>>;

    /// SUCCESS payments that no order ever claimed
    async fn orphaned_payments(&self) -> Result<Vec<Payment>>;

    async fn orders_with_failed_payments(&self) -> Result<Vec<FailedPaymentOrder>>;
}
