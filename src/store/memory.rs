use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{
    CatalogRepository, FailedPaymentOrder, FileRepository, OrderRepository, PaymentRepository,
    StoredFile,
};
use crate::domain::catalog::{BindingOption, CatalogKey, DiscountRule, ServiceCombination};
use crate::domain::order::{Order, OrderStatus, ShipmentTracking};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::print_job::{PrintJob, PrintJobStatus};
use crate::domain::shipment::TrackedShipment;

// ============================================================================
// In-Memory Store
// ============================================================================
//
// Implements every repository trait over plain maps. Used by service tests
// and for running without a database. `writes()` counts mutations that
// actually changed something, which is how idempotence is asserted.
//
// ============================================================================

#[derive(Default)]
struct Tables {
    combinations: HashMap<CatalogKey, ServiceCombination>,
    discounts: Vec<DiscountRule>,
    bindings: HashMap<String, BindingOption>,
    files: HashMap<Uuid, StoredFile>,
    orders: HashMap<Uuid, Order>,
    payments: HashMap<String, Payment>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutations applied so far
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn find_combination(&self, key: &CatalogKey) -> Result<Option<ServiceCombination>> {
        Ok(self.tables().combinations.get(key).cloned())
    }

    async fn qualifying_discounts(&self, key: &CatalogKey, pages: u32) -> Result<Vec<DiscountRule>> {
        let mut rules: Vec<DiscountRule> = self
            .tables()
            .discounts
            .iter()
            .filter(|r| r.key == *key && r.applies_to(pages))
            .cloned()
            .collect();
        rules.sort_by(|a, b| {
            b.min_pages
                .cmp(&a.min_pages)
                .then(a.position.cmp(&b.position))
        });
        Ok(rules)
    }

    async fn find_binding(&self, binding_type: &str) -> Result<Option<BindingOption>> {
        Ok(self
            .tables()
            .bindings
            .get(&binding_type.trim().to_ascii_uppercase())
            .cloned())
    }

    async fn save_combination(&self, combination: &ServiceCombination) -> Result<()> {
        self.tables()
            .combinations
            .insert(combination.key, combination.clone());
        self.wrote();
        Ok(())
    }

    async fn save_discount(&self, rule: &DiscountRule) -> Result<()> {
        let mut tables = self.tables();
        tables.discounts.retain(|r| r.id != rule.id);
        tables.discounts.push(rule.clone());
        self.wrote();
        Ok(())
    }

    async fn save_binding(&self, binding: &BindingOption) -> Result<()> {
        self.tables()
            .bindings
            .insert(binding.binding_type.trim().to_ascii_uppercase(), binding.clone());
        self.wrote();
        Ok(())
    }
}

#[async_trait]
impl FileRepository for MemoryStore {
    async fn find_file(&self, id: Uuid) -> Result<Option<StoredFile>> {
        Ok(self.tables().files.get(&id).cloned())
    }

    async fn insert_file(&self, file: &StoredFile) -> Result<()> {
        self.tables().files.insert(file.id, file.clone());
        self.wrote();
        Ok(())
    }

    async fn is_referenced(&self, id: Uuid) -> Result<bool> {
        Ok(self
            .tables()
            .orders
            .values()
            .flat_map(|o| o.print_jobs.iter())
            .any(|j| j.file_id == id))
    }

    async fn delete_file(&self, id: Uuid) -> Result<bool> {
        let removed = self.tables().files.remove(&id).is_some();
        if removed {
            self.wrote();
        }
        Ok(removed)
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut tables = self.tables();
        if tables.orders.contains_key(&order.id) {
            bail!("order {} already exists", order.id);
        }
        tables.orders.insert(order.id, order.clone());
        self.wrote();
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.tables().orders.get(&id).cloned())
    }

    async fn find_by_awb(&self, awb: &str) -> Result<Option<Order>> {
        Ok(self
            .tables()
            .orders
            .values()
            .find(|o| o.tracking.awb_number.as_deref() == Some(awb))
            .cloned())
    }

    async fn find_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>> {
        Ok(self
            .tables()
            .orders
            .values()
            .filter(|o| o.razorpay_order_id.as_deref() == Some(gateway_order_id))
            .min_by_key(|o| o.created_at)
            .cloned())
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<bool> {
        let mut tables = self.tables();
        let Some(order) = tables.orders.get_mut(&id) else {
            return Ok(false);
        };
        order.status = status;
        order.updated_at = Utc::now();
        self.wrote();
        Ok(true)
    }

    async fn record_shipment(&self, id: Uuid, awb: &str) -> Result<bool> {
        let mut tables = self.tables();
        match tables.orders.get_mut(&id) {
            Some(order) if !order.tracking.shipping_created => {
                order.tracking.awb_number = Some(awb.to_string());
                order.tracking.shipping_created = true;
                order.updated_at = Utc::now();
                self.wrote();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_tracking(
        &self,
        id: Uuid,
        tracking: &ShipmentTracking,
        status: Option<OrderStatus>,
    ) -> Result<()> {
        let mut tables = self.tables();
        let Some(order) = tables.orders.get_mut(&id) else {
            bail!("order {} not found", id);
        };
        order.tracking = tracking.clone();
        if let Some(status) = status {
            order.status = status;
        }
        order.updated_at = Utc::now();
        self.wrote();
        Ok(())
    }

    async fn list_tracked_shipments(&self) -> Result<Vec<TrackedShipment>> {
        let tables = self.tables();
        let mut orders: Vec<&Order> = tables
            .orders
            .values()
            .filter(|o| o.tracking.is_trackable())
            .collect();
        orders.sort_by_key(|o| o.created_at);

        Ok(orders
            .into_iter()
            .map(|o| TrackedShipment {
                order_id: o.id,
                status: o.status,
                tracking: o.tracking.clone(),
            })
            .collect())
    }

    async fn find_print_job(&self, id: Uuid) -> Result<Option<PrintJob>> {
        Ok(self
            .tables()
            .orders
            .values()
            .flat_map(|o| o.print_jobs.iter())
            .find(|j| j.id == id)
            .cloned())
    }

    async fn update_job_status(&self, id: Uuid, status: PrintJobStatus) -> Result<bool> {
        let mut tables = self.tables();
        let job = tables
            .orders
            .values_mut()
            .flat_map(|o| o.print_jobs.iter_mut())
            .find(|j| j.id == id);

        match job {
            Some(job) => {
                job.status = status;
                self.wrote();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_order(&self, id: Uuid) -> Result<bool> {
        let removed = self.tables().orders.remove(&id).is_some();
        if removed {
            self.wrote();
        }
        Ok(removed)
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn insert_payment(&self, payment: &Payment) -> Result<bool> {
        let mut tables = self.tables();
        if tables.payments.contains_key(&payment.razorpay_order_id) {
            return Ok(false);
        }
        tables
            .payments
            .insert(payment.razorpay_order_id.clone(), payment.clone());
        self.wrote();
        Ok(true)
    }

    async fn find_payment(&self, gateway_order_id: &str) -> Result<Option<Payment>> {
        Ok(self.tables().payments.get(gateway_order_id).cloned())
    }

    async fn save_payment_state(&self, payment: &Payment) -> Result<()> {
        let mut tables = self.tables();
        let Some(stored) = tables.payments.get_mut(&payment.razorpay_order_id) else {
            bail!("payment for {} not found", payment.razorpay_order_id);
        };
        stored.status = payment.status;
        stored.razorpay_payment_id = payment.razorpay_payment_id.clone();
        stored.amount = payment.amount;
        stored.updated_at = payment.updated_at;
        self.wrote();
        Ok(())
    }

    async fn link_order(&self, gateway_order_id: &str, order_id: Uuid) -> Result<bool> {
        let mut tables = self.tables();
        match tables.payments.get_mut(gateway_order_id) {
            Some(payment) if payment.order_id.is_none() => {
                payment.order_id = Some(order_id);
                payment.updated_at = Utc::now();
                self.wrote();
                Ok(true)
            }
            Some(payment) => Ok(payment.order_id == Some(order_id)),
            None => Ok(false),
        }
    }

    async fn unlinked_payments(&self) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .tables()
            .payments
            .values()
            .filter(|p| p.order_id.is_none())
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    async fn orphaned_payments(&self) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .tables()
            .payments
            .values()
            .filter(|p| p.is_orphaned())
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    async fn orders_with_failed_payments(&self) -> Result<Vec<FailedPaymentOrder>> {
        let tables = self.tables();
        let mut rows: Vec<FailedPaymentOrder> = tables
            .payments
            .values()
            .filter(|p| p.status == PaymentStatus::Failed)
            .flat_map(|p| {
                tables
                    .orders
                    .values()
                    .filter(|o| o.razorpay_order_id.as_deref() == Some(p.razorpay_order_id.as_str()))
                    .map(move |o| FailedPaymentOrder {
                        order_id: o.id,
                        user_id: o.user_id,
                        order_status: o.status,
                        total: o.total,
                        razorpay_order_id: p.razorpay_order_id.clone(),
                        payment_status: p.status,
                        payment_updated_at: p.updated_at,
                    })
            })
            .collect();
        rows.sort_by_key(|r| r.payment_updated_at);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{ColorMode, PaperQuality, PaperSize, PrintSide};
    use rust_decimal::Decimal;

    fn key() -> CatalogKey {
        CatalogKey::new(ColorMode::Color, PaperSize::A4, PaperQuality::Gsm80, PrintSide::Single)
    }

    #[tokio::test]
    async fn test_discounts_ordered_by_threshold_then_position() {
        let store = MemoryStore::new();
        let low = DiscountRule::new(key(), 10, Decimal::new(25, 2), 0).unwrap();
        let high_second = DiscountRule::new(key(), 50, Decimal::new(50, 2), 2).unwrap();
        let high_first = DiscountRule::new(key(), 50, Decimal::ONE, 1).unwrap();
        let too_high = DiscountRule::new(key(), 100, Decimal::TWO, 0).unwrap();
        for rule in [&low, &high_second, &high_first, &too_high] {
            store.save_discount(rule).await.unwrap();
        }

        let rules = store.qualifying_discounts(&key(), 60).await.unwrap();
        let ids: Vec<Uuid> = rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![high_first.id, high_second.id, low.id]);
    }

    #[tokio::test]
    async fn test_link_order_is_conditional() {
        let store = MemoryStore::new();
        store
            .insert_payment(&Payment::pending("rzp_1", Decimal::ONE))
            .await
            .unwrap();

        let order = Uuid::new_v4();
        assert!(store.link_order("rzp_1", order).await.unwrap());
        let writes = store.writes();

        assert!(store.link_order("rzp_1", order).await.unwrap());
        assert!(!store.link_order("rzp_1", Uuid::new_v4()).await.unwrap());
        assert!(!store.link_order("rzp_missing", order).await.unwrap());
        assert_eq!(store.writes(), writes);
    }

    #[tokio::test]
    async fn test_duplicate_payment_insert_is_ignored() {
        let store = MemoryStore::new();
        assert!(store
            .insert_payment(&Payment::pending("rzp_1", Decimal::ONE))
            .await
            .unwrap());
        assert!(!store
            .insert_payment(&Payment::pending("rzp_1", Decimal::TWO))
            .await
            .unwrap());

        let stored = store.find_payment("rzp_1").await.unwrap().unwrap();
        assert_eq!(stored.amount, Decimal::ONE);
    }
}
