use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::payments::{LinkOutcome, PaymentService};
use crate::domain::order::{
    check_job_transition, group_for_invoice, InvoiceGroupKind, Order, OrderError, OrderStatus,
    PlaceOrder, ResolvedJob, TransitionMode,
};
use crate::domain::print_job::{PrintJob, PrintJobStatus, PrintOptions};
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::store::{FileRepository, OrderRepository};

/// One invoice block, detached from the order it was computed from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceBlock {
    pub label: String,
    pub kind: InvoiceGroupKind,
    pub options: Option<PrintOptions>,
    pub job_ids: Vec<Uuid>,
    pub pages: u32,
}

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    files: Arc<dyn FileRepository>,
    payments: Arc<PaymentService>,
    metrics: Arc<Metrics>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        files: Arc<dyn FileRepository>,
        payments: Arc<PaymentService>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            orders,
            files,
            payments,
            metrics,
        }
    }

    /// Validate, persist as PENDING with QUEUED jobs, then try to attach the
    /// gateway payment. A payment that is not there yet does not fail the
    /// order.
    pub async fn place_order(&self, user_id: Uuid, command: PlaceOrder) -> AppResult<Order> {
        command.validate()?;

        let mut jobs = Vec::with_capacity(command.print_jobs.len());
        for request in &command.print_jobs {
            let file = self
                .files
                .find_file(request.file_id)
                .await?
                .filter(|f| f.user_id == user_id)
                .ok_or_else(|| AppError::not_found("File", request.file_id))?;

            jobs.push(ResolvedJob {
                file_id: file.id,
                pages: file.pages,
                options: request.options.clone(),
            });
        }

        let order = Order::place(user_id, &command, jobs)?;
        self.orders.insert_order(&order).await?;
        self.metrics.orders_placed_total.inc();

        info!(
            order_id = %order.id,
            user_id = %user_id,
            jobs = order.print_jobs.len(),
            total = %order.total,
            "📦 Order placed"
        );

        if let Some(gateway_order_id) = &order.razorpay_order_id {
            match self.payments.link_order_payment(order.id, gateway_order_id).await {
                Ok(LinkOutcome::LinkedElsewhere) => warn!(
                    order_id = %order.id,
                    razorpay_order_id = %gateway_order_id,
                    "Order references a payment owned by another order"
                ),
                Ok(_) => {}
                Err(e) => warn!(
                    order_id = %order.id,
                    razorpay_order_id = %gateway_order_id,
                    error = %e,
                    "Payment link failed, reconciliation will retry"
                ),
            }
        }

        Ok(order)
    }

    pub async fn get_order(&self, order_id: Uuid) -> AppResult<Order> {
        self.orders
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order", order_id))
    }

    /// The order as seen by its owner; other callers get `NotFound`
    pub async fn customer_order(&self, user_id: Uuid, order_id: Uuid) -> AppResult<Order> {
        self.orders
            .find_order(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| AppError::not_found("Order", order_id))
    }

    pub async fn change_status(
        &self,
        order_id: Uuid,
        next: OrderStatus,
        admin_override: bool,
    ) -> AppResult<Order> {
        let mut order = self.get_order(order_id).await?;
        let mode = if admin_override {
            TransitionMode::AdminOverride
        } else {
            TransitionMode::Forward
        };

        let previous = order.status;
        if order.transition(next, mode)? {
            self.orders.update_status(order.id, next).await?;
            info!(
                order_id = %order.id,
                from = %previous,
                to = %next,
                admin_override,
                "Order status changed"
            );
        }
        Ok(order)
    }

    pub async fn update_job_status(&self, job_id: Uuid, next: PrintJobStatus) -> AppResult<PrintJob> {
        let mut job = self
            .orders
            .find_print_job(job_id)
            .await?
            .ok_or_else(|| AppError::not_found("Print job", job_id))?;

        if job.status == next {
            return Ok(job);
        }
        check_job_transition(job.status, next)?;

        self.orders.update_job_status(job.id, next).await?;
        info!(
            job_id = %job.id,
            from = job.status.as_str(),
            to = next.as_str(),
            "Print job status changed"
        );
        job.status = next;
        Ok(job)
    }

    pub async fn invoice_groups(&self, order_id: Uuid) -> AppResult<Vec<InvoiceBlock>> {
        let order = self.get_order(order_id).await?;

        let blocks = group_for_invoice(&order.print_jobs, order.binding_groups.as_deref())
            .into_iter()
            .map(|group| InvoiceBlock {
                pages: group.pages(),
                job_ids: group.job_ids(),
                label: group.label,
                kind: group.kind,
                options: group.options,
            })
            .collect();
        Ok(blocks)
    }

    /// Delete a PENDING or CANCELLED order together with its print jobs
    pub async fn delete_order(&self, user_id: Uuid, order_id: Uuid) -> AppResult<()> {
        let order = self.customer_order(user_id, order_id).await?;
        if !order.can_be_deleted() {
            return Err(OrderError::NotDeletable.into());
        }

        if !self.orders.delete_order(order.id).await? {
            return Err(AppError::not_found("Order", order_id));
        }
        info!(order_id = %order.id, jobs = order.print_jobs.len(), "Order deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{GatewayError, GatewayOrder, PaymentGateway};
    use crate::domain::catalog::{ColorMode, PaperQuality, PaperSize, PrintSide};
    use crate::domain::order::{DeliveryType, PrintJobRequest};
    use crate::domain::payment::Payment;
    use crate::domain::Money;
    use crate::services::FileService;
    use crate::store::{MemoryStore, PaymentRepository, StoredFile};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;

    struct NoGateway;

    #[async_trait]
    impl PaymentGateway for NoGateway {
        async fn create_order(&self, _amount: Money, _receipt: &str) -> Result<GatewayOrder, GatewayError> {
            Err(GatewayError::Unavailable)
        }
    }

    fn service(store: Arc<MemoryStore>) -> OrderService {
        let metrics = Arc::new(Metrics::new().unwrap());
        let payments = Arc::new(PaymentService::new(
            store.clone(),
            store.clone(),
            Arc::new(NoGateway),
            "secret",
            metrics.clone(),
        ));
        OrderService::new(store.clone(), store, payments, metrics)
    }

    fn options(color: ColorMode) -> PrintOptions {
        PrintOptions {
            color,
            paper_size: PaperSize::A4,
            paper_quality: PaperQuality::Gsm80,
            side: PrintSide::Single,
            binding: None,
        }
    }

    async fn upload(store: &MemoryStore, user_id: Uuid, pages: u32) -> Uuid {
        let file = StoredFile {
            id: Uuid::new_v4(),
            user_id,
            filename: "notes.pdf".to_string(),
            url: "https://files.example/notes.pdf".to_string(),
            pages,
            created_at: Utc::now(),
        };
        store.insert_file(&file).await.unwrap();
        file.id
    }

    fn pickup(jobs: Vec<(Uuid, PrintOptions)>) -> PlaceOrder {
        PlaceOrder {
            delivery_type: DeliveryType::Pickup,
            address: None,
            print_jobs: jobs
                .into_iter()
                .map(|(file_id, options)| PrintJobRequest { file_id, options })
                .collect(),
            total: Decimal::new(24000, 2),
            binding_groups: None,
            razorpay_order_id: None,
        }
    }

    #[tokio::test]
    async fn test_place_order_persists_jobs_with_file_pages() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let file_id = upload(&store, user, 60).await;
        let service = service(store.clone());

        let order = service
            .place_order(user, pickup(vec![(file_id, options(ColorMode::Color))]))
            .await
            .unwrap();

        let loaded = service.get_order(order.id).await.unwrap();
        assert_eq!(loaded.status, OrderStatus::Pending);
        assert_eq!(loaded.total, Decimal::new(24000, 2));
        assert_eq!(loaded.print_jobs.len(), 1);
        assert_eq!(loaded.print_jobs[0].pages, 60);
        assert_eq!(loaded.print_jobs[0].status, PrintJobStatus::Queued);
    }

    #[tokio::test]
    async fn test_unknown_or_foreign_file_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let foreign = upload(&store, Uuid::new_v4(), 3).await;
        let service = service(store.clone());

        let err = service
            .place_order(user, pickup(vec![(foreign, options(ColorMode::Color))]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service
            .place_order(user, pickup(vec![(Uuid::new_v4(), options(ColorMode::Color))]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_place_order_links_existing_payment() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let file_id = upload(&store, user, 4).await;
        store
            .insert_payment(&Payment::pending("rzp_paid", Decimal::new(2000, 2)))
            .await
            .unwrap();
        let service = service(store.clone());

        let mut command = pickup(vec![(file_id, options(ColorMode::BlackWhite))]);
        command.razorpay_order_id = Some("rzp_paid".to_string());
        let order = service.place_order(user, command).await.unwrap();

        let payment = store.find_payment("rzp_paid").await.unwrap().unwrap();
        assert_eq!(payment.order_id, Some(order.id));
    }

    #[tokio::test]
    async fn test_order_placed_before_payment_still_succeeds() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let file_id = upload(&store, user, 4).await;
        let service = service(store.clone());

        let mut command = pickup(vec![(file_id, options(ColorMode::BlackWhite))]);
        command.razorpay_order_id = Some("rzp_later".to_string());

        let order = service.place_order(user, command).await.unwrap();
        assert_eq!(order.razorpay_order_id.as_deref(), Some("rzp_later"));
    }

    #[tokio::test]
    async fn test_status_changes_forward_only_unless_overridden() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let file_id = upload(&store, user, 2).await;
        let service = service(store.clone());
        let order = service
            .place_order(user, pickup(vec![(file_id, options(ColorMode::Color))]))
            .await
            .unwrap();

        service.change_status(order.id, OrderStatus::Completed, false).await.unwrap();

        let err = service
            .change_status(order.id, OrderStatus::Processing, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let reverted = service
            .change_status(order.id, OrderStatus::Processing, true)
            .await
            .unwrap();
        assert_eq!(reverted.status, OrderStatus::Processing);
        assert_eq!(
            service.get_order(order.id).await.unwrap().status,
            OrderStatus::Processing
        );
    }

    #[tokio::test]
    async fn test_job_lifecycle() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let file_id = upload(&store, user, 2).await;
        let service = service(store.clone());
        let order = service
            .place_order(user, pickup(vec![(file_id, options(ColorMode::Color))]))
            .await
            .unwrap();
        let job_id = order.print_jobs[0].id;

        let err = service
            .update_job_status(job_id, PrintJobStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        service.update_job_status(job_id, PrintJobStatus::Printing).await.unwrap();
        let done = service
            .update_job_status(job_id, PrintJobStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.status, PrintJobStatus::Completed);
    }

    #[tokio::test]
    async fn test_invoice_fallback_groups_by_options() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let a = upload(&store, user, 2).await;
        let b = upload(&store, user, 3).await;
        let c = upload(&store, user, 5).await;
        let service = service(store.clone());

        let order = service
            .place_order(
                user,
                pickup(vec![
                    (a, options(ColorMode::Color)),
                    (b, options(ColorMode::BlackWhite)),
                    (c, options(ColorMode::Color)),
                ]),
            )
            .await
            .unwrap();

        let blocks = service.invoice_groups(order.id).await.unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].label, "Print Group 1");
        assert_eq!(blocks[0].pages, 7);
        assert_eq!(blocks[1].pages, 3);
    }

    #[tokio::test]
    async fn test_delete_order_frees_its_files() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let file_id = upload(&store, user, 2).await;
        let service = service(store.clone());
        let files = FileService::new(store.clone());
        let order = service
            .place_order(user, pickup(vec![(file_id, options(ColorMode::Color))]))
            .await
            .unwrap();

        let err = files.delete_file(user, file_id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        service.delete_order(user, order.id).await.unwrap();
        assert!(store.find_print_job(order.print_jobs[0].id).await.unwrap().is_none());
        files.delete_file(user, file_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_processing_order_cannot_be_deleted() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let file_id = upload(&store, user, 2).await;
        let service = service(store.clone());
        let order = service
            .place_order(user, pickup(vec![(file_id, options(ColorMode::Color))]))
            .await
            .unwrap();
        service.change_status(order.id, OrderStatus::Processing, false).await.unwrap();

        let err = service.delete_order(user, order.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_other_users_order_is_hidden() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let file_id = upload(&store, owner, 2).await;
        let service = service(store.clone());
        let order = service
            .place_order(owner, pickup(vec![(file_id, options(ColorMode::Color))]))
            .await
            .unwrap();

        let err = service.customer_order(stranger, order.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = service.delete_order(stranger, order.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(service.customer_order(owner, order.id).await.unwrap().id, order.id);
    }
}
