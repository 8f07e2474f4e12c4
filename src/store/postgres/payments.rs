use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::domain::payment::Payment;
use crate::domain::Money;
use crate::store::{FailedPaymentOrder, PaymentRepository};

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    razorpay_order_id: String,
    razorpay_payment_id: Option<String>,
    amount: Money,
    status: String,
    order_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = anyhow::Error;

    fn try_from(row: PaymentRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            razorpay_order_id: row.razorpay_order_id,
            razorpay_payment_id: row.razorpay_payment_id,
            amount: row.amount,
            status: row.status.parse().map_err(anyhow::Error::msg)?,
            order_id: row.order_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FailedPaymentRow {
    order_id: Uuid,
    user_id: Uuid,
    order_status: String,
    total: Money,
    razorpay_order_id: String,
    payment_status: String,
    payment_updated_at: DateTime<Utc>,
}

impl TryFrom<FailedPaymentRow> for FailedPaymentOrder {
    type Error = anyhow::Error;

    fn try_from(row: FailedPaymentRow) -> Result<Self> {
        Ok(Self {
            order_id: row.order_id,
            user_id: row.user_id,
            order_status: row.order_status.parse().map_err(anyhow::Error::msg)?,
            total: row.total,
            razorpay_order_id: row.razorpay_order_id,
            payment_status: row.payment_status.parse().map_err(anyhow::Error::msg)?,
            payment_updated_at: row.payment_updated_at,
        })
    }
}

const PAYMENT_COLUMNS: &str = "id, razorpay_order_id, razorpay_payment_id, amount, status, \
                               order_id, created_at, updated_at";

impl PgStore {
    async fn fetch_payments(&self, filter: &str) -> Result<Vec<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments WHERE {} ORDER BY created_at",
            PAYMENT_COLUMNS, filter
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Payment::try_from).collect()
    }
}

#[async_trait]
impl PaymentRepository for PgStore {
    async fn insert_payment(&self, payment: &Payment) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO payments (
                id, razorpay_order_id, razorpay_payment_id, amount, status,
                order_id, created_at, updated_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (razorpay_order_id) DO NOTHING",
        )
        .bind(payment.id)
        .bind(&payment.razorpay_order_id)
        .bind(payment.razorpay_payment_id.as_deref())
        .bind(payment.amount)
        .bind(payment.status.as_str())
        .bind(payment.order_id)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_payment(&self, gateway_order_id: &str) -> Result<Option<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments WHERE razorpay_order_id = $1",
            PAYMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Payment::try_from).transpose()
    }

    async fn save_payment_state(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            "UPDATE payments
             SET status = $1, razorpay_payment_id = $2, amount = $3, updated_at = $4
             WHERE razorpay_order_id = $5",
        )
        .bind(payment.status.as_str())
        .bind(payment.razorpay_payment_id.as_deref())
        .bind(payment.amount)
        .bind(payment.updated_at)
        .bind(&payment.razorpay_order_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn link_order(&self, gateway_order_id: &str, order_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE payments
             SET order_id = $1,
                 updated_at = CASE WHEN order_id IS NULL THEN now() ELSE updated_at END
             WHERE razorpay_order_id = $2 AND (order_id IS NULL OR order_id = $1)",
        )
        .bind(order_id)
        .bind(gateway_order_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn unlinked_payments(&self) -> Result<Vec<Payment>> {
        self.fetch_payments("order_id IS NULL").await
    }

    async fn orphaned_payments(&self) -> Result<Vec<Payment>> {
        self.fetch_payments("order_id IS NULL AND status = 'SUCCESS'").await
    }

    async fn orders_with_failed_payments(&self) -> Result<Vec<FailedPaymentOrder>> {
        let rows = sqlx::query_as::<_, FailedPaymentRow>(
            "SELECT o.id AS order_id, o.user_id, o.status AS order_status, o.total,
                    p.razorpay_order_id, p.status AS payment_status,
                    p.updated_at AS payment_updated_at
             FROM payments p
             JOIN orders o ON o.razorpay_order_id = p.razorpay_order_id
             WHERE p.status = 'FAILED'
             ORDER BY p.updated_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FailedPaymentOrder::try_from).collect()
    }
}
