use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use super::{to_i32, to_u32, PgStore};
use crate::domain::order::{DeliveryType, Order, OrderStatus, ShipmentTracking, ShippingAddress};
use crate::domain::print_job::{PrintJob, PrintJobStatus};
use crate::domain::shipment::TrackedShipment;
use crate::store::OrderRepository;

// ============================================================================
// Order Queries
// ============================================================================
//
// Orders are always read together with their print jobs through one LEFT
// JOIN, rows folded back into aggregates in `fold_orders`. Jobs keep their
// placement order through the `position` column.
//
// ============================================================================

const ORDER_SELECT: &str = "
    SELECT o.id, o.user_id, o.status, o.delivery_type, o.address, o.total,
           o.binding_groups, o.razorpay_order_id, o.awb_number, o.shipping_created,
           o.last_carrier_status, o.last_carrier_location, o.last_carrier_event_at,
           o.created_at, o.updated_at,
           j.id AS job_id, j.file_id AS job_file_id, j.user_id AS job_user_id,
           j.pages AS job_pages, j.options AS job_options, j.status AS job_status,
           j.created_at AS job_created_at
    FROM orders o
    LEFT JOIN print_jobs j ON j.order_id = o.id";

const ORDER_SORT: &str = "ORDER BY o.created_at, o.id, j.position";

fn parse_text<T>(value: String, field: &'static str) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}: {}", field, e))
}

fn tracking_from_row(row: &PgRow) -> Result<ShipmentTracking> {
    Ok(ShipmentTracking {
        awb_number: row.try_get("awb_number")?,
        shipping_created: row.try_get("shipping_created")?,
        last_status: row.try_get("last_carrier_status")?,
        last_location: row.try_get("last_carrier_location")?,
        last_event_at: row.try_get::<Option<NaiveDateTime>, _>("last_carrier_event_at")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order> {
    let address: Option<Json<ShippingAddress>> = row.try_get("address")?;
    let binding_groups: Option<Json<Vec<Vec<Uuid>>>> = row.try_get("binding_groups")?;

    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        status: parse_text(row.try_get("status")?, "orders.status")?,
        delivery_type: parse_text::<DeliveryType>(row.try_get("delivery_type")?, "orders.delivery_type")?,
        address: address.map(|a| a.0),
        total: row.try_get("total")?,
        binding_groups: binding_groups.map(|g| g.0),
        razorpay_order_id: row.try_get("razorpay_order_id")?,
        tracking: tracking_from_row(row)?,
        print_jobs: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn job_from_row(row: &PgRow, order_id: Option<Uuid>) -> Result<Option<PrintJob>> {
    let Some(id) = row.try_get::<Option<Uuid>, _>("job_id")? else {
        return Ok(None);
    };

    Ok(Some(PrintJob {
        id,
        file_id: row.try_get("job_file_id")?,
        user_id: row.try_get("job_user_id")?,
        order_id,
        pages: to_u32(row.try_get("job_pages")?, "print_jobs.pages")?,
        options: row.try_get("job_options")?,
        status: parse_text(row.try_get("job_status")?, "print_jobs.status")?,
        created_at: row.try_get::<DateTime<Utc>, _>("job_created_at")?,
    }))
}

/// Fold joined rows (sorted by order) into orders with their jobs
fn fold_orders(rows: Vec<PgRow>) -> Result<Vec<Order>> {
    let mut orders: Vec<Order> = Vec::new();

    for row in &rows {
        let id: Uuid = row.try_get("id")?;
        if orders.last().map(|o| o.id) != Some(id) {
            orders.push(order_from_row(row)?);
        }
        if let (Some(order), Some(job)) = (orders.last_mut(), job_from_row(row, Some(id))?) {
            order.print_jobs.push(job);
        }
    }

    Ok(orders)
}

impl PgStore {
    async fn fetch_one_order(&self, filter: &str, bind: impl ToString) -> Result<Option<Order>> {
        let sql = format!("{} WHERE {} {}", ORDER_SELECT, filter, ORDER_SORT);
        let rows = sqlx::query(&sql)
            .bind(bind.to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(fold_orders(rows)?.into_iter().next())
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (
                id, user_id, status, delivery_type, address, total, binding_groups,
                razorpay_order_id, awb_number, shipping_created, created_at, updated_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.status.as_str())
        .bind(order.delivery_type.as_str())
        .bind(order.address.as_ref().map(Json))
        .bind(order.total)
        .bind(order.binding_groups.as_ref().map(Json))
        .bind(order.razorpay_order_id.as_deref())
        .bind(order.tracking.awb_number.as_deref())
        .bind(order.tracking.shipping_created)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert order {}", order.id))?;

        for (position, job) in order.print_jobs.iter().enumerate() {
            sqlx::query(
                "INSERT INTO print_jobs (
                    id, file_id, user_id, order_id, position, pages, options, status, created_at
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(job.id)
            .bind(job.file_id)
            .bind(job.user_id)
            .bind(order.id)
            .bind(i32::try_from(position)?)
            .bind(to_i32(job.pages, "pages")?)
            .bind(job.options.as_deref())
            .bind(job.status.as_str())
            .bind(job.created_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert print job {}", job.id))?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
        let sql = format!("{} WHERE o.id = $1 {}", ORDER_SELECT, ORDER_SORT);
        let rows = sqlx::query(&sql).bind(id).fetch_all(&self.pool).await?;
        Ok(fold_orders(rows)?.into_iter().next())
    }

    async fn find_by_awb(&self, awb: &str) -> Result<Option<Order>> {
        self.fetch_one_order(
            "o.id = (SELECT id FROM orders WHERE awb_number = $1 ORDER BY created_at LIMIT 1)",
            awb,
        )
        .await
    }

    async fn find_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>> {
        self.fetch_one_order(
            "o.id = (SELECT id FROM orders WHERE razorpay_order_id = $1 ORDER BY created_at LIMIT 1)",
            gateway_order_id,
        )
        .await
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE orders SET status = $1, updated_at = now() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_shipment(&self, id: Uuid, awb: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE orders
             SET awb_number = $1, shipping_created = TRUE, updated_at = now()
             WHERE id = $2 AND shipping_created = FALSE",
        )
        .bind(awb)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_tracking(
        &self,
        id: Uuid,
        tracking: &ShipmentTracking,
        status: Option<OrderStatus>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE orders
             SET last_carrier_status = $1,
                 last_carrier_location = $2,
                 last_carrier_event_at = $3,
                 status = COALESCE($4, status),
                 updated_at = now()
             WHERE id = $5",
        )
        .bind(tracking.last_status.as_deref())
        .bind(tracking.last_location.as_deref())
        .bind(tracking.last_event_at)
        .bind(status.map(|s| s.as_str()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_tracked_shipments(&self) -> Result<Vec<TrackedShipment>> {
        let rows = sqlx::query(
            "SELECT id, status, awb_number, shipping_created, last_carrier_status,
                    last_carrier_location, last_carrier_event_at
             FROM orders
             WHERE shipping_created = TRUE
               AND awb_number IS NOT NULL AND btrim(awb_number) <> ''
             ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(TrackedShipment {
                    order_id: row.try_get("id")?,
                    status: parse_text(row.try_get("status")?, "orders.status")?,
                    tracking: tracking_from_row(row)?,
                })
            })
            .collect()
    }

    async fn find_print_job(&self, id: Uuid) -> Result<Option<PrintJob>> {
        let row = sqlx::query(
            "SELECT id AS job_id, file_id AS job_file_id, user_id AS job_user_id,
                    order_id, pages AS job_pages, options AS job_options,
                    status AS job_status, created_at AS job_created_at
             FROM print_jobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => job_from_row(&row, row.try_get("order_id")?),
            None => Ok(None),
        }
    }

    async fn update_job_status(&self, id: Uuid, status: PrintJobStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE print_jobs SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_order(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM print_jobs WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
