use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::{Order, OrderError, OrderStatus, ShipmentTracking, ShippingAddress};
use crate::domain::Money;

// ============================================================================
// Shipment Value Objects
// ============================================================================

/// Parcel dimensions. Every order ships as one document envelope, so these
/// are fixed rather than derived from page counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PackageSpec {
    pub weight_kg: Decimal,
    pub length_cm: u32,
    pub breadth_cm: u32,
    pub height_cm: u32,
}

pub const DOCUMENT_PACKAGE: PackageSpec = PackageSpec {
    weight_kg: Decimal::from_parts(5, 0, 0, false, 1),
    length_cm: 30,
    breadth_cm: 22,
    height_cm: 2,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaymentMode {
    Prepaid,
    Cod,
}

impl PaymentMode {
    /// COD unless the order was paid through the gateway
    pub fn for_order(order: &Order) -> Self {
        if order.is_prepaid() {
            PaymentMode::Prepaid
        } else {
            PaymentMode::Cod
        }
    }

    pub fn as_carrier_str(&self) -> &'static str {
        match self {
            PaymentMode::Prepaid => "Prepaid",
            PaymentMode::Cod => "COD",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Everything the carrier needs to book one shipment
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentRequest {
    pub order_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub pickup_location: String,
    pub customer: CustomerContact,
    pub address: ShippingAddress,
    pub payment_mode: PaymentMode,
    pub sub_total: Money,
    pub total_pages: u32,
    pub package: PackageSpec,
}

impl ShipmentRequest {
    pub fn for_order(
        order: &Order,
        customer: CustomerContact,
        pickup_location: &str,
    ) -> Result<Self, OrderError> {
        let address = order.ensure_shippable()?;

        Ok(Self {
            order_id: order.id,
            order_date: order.created_at,
            pickup_location: pickup_location.to_string(),
            customer,
            address: address.clone(),
            payment_mode: PaymentMode::for_order(order),
            sub_total: order.total,
            total_pages: order.total_pages(),
            package: DOCUMENT_PACKAGE,
        })
    }
}

/// Carrier acknowledgement of a booked shipment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentReceipt {
    pub awb_number: String,
    pub carrier_shipment_id: Option<String>,
    pub courier_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub occurred_at: Option<NaiveDateTime>,
    pub status: String,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Carrier view of one AWB; `events` oldest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSnapshot {
    pub awb_number: String,
    pub current_status: Option<String>,
    pub last_location: Option<String>,
    pub last_event_at: Option<NaiveDateTime>,
    pub events: Vec<TrackingEvent>,
}

impl TrackingSnapshot {
    /// Build from carrier events in any order; status and location come from
    /// `current_status` when given, otherwise from the newest event.
    pub fn from_events(
        awb_number: impl Into<String>,
        current_status: Option<String>,
        mut events: Vec<TrackingEvent>,
    ) -> Self {
        // Undated events sort first so the newest dated event stays last
        events.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at));

        let newest = events.last();
        let current_status = current_status
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| newest.map(|e| e.status.clone()));

        Self {
            awb_number: awb_number.into(),
            current_status,
            last_location: newest.and_then(|e| e.location.clone()),
            last_event_at: newest.and_then(|e| e.occurred_at),
            events,
        }
    }
}

/// Sweep input: an order with a booked shipment
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedShipment {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub tracking: ShipmentTracking,
}

impl TrackedShipment {
    pub fn awb(&self) -> &str {
        self.tracking.awb_number.as_deref().unwrap_or_default()
    }
}
