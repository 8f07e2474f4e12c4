use crate::domain::order::OrderStatus;

// ============================================================================
// Carrier Status Translation
// ============================================================================
//
// The only place carrier wording is interpreted. Labels are normalised
// (upper case, `_`/`-` as spaces, collapsed whitespace) before matching.
//
// Our order vocabulary has no separate "shipped" state, so every state where
// the parcel has left the shop maps to OUT_FOR_DELIVERY. Returns and
// exceptions are recorded on the order but do not move its status.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarrierStatus {
    AwaitingPickup,
    InTransit,
    OutForDelivery,
    Delivered,
    Cancelled,
    Exception(String),
    Unknown(String),
}

impl CarrierStatus {
    pub fn parse(raw: &str) -> Self {
        let label = normalize(raw);
        match label.as_str() {
            "NEW" | "AWB ASSIGNED" | "LABEL GENERATED" | "PICKUP SCHEDULED" | "PICKUP GENERATED"
            | "PICKUP QUEUED" | "MANIFEST GENERATED" | "OUT FOR PICKUP" => CarrierStatus::AwaitingPickup,

            "PICKED UP" | "SHIPPED" | "IN TRANSIT" | "REACHED AT DESTINATION HUB"
            | "REACHED DESTINATION HUB" => CarrierStatus::InTransit,

            "OUT FOR DELIVERY" => CarrierStatus::OutForDelivery,

            "DELIVERED" => CarrierStatus::Delivered,

            "CANCELED" | "CANCELLED" | "RTO DELIVERED" | "LOST" | "DESTROYED" => {
                CarrierStatus::Cancelled
            }

            "UNDELIVERED" | "DELAYED" | "RTO INITIATED" | "RTO IN TRANSIT" | "RTO OFD"
            | "PICKUP EXCEPTION" | "DAMAGED" => CarrierStatus::Exception(label),

            _ => CarrierStatus::Unknown(label),
        }
    }

    pub fn to_order_status(&self) -> Option<OrderStatus> {
        match self {
            CarrierStatus::AwaitingPickup => Some(OrderStatus::Completed),
            CarrierStatus::InTransit | CarrierStatus::OutForDelivery => Some(OrderStatus::OutForDelivery),
            CarrierStatus::Delivered => Some(OrderStatus::Delivered),
            CarrierStatus::Cancelled => Some(OrderStatus::Cancelled),
            CarrierStatus::Exception(_) | CarrierStatus::Unknown(_) => None,
        }
    }
}

/// Carrier label → local order status, `None` when the label should not move the order
pub fn map_carrier_status(raw: &str) -> Option<OrderStatus> {
    CarrierStatus::parse(raw).to_order_status()
}

fn normalize(raw: &str) -> String {
    raw.replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}
