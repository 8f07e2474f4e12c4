use crate::domain::order::{OrderStatus, ShipmentTracking};

use super::status_mapping::map_carrier_status;
use super::value_objects::TrackingSnapshot;

/// Changes to persist after a tracking poll
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingUpdate {
    pub tracking: ShipmentTracking,
    /// New order status, present only for a legal forward move
    pub order_status: Option<OrderStatus>,
}

/// Compare a fresh carrier snapshot with what the order already records.
///
/// Returns `None` when the carrier reported nothing usable or the status is
/// unchanged, so repeated identical polls write nothing.
pub fn reconcile_tracking(
    current_status: OrderStatus,
    current: &ShipmentTracking,
    snapshot: &TrackingSnapshot,
) -> Option<TrackingUpdate> {
    let reported = snapshot
        .current_status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())?;

    let unchanged = current
        .last_status
        .as_deref()
        .map(|last| last.trim().eq_ignore_ascii_case(reported))
        .unwrap_or(false);
    if unchanged {
        return None;
    }

    let tracking = ShipmentTracking {
        last_status: Some(reported.to_string()),
        last_location: snapshot
            .last_location
            .clone()
            .or_else(|| current.last_location.clone()),
        last_event_at: snapshot.last_event_at.or(current.last_event_at),
        ..current.clone()
    };

    let order_status =
        map_carrier_status(reported).filter(|next| current_status.can_transition_to(*next));

    Some(TrackingUpdate {
        tracking,
        order_status,
    })
}
