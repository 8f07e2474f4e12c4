use uuid::Uuid;

use super::value_objects::OrderStatus;
use crate::domain::print_job::PrintJobStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Order must contain at least one print job")]
    EmptyPrintJobs,

    #[error("Order total cannot be negative")]
    NegativeTotal,

    #[error("Delivery orders require a shipping address")]
    MissingAddress,

    #[error("Invalid shipping address: {0}")]
    InvalidAddress(&'static str),

    #[error("Gateway order id cannot be blank")]
    BlankGatewayOrderId,

    #[error("File {0} has no pages")]
    EmptyFile(Uuid),

    #[error("Print options could not be encoded: {0}")]
    OptionsEncoding(String),

    #[error("Invalid binding groups: {0}")]
    InvalidBindingGroups(String),

    #[error("Cannot move order from {from:?} to {to:?}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Cannot move print job from {from:?} to {to:?}")]
    InvalidJobTransition { from: PrintJobStatus, to: PrintJobStatus },

    #[error("Shipment already created for this order")]
    ShipmentAlreadyCreated,

    #[error("Order cannot be shipped: {0}")]
    NotShippable(&'static str),

    #[error("Only pending or cancelled orders can be deleted")]
    NotDeletable,
}
