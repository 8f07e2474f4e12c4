// ============================================================================
// Payment Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentError {
    #[error("Webhook signature header is missing")]
    MissingSignature,

    #[error("Webhook signature does not match")]
    BadSignature,

    #[error("Webhook payload is malformed: {0}")]
    MalformedPayload(String),

    #[error("Webhook event '{0}' carries no payment entity")]
    NoPaymentEntity(String),

    #[error("Payment amount must be positive")]
    InvalidAmount,

    #[error("Payment for gateway order {gateway_order_id} is already linked to order {linked_order}")]
    AlreadyLinked {
        gateway_order_id: String,
        linked_order: uuid::Uuid,
    },
}
