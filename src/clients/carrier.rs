use async_trait::async_trait;

use crate::domain::shipment::{ShipmentReceipt, ShipmentRequest, TrackingSnapshot};
use crate::utils::{BreakerError, CircuitState, IsTransient};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CarrierError {
    #[error("Carrier authentication failed: {0}")]
    Auth(String),

    #[error("Carrier request timed out")]
    Timeout,

    #[error("Carrier unreachable: {0}")]
    Transport(String),

    #[error("Carrier rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Carrier temporarily unavailable (circuit open)")]
    Unavailable,

    #[error("Unexpected carrier response: {0}")]
    Decode(String),

    #[error("No tracking data for AWB {0}")]
    NoTrackingData(String),
}

impl IsTransient for CarrierError {
    fn is_transient(&self) -> bool {
        match self {
            CarrierError::Timeout | CarrierError::Transport(_) => true,
            CarrierError::Rejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<BreakerError<CarrierError>> for CarrierError {
    fn from(err: BreakerError<CarrierError>) -> Self {
        match err {
            BreakerError::Open(_) => CarrierError::Unavailable,
            BreakerError::Inner(e) => e,
        }
    }
}

impl From<reqwest::Error> for CarrierError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CarrierError::Timeout
        } else if err.is_decode() {
            CarrierError::Decode(err.to_string())
        } else {
            CarrierError::Transport(err.to_string())
        }
    }
}

/// Courier operations the shipment service depends on
#[async_trait]
pub trait CarrierClient: Send + Sync {
    /// Book one shipment. Not idempotent at the carrier: never retried.
    async fn create_shipment(&self, request: &ShipmentRequest) -> Result<ShipmentReceipt, CarrierError>;

    /// Current tracking state for an AWB
    async fn track(&self, awb: &str) -> Result<TrackingSnapshot, CarrierError>;

    fn circuit_state(&self) -> CircuitState {
        CircuitState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CarrierError::Timeout.is_transient());
        assert!(CarrierError::Rejected { status: 503, message: String::new() }.is_transient());
        assert!(!CarrierError::Rejected { status: 422, message: String::new() }.is_transient());
        assert!(!CarrierError::Auth("bad".into()).is_transient());
        assert!(!CarrierError::Unavailable.is_transient());
    }

    #[test]
    fn test_open_breaker_maps_to_unavailable() {
        let err: CarrierError = BreakerError::<CarrierError>::Open("carrier").into();
        assert_eq!(err, CarrierError::Unavailable);
    }
}
