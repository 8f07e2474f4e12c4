use serde::{Deserialize, Serialize};

// ============================================================================
// Payment Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "SUCCESS" => Ok(PaymentStatus::Success),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status '{}'", other)),
        }
    }
}

/// Payment status vocabulary of the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayPaymentStatus {
    Created,
    Authorized,
    Captured,
    Refunded,
    Failed,
    Other(String),
}

impl GatewayPaymentStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created" => GatewayPaymentStatus::Created,
            "authorized" => GatewayPaymentStatus::Authorized,
            "captured" => GatewayPaymentStatus::Captured,
            "refunded" => GatewayPaymentStatus::Refunded,
            "failed" => GatewayPaymentStatus::Failed,
            other => GatewayPaymentStatus::Other(other.to_string()),
        }
    }

    /// The one place gateway wording becomes a local payment status:
    /// captured → SUCCESS, failed → FAILED, anything else → PENDING.
    pub fn to_payment_status(&self) -> PaymentStatus {
        match self {
            GatewayPaymentStatus::Captured => PaymentStatus::Success,
            GatewayPaymentStatus::Failed => PaymentStatus::Failed,
            GatewayPaymentStatus::Created
            | GatewayPaymentStatus::Authorized
            | GatewayPaymentStatus::Refunded
            | GatewayPaymentStatus::Other(_) => PaymentStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_status_mapping() {
        assert_eq!(GatewayPaymentStatus::parse("captured").to_payment_status(), PaymentStatus::Success);
        assert_eq!(GatewayPaymentStatus::parse("FAILED").to_payment_status(), PaymentStatus::Failed);
        assert_eq!(GatewayPaymentStatus::parse("authorized").to_payment_status(), PaymentStatus::Pending);
        assert_eq!(
            GatewayPaymentStatus::parse("disputed"),
            GatewayPaymentStatus::Other("disputed".to_string())
        );
        assert_eq!(GatewayPaymentStatus::parse("disputed").to_payment_status(), PaymentStatus::Pending);
    }

    #[test]
    fn test_payment_status_parse() {
        assert_eq!("success".parse::<PaymentStatus>().unwrap(), PaymentStatus::Success);
        assert!("captured".parse::<PaymentStatus>().is_err());
    }
}
