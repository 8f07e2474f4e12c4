use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::clients::{CarrierError, GatewayError};
use crate::domain::catalog::CatalogError;
use crate::domain::order::OrderError;
use crate::domain::payment::PaymentError;
use crate::otp::OtpError;
use crate::pricing::PricingError;

// ============================================================================
// Service Boundary Errors
// ============================================================================
//
// Every service returns `AppError`. Domain errors map onto the taxonomy via
// `From`; infrastructure faults arrive as `anyhow::Error` and become
// `Internal`, whose detail is logged but never sent to the caller.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    ExternalService(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} {} not found", what, id))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::ExternalService(_) => "external_service_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "Internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.kind(),
            message,
        })
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        let message = err.to_string();
        match err {
            PricingError::Storage(e) => AppError::Internal(e),
            PricingError::InBatch { index, source } => match AppError::from(*source) {
                AppError::NotFound(m) => AppError::NotFound(format!("File {}: {}", index, m)),
                AppError::Validation(m) => AppError::Validation(format!("File {}: {}", index, m)),
                other => other,
            },
            PricingError::CombinationNotFound(_) | PricingError::BindingNotFound(_) => {
                AppError::NotFound(message)
            }
            PricingError::InvalidDiscount { .. } => AppError::Validation(message),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidStatusTransition { .. }
            | OrderError::InvalidJobTransition { .. }
            | OrderError::ShipmentAlreadyCreated
            | OrderError::NotDeletable => AppError::Conflict(err.to_string()),
            _ => AppError::Validation(err.to_string()),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::MissingSignature | PaymentError::BadSignature => {
                AppError::Unauthorized(err.to_string())
            }
            PaymentError::AlreadyLinked { .. } => AppError::Conflict(err.to_string()),
            _ => AppError::Validation(err.to_string()),
        }
    }
}

impl From<CarrierError> for AppError {
    fn from(err: CarrierError) -> Self {
        match err {
            CarrierError::NoTrackingData(_) => AppError::NotFound(err.to_string()),
            _ => AppError::ExternalService(err.to_string()),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidAmount => AppError::Validation(err.to_string()),
            _ => AppError::ExternalService(err.to_string()),
        }
    }
}

impl From<OtpError> for AppError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::InvalidRecipient(_) => AppError::Validation(err.to_string()),
            OtpError::Expired | OtpError::Mismatch => AppError::Unauthorized(err.to_string()),
            OtpError::Delivery(_) => AppError::ExternalService(err.to_string()),
            OtpError::Storage(e) => AppError::Internal(e),
        }
    }
}
