use actix_web::dev::Payload;
use actix_web::{error, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::metrics::Metrics;
use crate::otp::OtpService;
use crate::pricing::PricingEngine;
use crate::services::{FileService, OrderService, PaymentService, ShipmentService};

mod orders;
mod otp;
mod payments;
mod pricing;
mod shipments;

// ============================================================================
// HTTP Surface
// ============================================================================
//
// Thin handlers: parse, call one service, serialize. Every failure goes
// through `AppError`'s response mapping.
//
// ============================================================================

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Shared services, registered once as `web::Data<AppState>`
pub struct AppState {
    pub pricing: Arc<PricingEngine>,
    pub orders: Arc<OrderService>,
    pub files: Arc<FileService>,
    pub payments: Arc<PaymentService>,
    pub shipments: Arc<ShipmentService>,
    pub otp: Arc<OtpService>,
    pub metrics: Arc<Metrics>,
}

/// Caller identity from the `X-User-Id` header set by the session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub Uuid);

impl FromRequest for CallerId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let caller = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(format!("{} header is required", USER_ID_HEADER)))
            .and_then(|raw| {
                Uuid::parse_str(raw.trim())
                    .map(CallerId)
                    .map_err(|_| AppError::Unauthorized(format!("{} is not a valid id", USER_ID_HEADER)))
            });
        ready(caller)
    }
}

/// Extractor failures answer with the same `{error, message}` body as
/// service errors. The serde detail stays in the log.
fn json_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!(path = %req.path(), error = %err, "Rejected request body");
    let message = match err {
        error::JsonPayloadError::ContentType => "Expected a JSON request body",
        error::JsonPayloadError::Overflow { .. } | error::JsonPayloadError::OverflowKnownLength { .. } => {
            "Request body is too large"
        }
        _ => "Request body does not match the expected shape",
    };
    AppError::Validation(message.to_string()).into()
}

fn path_error(err: error::PathError, req: &HttpRequest) -> actix_web::Error {
    debug!(path = %req.path(), error = %err, "Rejected path parameter");
    AppError::Validation("Invalid identifier in request path".to_string()).into()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::PathConfig::default().error_handler(path_error))
            .route("/pricing/quote", web::post().to(pricing::quote))
            .route("/orders", web::post().to(orders::place_order))
            .route("/orders/{id}", web::get().to(orders::get_order))
            .route("/orders/{id}", web::delete().to(orders::delete_order))
            .route("/orders/{id}/status", web::put().to(orders::change_status))
            .route("/orders/{id}/invoice-groups", web::get().to(orders::invoice_groups))
            .route("/orders/{id}/shipment", web::post().to(shipments::create_shipment))
            .route("/print-jobs/{id}/status", web::put().to(orders::update_job_status))
            .route("/files/{id}", web::delete().to(orders::delete_file))
            .route("/payments/gateway-orders", web::post().to(payments::create_gateway_order))
            .route("/payments/webhook", web::post().to(payments::webhook))
            .route("/admin/orders/failed-payments", web::get().to(payments::failed_payment_orders))
            .route("/admin/payments/orphaned", web::get().to(payments::orphaned_payments))
            .route("/tracking/orders/{id}", web::get().to(shipments::track_order))
            .route("/tracking/awb/{awb}", web::get().to(shipments::track_awb))
            .route("/otp/send", web::post().to(otp::send))
            .route("/otp/verify", web::post().to(otp::verify)),
    );
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::clients::{CarrierClient, CarrierError, GatewayError, GatewayOrder, PaymentGateway};
    use crate::domain::shipment::{ShipmentReceipt, ShipmentRequest, TrackingSnapshot};
    use crate::domain::Money;
    use crate::otp::{InMemoryOtpStore, LoggingOtpSender};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::time::Duration;

    pub const WEBHOOK_SECRET: &str = "whsec_api";

    pub struct OfflineCarrier;

    #[async_trait]
    impl CarrierClient for OfflineCarrier {
        async fn create_shipment(&self, _: &ShipmentRequest) -> Result<ShipmentReceipt, CarrierError> {
            Err(CarrierError::Unavailable)
        }

        async fn track(&self, awb: &str) -> Result<TrackingSnapshot, CarrierError> {
            Err(CarrierError::NoTrackingData(awb.to_string()))
        }
    }

    pub struct StaticGateway;

    #[async_trait]
    impl PaymentGateway for StaticGateway {
        async fn create_order(&self, amount: Money, _: &str) -> Result<GatewayOrder, GatewayError> {
            Ok(GatewayOrder {
                id: "order_api_1".to_string(),
                amount,
                currency: "INR".to_string(),
                key_id: "rzp_test".to_string(),
            })
        }
    }

    pub fn state(store: Arc<MemoryStore>) -> AppState {
        let metrics = Arc::new(Metrics::new().unwrap());
        let payments = Arc::new(PaymentService::new(
            store.clone(),
            store.clone(),
            Arc::new(StaticGateway),
            WEBHOOK_SECRET,
            metrics.clone(),
        ));

        AppState {
            pricing: Arc::new(PricingEngine::new(store.clone())),
            orders: Arc::new(OrderService::new(store.clone(), store.clone(), payments.clone(), metrics.clone())),
            files: Arc::new(FileService::new(store.clone())),
            payments,
            shipments: Arc::new(ShipmentService::new(
                store.clone(),
                Arc::new(OfflineCarrier),
                "Primary",
                metrics.clone(),
            )),
            otp: Arc::new(OtpService::new(
                Arc::new(InMemoryOtpStore::new()),
                Arc::new(LoggingOtpSender),
                Duration::from_secs(300),
            )),
            metrics,
        }
    }
}
