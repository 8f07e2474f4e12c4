use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use super::AppState;
use crate::domain::Money;
use crate::error::AppError;

const SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

#[derive(Debug, Deserialize)]
pub struct GatewayOrderRequest {
    pub amount: Money,
    pub receipt: String,
}

pub async fn create_gateway_order(
    state: web::Data<AppState>,
    body: web::Json<GatewayOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let order = state
        .payments
        .create_gateway_order(body.amount, body.receipt.trim())
        .await?;
    Ok(HttpResponse::Created().json(order))
}

/// Signature covers the raw bytes, so the body is taken unparsed
pub async fn webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state.payments.handle_webhook(&body, signature).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

pub async fn failed_payment_orders(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.payments.failed_payment_orders().await?))
}

pub async fn orphaned_payments(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.payments.orphaned_payments().await?))
}
