use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::AppState;
use crate::domain::shipment::CustomerContact;
use crate::error::AppError;

pub async fn create_shipment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<CustomerContact>,
) -> Result<HttpResponse, AppError> {
    let receipt = state
        .shipments
        .create_shipment(path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(receipt))
}

pub async fn track_order(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.shipments.track_order(path.into_inner()).await?))
}

pub async fn track_awb(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.shipments.track_awb(&path.into_inner()).await?))
}
