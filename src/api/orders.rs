use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use super::{AppState, CallerId};
use crate::domain::order::{OrderStatus, PlaceOrder};
use crate::domain::print_job::PrintJobStatus;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: String,
    #[serde(default)]
    pub admin_override: bool,
}

#[derive(Debug, Deserialize)]
pub struct JobStatusChange {
    pub status: String,
}

pub async fn place_order(
    state: web::Data<AppState>,
    caller: CallerId,
    body: web::Json<PlaceOrder>,
) -> Result<HttpResponse, AppError> {
    let order = state.orders.place_order(caller.0, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

pub async fn get_order(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order = state.orders.customer_order(caller.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn change_status(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<StatusChange>,
) -> Result<HttpResponse, AppError> {
    let next: OrderStatus = body.status.parse().map_err(AppError::Validation)?;
    let order = state
        .orders
        .change_status(path.into_inner(), next, body.admin_override)
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn update_job_status(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<JobStatusChange>,
) -> Result<HttpResponse, AppError> {
    let next: PrintJobStatus = body.status.parse().map_err(AppError::Validation)?;
    let job = state.orders.update_job_status(path.into_inner(), next).await?;
    Ok(HttpResponse::Ok().json(job))
}

pub async fn invoice_groups(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    let blocks = state.orders.invoice_groups(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(blocks))
}

pub async fn delete_order(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state.orders.delete_order(caller.0, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn delete_file(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state.files.delete_file(caller.0, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::super::{test_support, USER_ID_HEADER};
    use crate::store::{FileRepository, MemoryStore, StoredFile};
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use uuid::Uuid;

    fn order_body(file_id: Uuid) -> Value {
        json!({
            "deliveryType": "PICKUP",
            "printJobs": [{
                "fileId": file_id,
                "options": { "color": "BW", "paperSize": "A4", "paperQuality": "70GSM", "side": "DOUBLE" }
            }],
            "total": "12.50"
        })
    }

    #[actix_web::test]
    async fn test_place_and_fetch_order() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let file = StoredFile {
            id: Uuid::new_v4(),
            user_id: user,
            filename: "lab.pdf".to_string(),
            url: "https://files.example/lab.pdf".to_string(),
            pages: 5,
            created_at: Utc::now(),
        };
        store.insert_file(&file).await.unwrap();

        let state = web::Data::new(test_support::state(store));
        let app = test::init_service(App::new().app_data(state).configure(super::super::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .insert_header((USER_ID_HEADER, user.to_string()))
            .set_json(order_body(file.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let placed: Value = test::read_body_json(resp).await;
        let id = placed["id"].as_str().unwrap().to_string();
        assert_eq!(placed["status"], "PENDING");

        let req = test::TestRequest::get()
            .uri(&format!("/api/orders/{}", id))
            .insert_header((USER_ID_HEADER, user.to_string()))
            .to_request();
        let fetched: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched["printJobs"][0]["pages"], 5);

        let req = test::TestRequest::put()
            .uri(&format!("/api/orders/{}/status", id))
            .set_json(json!({ "status": "shipped" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_missing_caller_is_unauthorized() {
        let state = web::Data::new(test_support::state(Arc::new(MemoryStore::new())));
        let app = test::init_service(App::new().app_data(state).configure(super::super::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .set_json(order_body(Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_unknown_order_is_404_with_error_body() {
        let state = web::Data::new(test_support::state(Arc::new(MemoryStore::new())));
        let app = test::init_service(App::new().app_data(state).configure(super::super::configure)).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/orders/{}", Uuid::new_v4()))
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "not_found");
    }

    #[actix_web::test]
    async fn test_order_is_invisible_to_other_callers() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let file = StoredFile {
            id: Uuid::new_v4(),
            user_id: owner,
            filename: "notes.pdf".to_string(),
            url: "https://files.example/notes.pdf".to_string(),
            pages: 3,
            created_at: Utc::now(),
        };
        store.insert_file(&file).await.unwrap();

        let state = web::Data::new(test_support::state(store));
        let app = test::init_service(App::new().app_data(state).configure(super::super::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .insert_header((USER_ID_HEADER, owner.to_string()))
            .set_json(order_body(file.id))
            .to_request();
        let placed: Value = test::call_and_read_body_json(&app, req).await;
        let uri = format!("/api/orders/{}", placed["id"].as_str().unwrap());
        let stranger = Uuid::new_v4().to_string();

        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header((USER_ID_HEADER, stranger.clone()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete()
            .uri(&uri)
            .insert_header((USER_ID_HEADER, stranger))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete()
            .uri(&uri)
            .insert_header((USER_ID_HEADER, owner.to_string()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn test_malformed_body_gets_json_error() {
        let state = web::Data::new(test_support::state(Arc::new(MemoryStore::new())));
        let app = test::init_service(App::new().app_data(state).configure(super::super::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .set_json(json!({ "deliveryType": "PICKUP", "printJobs": 7, "total": "1.00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "validation_error");
        assert!(!body["message"].as_str().unwrap().contains("invalid type"));
    }

    #[actix_web::test]
    async fn test_bad_path_id_gets_json_error() {
        let state = web::Data::new(test_support::state(Arc::new(MemoryStore::new())));
        let app = test::init_service(App::new().app_data(state).configure(super::super::configure)).await;

        let req = test::TestRequest::get()
            .uri("/api/orders/not-a-uuid")
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "validation_error");
    }
}
