use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::AppState;
use crate::error::AppError;
use crate::otp::OtpChannel;

#[derive(Debug, Deserialize)]
pub struct SendOtp {
    pub channel: OtpChannel,
    pub recipient: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtp {
    pub channel: OtpChannel,
    pub recipient: String,
    pub code: String,
}

pub async fn send(state: web::Data<AppState>, body: web::Json<SendOtp>) -> Result<HttpResponse, AppError> {
    state.otp.issue(body.channel, &body.recipient).await?;
    Ok(HttpResponse::Accepted().json(serde_json::json!({ "sent": true })))
}

pub async fn verify(state: web::Data<AppState>, body: web::Json<VerifyOtp>) -> Result<HttpResponse, AppError> {
    state.otp.verify(body.channel, &body.recipient, &body.code).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "verified": true })))
}

#[cfg(test)]
mod tests {
    use super::super::test_support;
    use crate::store::MemoryStore;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use serde_json::json;
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_send_then_wrong_code() {
        let state = web::Data::new(test_support::state(Arc::new(MemoryStore::new())));
        let app = test::init_service(App::new().app_data(state).configure(super::super::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/otp/send")
            .set_json(json!({ "channel": "email", "recipient": "Asha@Example.com" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);

        let req = test::TestRequest::post()
            .uri("/api/otp/verify")
            .set_json(json!({ "channel": "email", "recipient": "asha@example.com", "code": "not-it" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_invalid_recipient_is_rejected() {
        let state = web::Data::new(test_support::state(Arc::new(MemoryStore::new())));
        let app = test::init_service(App::new().app_data(state).configure(super::super::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/otp/send")
            .set_json(json!({ "channel": "phone", "recipient": "12" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
