use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::AppState;
use crate::error::AppError;
use crate::pricing::FileQuoteSpec;

/// One spec gets a single line back; a list gets the full breakdown
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum QuoteRequest {
    Batch(Vec<FileQuoteSpec>),
    Single(FileQuoteSpec),
}

pub async fn quote(
    state: web::Data<AppState>,
    body: web::Json<QuoteRequest>,
) -> Result<HttpResponse, AppError> {
    let result = match body.into_inner() {
        QuoteRequest::Single(spec) => state
            .pricing
            .quote_file(&spec)
            .await
            .map(|line| HttpResponse::Ok().json(line)),
        QuoteRequest::Batch(specs) => state
            .pricing
            .quote_batch(&specs)
            .await
            .map(|breakdown| HttpResponse::Ok().json(breakdown)),
    };

    match result {
        Ok(response) => {
            state.metrics.record_quote("ok");
            Ok(response)
        }
        Err(e) => {
            state.metrics.record_quote(e.kind());
            Err(e.into())
        }
    }
}
