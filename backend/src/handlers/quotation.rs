//! Quotation HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::middleware::CurrentUser;
use crate::services::quotation::CreateQuotationInput;
use crate::services::QuotationService;
use crate::AppState;

pub async fn list_quotations(State(state): State<AppState>) -> impl IntoResponse {
    let service = QuotationService::new(state.store.clone());

    match service.list_quotations().await {
        Ok(quotations) => {
            (StatusCode::OK, Json(serde_json::json!({ "quotations": quotations }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Opportunities approved for quotation and still waiting for one
pub async fn pending_quotations(State(state): State<AppState>) -> impl IntoResponse {
    let service = QuotationService::new(state.store.clone());

    match service.pending_opportunities().await {
        Ok(opportunities) => (
            StatusCode::OK,
            Json(serde_json::json!({ "opportunities": opportunities })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn draft_quotation(
    State(state): State<AppState>,
    Path(opportunity_id): Path<String>,
) -> impl IntoResponse {
    let service = QuotationService::new(state.store.clone());

    match service.draft_from_opportunity(&opportunity_id).await {
        Ok(draft) => (StatusCode::OK, Json(draft)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_quotation(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(input): Json<CreateQuotationInput>,
) -> impl IntoResponse {
    let service = QuotationService::new(state.store.clone());

    match service.create_quotation(&actor, input).await {
        Ok(quotation) => (StatusCode::CREATED, Json(quotation)).into_response(),
        Err(e) => e.into_response(),
    }
}
