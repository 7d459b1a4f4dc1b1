//! Sales ledger HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::middleware::CurrentUser;
use crate::services::sales::RegisterSaleInput;
use crate::services::SalesService;
use crate::AppState;

fn service(state: &AppState) -> SalesService {
    SalesService::new(state.store.clone(), state.config.inventory.sales_location)
}

pub async fn list_sales(State(state): State<AppState>) -> impl IntoResponse {
    match service(&state).list_sales().await {
        Ok(sales) => (StatusCode::OK, Json(serde_json::json!({ "sales": sales }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_sale(State(state): State<AppState>, Path(sale_id): Path<String>) -> impl IntoResponse {
    match service(&state).get_sale(&sale_id).await {
        Ok(sale) => (StatusCode::OK, Json(sale)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Register a sale; all lines succeed or none do
pub async fn register_sale(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(input): Json<RegisterSaleInput>,
) -> impl IntoResponse {
    match service(&state).register_sale(&actor, input).await {
        Ok(sale) => (StatusCode::CREATED, Json(sale)).into_response(),
        Err(e) => e.into_response(),
    }
}
