//! Stock HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::middleware::CurrentUser;
use crate::services::inventory::TransferStockInput;
use crate::services::InventoryService;
use crate::AppState;

/// Per-location stock, total and available-for-sale
pub async fn get_stock_summary(
    State(state): State<AppState>,
    Path(sku_id): Path<String>,
) -> impl IntoResponse {
    let service = InventoryService::new(state.store.clone());

    match service.stock_summary(&sku_id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn transfer_stock(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(sku_id): Path<String>,
    Json(input): Json<TransferStockInput>,
) -> impl IntoResponse {
    let service = InventoryService::new(state.store.clone());

    match service.transfer_stock(&actor, &sku_id, input).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => e.into_response(),
    }
}
