//! Purchase order HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shared::PurchaseOrderStatus;

use crate::middleware::CurrentUser;
use crate::services::procurement::CreatePurchaseOrderInput;
use crate::services::ProcurementService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderFilter {
    pub status: Option<PurchaseOrderStatus>,
}

fn service(state: &AppState) -> ProcurementService {
    ProcurementService::new(state.store.clone(), state.config.inventory.receiving_location)
}

pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> impl IntoResponse {
    match service(&state).list_purchase_orders(filter.status).await {
        Ok(orders) => {
            (StatusCode::OK, Json(serde_json::json!({ "purchaseOrders": orders }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> impl IntoResponse {
    match service(&state).get_purchase_order(&order_id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_purchase_order(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> impl IntoResponse {
    match service(&state).create_purchase_order(&actor, input).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Receive an ordered purchase order into stock
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(order_id): Path<String>,
) -> impl IntoResponse {
    match service(&state).receive_order(&actor, &order_id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn cancel_purchase_order(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(order_id): Path<String>,
) -> impl IntoResponse {
    match service(&state).cancel_order(&actor, &order_id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}
