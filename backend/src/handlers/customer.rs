//! Customer HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shared::CustomerType;

use crate::middleware::CurrentUser;
use crate::services::customer::{CreateCustomerInput, UpdateCustomerInput};
use crate::services::CustomerService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CustomerFilter {
    #[serde(rename = "type")]
    pub customer_type: Option<CustomerType>,
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(filter): Query<CustomerFilter>,
) -> impl IntoResponse {
    let service = CustomerService::new(state.store.clone());

    match service.list_customers(filter.customer_type).await {
        Ok(customers) => {
            (StatusCode::OK, Json(serde_json::json!({ "customers": customers }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> impl IntoResponse {
    let service = CustomerService::new(state.store.clone());

    match service.get_customer(&customer_id).await {
        Ok(customer) => (StatusCode::OK, Json(customer)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_customer(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Json(input): Json<CreateCustomerInput>,
) -> impl IntoResponse {
    let service = CustomerService::new(state.store.clone());

    match service.create_customer(input).await {
        Ok(customer) => (StatusCode::CREATED, Json(customer)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_customer(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(customer_id): Path<String>,
    Json(input): Json<UpdateCustomerInput>,
) -> impl IntoResponse {
    let service = CustomerService::new(state.store.clone());

    match service.update_customer(&customer_id, input).await {
        Ok(customer) => (StatusCode::OK, Json(customer)).into_response(),
        Err(e) => e.into_response(),
    }
}
