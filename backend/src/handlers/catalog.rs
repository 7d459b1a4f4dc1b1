//! Catalog HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::middleware::CurrentUser;
use crate::services::catalog::{CreateNamedInput, CreateProductFamilyInput, CreateSkuInput};
use crate::services::CatalogService;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub category_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuFilter {
    #[serde(default)]
    pub active_only: bool,
}

pub async fn list_categories(State(state): State<AppState>) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service.list_categories().await {
        Ok(categories) => {
            (StatusCode::OK, Json(serde_json::json!({ "categories": categories }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Create a category (also used for quick-create during classification)
pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(input): Json<CreateNamedInput>,
) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service.create_category(&actor, input).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(category_id): Path<String>,
) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service.delete_category(&actor, &category_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service
        .list_product_families(filter.category_id.as_deref())
        .await
    {
        Ok(products) => {
            (StatusCode::OK, Json(serde_json::json!({ "products": products }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(input): Json<CreateProductFamilyInput>,
) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service.create_product_family(&actor, input).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(product_id): Path<String>,
) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service.delete_product_family(&actor, &product_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_brands(State(state): State<AppState>) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service.list_brands().await {
        Ok(brands) => (StatusCode::OK, Json(serde_json::json!({ "brands": brands }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_brand(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(input): Json<CreateNamedInput>,
) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service.create_brand(&actor, input).await {
        Ok(brand) => (StatusCode::CREATED, Json(brand)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_brand(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(brand_id): Path<String>,
) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service.delete_brand(&actor, &brand_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_skus(
    State(state): State<AppState>,
    Query(filter): Query<SkuFilter>,
) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service.list_skus(filter.active_only).await {
        Ok(skus) => (StatusCode::OK, Json(serde_json::json!({ "skus": skus }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_sku(
    State(state): State<AppState>,
    Path(sku_id): Path<String>,
) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service.get_sku(&sku_id).await {
        Ok(sku) => (StatusCode::OK, Json(sku)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_sku(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(input): Json<CreateSkuInput>,
) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service.create_sku(&actor, input).await {
        Ok(sku) => (StatusCode::CREATED, Json(sku)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_sku(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(sku_id): Path<String>,
) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service.delete_sku(&actor, &sku_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Approved-for-catalog opportunities waiting for a SKU
pub async fn catalog_candidates(State(state): State<AppState>) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service.catalog_candidates().await {
        Ok(candidates) => {
            (StatusCode::OK, Json(serde_json::json!({ "candidates": candidates }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn purchase_candidates(State(state): State<AppState>) -> impl IntoResponse {
    let service = CatalogService::new(state.store.clone());

    match service.purchase_candidates().await {
        Ok(candidates) => {
            (StatusCode::OK, Json(serde_json::json!({ "candidates": candidates }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}
