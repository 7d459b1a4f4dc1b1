//! Requirement intake HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::middleware::CurrentUser;
use crate::services::requirement::{ClassifyItemInput, CreateRequirementInput};
use crate::services::RequirementService;
use crate::AppState;

/// List all requirements
pub async fn list_requirements(State(state): State<AppState>) -> impl IntoResponse {
    let service = RequirementService::new(state.store.clone());

    match service.list_requirements().await {
        Ok(requirements) => {
            (StatusCode::OK, Json(serde_json::json!({ "requirements": requirements }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Requirements with items still awaiting classification or analysis
pub async fn requirement_inbox(State(state): State<AppState>) -> impl IntoResponse {
    let service = RequirementService::new(state.store.clone());

    match service.inbox().await {
        Ok(requirements) => {
            (StatusCode::OK, Json(serde_json::json!({ "requirements": requirements }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn get_requirement(
    State(state): State<AppState>,
    Path(requirement_id): Path<String>,
) -> impl IntoResponse {
    let service = RequirementService::new(state.store.clone());

    match service.get_requirement(&requirement_id).await {
        Ok(requirement) => (StatusCode::OK, Json(requirement)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_requirement(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(input): Json<CreateRequirementInput>,
) -> impl IntoResponse {
    let service = RequirementService::new(state.store.clone());

    match service.create_requirement(&actor, input).await {
        Ok(requirement) => (StatusCode::CREATED, Json(requirement)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn classify_item(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((requirement_id, item_index)): Path<(String, usize)>,
    Json(input): Json<ClassifyItemInput>,
) -> impl IntoResponse {
    let service = RequirementService::new(state.store.clone());

    match service
        .classify_item(&actor, &requirement_id, item_index, input)
        .await
    {
        Ok(requirement) => (StatusCode::OK, Json(requirement)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Open an opportunity for a classified item
pub async fn start_analysis(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((requirement_id, item_index)): Path<(String, usize)>,
) -> impl IntoResponse {
    let service = RequirementService::new(state.store.clone());

    match service
        .start_analysis(&actor, &requirement_id, item_index)
        .await
    {
        Ok(opportunity) => (StatusCode::CREATED, Json(opportunity)).into_response(),
        Err(e) => e.into_response(),
    }
}
