//! Opportunity HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shared::OpportunityStatus;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::opportunity::{
    CompetitorEntryInput, DecisionInput, EntryKind, OpportunityService, ProviderQuoteInput,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

fn service(state: &AppState) -> OpportunityService {
    OpportunityService::new(
        state.store.clone(),
        state.rate_cache.clone(),
        state.config.pricing.clone(),
    )
}

/// List opportunities, optionally by `?status=`
pub async fn list_opportunities(
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> impl IntoResponse {
    let status = match filter.status.as_deref() {
        None => None,
        Some(raw) => match OpportunityStatus::from_str(raw) {
            Some(status) => Some(status),
            None => {
                return AppError::ValidationError(format!("Unknown opportunity status: {}", raw))
                    .into_response()
            }
        },
    };

    match service(&state).list_opportunities(status).await {
        Ok(opportunities) => (
            StatusCode::OK,
            Json(serde_json::json!({ "opportunities": opportunities })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_opportunity(
    State(state): State<AppState>,
    Path(opportunity_id): Path<String>,
) -> impl IntoResponse {
    match service(&state).get_opportunity(&opportunity_id).await {
        Ok(opportunity) => (StatusCode::OK, Json(opportunity)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Margin analysis at the current exchange rate
pub async fn analyze_opportunity(
    State(state): State<AppState>,
    Path(opportunity_id): Path<String>,
) -> impl IntoResponse {
    match service(&state).analyze(&opportunity_id).await {
        Ok(analysis) => (StatusCode::OK, Json(analysis)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn add_provider_quote(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(opportunity_id): Path<String>,
    Json(input): Json<ProviderQuoteInput>,
) -> impl IntoResponse {
    match service(&state)
        .add_provider_quote(&actor, &opportunity_id, input)
        .await
    {
        Ok(opportunity) => (StatusCode::CREATED, Json(opportunity)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_provider_quote(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((opportunity_id, quote_id)): Path<(String, String)>,
    Json(input): Json<ProviderQuoteInput>,
) -> impl IntoResponse {
    match service(&state)
        .update_provider_quote(&actor, &opportunity_id, &quote_id, input)
        .await
    {
        Ok(opportunity) => (StatusCode::OK, Json(opportunity)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn remove_provider_quote(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((opportunity_id, quote_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match service(&state)
        .remove_item(&actor, &opportunity_id, EntryKind::Provider, &quote_id)
        .await
    {
        Ok(opportunity) => (StatusCode::OK, Json(opportunity)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn add_competitor_entry(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(opportunity_id): Path<String>,
    Json(input): Json<CompetitorEntryInput>,
) -> impl IntoResponse {
    match service(&state)
        .add_competitor_entry(&actor, &opportunity_id, input)
        .await
    {
        Ok(opportunity) => (StatusCode::CREATED, Json(opportunity)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn remove_competitor_entry(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((opportunity_id, entry_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match service(&state)
        .remove_item(&actor, &opportunity_id, EntryKind::Competitor, &entry_id)
        .await
    {
        Ok(opportunity) => (StatusCode::OK, Json(opportunity)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn approve_opportunity(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(opportunity_id): Path<String>,
    input: Option<Json<DecisionInput>>,
) -> impl IntoResponse {
    let input = input.map(|Json(i)| i).unwrap_or_default();

    match service(&state).approve(&actor, &opportunity_id, input).await {
        Ok(opportunity) => (StatusCode::OK, Json(opportunity)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn reject_opportunity(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(opportunity_id): Path<String>,
    input: Option<Json<DecisionInput>>,
) -> impl IntoResponse {
    let input = input.map(|Json(i)| i).unwrap_or_default();

    match service(&state).reject(&actor, &opportunity_id, input).await {
        Ok(opportunity) => (StatusCode::OK, Json(opportunity)).into_response(),
        Err(e) => e.into_response(),
    }
}
