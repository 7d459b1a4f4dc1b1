//! Exchange rate HTTP handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Effective rate with its provenance. Never fails.
pub async fn get_exchange_rate(State(state): State<AppState>) -> impl IntoResponse {
    let rate = state.rate_cache.get_rate().await;
    (StatusCode::OK, Json(rate))
}

/// Fetch a fresh rate; provider failures surface as 502
pub async fn refresh_exchange_rate(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> impl IntoResponse {
    match state.rate_cache.refresh_rate(Some(&actor)).await {
        Ok(sample) => (StatusCode::OK, Json(sample)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn exchange_rate_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(30).clamp(1, 500);

    match state.rate_cache.history(limit).await {
        Ok(samples) => {
            (StatusCode::OK, Json(serde_json::json!({ "samples": samples }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Callable function: fetch, record and return `{success, rate, timestamp}`.
///
/// Identity is optional here; when present it is recorded as `requestedBy`.
pub async fn get_current_exchange_rate(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
) -> impl IntoResponse {
    let actor = user.map(|CurrentUser(actor)| actor);

    match state.rate_cache.refresh_rate(actor.as_ref()).await {
        Ok(sample) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "rate": sample.rate_usd_to_pen,
                "timestamp": sample.date.to_rfc3339(),
            })),
        )
            .into_response(),
        Err(AppError::Provider(detail)) => {
            tracing::error!(error = %detail, "getCurrentExchangeRate failed");
            AppError::Internal(format!("Could not obtain the exchange rate: {}", detail))
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}
