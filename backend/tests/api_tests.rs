//! HTTP surface tests driven through the router with `oneshot`

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pipeline_backend::create_app;
use serde_json::{json, Value};
use shared::StockLocation;
use tower::ServiceExt;

use common::{app_state, dec, memory_store, seed_sku, StubRateProvider};

const USER: &str = "user-42";

fn build_app(provider: std::sync::Arc<StubRateProvider>) -> (Router, pipeline_backend::store::SharedStore) {
    let store = memory_store();
    (create_app(app_state(&store, provider)), store)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn requirement_body() -> Value {
    json!({
        "source": "Cliente",
        "contactInfo": "Botica Central",
        "items": [{ "requestedProduct": "Vitamina D3", "dosage": "5000 UI" }]
    })
}

#[tokio::test]
async fn health_reports_connected_store() {
    let (app, _) = build_app(StubRateProvider::returning(dec("3.70")));

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "connected");
}

#[tokio::test]
async fn mutations_require_caller_identity() {
    let (app, _) = build_app(StubRateProvider::returning(dec("3.70")));

    let (status, body) = send(&app, post("/api/v1/requirements", None, requirement_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(body["error"]["message_es"].as_str().unwrap().contains("x-user-id"));

    // Reads stay open
    let (status, body) = send(&app, get("/api/v1/requirements")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requirements"], json!([]));
}

#[tokio::test]
async fn requirement_round_trip_stamps_the_caller() {
    let (app, _) = build_app(StubRateProvider::returning(dec("3.70")));

    let (status, created) =
        send(&app, post("/api/v1/requirements", Some(USER), requirement_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["createdBy"], USER);
    assert_eq!(created["items"][0]["status"], "pending_review");

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(&app, get(&format!("/api/v1/requirements/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], id);

    let (status, body) = send(
        &app,
        post(&format!("/api/v1/requirements/{}/items/0/analysis", id), Some(USER), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "PRECONDITION_FAILED");

    let (status, _) = send(
        &app,
        post(
            &format!("/api/v1/requirements/{}/items/0/classify", id),
            Some(USER),
            json!({ "productId": "prod-vitamina-d" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, opportunity) = send(
        &app,
        post(&format!("/api/v1/requirements/{}/items/0/analysis", id), Some(USER), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(opportunity["status"], "analysis");
    assert_eq!(opportunity["endGoal"], "quote_customer");
}

#[tokio::test]
async fn unknown_resources_and_filters() {
    let (app, _) = build_app(StubRateProvider::returning(dec("3.70")));

    let (status, body) = send(&app, get("/api/v1/opportunities/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(&app, get("/api/v1/opportunities?status=bogus")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, get("/api/v1/opportunities?status=analysis")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["opportunities"], json!([]));
}

#[tokio::test]
async fn short_sale_is_unprocessable() {
    let (app, store) = build_app(StubRateProvider::returning(dec("3.70")));
    let sku = seed_sku(&store, &[(StockLocation::LaVictoria, 1)]).await;

    let (status, body) = send(
        &app,
        post(
            "/api/v1/sales",
            Some(USER),
            json!({
                "customerName": "Cliente mostrador",
                "items": [{ "skuId": sku.id, "quantity": 2 }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");

    let (status, summary) = send(&app, get(&format!("/api/v1/inventory/skus/{}", sku.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["availableForSale"], 1);
}

#[tokio::test]
async fn exchange_rate_endpoints() {
    let provider = StubRateProvider::returning(dec("3.70"));
    let (app, _) = build_app(provider.clone());

    let (status, body) = send(&app, get("/api/v1/exchange-rate")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fetched");
    assert_eq!(body["rate"], "3.70");

    let (status, body) = send(&app, get("/api/v1/exchange-rate")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "cached");
    assert_eq!(provider.calls(), 1);

    let (status, _) = send(&app, post("/api/v1/exchange-rate/refresh", None, json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) =
        send(&app, post("/api/v1/exchange-rate/refresh", Some(USER), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requestedBy"], USER);
    assert_eq!(provider.calls(), 2);

    let (status, body) = send(&app, get("/api/v1/exchange-rate/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["samples"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn refresh_failure_is_a_bad_gateway() {
    let (app, _) = build_app(StubRateProvider::failing());

    let (status, body) =
        send(&app, post("/api/v1/exchange-rate/refresh", Some(USER), json!({}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "PROVIDER_ERROR");

    // The plain read still answers, from the default
    let (status, body) = send(&app, get("/api/v1/exchange-rate")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "default");
}

#[tokio::test]
async fn callable_function_returns_rate_and_timestamp() {
    let (app, _) = build_app(StubRateProvider::returning(dec("3.7512")));

    let (status, body) = send(
        &app,
        post("/api/v1/functions/get-current-exchange-rate", None, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["rate"], "3.7512");
    assert!(body["timestamp"].as_str().is_some());

    let (app, _) = build_app(StubRateProvider::failing());
    let (status, body) = send(
        &app,
        post("/api/v1/functions/get-current-exchange-rate", Some(USER), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
}
