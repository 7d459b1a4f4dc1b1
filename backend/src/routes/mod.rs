//! Route definitions for the Opportunity Pipeline
//!
//! Mutating routes require caller identity through the `CurrentUser`
//! extractor; read routes are open.

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/requirements", requirement_routes())
        .nest("/opportunities", opportunity_routes())
        .nest("/catalog", catalog_routes())
        .nest("/inventory", inventory_routes())
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/sales", sales_routes())
        .nest("/quotations", quotation_routes())
        .nest("/customers", customer_routes())
        .nest("/exchange-rate", exchange_rate_routes())
        // Callable function kept at its historical path
        .route(
            "/functions/get-current-exchange-rate",
            post(handlers::get_current_exchange_rate),
        )
}

fn requirement_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_requirements).post(handlers::create_requirement),
        )
        .route("/inbox", get(handlers::requirement_inbox))
        .route("/:requirement_id", get(handlers::get_requirement))
        .route(
            "/:requirement_id/items/:item_index/classify",
            post(handlers::classify_item),
        )
        .route(
            "/:requirement_id/items/:item_index/analysis",
            post(handlers::start_analysis),
        )
}

fn opportunity_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_opportunities))
        .route("/:opportunity_id", get(handlers::get_opportunity))
        .route("/:opportunity_id/analysis", get(handlers::analyze_opportunity))
        .route("/:opportunity_id/quotes", post(handlers::add_provider_quote))
        .route(
            "/:opportunity_id/quotes/:quote_id",
            put(handlers::update_provider_quote).delete(handlers::remove_provider_quote),
        )
        .route(
            "/:opportunity_id/competitors",
            post(handlers::add_competitor_entry),
        )
        .route(
            "/:opportunity_id/competitors/:entry_id",
            delete(handlers::remove_competitor_entry),
        )
        .route("/:opportunity_id/approve", post(handlers::approve_opportunity))
        .route("/:opportunity_id/reject", post(handlers::reject_opportunity))
        .route(
            "/:opportunity_id/quotation-draft",
            get(handlers::draft_quotation),
        )
}

fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/categories/:category_id", delete(handlers::delete_category))
        .route(
            "/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/products/:product_id", delete(handlers::delete_product))
        .route(
            "/brands",
            get(handlers::list_brands).post(handlers::create_brand),
        )
        .route("/brands/:brand_id", delete(handlers::delete_brand))
        .route("/skus", get(handlers::list_skus).post(handlers::create_sku))
        .route(
            "/skus/:sku_id",
            get(handlers::get_sku).delete(handlers::delete_sku),
        )
        .route("/candidates", get(handlers::catalog_candidates))
}

fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/skus/:sku_id", get(handlers::get_stock_summary))
        .route("/skus/:sku_id/transfer", post(handlers::transfer_stock))
}

fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchase_orders).post(handlers::create_purchase_order),
        )
        .route("/candidates", get(handlers::purchase_candidates))
        .route("/:order_id", get(handlers::get_purchase_order))
        .route("/:order_id/receive", post(handlers::receive_purchase_order))
        .route("/:order_id/cancel", post(handlers::cancel_purchase_order))
}

fn sales_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::register_sale))
        .route("/:sale_id", get(handlers::get_sale))
}

fn quotation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_quotations).post(handlers::create_quotation),
        )
        .route("/pending", get(handlers::pending_quotations))
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_customers).post(handlers::create_customer),
        )
        .route(
            "/:customer_id",
            get(handlers::get_customer).put(handlers::update_customer),
        )
}

fn exchange_rate_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_exchange_rate))
        .route("/refresh", post(handlers::refresh_exchange_rate))
        .route("/history", get(handlers::exchange_rate_history))
}
