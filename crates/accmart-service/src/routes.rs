//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, patch, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    admin, deposits, health, products, purchases, transactions, users, webhooks,
};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Maximum concurrent requests for admin endpoints.
const ADMIN_MAX_CONCURRENT_REQUESTS: usize = 10;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/products` - Products for sale
///
/// ## Users (JWT auth)
/// - `PUT /v1/users/me` - Sync the caller's profile
/// - `GET /v1/users/me` - Get the caller's profile and balance
/// - `GET /v1/products/:id` - Product detail
/// - `POST /v1/purchases` - Buy one product
/// - `POST /v1/purchases/bulk` - Buy a cart
/// - `GET /v1/purchases` - Purchase history
/// - `POST /v1/deposits/initialize` - Start a deposit
/// - `POST /v1/deposits/verify` - Confirm a deposit
/// - `GET /v1/transactions` - Ledger history
///
/// ## Admin (JWT auth, stored admin flag)
/// - `GET /v1/admin/users`, `PATCH /v1/admin/users/:id/admin-status`
/// - `GET /v1/admin/stats`
/// - `GET /v1/admin/products`, `POST /v1/admin/products`
/// - `GET /v1/admin/deposits`, `GET /v1/admin/purchases`
/// - `PATCH /v1/admin/transactions/:id/status`
///
/// ## Webhooks (Signature verification)
/// - `POST /webhooks/paystack` - Paystack webhooks
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/:id/admin-status", patch(admin::set_admin_status))
        .route("/stats", get(admin::stats))
        .route(
            "/products",
            get(admin::list_products).post(admin::create_product),
        )
        .route("/deposits", get(admin::list_deposits))
        .route("/purchases", get(admin::list_purchases))
        .route(
            "/transactions/:id/status",
            patch(admin::update_transaction_status),
        )
        .layer(ConcurrencyLimitLayer::new(ADMIN_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Users
        .route("/users/me", get(users::get_me).put(users::sync_user))
        // Catalogue
        .route("/products", get(products::list_products))
        .route("/products/:id", get(products::get_product))
        .route("/categories", get(products::list_categories))
        // Purchases
        .route(
            "/purchases",
            get(purchases::list_purchases).post(purchases::create_purchase),
        )
        .route("/purchases/bulk", post(purchases::create_bulk_purchase))
        // Deposits
        .route("/deposits/initialize", post(deposits::initialize_deposit))
        .route("/deposits/verify", post(deposits::verify_deposit))
        // Ledger
        .route("/transactions", get(transactions::list_transactions))
        .nest("/admin", admin_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - controlled by Paystack)
        .route("/webhooks/paystack", post(webhooks::paystack_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
