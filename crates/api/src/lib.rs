//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for period close, corrections, reconciliation, and
//!   overage billing
//! - API key authentication middleware
//! - The dunning run orchestrator that drives the payment collaborator

pub mod dunning;
pub mod middleware;
pub mod routes;

use axum::Router;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use quill_shared::PaymentGateway;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Permitted debit/credit mismatch in major currency units.
    pub balance_tolerance: Decimal,
    /// SHA-256 hex digest of the billing service token.
    pub service_token_sha256: String,
    /// Payment collaborator for overage charges.
    pub payment: Arc<dyn PaymentGateway>,
    /// Platform merchant identifier at the payment collaborator.
    pub merchant_id: Option<String>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
