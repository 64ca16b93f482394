//! Health check endpoints.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall status: `healthy` or `degraded`.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Database reachability: `reachable` or `unreachable`.
    pub database: &'static str,
}

/// Health check handler. Pings the database so load balancers stop routing
/// to an instance that lost its pool.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                version: env!("CARGO_PKG_VERSION"),
                database: "reachable",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check could not reach the database");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    version: env!("CARGO_PKG_VERSION"),
                    database: "unreachable",
                }),
            )
        }
    }
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use sea_orm::DatabaseConnection;
    use std::sync::Arc;
    use tower::ServiceExt;

    use quill_shared::{ChargeReceipt, ChargeRequest, PaymentError, PaymentGateway};

    struct NullGateway;

    #[async_trait]
    impl PaymentGateway for NullGateway {
        async fn charge(&self, _request: &ChargeRequest) -> Result<ChargeReceipt, PaymentError> {
            Err(PaymentError::Declined("unused in these tests".to_string()))
        }
    }

    #[tokio::test]
    async fn test_lost_database_reports_degraded() {
        let state = AppState {
            db: Arc::new(DatabaseConnection::Disconnected),
            balance_tolerance: rust_decimal::Decimal::new(1, 2),
            service_token_sha256: String::new(),
            payment: Arc::new(NullGateway),
            merchant_id: None,
        };
        let app = Router::new().merge(routes()).with_state(state);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "degraded");
        assert_eq!(parsed["database"], "unreachable");
    }
}
