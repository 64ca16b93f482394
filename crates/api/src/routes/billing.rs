//! Overage billing routes.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{
    AppState,
    dunning::{DunningEngine, RunRequest, previous_month},
    middleware::auth::verify_service_token,
};
use quill_db::repositories::BillingError;

/// Request body for a billing pass.
#[derive(Debug, Deserialize)]
pub struct BillOveragesRequest {
    /// First day of the billed period; defaults with `period_end` to the
    /// previous calendar month.
    pub period_start: Option<NaiveDate>,
    /// Last day of the billed period.
    pub period_end: Option<NaiveDate>,
    /// Restrict the pass to one organization.
    pub organization_id: Option<Uuid>,
    /// Report decisions without writing anything.
    #[serde(default)]
    pub dry_run: bool,
}

/// POST /bill-overages - Run a billing pass over metered usage.
///
/// Authenticated with the bearer service token, not a ledger API key; this
/// endpoint is for the billing scheduler, not tenants.
async fn bill_overages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BillOveragesRequest>,
) -> impl IntoResponse {
    if !verify_service_token(&headers, &state.service_token_sha256) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "invalid_service_token",
                "message": "A valid bearer service token is required"
            })),
        )
            .into_response();
    }

    let (period_start, period_end) = match (payload.period_start, payload.period_end) {
        (Some(start), Some(end)) if start <= end => (start, end),
        (None, None) => previous_month(Utc::now().date_naive()),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid_period",
                    "message": "period_start and period_end must be given together, start first"
                })),
            )
                .into_response();
        }
    };

    let engine = DunningEngine::new(
        (*state.db).clone(),
        state.payment.clone(),
        state.merchant_id.clone(),
    );

    let report = match engine
        .run(&RunRequest {
            period_start,
            period_end,
            organization_id: payload.organization_id,
            dry_run: payload.dry_run,
        })
        .await
    {
        Ok(r) => r,
        Err(BillingError::OrganizationNotFound(id)) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "organization_not_found",
                    "message": format!("Organization not found: {id}")
                })),
            )
                .into_response();
        }
        Err(e) => {
            error!(error = %e, "Billing pass failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred running the billing pass"
                })),
            )
                .into_response();
        }
    };

    (StatusCode::OK, Json(report)).into_response()
}

/// Creates the billing routes; auth is the service token, checked inline.
pub fn routes() -> Router<AppState> {
    Router::new().route("/bill-overages", post(bill_overages))
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use sea_orm::DatabaseConnection;
    use sha2::{Digest, Sha256};
    use std::sync::Arc;
    use tower::ServiceExt;

    use quill_shared::{ChargeReceipt, ChargeRequest, PaymentError, PaymentGateway};

    const SERVICE_TOKEN: &str = "test-service-token";

    struct NullGateway;

    #[async_trait]
    impl PaymentGateway for NullGateway {
        async fn charge(&self, _request: &ChargeRequest) -> Result<ChargeReceipt, PaymentError> {
            Err(PaymentError::Declined("unused in these tests".to_string()))
        }
    }

    /// State with a disconnected pool; these tests never reach the database.
    fn test_state() -> AppState {
        AppState {
            db: Arc::new(DatabaseConnection::Disconnected),
            balance_tolerance: rust_decimal::Decimal::new(1, 2),
            service_token_sha256: hex::encode(Sha256::digest(SERVICE_TOKEN.as_bytes())),
            payment: Arc::new(NullGateway),
            merchant_id: Some("acct_test".to_string()),
        }
    }

    fn app() -> Router {
        let state = test_state();
        Router::new().merge(routes()).with_state(state)
    }

    fn request(token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/bill-overages")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_missing_service_token_rejected() {
        let response = app()
            .oneshot(request(None, json!({"dry_run": true})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"], "invalid_service_token");
    }

    #[tokio::test]
    async fn test_wrong_service_token_rejected() {
        let response = app()
            .oneshot(request(Some("not-the-token"), json!({"dry_run": true})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_half_specified_period_rejected() {
        let response = app()
            .oneshot(request(
                Some(SERVICE_TOKEN),
                json!({"period_start": "2026-02-01", "dry_run": true}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"], "invalid_period");
    }

    #[tokio::test]
    async fn test_inverted_period_rejected() {
        let response = app()
            .oneshot(request(
                Some(SERVICE_TOKEN),
                json!({
                    "period_start": "2026-02-28",
                    "period_end": "2026-02-01",
                    "dry_run": true,
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
