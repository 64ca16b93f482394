//! Balance routes: derived account balances and on-demand trial balances.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{AppState, middleware::ApiLedger};
use quill_db::repositories::{AccountError, AccountRepository, PeriodRepository};

use super::periods::period_error_response;

/// GET /accounts/{account_id}/balance - Derived balance of one account.
async fn get_account_balance(
    State(state): State<AppState>,
    ledger: ApiLedger,
    Path(account_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = AccountRepository::new((*state.db).clone());

    match repo.account_balance(ledger.id(), account_id).await {
        Ok(balance) => (
            StatusCode::OK,
            Json(json!({
                "account_id": account_id,
                "balance": balance,
            })),
        )
            .into_response(),
        Err(AccountError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "account_not_found",
                "message": format!("Account not found: {account_id}"),
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to compute account balance");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred",
                })),
            )
                .into_response()
        }
    }
}

/// Request body for taking a trial balance snapshot.
#[derive(Debug, Default, Deserialize)]
pub struct TakeSnapshotRequest {
    /// Count entries dated on or before this date; defaults to today.
    pub through: Option<NaiveDate>,
}

/// POST /trial-balance - Take and persist a trial balance snapshot.
///
/// Unlike the close path this succeeds even when the books do not balance;
/// the snapshot records the discrepancy for audit.
async fn take_trial_balance(
    State(state): State<AppState>,
    ledger: ApiLedger,
    Json(payload): Json<TakeSnapshotRequest>,
) -> impl IntoResponse {
    let repo = PeriodRepository::new((*state.db).clone(), state.balance_tolerance);
    let through = payload.through.unwrap_or_else(|| Utc::now().date_naive());

    match repo.take_snapshot(ledger.id(), through).await {
        Ok(snapshot) => {
            info!(
                ledger_id = %ledger.id(),
                snapshot_id = %snapshot.id,
                is_balanced = snapshot.is_balanced,
                "Trial balance snapshot taken"
            );

            (
                StatusCode::CREATED,
                Json(json!({
                    "snapshot_id": snapshot.id,
                    "content_hash": snapshot.content_hash,
                    "total_debits": snapshot.total_debits,
                    "total_credits": snapshot.total_credits,
                    "is_balanced": snapshot.is_balanced,
                    "taken_at": snapshot.taken_at,
                })),
            )
                .into_response()
        }
        Err(e) => period_error_response(&e),
    }
}

/// GET /trial-balance - The most recent snapshot for the calling ledger.
async fn latest_trial_balance(
    State(state): State<AppState>,
    ledger: ApiLedger,
) -> impl IntoResponse {
    let repo = PeriodRepository::new((*state.db).clone(), state.balance_tolerance);

    match repo.latest_snapshot(ledger.id()).await {
        Ok(Some(snapshot)) => (
            StatusCode::OK,
            Json(json!({
                "snapshot_id": snapshot.id,
                "content_hash": snapshot.content_hash,
                "total_debits": snapshot.total_debits,
                "total_credits": snapshot.total_credits,
                "is_balanced": snapshot.is_balanced,
                "taken_at": snapshot.taken_at,
            })),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "no_snapshot",
                "message": "No trial balance snapshot has been taken",
            })),
        )
            .into_response(),
        Err(e) => period_error_response(&e),
    }
}

/// Creates the balance routes (requires API key middleware externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts/{account_id}/balance", get(get_account_balance))
        .route(
            "/trial-balance",
            post(take_trial_balance).get(latest_trial_balance),
        )
}
