//! Period close routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{AppState, middleware::ApiLedger};
use quill_core::period::{self, PeriodError, PeriodGranularity};
use quill_db::repositories::{ClosePeriodInput, PeriodRepository};

/// Request body for closing a period.
#[derive(Debug, Deserialize)]
pub struct ClosePeriodRequest {
    /// Calendar year.
    pub year: i32,
    /// Month 1-12; exactly one of `month`/`quarter` must be set.
    pub month: Option<u32>,
    /// Quarter 1-4.
    pub quarter: Option<u32>,
    /// Free-form close notes.
    pub notes: Option<String>,
}

/// POST /close-period - Close an accounting period with a frozen snapshot.
async fn close_period(
    State(state): State<AppState>,
    ledger: ApiLedger,
    Json(payload): Json<ClosePeriodRequest>,
) -> impl IntoResponse {
    let (granularity, bounds) = match (payload.month, payload.quarter) {
        (Some(month), None) => (
            PeriodGranularity::Monthly,
            period::month_bounds(payload.year, month),
        ),
        (None, Some(quarter)) => (
            PeriodGranularity::Quarterly,
            period::quarter_bounds(payload.year, quarter),
        ),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid_period",
                    "message": "Exactly one of month or quarter is required"
                })),
            )
                .into_response();
        }
    };

    let (start_date, end_date) = match bounds {
        Ok(range) => range,
        Err(e) => return period_error_response(&e),
    };

    let repo = PeriodRepository::new((*state.db).clone(), state.balance_tolerance);
    let closed = match repo
        .close_period(ClosePeriodInput {
            ledger_id: ledger.id(),
            start_date,
            end_date,
            granularity,
            notes: payload.notes,
        })
        .await
    {
        Ok(c) => c,
        Err(e) => return period_error_response(&e),
    };

    info!(
        ledger_id = %ledger.id(),
        period_id = %closed.period.id,
        start_date = %start_date,
        end_date = %end_date,
        snapshot_hash = %closed.snapshot.content_hash,
        "Period closed"
    );

    (
        StatusCode::CREATED,
        Json(json!({
            "period_id": closed.period.id,
            "start_date": closed.period.start_date,
            "end_date": closed.period.end_date,
            "status": "closed",
            "snapshot": {
                "id": closed.snapshot.id,
                "content_hash": closed.snapshot.content_hash,
                "total_debits": closed.snapshot.total_debits,
                "total_credits": closed.snapshot.total_credits,
                "is_balanced": closed.snapshot.is_balanced,
            },
            "balance_tolerance": state.balance_tolerance,
        })),
    )
        .into_response()
}

/// Maps a period error to its HTTP response.
pub(crate) fn period_error_response(error: &PeriodError) -> axum::response::Response {
    let status =
        StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let body = match error {
        PeriodError::UnbalancedLedger {
            debits,
            credits,
            difference,
        } => json!({
            "error": "unbalanced_ledger",
            "message": error.to_string(),
            "debits": debits,
            "credits": credits,
            "difference": difference,
        }),
        PeriodError::AlreadyClosed { .. } => json!({
            "error": "period_already_closed",
            "message": error.to_string(),
        }),
        PeriodError::InvalidMonth(_) | PeriodError::InvalidQuarter(_) => json!({
            "error": "invalid_period",
            "message": error.to_string(),
        }),
        PeriodError::Database(_) => {
            tracing::error!(error = %error, "Database error in period operation");
            json!({
                "error": "internal_error",
                "message": "An error occurred",
            })
        }
    };

    (status, Json(body)).into_response()
}

/// Creates the period routes (requires API key middleware externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/close-period", post(close_period))
}
