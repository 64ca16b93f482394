//! Bank reconciliation routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{AppState, middleware::ApiLedger};
use quill_core::reconcile::ReconcileError;
use quill_db::repositories::{ImportBankRecordInput, ReconciliationRepository};

/// One bank statement line to import.
#[derive(Debug, Deserialize)]
pub struct ImportRecord {
    /// Statement line reference, unique per ledger.
    pub external_ref: String,
    /// Signed amount.
    pub amount: Decimal,
    /// Statement date.
    pub posted_at: DateTime<Utc>,
}

/// Reconciliation request body, dispatched on `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconcileRequest {
    /// Import bank statement lines.
    Import {
        /// Lines to import; already-seen external refs are skipped.
        records: Vec<ImportRecord>,
    },
    /// Manually pair one transaction with one bank record.
    Match {
        /// The ledger side.
        transaction_id: Uuid,
        /// The bank record side.
        bank_record_id: Uuid,
    },
    /// Clear a match.
    Unmatch {
        /// The bank record whose match to clear.
        bank_record_id: Uuid,
    },
    /// Pair unmatched transactions with bank records, oldest first.
    AutoMatch,
    /// List both unmatched sides for manual review.
    ListUnmatched,
}

/// POST /reconcile - Dispatch a reconciliation action.
async fn reconcile(
    State(state): State<AppState>,
    ledger: ApiLedger,
    Json(payload): Json<ReconcileRequest>,
) -> impl IntoResponse {
    let repo = ReconciliationRepository::new((*state.db).clone());

    match payload {
        ReconcileRequest::Import { records } => {
            let inputs: Vec<ImportBankRecordInput> = records
                .into_iter()
                .map(|r| ImportBankRecordInput {
                    external_ref: r.external_ref,
                    amount: r.amount,
                    posted_at: r.posted_at,
                })
                .collect();
            match repo.import_records(ledger.id(), inputs).await {
                Ok(imported) => {
                    info!(ledger_id = %ledger.id(), imported, "Bank records imported");
                    (StatusCode::CREATED, Json(json!({ "imported": imported }))).into_response()
                }
                Err(e) => reconcile_error_response(&e),
            }
        }
        ReconcileRequest::Match {
            transaction_id,
            bank_record_id,
        } => match repo
            .manual_match(ledger.id(), bank_record_id, transaction_id)
            .await
        {
            Ok(outcome) => {
                info!(
                    ledger_id = %ledger.id(),
                    transaction_id = %transaction_id,
                    bank_record_id = %bank_record_id,
                    amount_mismatch = outcome.amount_mismatch,
                    "Manual match recorded"
                );
                let mut body = json!({
                    "matched": {
                        "transaction_id": transaction_id,
                        "bank_record_id": bank_record_id,
                    }
                });
                if outcome.amount_mismatch {
                    body["warning"] = json!("amount_mismatch");
                }
                (StatusCode::OK, Json(body)).into_response()
            }
            Err(e) => reconcile_error_response(&e),
        },
        ReconcileRequest::Unmatch { bank_record_id } => {
            match repo.unmatch(ledger.id(), bank_record_id).await {
                Ok(()) => (
                    StatusCode::OK,
                    Json(json!({ "unmatched": bank_record_id })),
                )
                    .into_response(),
                Err(e) => reconcile_error_response(&e),
            }
        }
        ReconcileRequest::AutoMatch => match repo.auto_match(ledger.id()).await {
            Ok(report) => (
                StatusCode::OK,
                Json(json!({
                    "matched_count": report.matched.len(),
                    "matched": report.matched,
                    "ambiguous": report.ambiguous,
                    "unmatched": report.unmatched,
                })),
            )
                .into_response(),
            Err(e) => reconcile_error_response(&e),
        },
        ReconcileRequest::ListUnmatched => match repo.list_unmatched(ledger.id()).await {
            Ok(sides) => (
                StatusCode::OK,
                Json(json!({
                    "transactions": sides.transactions,
                    "bank_records": sides.bank_records,
                })),
            )
                .into_response(),
            Err(e) => reconcile_error_response(&e),
        },
    }
}

/// Maps a reconciliation error to its HTTP response.
fn reconcile_error_response(error: &ReconcileError) -> axum::response::Response {
    let status =
        StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if matches!(error, ReconcileError::Database(_)) {
        tracing::error!(error = %error, "Database error in reconciliation");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "internal_error",
                "message": "An error occurred",
            })),
        )
            .into_response();
    }

    let code = match error {
        ReconcileError::BankRecordAlreadyMatched(_) => "bank_record_already_matched",
        ReconcileError::TransactionAlreadyMatched(_) => "transaction_already_matched",
        ReconcileError::NotMatched(_) => "not_matched",
        ReconcileError::NotFound(_) => "not_found",
        ReconcileError::Database(_) => "internal_error",
    };

    (
        status,
        Json(json!({ "error": code, "message": error.to_string() })),
    )
        .into_response()
}

/// Creates the reconciliation routes (requires API key middleware externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/reconcile", post(reconcile))
}
