//! Correction routes: forward-dated reversals of completed transactions.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{AppState, middleware::ApiLedger};
use quill_core::correction::AdjustmentJournalInput;
use quill_core::ledger::{AccountKey, AccountType, EntryInput, EntryType, LedgerError};
use quill_db::repositories::{
    AdjustmentRecord, RecordAdjustmentInput, ReverseTransactionInput, TransactionRepository,
};

fn default_adjustment_type() -> String {
    "error_correction".to_string()
}

/// One caller-authored adjustment line.
#[derive(Debug, Deserialize)]
pub struct AdjustmentEntry {
    /// Account in the chart of accounts.
    pub account_type: AccountType,
    /// Sub-account entity, if any.
    pub entity_id: Option<Uuid>,
    /// Debit or credit.
    pub entry_type: EntryType,
    /// Positive amount.
    pub amount: Decimal,
}

/// Request body for recording an adjustment.
///
/// With `original_transaction_id` the adjustment is a reversal and the
/// entries are derived from the original. Without it, `entries` carries
/// the caller-authored correcting lines.
#[derive(Debug, Deserialize)]
pub struct RecordAdjustmentRequest {
    /// Correction category.
    #[serde(default = "default_adjustment_type")]
    pub adjustment_type: String,
    /// Caller-authored adjustment lines.
    #[serde(default)]
    pub entries: Vec<AdjustmentEntry>,
    /// Human explanation; required.
    pub reason: String,
    /// Who prepared the correction.
    pub prepared_by: String,
    /// The completed transaction to reverse, if this is a reversal.
    pub original_transaction_id: Option<Uuid>,
    /// Accounting date of the adjustment; defaults to today. Must fall in
    /// an open period.
    pub effective_date: Option<NaiveDate>,
}

/// POST /record-adjustment - Post a correcting adjustment.
async fn record_adjustment(
    State(state): State<AppState>,
    ledger: ApiLedger,
    Json(payload): Json<RecordAdjustmentRequest>,
) -> impl IntoResponse {
    let repo = TransactionRepository::new((*state.db).clone(), state.balance_tolerance);
    let effective_date = payload
        .effective_date
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    let journal = AdjustmentJournalInput {
        adjustment_type: payload.adjustment_type,
        reason: payload.reason,
        prepared_by: payload.prepared_by,
        original_transaction_id: payload.original_transaction_id,
    };

    let result = if let Some(original_id) = payload.original_transaction_id {
        // The original must belong to the calling ledger.
        match repo.find_with_entries(original_id).await {
            Ok(found) if found.transaction.ledger_id != ledger.id() => {
                return ledger_error_response(&LedgerError::TransactionNotFound(original_id));
            }
            Ok(_) => {}
            Err(e) => return ledger_error_response(&e),
        }
        repo.reverse_transaction(ReverseTransactionInput {
            original_id,
            effective_date,
            journal,
        })
        .await
    } else {
        if payload.entries.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "missing_entries",
                    "message": "An adjustment needs entries or an original_transaction_id",
                })),
            )
                .into_response();
        }
        repo.record_adjustment(RecordAdjustmentInput {
            ledger_id: ledger.id(),
            effective_date,
            entries: entry_inputs(&payload.entries),
            journal,
        })
        .await
    };

    let adjustment: AdjustmentRecord = match result {
        Ok(a) => a,
        Err(e) => return ledger_error_response(&e),
    };

    info!(
        ledger_id = %ledger.id(),
        transaction_id = %adjustment.transaction.id,
        adjustment_id = %adjustment.journal.id,
        "Adjustment recorded"
    );

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "transaction_id": adjustment.transaction.id,
            "adjustment_id": adjustment.journal.id,
            "entries_created": adjustment.entries.len(),
        })),
    )
        .into_response()
}

/// Converts request lines into ledger entry inputs.
fn entry_inputs(entries: &[AdjustmentEntry]) -> Vec<EntryInput> {
    entries
        .iter()
        .map(|e| EntryInput {
            account: AccountKey {
                account_type: e.account_type,
                entity_id: e.entity_id,
            },
            entry_type: e.entry_type,
            amount: e.amount,
        })
        .collect()
}

/// Request body for voiding a transaction.
#[derive(Debug, Deserialize)]
pub struct VoidTransactionRequest {
    /// The transaction to void.
    pub transaction_id: Uuid,
}

/// POST /void-transaction - Void a transaction without touching its entries.
async fn void_transaction(
    State(state): State<AppState>,
    ledger: ApiLedger,
    Json(payload): Json<VoidTransactionRequest>,
) -> impl IntoResponse {
    let repo = TransactionRepository::new((*state.db).clone(), state.balance_tolerance);

    // The transaction must belong to the calling ledger.
    match repo.find_with_entries(payload.transaction_id).await {
        Ok(found) if found.transaction.ledger_id != ledger.id() => {
            return ledger_error_response(&LedgerError::TransactionNotFound(
                payload.transaction_id,
            ));
        }
        Ok(_) => {}
        Err(e) => return ledger_error_response(&e),
    }

    match repo.void_transaction(payload.transaction_id).await {
        Ok(voided) => {
            info!(
                ledger_id = %ledger.id(),
                transaction_id = %voided.id,
                "Transaction voided"
            );

            (
                StatusCode::OK,
                Json(json!({
                    "transaction_id": voided.id,
                    "status": "voided",
                })),
            )
                .into_response()
        }
        Err(e) => ledger_error_response(&e),
    }
}

/// Maps a ledger error to its HTTP response.
pub(crate) fn ledger_error_response(error: &LedgerError) -> axum::response::Response {
    let status =
        StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if matches!(error, LedgerError::Database(_)) {
        tracing::error!(error = %error, "Database error in ledger operation");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "internal_error",
                "message": "An error occurred",
            })),
        )
            .into_response();
    }

    let body = match error {
        LedgerError::ImbalancedEntries { difference, .. } => json!({
            "error": error.error_code(),
            "message": error.to_string(),
            "difference": difference,
        }),
        _ => json!({
            "error": error.error_code(),
            "message": error.to_string(),
        }),
    };

    (status, Json(body)).into_response()
}

/// Creates the adjustment routes (requires API key middleware externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/record-adjustment", post(record_adjustment))
        .route("/void-transaction", post(void_transaction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_entry_body_deserializes() {
        let request: RecordAdjustmentRequest = serde_json::from_value(json!({
            "adjustment_type": "reclassification",
            "entries": [
                {"account_type": "expense", "entry_type": "debit", "amount": "25.00"},
                {"account_type": "fees", "entry_type": "credit", "amount": "25.00"}
            ],
            "reason": "Fee booked to the wrong account",
            "prepared_by": "jordan@example.com"
        }))
        .unwrap();

        assert_eq!(request.adjustment_type, "reclassification");
        assert_eq!(request.entries.len(), 2);
        assert!(request.original_transaction_id.is_none());
        assert!(request.effective_date.is_none());

        let inputs = entry_inputs(&request.entries);
        assert_eq!(inputs[0].account.account_type, AccountType::Expense);
        assert_eq!(inputs[0].entry_type, EntryType::Debit);
        assert_eq!(inputs[1].amount, dec!(25.00));
    }

    #[test]
    fn test_reversal_body_deserializes_without_entries() {
        let original = Uuid::now_v7();
        let request: RecordAdjustmentRequest = serde_json::from_value(json!({
            "reason": "Duplicate sale",
            "prepared_by": "jordan@example.com",
            "original_transaction_id": original,
        }))
        .unwrap();

        assert_eq!(request.adjustment_type, "error_correction");
        assert!(request.entries.is_empty());
        assert_eq!(request.original_transaction_id, Some(original));
    }
}
