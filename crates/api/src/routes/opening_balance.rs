//! Opening balance routes.

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

use crate::{AppState, middleware::ApiLedger, routes::adjustments::ledger_error_response};
use quill_core::ledger::{
    AccountClass, AccountKey, AccountType, EntryInput, EntryType, LedgerService, TransactionType,
};
use quill_db::repositories::{CreateTransactionInput, TransactionRepository};

/// One account balance as of the migration date.
#[derive(Debug, Deserialize)]
pub struct OpeningBalance {
    /// Account in the chart of accounts.
    pub account_type: AccountType,
    /// Sub-account entity, if any.
    pub entity_id: Option<Uuid>,
    /// Signed balance in the account's natural convention. Negative values
    /// are contra balances (an overdrawn bank account, a debit equity).
    pub balance: Decimal,
}

/// Request body for recording opening balances.
#[derive(Debug, Deserialize)]
pub struct OpeningBalanceRequest {
    /// Date the balances are taken as of.
    pub as_of_date: NaiveDate,
    /// Where the balances came from (prior system, audited statement).
    pub source: String,
    /// Per-account balances.
    pub balances: Vec<OpeningBalance>,
}

/// POST /record-opening-balance - Seed a ledger with balances migrated from
/// a prior system.
///
/// Callers supply signed balances, not journal lines; the debit or credit
/// side of each entry follows from the account's sign convention. Rejected
/// with 409 when opening balances already exist, and with 400 when the
/// accounting equation (assets = liabilities + equity) does not hold.
async fn record_opening_balance(
    State(state): State<AppState>,
    ledger: ApiLedger,
    Json(payload): Json<OpeningBalanceRequest>,
) -> impl IntoResponse {
    let repo = TransactionRepository::new((*state.db).clone(), state.balance_tolerance);

    match repo.has_opening_balance(ledger.id()).await {
        Ok(true) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "opening_balance_exists",
                    "message": "This ledger already has opening balances"
                })),
            )
                .into_response();
        }
        Ok(false) => {}
        Err(e) => return ledger_error_response(&e),
    }

    let entries: Vec<EntryInput> = payload
        .balances
        .iter()
        .filter_map(|b| entry_from_balance(b.account_type, b.entity_id, b.balance))
        .collect();

    let (assets, liabilities_and_equity) = equation_sides(&entries);
    if (assets - liabilities_and_equity).abs() > state.balance_tolerance {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "accounting_equation_violated",
                "message": "Opening balances must satisfy assets = liabilities + equity",
                "assets": assets,
                "liabilities_and_equity": liabilities_and_equity,
            })),
        )
            .into_response();
    }

    let totals = LedgerService::calculate_totals(&entries);
    let entry_count = entries.len();
    let created = match repo
        .create_transaction(CreateTransactionInput {
            ledger_id: ledger.id(),
            transaction_type: TransactionType::OpeningBalance,
            amount: totals.debits,
            currency: "USD".to_string(),
            description: Some(format!("Opening balance from {}", payload.source)),
            reference_id: None,
            effective_date: payload.as_of_date,
            entries,
        })
        .await
    {
        Ok(t) => t,
        Err(e) => return ledger_error_response(&e),
    };
    let transaction = &created.transaction;

    info!(
        ledger_id = %ledger.id(),
        transaction_id = %transaction.id,
        source = %payload.source,
        assets = %assets,
        "Opening balances recorded"
    );

    // The opening balance record is realized as the transaction itself,
    // so both ids refer to the same row.
    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "opening_balance_id": transaction.id,
            "transaction_id": transaction.id,
            "summary": {
                "as_of_date": transaction.effective_date,
                "accounts": entry_count,
                "total_debits": totals.debits,
                "total_credits": totals.credits,
                "assets": assets,
                "liabilities_and_equity": liabilities_and_equity,
            }
        })),
    )
        .into_response()
}

/// Turns a signed balance into a journal entry on the account's natural
/// side, or the opposite side for contra balances. Zero balances produce
/// no entry.
fn entry_from_balance(
    account_type: AccountType,
    entity_id: Option<Uuid>,
    balance: Decimal,
) -> Option<EntryInput> {
    if balance.is_zero() {
        return None;
    }
    let natural = match account_type.class() {
        AccountClass::DebitNormal => EntryType::Debit,
        AccountClass::CreditNormal => EntryType::Credit,
    };
    let entry_type = if balance > Decimal::ZERO {
        natural
    } else {
        natural.opposite()
    };
    Some(EntryInput {
        account: AccountKey {
            account_type,
            entity_id,
        },
        entry_type,
        amount: balance.abs(),
    })
}

/// Signed totals of the two sides of the accounting equation.
fn equation_sides(entries: &[EntryInput]) -> (Decimal, Decimal) {
    let mut assets = Decimal::ZERO;
    let mut liabilities_and_equity = Decimal::ZERO;

    for entry in entries {
        let (debit, credit) = match entry.entry_type {
            EntryType::Debit => (entry.amount, Decimal::ZERO),
            EntryType::Credit => (Decimal::ZERO, entry.amount),
        };
        let class = entry.account.account_type.class();
        let change = class.balance_change(debit, credit);

        if entry.account.account_type.is_asset_side() {
            assets += change;
        } else if class == AccountClass::CreditNormal {
            liabilities_and_equity += change;
        }
        // Debit-normal non-asset accounts (expenses, fees) have no place in
        // an opening balance equation; the entry-set balance check still
        // applies to them.
    }

    (assets, liabilities_and_equity)
}

/// Creates the opening balance routes (requires API key middleware externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/record-opening-balance", post(record_opening_balance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(account_type: AccountType, entry_type: EntryType, amount: Decimal) -> EntryInput {
        EntryInput {
            account: AccountKey {
                account_type,
                entity_id: None,
            },
            entry_type,
            amount,
        }
    }

    #[test]
    fn test_positive_balances_post_on_natural_side() {
        let bank = entry_from_balance(AccountType::Bank, None, dec!(1000.00)).unwrap();
        assert_eq!(bank.entry_type, EntryType::Debit);
        assert_eq!(bank.amount, dec!(1000.00));

        let equity = entry_from_balance(AccountType::Equity, None, dec!(1000.00)).unwrap();
        assert_eq!(equity.entry_type, EntryType::Credit);
        assert_eq!(equity.amount, dec!(1000.00));
    }

    #[test]
    fn test_negative_balances_flip_to_contra_side() {
        // Overdrawn bank account is a credit balance on an asset account.
        let bank = entry_from_balance(AccountType::Bank, None, dec!(-250.00)).unwrap();
        assert_eq!(bank.entry_type, EntryType::Credit);
        assert_eq!(bank.amount, dec!(250.00));

        let creator = entry_from_balance(AccountType::CreatorBalance, None, dec!(-40.00)).unwrap();
        assert_eq!(creator.entry_type, EntryType::Debit);
        assert_eq!(creator.amount, dec!(40.00));
    }

    #[test]
    fn test_zero_balance_produces_no_entry() {
        assert!(entry_from_balance(AccountType::Cash, None, Decimal::ZERO).is_none());
    }

    #[test]
    fn test_equation_holds_for_balanced_opening() {
        let entries = vec![
            entry(AccountType::Bank, EntryType::Debit, dec!(1000.00)),
            entry(AccountType::Equity, EntryType::Credit, dec!(1000.00)),
        ];
        let (assets, liabilities_and_equity) = equation_sides(&entries);
        assert_eq!(assets, dec!(1000.00));
        assert_eq!(liabilities_and_equity, dec!(1000.00));
    }

    #[test]
    fn test_equation_detects_mismatch() {
        let entries = vec![
            entry(AccountType::Cash, EntryType::Debit, dec!(500.00)),
            entry(AccountType::CreatorBalance, EntryType::Credit, dec!(300.00)),
            entry(AccountType::Equity, EntryType::Credit, dec!(100.00)),
        ];
        let (assets, liabilities_and_equity) = equation_sides(&entries);
        assert_ne!(assets, liabilities_and_equity);
    }

    #[test]
    fn test_contra_balances_reduce_their_side() {
        // Derived from signed balances: a positive bank balance, an
        // overdrawn cash account, and the equity that funds the difference.
        let entries: Vec<EntryInput> = [
            (AccountType::Bank, dec!(1000.00)),
            (AccountType::Cash, dec!(-200.00)),
            (AccountType::Equity, dec!(800.00)),
        ]
        .into_iter()
        .filter_map(|(ty, balance)| entry_from_balance(ty, None, balance))
        .collect();

        let (assets, liabilities_and_equity) = equation_sides(&entries);
        assert_eq!(assets, dec!(800.00));
        assert_eq!(liabilities_and_equity, dec!(800.00));
    }
}
