//! Bank reconciliation matching.
//!
//! Auto-matching walks unmatched ledger transactions oldest-first and looks
//! for unmatched bank records within one cent of the transaction amount.
//! Exactly one candidate makes a pair; several equally-good candidates leave
//! the transaction for manual review rather than guessing. Each bank record
//! is consumed by at most one transaction per run.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Amounts within this distance are considered the same money movement.
pub const MATCH_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// An unmatched ledger transaction, as a matching candidate.
#[derive(Debug, Clone, Serialize)]
pub struct UnmatchedTransaction {
    /// Transaction id.
    pub id: Uuid,
    /// Gross amount; sign carries direction.
    pub amount: Decimal,
    /// Accounting date.
    pub effective_date: NaiveDate,
}

/// An imported bank statement line awaiting a match.
#[derive(Debug, Clone, Serialize)]
pub struct UnmatchedBankRecord {
    /// Bank record id.
    pub id: Uuid,
    /// Statement amount; sign carries direction.
    pub amount: Decimal,
    /// Statement date.
    pub posted_at: DateTime<Utc>,
}

/// One transaction paired with one bank record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchPair {
    /// The ledger side.
    pub transaction_id: Uuid,
    /// The bank record side.
    pub bank_record_id: Uuid,
}

/// Result of an auto-match pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchReport {
    /// Pairs that matched.
    pub matched: Vec<MatchPair>,
    /// Transactions skipped because several records fit equally well.
    pub ambiguous: Vec<Uuid>,
    /// Transactions with no candidate at all.
    pub unmatched: Vec<Uuid>,
}

/// Errors from match operations.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The bank record was already consumed by an earlier match.
    #[error("Bank record {0} is already matched")]
    BankRecordAlreadyMatched(Uuid),

    /// The transaction was already consumed by an earlier match.
    #[error("Transaction {0} is already matched")]
    TransactionAlreadyMatched(Uuid),

    /// The bank record is not matched, so there is nothing to unmatch.
    #[error("Bank record {0} is not matched")]
    NotMatched(Uuid),

    /// Referenced record does not exist.
    #[error("Record not found: {0}")]
    NotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl ReconcileError {
    /// HTTP status code for API responses.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::BankRecordAlreadyMatched(_) | Self::TransactionAlreadyMatched(_) => 409,
            Self::NotMatched(_) => 422,
            Self::NotFound(_) => 404,
            Self::Database(_) => 500,
        }
    }
}

/// True when the two amounts are within [`MATCH_TOLERANCE`] of each other.
///
/// Manual matches are allowed to disagree on amount; callers surface the
/// disagreement as a warning instead of rejecting the pairing.
#[must_use]
pub fn amounts_agree(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= MATCH_TOLERANCE
}

/// Pairs transactions with bank records on amount within [`MATCH_TOLERANCE`].
///
/// Transactions are processed oldest-first. Each bank record is consumed by
/// at most one transaction. A transaction whose candidate set holds more than
/// one record is reported as ambiguous and consumes nothing.
#[must_use]
pub fn auto_match(
    transactions: &[UnmatchedTransaction],
    bank_records: &[UnmatchedBankRecord],
) -> MatchReport {
    let mut txns: Vec<&UnmatchedTransaction> = transactions.iter().collect();
    txns.sort_by_key(|t| (t.effective_date, t.id));

    let mut candidates: Vec<&UnmatchedBankRecord> = bank_records.iter().collect();
    candidates.sort_by_key(|r| (r.posted_at, r.id));

    let mut consumed = vec![false; candidates.len()];
    let mut report = MatchReport::default();

    for txn in txns {
        let fitting: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(i, r)| !consumed[*i] && amounts_agree(r.amount, txn.amount))
            .map(|(i, _)| i)
            .collect();

        match fitting.as_slice() {
            [] => report.unmatched.push(txn.id),
            [only] => {
                consumed[*only] = true;
                report.matched.push(MatchPair {
                    transaction_id: txn.id,
                    bank_record_id: candidates[*only].id,
                });
            }
            _ => report.ambiguous.push(txn.id),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn posted(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    fn record(amount: Decimal, day: u32) -> UnmatchedBankRecord {
        UnmatchedBankRecord {
            id: Uuid::new_v4(),
            amount,
            posted_at: posted(day),
        }
    }

    fn txn(amount: Decimal, day: u32) -> UnmatchedTransaction {
        UnmatchedTransaction {
            id: Uuid::new_v4(),
            amount,
            effective_date: date(day),
        }
    }

    #[test]
    fn test_exact_match_pairs_up() {
        let t = txn(dec!(100), 4);
        let r = record(dec!(100), 5);

        let report = auto_match(&[t.clone()], &[r.clone()]);

        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.matched[0].transaction_id, t.id);
        assert_eq!(report.matched[0].bank_record_id, r.id);
        assert!(report.ambiguous.is_empty());
        assert!(report.unmatched.is_empty());
    }

    #[test]
    fn test_one_cent_difference_still_matches() {
        let t = txn(dec!(100.00), 4);
        let r = record(dec!(100.01), 5);

        let report = auto_match(&[t], &[r]);
        assert_eq!(report.matched.len(), 1);
    }

    #[test]
    fn test_two_cents_apart_does_not_match() {
        let t = txn(dec!(100.00), 4);
        let r = record(dec!(100.02), 5);

        let report = auto_match(&[t.clone()], &[r]);
        assert!(report.matched.is_empty());
        assert_eq!(report.unmatched, vec![t.id]);
    }

    #[test]
    fn test_sign_must_agree() {
        let t = txn(dec!(-100), 4);
        let r = record(dec!(100), 5);

        let report = auto_match(&[t.clone()], &[r]);
        assert_eq!(report.unmatched, vec![t.id]);
    }

    #[test]
    fn test_ambiguous_transaction_is_skipped() {
        let t = txn(dec!(50), 10);
        let r1 = record(dec!(50), 8);
        let r2 = record(dec!(50), 9);

        let report = auto_match(&[t.clone()], &[r1, r2]);

        assert!(report.matched.is_empty());
        assert_eq!(report.ambiguous, vec![t.id]);
    }

    #[test]
    fn test_each_record_consumed_once() {
        let t1 = txn(dec!(10), 1);
        let t2 = txn(dec!(10), 2);
        let r = record(dec!(10), 1);

        let report = auto_match(&[t1.clone(), t2.clone()], &[r]);

        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.matched[0].transaction_id, t1.id);
        assert_eq!(report.unmatched, vec![t2.id]);
    }

    #[test]
    fn test_oldest_transaction_goes_first() {
        // The older transaction claims the single record even when listed
        // second in the input.
        let newer = txn(dec!(75), 20);
        let older = txn(dec!(75), 2);
        let r = record(dec!(75), 3);

        let report = auto_match(&[newer.clone(), older.clone()], &[r]);

        assert_eq!(report.matched[0].transaction_id, older.id);
        assert_eq!(report.unmatched, vec![newer.id]);
    }

    #[test]
    fn test_rerun_is_deterministic() {
        let txns = vec![txn(dec!(5), 1), txn(dec!(7), 2)];
        let records = vec![record(dec!(7), 1), record(dec!(5), 1)];

        let a = auto_match(&txns, &records);
        let b = auto_match(&txns, &records);
        assert_eq!(a.matched, b.matched);
    }

    #[test]
    fn test_amounts_agree_within_one_cent() {
        assert!(amounts_agree(dec!(100.00), dec!(100.01)));
        assert!(amounts_agree(dec!(100.00), dec!(100.00)));
        assert!(!amounts_agree(dec!(100.00), dec!(99.00)));
        assert!(!amounts_agree(dec!(100.00), dec!(-100.00)));
    }
}
