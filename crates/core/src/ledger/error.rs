//! Ledger error types for validation and state errors.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Transaction must have at least 2 entries.
    #[error("Transaction must have at least 2 entries")]
    InsufficientEntries,

    /// Entry debits and credits do not balance within tolerance.
    #[error(
        "Entries do not balance. Debits: {debits}, Credits: {credits}, Difference: {difference}"
    )]
    ImbalancedEntries {
        /// Total debit amount.
        debits: Decimal,
        /// Total credit amount.
        credits: Decimal,
        /// Signed difference (debits - credits).
        difference: Decimal,
    },

    /// Entry amount cannot be zero.
    #[error("Entry amount cannot be zero")]
    ZeroAmount,

    /// Entry amount cannot be negative.
    #[error("Entry amount cannot be negative")]
    NegativeAmount,

    // ========== Idempotency Errors ==========
    /// Reference id already used for this ledger.
    #[error("Reference id already exists for this ledger: {0}")]
    DuplicateReference(String),

    // ========== Account Errors ==========
    /// Account not found and could not be auto-provisioned.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    // ========== Period Errors ==========
    /// The effective date falls in a closed or locked period.
    #[error("Period containing {0} is closed; post a forward-dated correction instead")]
    PeriodClosed(NaiveDate),

    /// Ledger debits and credits do not balance at period close.
    #[error("Ledger is not balanced. Debits: {debits}, Credits: {credits}")]
    UnbalancedLedger {
        /// Total debits across countable entries.
        debits: Decimal,
        /// Total credits across countable entries.
        credits: Decimal,
    },

    // ========== Transaction State Errors ==========
    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    /// Cannot void an already voided transaction.
    #[error("Transaction {0} is already voided")]
    AlreadyVoided(Uuid),

    /// Cannot reverse a transaction that is not completed.
    #[error("Only completed transactions can be reversed")]
    NotReversible,

    /// The adjustment metadata is incomplete.
    #[error("Invalid adjustment: {0}")]
    InvalidAdjustment(String),

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientEntries => "INSUFFICIENT_ENTRIES",
            Self::ImbalancedEntries { .. } => "IMBALANCED_ENTRIES",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::DuplicateReference(_) => "DUPLICATE_REFERENCE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::PeriodClosed(_) => "PERIOD_CLOSED",
            Self::UnbalancedLedger { .. } => "UNBALANCED_LEDGER",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::AlreadyVoided(_) => "ALREADY_VOIDED",
            Self::NotReversible => "NOT_REVERSIBLE",
            Self::InvalidAdjustment(_) => "INVALID_ADJUSTMENT",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation and invariant errors
            Self::InsufficientEntries
            | Self::ImbalancedEntries { .. }
            | Self::ZeroAmount
            | Self::NegativeAmount
            | Self::UnbalancedLedger { .. }
            | Self::NotReversible
            | Self::InvalidAdjustment(_) => 400,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::TransactionNotFound(_) => 404,

            // 409 Conflict - idempotency and state conflicts
            Self::DuplicateReference(_) | Self::PeriodClosed(_) | Self::AlreadyVoided(_) => 409,

            // 500 Internal Server Error
            Self::Database(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::InsufficientEntries.error_code(),
            "INSUFFICIENT_ENTRIES"
        );
        assert_eq!(
            LedgerError::ImbalancedEntries {
                debits: dec!(100),
                credits: dec!(50),
                difference: dec!(50),
            }
            .error_code(),
            "IMBALANCED_ENTRIES"
        );
        assert_eq!(
            LedgerError::DuplicateReference("ref-1".into()).error_code(),
            "DUPLICATE_REFERENCE"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::InsufficientEntries.http_status_code(), 400);
        assert_eq!(
            LedgerError::DuplicateReference("ref-1".into()).http_status_code(),
            409
        );
        assert_eq!(
            LedgerError::PeriodClosed(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap())
                .http_status_code(),
            409
        );
        assert_eq!(
            LedgerError::AccountNotFound("cash".into()).http_status_code(),
            404
        );
        assert_eq!(
            LedgerError::Database("boom".into()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_imbalanced_display_surfaces_discrepancy() {
        let err = LedgerError::ImbalancedEntries {
            debits: dec!(100.00),
            credits: dec!(99.50),
            difference: dec!(0.50),
        };
        assert_eq!(
            err.to_string(),
            "Entries do not balance. Debits: 100.00, Credits: 99.50, Difference: 0.50"
        );
    }
}
