//! Forward-dated corrections for closed periods.
//!
//! Financial history is append-only: a transaction dated in a closed period
//! is never edited. Instead the correction engine builds a new transaction
//! in the currently open period whose entries are the exact debit/credit
//! swap of the original, tagged with an adjustment journal referencing it.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::types::EntryType;
use rust_decimal::Decimal;

/// A posted entry line, as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedEntry {
    /// The account the entry was posted to.
    pub account_id: Uuid,
    /// Debit or credit.
    pub entry_type: EntryType,
    /// Positive amount.
    pub amount: Decimal,
}

/// Why a correction exists and who prepared it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentJournalInput {
    /// Correction category (error_correction, reclassification, ...).
    pub adjustment_type: String,
    /// Human explanation; required.
    pub reason: String,
    /// Who prepared the correction.
    pub prepared_by: String,
    /// The transaction being corrected, if any.
    pub original_transaction_id: Option<Uuid>,
}

/// Errors constructing a correction.
#[derive(Debug, Error)]
pub enum CorrectionError {
    /// A correction must explain itself.
    #[error("Adjustment reason is required")]
    MissingReason,

    /// A correction must name its preparer.
    #[error("Adjustment preparer is required")]
    MissingPreparer,

    /// The original transaction has no entries to reverse.
    #[error("Original transaction has no entries")]
    NothingToReverse,
}

/// Validates adjustment journal metadata.
///
/// # Errors
///
/// Returns `CorrectionError` if the reason or preparer is blank.
pub fn validate_journal(journal: &AdjustmentJournalInput) -> Result<(), CorrectionError> {
    if journal.reason.trim().is_empty() {
        return Err(CorrectionError::MissingReason);
    }
    if journal.prepared_by.trim().is_empty() {
        return Err(CorrectionError::MissingPreparer);
    }
    Ok(())
}

/// Builds the exact reversal of a set of posted entries: every debit becomes
/// a credit of the same amount against the same account, and vice versa.
///
/// # Errors
///
/// Returns `CorrectionError::NothingToReverse` if `entries` is empty.
pub fn reversal_entries(entries: &[PostedEntry]) -> Result<Vec<PostedEntry>, CorrectionError> {
    if entries.is_empty() {
        return Err(CorrectionError::NothingToReverse);
    }

    Ok(entries
        .iter()
        .map(|e| PostedEntry {
            account_id: e.account_id,
            entry_type: e.entry_type.opposite(),
            amount: e.amount,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn journal() -> AdjustmentJournalInput {
        AdjustmentJournalInput {
            adjustment_type: "error_correction".to_string(),
            reason: "Duplicate sale recorded".to_string(),
            prepared_by: "jane@example.com".to_string(),
            original_transaction_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn test_journal_requires_reason() {
        let mut j = journal();
        j.reason = "   ".to_string();
        assert!(matches!(
            validate_journal(&j),
            Err(CorrectionError::MissingReason)
        ));
    }

    #[test]
    fn test_journal_requires_preparer() {
        let mut j = journal();
        j.prepared_by = String::new();
        assert!(matches!(
            validate_journal(&j),
            Err(CorrectionError::MissingPreparer)
        ));
    }

    #[test]
    fn test_valid_journal_accepted() {
        assert!(validate_journal(&journal()).is_ok());
    }

    #[test]
    fn test_reversal_swaps_debits_and_credits() {
        let cash = Uuid::new_v4();
        let revenue = Uuid::new_v4();
        let original = vec![
            PostedEntry {
                account_id: cash,
                entry_type: EntryType::Debit,
                amount: dec!(100),
            },
            PostedEntry {
                account_id: revenue,
                entry_type: EntryType::Credit,
                amount: dec!(100),
            },
        ];

        let reversal = reversal_entries(&original).unwrap();

        assert_eq!(reversal.len(), 2);
        assert_eq!(reversal[0].account_id, cash);
        assert_eq!(reversal[0].entry_type, EntryType::Credit);
        assert_eq!(reversal[0].amount, dec!(100));
        assert_eq!(reversal[1].account_id, revenue);
        assert_eq!(reversal[1].entry_type, EntryType::Debit);
    }

    #[test]
    fn test_reversal_of_reversal_is_identity() {
        let original = vec![
            PostedEntry {
                account_id: Uuid::new_v4(),
                entry_type: EntryType::Debit,
                amount: dec!(42.42),
            },
            PostedEntry {
                account_id: Uuid::new_v4(),
                entry_type: EntryType::Credit,
                amount: dec!(42.42),
            },
        ];

        let twice = reversal_entries(&reversal_entries(&original).unwrap()).unwrap();
        assert_eq!(twice, original);
    }

    #[test]
    fn test_empty_entries_rejected() {
        assert!(matches!(
            reversal_entries(&[]),
            Err(CorrectionError::NothingToReverse)
        ));
    }
}
