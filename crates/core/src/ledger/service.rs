//! Ledger service for entry-set validation.
//!
//! This module provides the core business logic for validating entry sets
//! before they are persisted. It is pure: account resolution and storage
//! concerns live in the repository layer.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{EntryInput, EntryType};

/// Totals for a validated entry set.
#[derive(Debug, Clone)]
pub struct EntryTotals {
    /// Sum of debit entries.
    pub debits: Decimal,
    /// Sum of credit entries.
    pub credits: Decimal,
}

impl EntryTotals {
    /// Signed difference (debits - credits).
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.debits - self.credits
    }

    /// Returns true if the set balances within the given tolerance.
    #[must_use]
    pub fn is_balanced_within(&self, tolerance: Decimal) -> bool {
        self.difference().abs() <= tolerance
    }
}

/// Ledger service for entry-set validation.
pub struct LedgerService;

impl LedgerService {
    /// Validates an entry set before persisting.
    ///
    /// Checks, in order:
    /// 1. At least 2 entries
    /// 2. Every amount strictly positive
    /// 3. `sum(debits)` equals `sum(credits)` within `tolerance`
    ///
    /// Accumulated rounding from percentage splits is tolerated up to
    /// `tolerance` (one unit of minor currency by default), never more.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if validation fails. Nothing is ever
    /// partially applied: validation happens before any write.
    pub fn validate_entry_set(
        entries: &[EntryInput],
        tolerance: Decimal,
    ) -> Result<EntryTotals, LedgerError> {
        if entries.len() < 2 {
            return Err(LedgerError::InsufficientEntries);
        }

        for entry in entries {
            if entry.amount == Decimal::ZERO {
                return Err(LedgerError::ZeroAmount);
            }
            if entry.amount < Decimal::ZERO {
                return Err(LedgerError::NegativeAmount);
            }
        }

        let totals = Self::calculate_totals(entries);

        if !totals.is_balanced_within(tolerance) {
            return Err(LedgerError::ImbalancedEntries {
                debits: totals.debits,
                credits: totals.credits,
                difference: totals.difference(),
            });
        }

        Ok(totals)
    }

    /// Calculates debit/credit totals for an entry set.
    #[must_use]
    pub fn calculate_totals(entries: &[EntryInput]) -> EntryTotals {
        let debits: Decimal = entries
            .iter()
            .filter(|e| e.entry_type == EntryType::Debit)
            .map(|e| e.amount)
            .sum();
        let credits: Decimal = entries
            .iter()
            .filter(|e| e.entry_type == EntryType::Credit)
            .map(|e| e.amount)
            .sum();

        EntryTotals { debits, credits }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{AccountKey, AccountType};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2); // 0.01

    fn entry(account_type: AccountType, entry_type: EntryType, amount: Decimal) -> EntryInput {
        EntryInput {
            account: AccountKey::of(account_type),
            entry_type,
            amount,
        }
    }

    #[test]
    fn test_balanced_entry_set() {
        let entries = vec![
            entry(AccountType::Cash, EntryType::Debit, dec!(100)),
            entry(AccountType::PlatformRevenue, EntryType::Credit, dec!(20)),
            entry(AccountType::CreatorBalance, EntryType::Credit, dec!(80)),
        ];

        let totals = LedgerService::validate_entry_set(&entries, TOLERANCE).unwrap();
        assert_eq!(totals.debits, dec!(100));
        assert_eq!(totals.credits, dec!(100));
        assert_eq!(totals.difference(), Decimal::ZERO);
    }

    #[test]
    fn test_imbalanced_entry_set_rejected() {
        let entries = vec![
            entry(AccountType::Cash, EntryType::Debit, dec!(100)),
            entry(AccountType::PlatformRevenue, EntryType::Credit, dec!(50)),
        ];

        let err = LedgerService::validate_entry_set(&entries, TOLERANCE).unwrap_err();
        match err {
            LedgerError::ImbalancedEntries {
                debits,
                credits,
                difference,
            } => {
                assert_eq!(debits, dec!(100));
                assert_eq!(credits, dec!(50));
                assert_eq!(difference, dec!(50));
            }
            other => panic!("expected ImbalancedEntries, got {other:?}"),
        }
    }

    #[test]
    fn test_sub_cent_rounding_drift_tolerated() {
        // 33.33 + 66.66 = 99.99 against a 100.00 debit: within one cent.
        let entries = vec![
            entry(AccountType::Cash, EntryType::Debit, dec!(100.00)),
            entry(AccountType::CreatorBalance, EntryType::Credit, dec!(33.33)),
            entry(AccountType::PlatformRevenue, EntryType::Credit, dec!(66.66)),
        ];

        assert!(LedgerService::validate_entry_set(&entries, TOLERANCE).is_ok());
    }

    #[test]
    fn test_drift_above_one_cent_rejected() {
        let entries = vec![
            entry(AccountType::Cash, EntryType::Debit, dec!(100.00)),
            entry(AccountType::CreatorBalance, EntryType::Credit, dec!(99.98)),
        ];

        assert!(matches!(
            LedgerService::validate_entry_set(&entries, TOLERANCE),
            Err(LedgerError::ImbalancedEntries { .. })
        ));
    }

    #[test]
    fn test_single_entry_rejected() {
        let entries = vec![entry(AccountType::Cash, EntryType::Debit, dec!(100))];
        assert!(matches!(
            LedgerService::validate_entry_set(&entries, TOLERANCE),
            Err(LedgerError::InsufficientEntries)
        ));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let entries = vec![
            entry(AccountType::Cash, EntryType::Debit, dec!(0)),
            entry(AccountType::PlatformRevenue, EntryType::Credit, dec!(0)),
        ];
        assert!(matches!(
            LedgerService::validate_entry_set(&entries, TOLERANCE),
            Err(LedgerError::ZeroAmount)
        ));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let entries = vec![
            entry(AccountType::Cash, EntryType::Debit, dec!(-100)),
            entry(AccountType::PlatformRevenue, EntryType::Credit, dec!(100)),
        ];
        assert!(matches!(
            LedgerService::validate_entry_set(&entries, TOLERANCE),
            Err(LedgerError::NegativeAmount)
        ));
    }

    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any mirrored debit/credit pair validates.
        #[test]
        fn prop_mirrored_pair_balances(amount in amount_strategy()) {
            let entries = vec![
                entry(AccountType::Cash, EntryType::Debit, amount),
                entry(AccountType::PlatformRevenue, EntryType::Credit, amount),
            ];
            prop_assert!(LedgerService::validate_entry_set(&entries, TOLERANCE).is_ok());
        }

        /// Splitting a credit across accounts never changes the totals.
        #[test]
        fn prop_split_preserves_totals(
            amount in amount_strategy(),
            split_percent in 1u32..100u32,
        ) {
            let first = (amount * Decimal::from(split_percent) / Decimal::from(100u32))
                .round_dp(2);
            let second = amount - first;
            prop_assume!(first > Decimal::ZERO && second > Decimal::ZERO);

            let entries = vec![
                entry(AccountType::Cash, EntryType::Debit, amount),
                entry(AccountType::PlatformRevenue, EntryType::Credit, first),
                entry(AccountType::CreatorBalance, EntryType::Credit, second),
            ];

            let totals = LedgerService::validate_entry_set(&entries, TOLERANCE).unwrap();
            prop_assert_eq!(totals.debits, totals.credits);
        }

        /// A strictly larger-than-tolerance imbalance is always rejected,
        /// never partially accepted.
        #[test]
        fn prop_imbalance_always_rejected(
            amount in amount_strategy(),
            gap in (2i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2)),
        ) {
            let entries = vec![
                entry(AccountType::Cash, EntryType::Debit, amount + gap),
                entry(AccountType::PlatformRevenue, EntryType::Credit, amount),
            ];
            let rejected = matches!(
                LedgerService::validate_entry_set(&entries, TOLERANCE),
                Err(LedgerError::ImbalancedEntries { .. })
            );
            prop_assert!(rejected);
        }
    }
}
