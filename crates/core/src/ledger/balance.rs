//! Account balance calculations.
//!
//! Balances are derived, never stored authoritatively: an account's balance
//! is the signed sum of its countable entries, with the sign convention
//! determined by the account class.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Balance sign convention for an account.
///
/// - Debit-normal accounts (assets, expenses) grow with debits.
/// - Credit-normal accounts (liabilities, equity, revenue) grow with credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountClass {
    /// Debit-normal accounts (cash, bank, receivables, expenses, fees).
    DebitNormal,
    /// Credit-normal accounts (creator balances, revenue, tax reserve, equity).
    CreditNormal,
}

impl AccountClass {
    /// Calculates the balance change for an entry.
    #[must_use]
    pub fn balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::DebitNormal => debit - credit,
            Self::CreditNormal => credit - debit,
        }
    }
}

/// Ledger-wide debit/credit totals over countable entries.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerBalance {
    /// Total debit amount.
    pub total_debits: Decimal,
    /// Total credit amount.
    pub total_credits: Decimal,
}

impl LedgerBalance {
    /// Creates a new ledger balance from totals.
    #[must_use]
    pub const fn new(total_debits: Decimal, total_credits: Decimal) -> Self {
        Self {
            total_debits,
            total_credits,
        }
    }

    /// Signed difference (debits - credits).
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.total_debits - self.total_credits
    }

    /// Returns true if debits equal credits within the given tolerance.
    #[must_use]
    pub fn is_balanced_within(&self, tolerance: Decimal) -> bool {
        self.difference().abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_debit_normal_balance_change() {
        let class = AccountClass::DebitNormal;
        assert_eq!(class.balance_change(dec!(100), dec!(0)), dec!(100));
        assert_eq!(class.balance_change(dec!(0), dec!(50)), dec!(-50));
        assert_eq!(class.balance_change(dec!(100), dec!(30)), dec!(70));
    }

    #[test]
    fn test_credit_normal_balance_change() {
        let class = AccountClass::CreditNormal;
        assert_eq!(class.balance_change(dec!(0), dec!(100)), dec!(100));
        assert_eq!(class.balance_change(dec!(50), dec!(0)), dec!(-50));
        assert_eq!(class.balance_change(dec!(30), dec!(100)), dec!(70));
    }

    #[test]
    fn test_ledger_balance_within_tolerance() {
        let balance = LedgerBalance::new(dec!(100.00), dec!(99.995));
        assert!(balance.is_balanced_within(dec!(0.01)));
        assert!(!balance.is_balanced_within(dec!(0.001)));
    }

    #[test]
    fn test_ledger_balance_difference_is_signed() {
        let balance = LedgerBalance::new(dec!(50), dec!(80));
        assert_eq!(balance.difference(), dec!(-30));
    }

    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The two sign conventions are exact mirrors of each other.
        #[test]
        fn prop_classes_are_mirrored(
            debit in amount_strategy(),
            credit in amount_strategy(),
        ) {
            let d = AccountClass::DebitNormal.balance_change(debit, credit);
            let c = AccountClass::CreditNormal.balance_change(debit, credit);
            prop_assert_eq!(d, -c);
        }

        /// A balanced pair of totals stays balanced under any tolerance.
        #[test]
        fn prop_equal_totals_always_balanced(
            total in amount_strategy(),
            tolerance in amount_strategy(),
        ) {
            let balance = LedgerBalance::new(total, total);
            prop_assert!(balance.is_balanced_within(tolerance));
            prop_assert_eq!(balance.difference(), Decimal::ZERO);
        }

        /// Tolerance is a strict gate: a difference above it always fails.
        #[test]
        fn prop_difference_above_tolerance_rejected(
            total in amount_strategy(),
            excess in (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2)),
        ) {
            let tolerance = dec!(0.01);
            let balance = LedgerBalance::new(total + tolerance + excess, total);
            prop_assert!(!balance.is_balanced_within(tolerance));
        }
    }
}
