//! Ledger domain types for transaction creation and validation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::balance::AccountClass;

/// Entry type: either Debit or Credit.
///
/// In double-entry bookkeeping:
/// - Debits increase asset/expense accounts, decrease liability/equity/revenue accounts
/// - Credits decrease asset/expense accounts, increase liability/equity/revenue accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Debit entry.
    Debit,
    /// Credit entry.
    Credit,
}

impl EntryType {
    /// Returns the opposite entry type, used when constructing reversals.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }
}

/// Transaction type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Sale with platform fee split.
    Sale,
    /// Expense transaction.
    Expense,
    /// Payout to a creator or contractor.
    Payout,
    /// Refund of a prior sale.
    Refund,
    /// Correcting adjustment entry.
    Adjustment,
    /// Opening balance entry.
    OpeningBalance,
    /// Transfer between accounts.
    Transfer,
}

/// Transaction status.
///
/// Transactions are immutable once completed; voiding or reversing never
/// deletes entries, it only changes status (and, for reversals, adds a
/// forward-dated offsetting transaction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Transaction is being drafted; excluded from balances.
    Draft,
    /// Transaction is posted to the ledger.
    Completed,
    /// Transaction has been voided; excluded from balances.
    Voided,
    /// Transaction has been reversed by a correcting transaction;
    /// excluded from balances (the correction carries the offset).
    Reversed,
}

impl TransactionStatus {
    /// Returns true if this transaction's entries count toward balances.
    #[must_use]
    pub fn counts_toward_balance(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if the transaction is immutable apart from status
    /// transitions.
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        !matches!(self, Self::Draft)
    }
}

/// Account types in the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Cash on hand.
    Cash,
    /// Bank account.
    Bank,
    /// Amounts owed by customers.
    AccountsReceivable,
    /// Balance owed to a creator or contractor.
    CreatorBalance,
    /// Platform's own revenue.
    PlatformRevenue,
    /// Reserved tax amounts.
    TaxReserve,
    /// Operating expenses.
    Expense,
    /// Processor and platform fees.
    Fees,
    /// Owner equity.
    Equity,
}

impl AccountType {
    /// Returns the balance sign convention for this account type.
    #[must_use]
    pub const fn class(self) -> AccountClass {
        match self {
            Self::Cash | Self::Bank | Self::AccountsReceivable | Self::Expense | Self::Fees => {
                AccountClass::DebitNormal
            }
            Self::CreatorBalance | Self::PlatformRevenue | Self::TaxReserve | Self::Equity => {
                AccountClass::CreditNormal
            }
        }
    }

    /// Returns true for asset-side account types, used when checking the
    /// opening balance equation (assets = liabilities + equity).
    #[must_use]
    pub const fn is_asset_side(self) -> bool {
        matches!(self, Self::Cash | Self::Bank | Self::AccountsReceivable)
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Cash => "cash",
            Self::Bank => "bank",
            Self::AccountsReceivable => "accounts_receivable",
            Self::CreatorBalance => "creator_balance",
            Self::PlatformRevenue => "platform_revenue",
            Self::TaxReserve => "tax_reserve",
            Self::Expense => "expense",
            Self::Fees => "fees",
            Self::Equity => "equity",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(Self::Cash),
            "bank" => Ok(Self::Bank),
            "accounts_receivable" => Ok(Self::AccountsReceivable),
            "creator_balance" => Ok(Self::CreatorBalance),
            "platform_revenue" => Ok(Self::PlatformRevenue),
            "tax_reserve" => Ok(Self::TaxReserve),
            "expense" => Ok(Self::Expense),
            "fees" => Ok(Self::Fees),
            "equity" => Ok(Self::Equity),
            _ => Err(format!("Unknown account type: {s}")),
        }
    }
}

/// Addresses an account within a ledger.
///
/// Accounts are auto-provisioned on first reference, so callers address
/// them by type (plus owning entity for per-creator accounts) rather than
/// by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    /// The account type.
    pub account_type: AccountType,
    /// Owning creator/contractor, for per-entity accounts.
    pub entity_id: Option<Uuid>,
}

impl AccountKey {
    /// Creates a key for a ledger-level account with no owning entity.
    #[must_use]
    pub const fn of(account_type: AccountType) -> Self {
        Self {
            account_type,
            entity_id: None,
        }
    }

    /// Creates a key for a per-entity account.
    #[must_use]
    pub const fn for_entity(account_type: AccountType, entity_id: Uuid) -> Self {
        Self {
            account_type,
            entity_id: Some(entity_id),
        }
    }
}

/// Input for a single ledger entry in a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInput {
    /// The account to post to.
    pub account: AccountKey,
    /// Whether this is a debit or credit entry.
    pub entry_type: EntryType,
    /// Amount in major currency units (must be positive).
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::balance::AccountClass;

    #[test]
    fn test_entry_type_opposite() {
        assert_eq!(EntryType::Debit.opposite(), EntryType::Credit);
        assert_eq!(EntryType::Credit.opposite(), EntryType::Debit);
    }

    #[test]
    fn test_status_counts_toward_balance() {
        assert!(TransactionStatus::Completed.counts_toward_balance());
        assert!(!TransactionStatus::Draft.counts_toward_balance());
        assert!(!TransactionStatus::Voided.counts_toward_balance());
        assert!(!TransactionStatus::Reversed.counts_toward_balance());
    }

    #[test]
    fn test_status_immutability() {
        assert!(!TransactionStatus::Draft.is_immutable());
        assert!(TransactionStatus::Completed.is_immutable());
        assert!(TransactionStatus::Voided.is_immutable());
        assert!(TransactionStatus::Reversed.is_immutable());
    }

    #[test]
    fn test_account_type_classes() {
        assert_eq!(AccountType::Cash.class(), AccountClass::DebitNormal);
        assert_eq!(AccountType::Bank.class(), AccountClass::DebitNormal);
        assert_eq!(
            AccountType::AccountsReceivable.class(),
            AccountClass::DebitNormal
        );
        assert_eq!(AccountType::Expense.class(), AccountClass::DebitNormal);
        assert_eq!(AccountType::Fees.class(), AccountClass::DebitNormal);
        assert_eq!(
            AccountType::CreatorBalance.class(),
            AccountClass::CreditNormal
        );
        assert_eq!(
            AccountType::PlatformRevenue.class(),
            AccountClass::CreditNormal
        );
        assert_eq!(AccountType::TaxReserve.class(), AccountClass::CreditNormal);
        assert_eq!(AccountType::Equity.class(), AccountClass::CreditNormal);
    }

    #[test]
    fn test_account_type_round_trip() {
        for ty in [
            AccountType::Cash,
            AccountType::Bank,
            AccountType::AccountsReceivable,
            AccountType::CreatorBalance,
            AccountType::PlatformRevenue,
            AccountType::TaxReserve,
            AccountType::Expense,
            AccountType::Fees,
            AccountType::Equity,
        ] {
            let parsed: AccountType = ty.to_string().parse().unwrap();
            assert_eq!(parsed, ty);
        }
    }

    #[test]
    fn test_unknown_account_type_rejected() {
        assert!("piggy_bank".parse::<AccountType>().is_err());
    }
}
