//! Postgres enum types mapped to Rust.
//!
//! Each enum mirrors a `CREATE TYPE ... AS ENUM` in the initial migration.
//! Conversions to and from the domain enums in `quill-core` live here so
//! repositories never string-match enum values.

use quill_core::billing::{BillingStatus, ChargeStatus};
use quill_core::ledger::{AccountType as DomainAccountType, EntryType as DomainEntryType};
use quill_core::ledger::{TransactionStatus as DomainTransactionStatus, TransactionType as DomainTransactionType};
use quill_core::period::{
    PeriodGranularity as DomainPeriodGranularity, PeriodStatus as DomainPeriodStatus,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Debit or credit side of an entry.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entry_type")]
pub enum EntryType {
    /// Debit side.
    #[sea_orm(string_value = "debit")]
    Debit,
    /// Credit side.
    #[sea_orm(string_value = "credit")]
    Credit,
}

/// Business meaning of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_type")]
pub enum TransactionType {
    /// Customer sale.
    #[sea_orm(string_value = "sale")]
    Sale,
    /// Operating expense.
    #[sea_orm(string_value = "expense")]
    Expense,
    /// Payout to a creator.
    #[sea_orm(string_value = "payout")]
    Payout,
    /// Refund of a sale.
    #[sea_orm(string_value = "refund")]
    Refund,
    /// Correction posted by the adjustment engine.
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    /// Opening balance seed.
    #[sea_orm(string_value = "opening_balance")]
    OpeningBalance,
    /// Internal transfer.
    #[sea_orm(string_value = "transfer")]
    Transfer,
}

/// Lifecycle of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_status")]
pub enum TransactionStatus {
    /// Not yet posted.
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Posted; counts toward balances.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Cancelled before posting took effect.
    #[sea_orm(string_value = "voided")]
    Voided,
    /// Negated by a reversal transaction.
    #[sea_orm(string_value = "reversed")]
    Reversed,
}

/// Account categories in the fixed chart.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
pub enum AccountType {
    /// Cash on hand.
    #[sea_orm(string_value = "cash")]
    Cash,
    /// Bank accounts.
    #[sea_orm(string_value = "bank")]
    Bank,
    /// Money owed to the platform.
    #[sea_orm(string_value = "accounts_receivable")]
    AccountsReceivable,
    /// Per-creator liability.
    #[sea_orm(string_value = "creator_balance")]
    CreatorBalance,
    /// Platform revenue.
    #[sea_orm(string_value = "platform_revenue")]
    PlatformRevenue,
    /// Tax withheld.
    #[sea_orm(string_value = "tax_reserve")]
    TaxReserve,
    /// Operating expenses.
    #[sea_orm(string_value = "expense")]
    Expense,
    /// Processor and platform fees.
    #[sea_orm(string_value = "fees")]
    Fees,
    /// Owner equity.
    #[sea_orm(string_value = "equity")]
    Equity,
}

/// Accounting period state.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "period_status")]
pub enum PeriodStatus {
    /// Accepting postings.
    #[sea_orm(string_value = "open")]
    Open,
    /// Closed with a snapshot; terminal.
    #[sea_orm(string_value = "closed")]
    Closed,
    /// Closed and never reopened, not even by corrections.
    #[sea_orm(string_value = "locked")]
    Locked,
}

/// How a period is cut from the calendar.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "period_granularity")]
pub enum PeriodGranularity {
    /// One calendar month.
    #[sea_orm(string_value = "monthly")]
    Monthly,
    /// One calendar quarter.
    #[sea_orm(string_value = "quarterly")]
    Quarterly,
}

/// Overage charge lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "charge_status")]
pub enum ChargeStatusDb {
    /// Awaiting an attempt.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Claimed by a running billing pass.
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Collected.
    #[sea_orm(string_value = "succeeded")]
    Succeeded,
    /// Attempts exhausted.
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Organization billing standing.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "billing_status")]
pub enum BillingStatusDb {
    /// Good standing.
    #[sea_orm(string_value = "active")]
    Active,
    /// A charge exhausted its attempts.
    #[sea_orm(string_value = "past_due")]
    PastDue,
    /// Access revoked.
    #[sea_orm(string_value = "suspended")]
    Suspended,
    /// Account closed.
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

impl From<DomainEntryType> for EntryType {
    fn from(value: DomainEntryType) -> Self {
        match value {
            DomainEntryType::Debit => Self::Debit,
            DomainEntryType::Credit => Self::Credit,
        }
    }
}

impl From<EntryType> for DomainEntryType {
    fn from(value: EntryType) -> Self {
        match value {
            EntryType::Debit => Self::Debit,
            EntryType::Credit => Self::Credit,
        }
    }
}

impl From<DomainTransactionType> for TransactionType {
    fn from(value: DomainTransactionType) -> Self {
        match value {
            DomainTransactionType::Sale => Self::Sale,
            DomainTransactionType::Expense => Self::Expense,
            DomainTransactionType::Payout => Self::Payout,
            DomainTransactionType::Refund => Self::Refund,
            DomainTransactionType::Adjustment => Self::Adjustment,
            DomainTransactionType::OpeningBalance => Self::OpeningBalance,
            DomainTransactionType::Transfer => Self::Transfer,
        }
    }
}

impl From<TransactionType> for DomainTransactionType {
    fn from(value: TransactionType) -> Self {
        match value {
            TransactionType::Sale => Self::Sale,
            TransactionType::Expense => Self::Expense,
            TransactionType::Payout => Self::Payout,
            TransactionType::Refund => Self::Refund,
            TransactionType::Adjustment => Self::Adjustment,
            TransactionType::OpeningBalance => Self::OpeningBalance,
            TransactionType::Transfer => Self::Transfer,
        }
    }
}

impl From<TransactionStatus> for DomainTransactionStatus {
    fn from(value: TransactionStatus) -> Self {
        match value {
            TransactionStatus::Draft => Self::Draft,
            TransactionStatus::Completed => Self::Completed,
            TransactionStatus::Voided => Self::Voided,
            TransactionStatus::Reversed => Self::Reversed,
        }
    }
}

impl From<DomainTransactionStatus> for TransactionStatus {
    fn from(value: DomainTransactionStatus) -> Self {
        match value {
            DomainTransactionStatus::Draft => Self::Draft,
            DomainTransactionStatus::Completed => Self::Completed,
            DomainTransactionStatus::Voided => Self::Voided,
            DomainTransactionStatus::Reversed => Self::Reversed,
        }
    }
}

impl From<DomainAccountType> for AccountType {
    fn from(value: DomainAccountType) -> Self {
        match value {
            DomainAccountType::Cash => Self::Cash,
            DomainAccountType::Bank => Self::Bank,
            DomainAccountType::AccountsReceivable => Self::AccountsReceivable,
            DomainAccountType::CreatorBalance => Self::CreatorBalance,
            DomainAccountType::PlatformRevenue => Self::PlatformRevenue,
            DomainAccountType::TaxReserve => Self::TaxReserve,
            DomainAccountType::Expense => Self::Expense,
            DomainAccountType::Fees => Self::Fees,
            DomainAccountType::Equity => Self::Equity,
        }
    }
}

impl From<AccountType> for DomainAccountType {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Cash => Self::Cash,
            AccountType::Bank => Self::Bank,
            AccountType::AccountsReceivable => Self::AccountsReceivable,
            AccountType::CreatorBalance => Self::CreatorBalance,
            AccountType::PlatformRevenue => Self::PlatformRevenue,
            AccountType::TaxReserve => Self::TaxReserve,
            AccountType::Expense => Self::Expense,
            AccountType::Fees => Self::Fees,
            AccountType::Equity => Self::Equity,
        }
    }
}

impl From<PeriodStatus> for DomainPeriodStatus {
    fn from(value: PeriodStatus) -> Self {
        match value {
            PeriodStatus::Open => Self::Open,
            PeriodStatus::Closed => Self::Closed,
            PeriodStatus::Locked => Self::Locked,
        }
    }
}

impl From<DomainPeriodStatus> for PeriodStatus {
    fn from(value: DomainPeriodStatus) -> Self {
        match value {
            DomainPeriodStatus::Open => Self::Open,
            DomainPeriodStatus::Closed => Self::Closed,
            DomainPeriodStatus::Locked => Self::Locked,
        }
    }
}

impl From<PeriodGranularity> for DomainPeriodGranularity {
    fn from(value: PeriodGranularity) -> Self {
        match value {
            PeriodGranularity::Monthly => Self::Monthly,
            PeriodGranularity::Quarterly => Self::Quarterly,
        }
    }
}

impl From<DomainPeriodGranularity> for PeriodGranularity {
    fn from(value: DomainPeriodGranularity) -> Self {
        match value {
            DomainPeriodGranularity::Monthly => Self::Monthly,
            DomainPeriodGranularity::Quarterly => Self::Quarterly,
        }
    }
}

impl From<ChargeStatusDb> for ChargeStatus {
    fn from(value: ChargeStatusDb) -> Self {
        match value {
            ChargeStatusDb::Pending => Self::Pending,
            ChargeStatusDb::Processing => Self::Processing,
            ChargeStatusDb::Succeeded => Self::Succeeded,
            ChargeStatusDb::Failed => Self::Failed,
        }
    }
}

impl From<ChargeStatus> for ChargeStatusDb {
    fn from(value: ChargeStatus) -> Self {
        match value {
            ChargeStatus::Pending => Self::Pending,
            ChargeStatus::Processing => Self::Processing,
            ChargeStatus::Succeeded => Self::Succeeded,
            ChargeStatus::Failed => Self::Failed,
        }
    }
}

impl From<BillingStatusDb> for BillingStatus {
    fn from(value: BillingStatusDb) -> Self {
        match value {
            BillingStatusDb::Active => Self::Active,
            BillingStatusDb::PastDue => Self::PastDue,
            BillingStatusDb::Suspended => Self::Suspended,
            BillingStatusDb::Canceled => Self::Canceled,
        }
    }
}

impl From<BillingStatus> for BillingStatusDb {
    fn from(value: BillingStatus) -> Self {
        match value {
            BillingStatus::Active => Self::Active,
            BillingStatus::PastDue => Self::PastDue,
            BillingStatus::Suspended => Self::Suspended,
            BillingStatus::Canceled => Self::Canceled,
        }
    }
}
