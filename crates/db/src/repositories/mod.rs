//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the
//! application.

pub mod account;
pub mod api_key;
pub mod billing;
pub mod period;
pub mod reconciliation;
pub mod transaction;

pub use account::{AccountError, AccountRepository};
pub use api_key::{ApiKeyRepository, IssuedKey};
pub use billing::{BillingError, BillingRepository, ClaimedCharge};
pub use period::{ClosePeriodInput, ClosedPeriod, PeriodRepository};
pub use reconciliation::{
    ImportBankRecordInput, ManualMatch, ReconciliationRepository, UnmatchedSides,
};
pub use transaction::{
    AdjustmentRecord, CreateTransactionInput, RecordAdjustmentInput, ReverseTransactionInput,
    TransactionRepository, TransactionWithEntries,
};
