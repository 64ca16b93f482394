//! Double-entry bookkeeping logic.
//!
//! Validation of entry sets, the debit/credit balance invariant, and the
//! account-class sign conventions for derived balances.

pub mod balance;
pub mod error;
pub mod service;
pub mod types;

pub use balance::{AccountClass, LedgerBalance};
pub use error::LedgerError;
pub use service::{EntryTotals, LedgerService};
pub use types::{
    AccountKey, AccountType, EntryInput, EntryType, TransactionStatus, TransactionType,
};
