//! `SeaORM` entity definitions.

pub mod accounting_periods;
pub mod accounts;
pub mod adjustment_journals;
pub mod api_keys;
pub mod bank_records;
pub mod ledger_entries;
pub mod ledgers;
pub mod organizations;
pub mod overage_charges;
pub mod sea_orm_active_enums;
pub mod transactions;
pub mod trial_balance_snapshots;
