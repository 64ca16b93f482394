//! Core business logic for Quill.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. All domain types, validation rules, and calculations live
//! here.
//!
//! # Modules
//!
//! - `ledger` - Double-entry bookkeeping validation and balance rules
//! - `period` - Accounting period state machine and date ranges
//! - `snapshot` - Trial balance snapshots and content hashing
//! - `correction` - Forward-dated corrections for closed periods
//! - `reconcile` - Bank feed reconciliation matching
//! - `billing` - Usage metering and the dunning state machine

pub mod billing;
pub mod correction;
pub mod ledger;
pub mod period;
pub mod reconcile;
pub mod snapshot;
