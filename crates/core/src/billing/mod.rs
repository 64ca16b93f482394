//! Usage metering and dunning policy.

pub mod dunning;
pub mod usage;

pub use dunning::{
    BillingStatus, ChargeStatus, DunningOutcome, SkipReason, MAX_ATTEMPTS, RETRY_DELAY_DAYS,
};
pub use usage::{OverageAssessment, OverageLine, PlanAllowance, UsageCounts};
