//! Dunning schedule and billing status transitions.
//!
//! A charge is attempted up to [`MAX_ATTEMPTS`] times. The delay before each
//! attempt is taken from [`RETRY_DELAY_DAYS`]: the first attempt is due
//! immediately, the second three days after the first failure, the third
//! seven days after the second failure. After the final failure the charge is
//! terminal and the organization drops to `past_due`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Days to wait before attempt 1, 2, and 3.
pub const RETRY_DELAY_DAYS: [i64; 3] = [0, 3, 7];

/// A charge is abandoned after this many failed attempts.
pub const MAX_ATTEMPTS: i32 = 3;

/// Lifecycle of an overage charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    /// Never attempted, or failed with retries remaining.
    Pending,
    /// Claimed by a running billing pass.
    Processing,
    /// Collected.
    Succeeded,
    /// All attempts exhausted.
    Failed,
}

impl ChargeStatus {
    /// True once no billing pass will touch the charge again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Billing standing of an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    /// In good standing.
    Active,
    /// An overage charge exhausted its attempts.
    PastDue,
    /// Access revoked.
    Suspended,
    /// Organization closed its account.
    Canceled,
}

impl BillingStatus {
    /// Status after a charge fails its final attempt. Suspended and canceled
    /// organizations keep their standing.
    #[must_use]
    pub fn after_terminal_failure(self) -> Self {
        match self {
            Self::Active | Self::PastDue => Self::PastDue,
            other => other,
        }
    }

    /// Status after a charge collects. Past-due organizations recover.
    #[must_use]
    pub fn after_success(self) -> Self {
        match self {
            Self::Active | Self::PastDue => Self::Active,
            other => other,
        }
    }
}

/// Delay in days before attempt number `attempt` (1-based), or `None` once
/// attempts are exhausted.
#[must_use]
pub fn retry_delay_days(attempt: i32) -> Option<i64> {
    if attempt < 1 || attempt > MAX_ATTEMPTS {
        return None;
    }
    #[allow(clippy::cast_sign_loss)]
    RETRY_DELAY_DAYS.get((attempt - 1) as usize).copied()
}

/// When the next attempt becomes due after a failure at `failed_at` on
/// attempt `attempts_so_far`. `None` when the charge is terminal.
#[must_use]
pub fn next_retry_at(attempts_so_far: i32, failed_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    retry_delay_days(attempts_so_far + 1).map(|days| failed_at + Duration::days(days))
}

/// Whether a charge with `attempts_so_far` failures, last failing at
/// `last_attempt_at`, is due for its next attempt at `now`.
#[must_use]
pub fn is_due(
    attempts_so_far: i32,
    last_attempt_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if attempts_so_far >= MAX_ATTEMPTS {
        return false;
    }
    match last_attempt_at {
        None => true,
        Some(last) => match next_retry_at(attempts_so_far, last) {
            Some(due) => now >= due,
            None => false,
        },
    }
}

/// Why a billing pass did not attempt a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The retry delay has not elapsed.
    NotDueYet,
    /// Another pass holds the claim or already finished the charge.
    AlreadyClaimed,
    /// Nothing to bill.
    WithinPlan,
}

/// Per-organization result of a billing pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum DunningOutcome {
    /// The charge collected.
    Succeeded {
        /// Attempts used, including the successful one.
        attempts: i32,
    },
    /// The attempt failed; the charge may retry.
    Failed {
        /// Failures so far.
        attempts: i32,
        /// Attempts remaining before the charge is abandoned.
        retries_remaining: i32,
        /// When the next attempt becomes due, if any remain.
        next_retry_at: Option<DateTime<Utc>>,
    },
    /// Nothing was attempted.
    Skipped {
        /// Why.
        reason: SkipReason,
    },
    /// A dry run determined an attempt would be made.
    WouldAttempt {
        /// Which attempt would run, 1-based.
        attempt: i32,
    },
}

impl DunningOutcome {
    /// Builds the failure outcome for a failure at `failed_at` that brought
    /// the total to `attempts` failures.
    #[must_use]
    pub fn failed(attempts: i32, failed_at: DateTime<Utc>) -> Self {
        Self::Failed {
            attempts,
            retries_remaining: (MAX_ATTEMPTS - attempts).max(0),
            next_retry_at: next_retry_at(attempts, failed_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
    }

    #[rstest]
    #[case(1, Some(0))]
    #[case(2, Some(3))]
    #[case(3, Some(7))]
    #[case(0, None)]
    #[case(4, None)]
    fn test_retry_delay_schedule(#[case] attempt: i32, #[case] expected: Option<i64>) {
        assert_eq!(retry_delay_days(attempt), expected);
    }

    #[test]
    fn test_fresh_charge_is_due_immediately() {
        assert!(is_due(0, None, t0()));
    }

    #[test]
    fn test_not_due_before_delay_elapses() {
        // One failure at t0: the second attempt is due three days later.
        let failed_at = t0();
        assert!(!is_due(1, Some(failed_at), failed_at + Duration::days(2)));
        assert!(is_due(
            1,
            Some(failed_at),
            failed_at + Duration::days(3) + Duration::hours(1)
        ));
    }

    #[test]
    fn test_third_attempt_waits_seven_days() {
        let failed_at = t0();
        assert!(!is_due(2, Some(failed_at), failed_at + Duration::days(6)));
        assert!(is_due(2, Some(failed_at), failed_at + Duration::days(7)));
    }

    #[test]
    fn test_exhausted_charge_never_due() {
        assert!(!is_due(3, Some(t0()), t0() + Duration::days(365)));
    }

    #[test]
    fn test_terminal_failure_marks_past_due() {
        assert_eq!(
            BillingStatus::Active.after_terminal_failure(),
            BillingStatus::PastDue
        );
        assert_eq!(
            BillingStatus::Suspended.after_terminal_failure(),
            BillingStatus::Suspended
        );
    }

    #[test]
    fn test_success_recovers_past_due() {
        assert_eq!(BillingStatus::PastDue.after_success(), BillingStatus::Active);
        assert_eq!(BillingStatus::Canceled.after_success(), BillingStatus::Canceled);
    }

    #[test]
    fn test_failed_outcome_counts_remaining_retries() {
        let failed_at = t0();

        let DunningOutcome::Failed {
            attempts,
            retries_remaining,
            next_retry_at: due,
        } = DunningOutcome::failed(1, failed_at)
        else {
            panic!("expected failure outcome");
        };
        assert_eq!(attempts, 1);
        assert_eq!(retries_remaining, 2);
        assert_eq!(due, Some(failed_at + Duration::days(3)));

        let DunningOutcome::Failed {
            retries_remaining,
            next_retry_at: due,
            ..
        } = DunningOutcome::failed(3, failed_at)
        else {
            panic!("expected failure outcome");
        };
        assert_eq!(retries_remaining, 0);
        assert_eq!(due, None);
    }

    #[test]
    fn test_charge_status_terminality() {
        assert!(ChargeStatus::Succeeded.is_terminal());
        assert!(ChargeStatus::Failed.is_terminal());
        assert!(!ChargeStatus::Pending.is_terminal());
        assert!(!ChargeStatus::Processing.is_terminal());
    }
}
