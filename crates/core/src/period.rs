//! Accounting period state machine and date ranges.
//!
//! Periods transition `open -> closed` exactly once; a closed (or locked)
//! period is the system's point of no return. Everything after it must flow
//! through the correction engine rather than editing historical entries.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Accounting period status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    /// Period is open - posting allowed.
    Open,
    /// Period is closed - no posting; corrections go forward.
    Closed,
    /// Period is locked - closed and administratively frozen.
    Locked,
}

impl PeriodStatus {
    /// Returns true if the period accepts new entries.
    #[must_use]
    pub fn allows_posting(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns true if the period can still be closed.
    #[must_use]
    pub fn can_close(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Period granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodGranularity {
    /// Calendar month.
    Monthly,
    /// Calendar quarter.
    Quarterly,
}

/// Errors that can occur when closing a period.
#[derive(Debug, Error)]
pub enum PeriodError {
    /// The requested month is not in 1..=12.
    #[error("Invalid month: {0}")]
    InvalidMonth(u32),

    /// The requested quarter is not in 1..=4.
    #[error("Invalid quarter: {0}")]
    InvalidQuarter(u32),

    /// The period is already closed or locked; closing twice never
    /// re-issues a snapshot.
    #[error("Period {start}..={end} is already closed")]
    AlreadyClosed {
        /// Period start date.
        start: NaiveDate,
        /// Period end date.
        end: NaiveDate,
    },

    /// The ledger does not balance; closing is blocked until corrected.
    #[error("Ledger is not balanced. Debits: {debits}, Credits: {credits}, Difference: {difference}")]
    UnbalancedLedger {
        /// Total debits.
        debits: Decimal,
        /// Total credits.
        credits: Decimal,
        /// Signed difference (debits - credits).
        difference: Decimal,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl PeriodError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidMonth(_) | Self::InvalidQuarter(_) | Self::UnbalancedLedger { .. } => 400,
            Self::AlreadyClosed { .. } => 409,
            Self::Database(_) => 500,
        }
    }
}

/// Returns the inclusive date range of a calendar month.
///
/// # Errors
///
/// Returns `PeriodError::InvalidMonth` if `month` is not in 1..=12.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), PeriodError> {
    let start =
        NaiveDate::from_ymd_opt(year, month, 1).ok_or(PeriodError::InvalidMonth(month))?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .and_then(|d| d.pred_opt())
    .ok_or(PeriodError::InvalidMonth(month))?;

    Ok((start, end))
}

/// Returns the inclusive date range of a calendar quarter.
///
/// # Errors
///
/// Returns `PeriodError::InvalidQuarter` if `quarter` is not in 1..=4.
pub fn quarter_bounds(year: i32, quarter: u32) -> Result<(NaiveDate, NaiveDate), PeriodError> {
    if !(1..=4).contains(&quarter) {
        return Err(PeriodError::InvalidQuarter(quarter));
    }
    let start_month = (quarter - 1) * 3 + 1;
    let (start, _) = month_bounds(year, start_month)?;
    let (_, end) = month_bounds(year, start_month + 2)?;
    Ok((start, end))
}

/// Returns the calendar month containing `date`.
#[must_use]
pub fn containing_month(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    // Month bounds for an existing date cannot fail.
    month_bounds(date.year(), date.month()).unwrap_or((date, date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_open_allows_posting() {
        assert!(PeriodStatus::Open.allows_posting());
        assert!(!PeriodStatus::Closed.allows_posting());
        assert!(!PeriodStatus::Locked.allows_posting());
    }

    #[test]
    fn test_only_open_can_close() {
        assert!(PeriodStatus::Open.can_close());
        assert!(!PeriodStatus::Closed.can_close());
        assert!(!PeriodStatus::Locked.can_close());
    }

    #[rstest]
    #[case(2026, 1, 31)]
    #[case(2026, 2, 28)]
    #[case(2024, 2, 29)]
    #[case(2026, 4, 30)]
    #[case(2026, 12, 31)]
    fn test_month_bounds(#[case] year: i32, #[case] month: u32, #[case] last_day: u32) {
        let (start, end) = month_bounds(year, month).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(year, month, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(year, month, last_day).unwrap());
    }

    #[test]
    fn test_invalid_month_rejected() {
        assert!(matches!(
            month_bounds(2026, 13),
            Err(PeriodError::InvalidMonth(13))
        ));
        assert!(matches!(
            month_bounds(2026, 0),
            Err(PeriodError::InvalidMonth(0))
        ));
    }

    #[rstest]
    #[case(1, (1, 1), (3, 31))]
    #[case(2, (4, 1), (6, 30))]
    #[case(3, (7, 1), (9, 30))]
    #[case(4, (10, 1), (12, 31))]
    fn test_quarter_bounds(
        #[case] quarter: u32,
        #[case] start: (u32, u32),
        #[case] end: (u32, u32),
    ) {
        let (s, e) = quarter_bounds(2026, quarter).unwrap();
        assert_eq!(s, NaiveDate::from_ymd_opt(2026, start.0, start.1).unwrap());
        assert_eq!(e, NaiveDate::from_ymd_opt(2026, end.0, end.1).unwrap());
    }

    #[test]
    fn test_invalid_quarter_rejected() {
        assert!(matches!(
            quarter_bounds(2026, 5),
            Err(PeriodError::InvalidQuarter(5))
        ));
    }

    #[test]
    fn test_containing_month() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let (start, end) = containing_month(date);
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 3, 31).unwrap());
    }
}
