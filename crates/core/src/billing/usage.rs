//! Overage assessment against plan allowances.

use serde::{Deserialize, Serialize};

/// Sentinel for an unlimited allowance.
pub const UNLIMITED: i64 = -1;

/// What an organization's plan includes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlanAllowance {
    /// Included live ledgers, -1 for unlimited.
    pub included_ledgers: i64,
    /// Included team members, -1 for unlimited.
    pub included_members: i64,
    /// Price in cents per ledger beyond the allowance.
    pub ledger_price_cents: i64,
    /// Price in cents per team member beyond the allowance.
    pub member_price_cents: i64,
}

/// Measured usage for one organization.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct UsageCounts {
    /// Live ledgers at assessment time.
    pub live_ledgers: i64,
    /// Team members at assessment time.
    pub team_members: i64,
}

/// One billable overage dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverageLine {
    /// Which dimension overflowed.
    pub dimension: String,
    /// Units beyond the allowance.
    pub additional: i64,
    /// Price per additional unit, in cents.
    pub unit_price_cents: i64,
    /// `additional * unit_price_cents`.
    pub amount_cents: i64,
}

/// Overage assessment for one organization.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverageAssessment {
    /// Billable lines; empty when usage fits the plan.
    pub lines: Vec<OverageLine>,
    /// Sum of line amounts in cents.
    pub total_cents: i64,
}

impl OverageAssessment {
    /// True if nothing is owed.
    #[must_use]
    pub fn is_within_plan(&self) -> bool {
        self.lines.is_empty()
    }
}

fn overage_units(used: i64, included: i64) -> i64 {
    if included == UNLIMITED {
        return 0;
    }
    (used - included).max(0)
}

/// Compares usage to the allowance and prices what exceeds it.
#[must_use]
pub fn assess(allowance: &PlanAllowance, usage: &UsageCounts) -> OverageAssessment {
    let mut assessment = OverageAssessment::default();

    let extra_ledgers = overage_units(usage.live_ledgers, allowance.included_ledgers);
    if extra_ledgers > 0 {
        assessment.lines.push(OverageLine {
            dimension: "ledgers".to_string(),
            additional: extra_ledgers,
            unit_price_cents: allowance.ledger_price_cents,
            amount_cents: extra_ledgers * allowance.ledger_price_cents,
        });
    }

    let extra_members = overage_units(usage.team_members, allowance.included_members);
    if extra_members > 0 {
        assessment.lines.push(OverageLine {
            dimension: "team_members".to_string(),
            additional: extra_members,
            unit_price_cents: allowance.member_price_cents,
            amount_cents: extra_members * allowance.member_price_cents,
        });
    }

    assessment.total_cents = assessment.lines.iter().map(|l| l.amount_cents).sum();
    assessment
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn starter_plan() -> PlanAllowance {
        PlanAllowance {
            included_ledgers: 1,
            included_members: 2,
            ledger_price_cents: 2000,
            member_price_cents: 500,
        }
    }

    #[test]
    fn test_ledger_overage_priced_per_unit() {
        let usage = UsageCounts {
            live_ledgers: 3,
            team_members: 2,
        };

        let assessment = assess(&starter_plan(), &usage);

        assert_eq!(assessment.lines.len(), 1);
        assert_eq!(assessment.lines[0].dimension, "ledgers");
        assert_eq!(assessment.lines[0].additional, 2);
        assert_eq!(assessment.lines[0].amount_cents, 4000);
        assert_eq!(assessment.total_cents, 4000);
    }

    #[test]
    fn test_within_plan_owes_nothing() {
        let usage = UsageCounts {
            live_ledgers: 1,
            team_members: 2,
        };

        let assessment = assess(&starter_plan(), &usage);
        assert!(assessment.is_within_plan());
        assert_eq!(assessment.total_cents, 0);
    }

    #[test]
    fn test_unlimited_allowance_never_bills() {
        let plan = PlanAllowance {
            included_ledgers: UNLIMITED,
            included_members: UNLIMITED,
            ledger_price_cents: 2000,
            member_price_cents: 500,
        };
        let usage = UsageCounts {
            live_ledgers: 500,
            team_members: 1000,
        };

        assert!(assess(&plan, &usage).is_within_plan());
    }

    #[test]
    fn test_both_dimensions_sum() {
        let usage = UsageCounts {
            live_ledgers: 2,
            team_members: 5,
        };

        let assessment = assess(&starter_plan(), &usage);
        assert_eq!(assessment.lines.len(), 2);
        assert_eq!(assessment.total_cents, 2000 + 3 * 500);
    }

    #[rstest]
    #[case(0, 1, 0)]
    #[case(1, 1, 0)]
    #[case(2, 1, 1)]
    #[case(10, 0, 10)]
    #[case(5, UNLIMITED, 0)]
    fn test_overage_units(#[case] used: i64, #[case] included: i64, #[case] expected: i64) {
        assert_eq!(overage_units(used, included), expected);
    }
}
