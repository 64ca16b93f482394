//! The dunning run orchestrator.
//!
//! A run walks the billable organizations, meters their usage, and drives
//! each overage charge through the claim / charge / record cycle. The
//! atomic claim in the billing repository is what makes concurrent runs
//! safe; this module only decides and dispatches.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use quill_core::billing::{
    ChargeStatus, DunningOutcome, MAX_ATTEMPTS, OverageAssessment, SkipReason, dunning, usage,
};
use quill_core::period::containing_month;
use quill_db::entities::{organizations, overage_charges};
use quill_db::repositories::billing::charge_status;
use quill_db::repositories::{BillingError, BillingRepository};
use quill_shared::{ChargeRequest, PaymentError, PaymentGateway};

/// Plan overage prices are denominated in this currency.
const BILLING_CURRENCY: &str = "USD";

/// Parameters of one billing pass.
#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    /// First day of the billed period.
    pub period_start: NaiveDate,
    /// Last day of the billed period.
    pub period_end: NaiveDate,
    /// Restrict the pass to one organization.
    pub organization_id: Option<Uuid>,
    /// Report decisions without writing anything.
    #[serde(default)]
    pub dry_run: bool,
}

/// Per-organization line of a run report.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationOutcome {
    /// The organization.
    pub organization_id: Uuid,
    /// Metered overage for the period, in minor units.
    pub overage_cents: i64,
    /// What the pass did (or, for dry runs, would do).
    #[serde(flatten)]
    pub outcome: DunningOutcome,
}

/// Result of one billing pass.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Always true; errors surface as HTTP errors, not reports.
    pub success: bool,
    /// First day of the billed period.
    pub period_start: NaiveDate,
    /// Last day of the billed period.
    pub period_end: NaiveDate,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Organizations charged (or, in a dry run, that would be charged).
    pub charged: usize,
    /// Organizations skipped.
    pub skipped: usize,
    /// Organizations whose payment attempt failed.
    pub failed: usize,
    /// One line per organization considered.
    pub results: Vec<OrganizationOutcome>,
}

impl RunReport {
    fn new(request: &RunRequest, results: Vec<OrganizationOutcome>) -> Self {
        let mut charged = 0;
        let mut skipped = 0;
        let mut failed = 0;
        for line in &results {
            match line.outcome {
                DunningOutcome::Succeeded { .. } | DunningOutcome::WouldAttempt { .. } => {
                    charged += 1;
                }
                DunningOutcome::Skipped { .. } => skipped += 1,
                DunningOutcome::Failed { .. } => failed += 1,
            }
        }
        Self {
            success: true,
            period_start: request.period_start,
            period_end: request.period_end,
            dry_run: request.dry_run,
            charged,
            skipped,
            failed,
            results,
        }
    }
}

/// Drives overage charges through claim, payment, and bookkeeping.
pub struct DunningEngine {
    repo: BillingRepository,
    gateway: Arc<dyn PaymentGateway>,
    merchant_id: Option<String>,
}

impl DunningEngine {
    /// Creates an engine over the given connection and payment gateway.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        gateway: Arc<dyn PaymentGateway>,
        merchant_id: Option<String>,
    ) -> Self {
        Self {
            repo: BillingRepository::new(db),
            gateway,
            merchant_id,
        }
    }

    /// Executes one billing pass.
    ///
    /// # Errors
    ///
    /// Returns an error when the organization scope cannot be resolved or a
    /// database operation fails. Payment failures are not errors; they are
    /// recorded per organization in the report.
    pub async fn run(&self, request: &RunRequest) -> Result<RunReport, BillingError> {
        let now = Utc::now();

        let organizations = match request.organization_id {
            Some(id) => vec![self.repo.find_organization(id).await?],
            None => self.repo.billable_organizations().await?,
        };

        let mut lines = Vec::with_capacity(organizations.len());
        for organization in &organizations {
            let line = self.process_organization(organization, request, now).await?;
            lines.push(line);
        }

        info!(
            period_start = %request.period_start,
            dry_run = request.dry_run,
            organizations = lines.len(),
            "billing pass complete"
        );

        Ok(RunReport::new(request, lines))
    }

    async fn process_organization(
        &self,
        organization: &organizations::Model,
        request: &RunRequest,
        now: DateTime<Utc>,
    ) -> Result<OrganizationOutcome, BillingError> {
        let counts = self.repo.usage_counts(organization).await?;
        let allowance = BillingRepository::plan_allowance(organization);
        let assessment = usage::assess(&allowance, &counts);

        let outcome = if assessment.is_within_plan() {
            DunningOutcome::Skipped {
                reason: SkipReason::WithinPlan,
            }
        } else if request.dry_run {
            let existing = self
                .repo
                .find_charge(organization.id, request.period_start)
                .await?;
            dry_run_decision(existing.as_ref().map(charge_view).as_ref(), now)
        } else {
            self.attempt(organization, request, &assessment, now).await?
        };

        Ok(OrganizationOutcome {
            organization_id: organization.id,
            overage_cents: assessment.total_cents,
            outcome,
        })
    }

    /// Claims the charge and drives one payment attempt.
    async fn attempt(
        &self,
        organization: &organizations::Model,
        request: &RunRequest,
        assessment: &OverageAssessment,
        now: DateTime<Utc>,
    ) -> Result<DunningOutcome, BillingError> {
        let Some(claimed) = self
            .repo
            .claim_charge(
                organization.id,
                request.period_start,
                request.period_end,
                assessment,
                BILLING_CURRENCY,
                now,
            )
            .await?
        else {
            // The claim tells us nothing about why it failed; look at the
            // row to report the reason.
            let existing = self
                .repo
                .find_charge(organization.id, request.period_start)
                .await?;
            let reason = match existing.as_ref().map(charge_view) {
                Some(view)
                    if view.status == ChargeStatus::Pending
                        && !dunning::is_due(view.attempts, view.last_attempt_at, now) =>
                {
                    SkipReason::NotDueYet
                }
                _ => SkipReason::AlreadyClaimed,
            };
            return Ok(DunningOutcome::Skipped { reason });
        };

        let charge = &claimed.charge;
        let charge_request = match build_charge_request(organization, charge, self.merchant_id.as_deref()) {
            Ok(r) => r,
            Err(e) => {
                // Configuration gaps consume an attempt like a decline.
                let updated = self.repo.record_failure(charge, &e.to_string(), now).await?;
                return Ok(failed_outcome(&updated));
            }
        };

        match self.gateway.charge(&charge_request).await {
            Ok(receipt) => {
                let updated = self.repo.record_success(charge, now).await?;
                info!(
                    organization_id = %organization.id,
                    charge_id = %charge.id,
                    provider_charge_id = %receipt.provider_charge_id,
                    amount_cents = charge.amount_cents,
                    "overage charge collected"
                );
                Ok(DunningOutcome::Succeeded {
                    attempts: updated.attempts,
                })
            }
            Err(e) => {
                let updated = self.repo.record_failure(charge, &e.to_string(), now).await?;
                Ok(failed_outcome(&updated))
            }
        }
    }
}

/// The fields of a charge row that dunning decisions read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChargeView {
    status: ChargeStatus,
    attempts: i32,
    last_attempt_at: Option<DateTime<Utc>>,
}

fn charge_view(charge: &overage_charges::Model) -> ChargeView {
    ChargeView {
        status: charge_status(charge),
        attempts: charge.attempts,
        last_attempt_at: charge.last_attempt_at.map(|t| t.with_timezone(&Utc)),
    }
}

/// What a real pass would do with this charge, without writing anything.
fn dry_run_decision(charge: Option<&ChargeView>, now: DateTime<Utc>) -> DunningOutcome {
    match charge {
        None => DunningOutcome::WouldAttempt { attempt: 1 },
        Some(view) => match view.status {
            ChargeStatus::Succeeded => DunningOutcome::Succeeded {
                attempts: view.attempts,
            },
            ChargeStatus::Failed => DunningOutcome::Failed {
                attempts: view.attempts,
                retries_remaining: 0,
                next_retry_at: None,
            },
            ChargeStatus::Processing => DunningOutcome::Skipped {
                reason: SkipReason::AlreadyClaimed,
            },
            ChargeStatus::Pending => {
                if dunning::is_due(view.attempts, view.last_attempt_at, now) {
                    DunningOutcome::WouldAttempt {
                        attempt: view.attempts + 1,
                    }
                } else {
                    DunningOutcome::Skipped {
                        reason: SkipReason::NotDueYet,
                    }
                }
            }
        },
    }
}

/// Builds the outgoing charge request, or fails when billing configuration
/// is incomplete.
fn build_charge_request(
    organization: &organizations::Model,
    charge: &overage_charges::Model,
    merchant_id: Option<&str>,
) -> Result<ChargeRequest, PaymentError> {
    let customer_ref = organization
        .billing_customer_ref
        .clone()
        .ok_or(PaymentError::MissingBillingMethod)?;
    let merchant_id = merchant_id.ok_or(PaymentError::MissingMerchant)?.to_string();

    Ok(ChargeRequest {
        customer_ref,
        merchant_id,
        amount_cents: charge.amount_cents,
        currency: charge.currency.clone(),
        description: format!(
            "Usage overage {} to {}",
            charge.period_start, charge.period_end
        ),
        // The charge row is unique per (organization, period), so its id is
        // a stable idempotency key across retries of the same attempt.
        idempotency_key: charge.id.to_string(),
    })
}

fn failed_outcome(charge: &overage_charges::Model) -> DunningOutcome {
    DunningOutcome::Failed {
        attempts: charge.attempts,
        retries_remaining: (MAX_ATTEMPTS - charge.attempts).max(0),
        next_retry_at: charge.next_retry_at.map(|t| t.with_timezone(&Utc)),
    }
}

/// The calendar month before the one containing `today`. A billing pass
/// with no explicit period bills the month that just ended.
#[must_use]
pub fn previous_month(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first_of_month = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
    let last_of_previous = first_of_month.pred_opt().unwrap_or(first_of_month);
    containing_month(last_of_previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use mockall::mock;
    use quill_db::entities::sea_orm_active_enums::{BillingStatusDb, ChargeStatusDb};
    use quill_shared::ChargeReceipt;

    mock! {
        Gateway {}

        #[async_trait]
        impl PaymentGateway for Gateway {
            async fn charge(
                &self,
                request: &ChargeRequest,
            ) -> Result<ChargeReceipt, PaymentError>;
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap()
    }

    fn organization(customer_ref: Option<&str>) -> organizations::Model {
        organizations::Model {
            id: Uuid::now_v7(),
            name: "Acme".to_string(),
            billing_status: BillingStatusDb::Active,
            billing_customer_ref: customer_ref.map(ToString::to_string),
            included_ledgers: 1,
            included_members: 3,
            ledger_overage_cents: 2000,
            member_overage_cents: 500,
            team_member_count: 3,
            created_at: t0().into(),
            updated_at: t0().into(),
        }
    }

    fn charge() -> overage_charges::Model {
        overage_charges::Model {
            id: Uuid::now_v7(),
            organization_id: Uuid::now_v7(),
            period_start: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
            amount_cents: 4000,
            currency: "USD".to_string(),
            detail: serde_json::json!([]),
            status: ChargeStatusDb::Processing,
            attempts: 0,
            last_attempt_at: None,
            next_retry_at: None,
            last_error: None,
            created_at: t0().into(),
            updated_at: t0().into(),
        }
    }

    #[test]
    fn test_charge_request_uses_charge_id_as_idempotency_key() {
        let org = organization(Some("cus_123"));
        let charge = charge();

        let request = build_charge_request(&org, &charge, Some("acct_1")).unwrap();
        assert_eq!(request.idempotency_key, charge.id.to_string());
        assert_eq!(request.customer_ref, "cus_123");
        assert_eq!(request.amount_cents, 4000);
    }

    #[test]
    fn test_missing_billing_method_fails_request_construction() {
        let org = organization(None);
        let err = build_charge_request(&org, &charge(), Some("acct_1")).unwrap_err();
        assert!(matches!(err, PaymentError::MissingBillingMethod));
    }

    #[test]
    fn test_missing_merchant_fails_request_construction() {
        let org = organization(Some("cus_123"));
        let err = build_charge_request(&org, &charge(), None).unwrap_err();
        assert!(matches!(err, PaymentError::MissingMerchant));
    }

    #[tokio::test]
    async fn test_mock_gateway_receives_built_request() {
        let org = organization(Some("cus_9"));
        let request = build_charge_request(&org, &charge(), Some("acct_1")).unwrap();

        let mut gateway = MockGateway::new();
        gateway
            .expect_charge()
            .withf(|r| r.customer_ref == "cus_9" && r.currency == "USD")
            .returning(|_| {
                Ok(ChargeReceipt {
                    provider_charge_id: "ch_1".to_string(),
                })
            });

        let receipt = gateway.charge(&request).await.unwrap();
        assert_eq!(receipt.provider_charge_id, "ch_1");
    }

    #[test]
    fn test_dry_run_fresh_charge_would_attempt() {
        assert!(matches!(
            dry_run_decision(None, t0()),
            DunningOutcome::WouldAttempt { attempt: 1 }
        ));
    }

    #[test]
    fn test_dry_run_pending_charge_respects_retry_delay() {
        let view = ChargeView {
            status: ChargeStatus::Pending,
            attempts: 1,
            last_attempt_at: Some(t0()),
        };

        // Second attempt is due three days after the first failure.
        assert!(matches!(
            dry_run_decision(Some(&view), t0() + Duration::days(1)),
            DunningOutcome::Skipped {
                reason: SkipReason::NotDueYet
            }
        ));
        assert!(matches!(
            dry_run_decision(Some(&view), t0() + Duration::days(3)),
            DunningOutcome::WouldAttempt { attempt: 2 }
        ));
    }

    #[test]
    fn test_dry_run_reports_terminal_charges_as_is() {
        let succeeded = ChargeView {
            status: ChargeStatus::Succeeded,
            attempts: 2,
            last_attempt_at: Some(t0()),
        };
        assert!(matches!(
            dry_run_decision(Some(&succeeded), t0()),
            DunningOutcome::Succeeded { attempts: 2 }
        ));

        let failed = ChargeView {
            status: ChargeStatus::Failed,
            attempts: 3,
            last_attempt_at: Some(t0()),
        };
        assert!(matches!(
            dry_run_decision(Some(&failed), t0()),
            DunningOutcome::Failed {
                attempts: 3,
                retries_remaining: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_dry_run_processing_charge_is_claimed() {
        let view = ChargeView {
            status: ChargeStatus::Processing,
            attempts: 0,
            last_attempt_at: None,
        };
        assert!(matches!(
            dry_run_decision(Some(&view), t0()),
            DunningOutcome::Skipped {
                reason: SkipReason::AlreadyClaimed
            }
        ));
    }

    #[test]
    fn test_previous_month_spans_the_month_that_ended() {
        let (start, end) = previous_month(NaiveDate::from_ymd_opt(2026, 8, 30).unwrap());
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 7, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 7, 31).unwrap());
    }

    #[test]
    fn test_report_counts_outcomes_by_bucket() {
        let request = RunRequest {
            period_start: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
            organization_id: None,
            dry_run: false,
        };
        let line = |outcome| OrganizationOutcome {
            organization_id: Uuid::now_v7(),
            overage_cents: 100,
            outcome,
        };

        let report = RunReport::new(
            &request,
            vec![
                line(DunningOutcome::Succeeded { attempts: 1 }),
                line(DunningOutcome::WouldAttempt { attempt: 1 }),
                line(DunningOutcome::Skipped {
                    reason: SkipReason::WithinPlan,
                }),
                line(DunningOutcome::Failed {
                    attempts: 2,
                    retries_remaining: 1,
                    next_retry_at: None,
                }),
            ],
        );

        assert!(report.success);
        assert_eq!(report.charged, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.results.len(), 4);
    }

    #[test]
    fn test_previous_month_crosses_year_boundary() {
        let (start, end) = previous_month(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }
}
