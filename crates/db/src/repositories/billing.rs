//! Billing repository: usage counts, the atomic dunning claim, and charge
//! state transitions.
//!
//! The claim is a single `INSERT ... ON CONFLICT ... DO UPDATE ... RETURNING`
//! statement whose predicate carries both the status gate and the retry
//! due-gate, so two concurrent billing passes cannot both hold the same
//! charge: the loser observes no returned row and skips.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, Set, Statement, TransactionTrait,
};
use uuid::Uuid;

use quill_core::billing::{
    dunning, BillingStatus, ChargeStatus, OverageAssessment, PlanAllowance, UsageCounts,
};

use crate::entities::{
    ledgers, organizations, overage_charges,
    sea_orm_active_enums::{BillingStatusDb, ChargeStatusDb},
};

/// Error types for billing operations.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Organization not found.
    #[error("Organization not found: {0}")]
    OrganizationNotFound(Uuid),

    /// Charge row not found.
    #[error("Charge not found: {0}")]
    ChargeNotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// A charge successfully claimed for processing.
#[derive(Debug, Clone)]
pub struct ClaimedCharge {
    /// The claimed row, status already `processing`.
    pub charge: overage_charges::Model,
}

/// Billing repository.
#[derive(Debug, Clone)]
pub struct BillingRepository {
    db: DatabaseConnection,
}

impl BillingRepository {
    /// Creates a new billing repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Organizations eligible for a billing pass. Suspended and canceled
    /// organizations are never billed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn billable_organizations(
        &self,
    ) -> Result<Vec<organizations::Model>, BillingError> {
        organizations::Entity::find()
            .filter(
                organizations::Column::BillingStatus
                    .is_in([BillingStatusDb::Active, BillingStatusDb::PastDue]),
            )
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Loads one organization.
    ///
    /// # Errors
    ///
    /// Returns `OrganizationNotFound` if no such organization exists.
    pub async fn find_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<organizations::Model, BillingError> {
        organizations::Entity::find_by_id(organization_id)
            .one(&self.db)
            .await?
            .ok_or(BillingError::OrganizationNotFound(organization_id))
    }

    /// Measures usage for an organization: live ledgers plus the maintained
    /// team member counter.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn usage_counts(
        &self,
        organization: &organizations::Model,
    ) -> Result<UsageCounts, BillingError> {
        let live_ledgers = ledgers::Entity::find()
            .filter(ledgers::Column::OrganizationId.eq(organization.id))
            .filter(ledgers::Column::IsLive.eq(true))
            .count(&self.db)
            .await?;

        Ok(UsageCounts {
            live_ledgers: i64::try_from(live_ledgers).unwrap_or(i64::MAX),
            team_members: organization.team_member_count,
        })
    }

    /// Plan allowance as stored on the organization row.
    #[must_use]
    pub fn plan_allowance(organization: &organizations::Model) -> PlanAllowance {
        PlanAllowance {
            included_ledgers: organization.included_ledgers,
            included_members: organization.included_members,
            ledger_price_cents: organization.ledger_overage_cents,
            member_price_cents: organization.member_overage_cents,
        }
    }

    /// Atomically claims the charge for `(organization, period)`.
    ///
    /// Inserts the charge as `processing` if none exists, or flips an
    /// existing `pending` charge to `processing` when its retry is due.
    /// Returns `None` when the charge is already held, finished, or not due.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub async fn claim_charge(
        &self,
        organization_id: Uuid,
        period_start: NaiveDate,
        period_end: NaiveDate,
        assessment: &OverageAssessment,
        currency: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ClaimedCharge>, BillingError> {
        let detail = serde_json::to_value(&assessment.lines)
            .map_err(|e| DbErr::Custom(e.to_string()))?;

        let claimed = overage_charges::Entity::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Postgres,
                CLAIM_SQL,
                [
                    Uuid::now_v7().into(),
                    organization_id.into(),
                    period_start.into(),
                    period_end.into(),
                    assessment.total_cents.into(),
                    currency.into(),
                    detail.into(),
                    now.into(),
                ],
            ))
            .one(&self.db)
            .await?;

        Ok(claimed.map(|charge| ClaimedCharge { charge }))
    }

    /// Records a successful collection: charge to `succeeded`, organization
    /// recovered to `active` if it was past due. One database transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the charge or organization is missing or an
    /// update fails.
    pub async fn record_success(
        &self,
        charge: &overage_charges::Model,
        now: DateTime<Utc>,
    ) -> Result<overage_charges::Model, BillingError> {
        let txn = self.db.begin().await?;

        let mut active: overage_charges::ActiveModel = charge.clone().into();
        active.status = Set(ChargeStatusDb::Succeeded);
        active.attempts = Set(charge.attempts + 1);
        active.last_attempt_at = Set(Some(now.into()));
        active.next_retry_at = Set(None);
        active.last_error = Set(None);
        active.updated_at = Set(now.into());
        let updated = active.update(&txn).await?;

        let organization = organizations::Entity::find_by_id(charge.organization_id)
            .one(&txn)
            .await?
            .ok_or(BillingError::OrganizationNotFound(charge.organization_id))?;
        let status: BillingStatus = organization.billing_status.clone().into();
        let next = status.after_success();
        if next != status {
            let mut org_active: organizations::ActiveModel = organization.into();
            org_active.billing_status = Set(next.into());
            org_active.updated_at = Set(now.into());
            org_active.update(&txn).await?;
        }

        txn.commit().await?;
        Ok(updated)
    }

    /// Records a failed attempt. Before the final attempt the charge drops
    /// back to `pending` with the next retry time; the final failure is
    /// terminal and flips the organization to `past_due`. One database
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the charge or organization is missing or an
    /// update fails.
    pub async fn record_failure(
        &self,
        charge: &overage_charges::Model,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<overage_charges::Model, BillingError> {
        let attempts = charge.attempts + 1;
        let terminal = attempts >= dunning::MAX_ATTEMPTS;

        let txn = self.db.begin().await?;

        let mut active: overage_charges::ActiveModel = charge.clone().into();
        active.attempts = Set(attempts);
        active.last_attempt_at = Set(Some(now.into()));
        active.last_error = Set(Some(error.to_string()));
        active.updated_at = Set(now.into());
        if terminal {
            active.status = Set(ChargeStatusDb::Failed);
            active.next_retry_at = Set(None);
        } else {
            active.status = Set(ChargeStatusDb::Pending);
            active.next_retry_at = Set(dunning::next_retry_at(attempts, now).map(Into::into));
        }
        let updated = active.update(&txn).await?;

        if terminal {
            let organization = organizations::Entity::find_by_id(charge.organization_id)
                .one(&txn)
                .await?
                .ok_or(BillingError::OrganizationNotFound(charge.organization_id))?;
            let status: BillingStatus = organization.billing_status.clone().into();
            let next = status.after_terminal_failure();
            if next != status {
                let mut org_active: organizations::ActiveModel = organization.into();
                org_active.billing_status = Set(next.into());
                org_active.updated_at = Set(now.into());
                org_active.update(&txn).await?;
            }
        }

        txn.commit().await?;

        tracing::warn!(
            charge_id = %charge.id,
            attempts,
            terminal,
            "overage charge attempt failed"
        );

        Ok(updated)
    }

    /// Current charge row for `(organization, period)`, if any. Used by dry
    /// runs to report what a real pass would do without claiming.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_charge(
        &self,
        organization_id: Uuid,
        period_start: NaiveDate,
    ) -> Result<Option<overage_charges::Model>, BillingError> {
        overage_charges::Entity::find()
            .filter(overage_charges::Column::OrganizationId.eq(organization_id))
            .filter(overage_charges::Column::PeriodStart.eq(period_start))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }
}

/// Charge status as a domain enum, for decision logic in the dunning runner.
#[must_use]
pub fn charge_status(charge: &overage_charges::Model) -> ChargeStatus {
    charge.status.clone().into()
}

// The WHERE predicate on the DO UPDATE arm carries the whole gate: a charge
// already processing, succeeded, or failed is not retaken, and a pending
// charge is only taken once its retry is due.
const CLAIM_SQL: &str = r"
INSERT INTO overage_charges
    (id, organization_id, period_start, period_end, amount_cents, currency,
     detail, status, attempts, created_at, updated_at)
VALUES
    ($1, $2, $3, $4, $5, $6, $7, 'processing', 0, $8, $8)
ON CONFLICT (organization_id, period_start) DO UPDATE
SET status = 'processing',
    updated_at = $8
WHERE overage_charges.status = 'pending'
  AND (overage_charges.next_retry_at IS NULL OR overage_charges.next_retry_at <= $8)
RETURNING *
";
