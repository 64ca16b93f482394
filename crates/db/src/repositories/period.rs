//! Period repository: close with a trial-balance snapshot, atomically.
//!
//! Closing a period is the one place the engine certifies "the books were
//! balanced here". The snapshot and the period row commit together; the
//! unique constraint on `(ledger_id, start_date, end_date)` makes a
//! concurrent double-close lose cleanly with `AlreadyClosed`.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use quill_core::period::{PeriodError, PeriodGranularity, PeriodStatus};
use quill_core::snapshot::TrialBalance;

use crate::entities::{
    accounting_periods, sea_orm_active_enums, trial_balance_snapshots,
};
use crate::repositories::account;

/// Input for closing a period.
#[derive(Debug, Clone)]
pub struct ClosePeriodInput {
    /// Owning ledger.
    pub ledger_id: Uuid,
    /// First day of the period.
    pub start_date: NaiveDate,
    /// Last day of the period.
    pub end_date: NaiveDate,
    /// Monthly or quarterly.
    pub granularity: PeriodGranularity,
    /// Free-form close notes.
    pub notes: Option<String>,
}

/// A closed period with its frozen snapshot.
#[derive(Debug, Clone)]
pub struct ClosedPeriod {
    /// The period row.
    pub period: accounting_periods::Model,
    /// The snapshot frozen at close.
    pub snapshot: trial_balance_snapshots::Model,
}

/// Period repository.
#[derive(Debug, Clone)]
pub struct PeriodRepository {
    db: DatabaseConnection,
    balance_tolerance: Decimal,
}

impl PeriodRepository {
    /// Creates a new period repository with the configured balance tolerance.
    #[must_use]
    pub const fn new(db: DatabaseConnection, balance_tolerance: Decimal) -> Self {
        Self {
            db,
            balance_tolerance,
        }
    }

    /// Closes a period, freezing a trial-balance snapshot.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyClosed` if the range has a closed or locked row (or a
    /// concurrent close wins the unique constraint), `UnbalancedLedger` if
    /// debits and credits disagree beyond the tolerance.
    pub async fn close_period(&self, input: ClosePeriodInput) -> Result<ClosedPeriod, PeriodError> {
        let existing = accounting_periods::Entity::find()
            .filter(accounting_periods::Column::LedgerId.eq(input.ledger_id))
            .filter(accounting_periods::Column::StartDate.eq(input.start_date))
            .filter(accounting_periods::Column::EndDate.eq(input.end_date))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        if let Some(period) = &existing {
            let status: PeriodStatus = period.status.clone().into();
            if !status.can_close() {
                return Err(PeriodError::AlreadyClosed {
                    start: input.start_date,
                    end: input.end_date,
                });
            }
        }

        let rows = account::trial_balance_rows(&self.db, input.ledger_id, input.end_date)
            .await
            .map_err(|e| PeriodError::Database(e.to_string()))?;
        let now = Utc::now();
        let trial_balance = TrialBalance::new(rows, now);

        if !trial_balance.is_balanced_within(self.balance_tolerance) {
            return Err(PeriodError::UnbalancedLedger {
                debits: trial_balance.total_debits,
                credits: trial_balance.total_credits,
                difference: trial_balance.difference(),
            });
        }

        let balances = serde_json::to_value(&trial_balance.rows)
            .map_err(|e| PeriodError::Database(e.to_string()))?;

        let txn = self.db.begin().await.map_err(db_err)?;

        let snapshot = trial_balance_snapshots::ActiveModel {
            id: Set(Uuid::now_v7()),
            ledger_id: Set(input.ledger_id),
            balances: Set(balances),
            content_hash: Set(trial_balance.content_hash()),
            total_debits: Set(trial_balance.total_debits),
            total_credits: Set(trial_balance.total_credits),
            is_balanced: Set(true),
            taken_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        let period = match existing {
            Some(open) => {
                // Conditional on the row still being open, so a concurrent
                // close that committed after the pre-check loses here
                // instead of overwriting the winning snapshot.
                let update = accounting_periods::Entity::update_many()
                    .col_expr(
                        accounting_periods::Column::Status,
                        sea_orm_active_enums::PeriodStatus::Closed.as_enum(),
                    )
                    .col_expr(
                        accounting_periods::Column::ClosingSnapshotId,
                        Expr::value(Some(snapshot.id)),
                    )
                    .col_expr(accounting_periods::Column::Notes, Expr::value(input.notes.clone()))
                    .col_expr(accounting_periods::Column::ClosedAt, Expr::value(Some(now)))
                    .col_expr(accounting_periods::Column::UpdatedAt, Expr::value(now))
                    .filter(accounting_periods::Column::Id.eq(open.id))
                    .filter(
                        accounting_periods::Column::Status
                            .eq(sea_orm_active_enums::PeriodStatus::Open),
                    )
                    .exec(&txn)
                    .await
                    .map_err(db_err)?;

                if update.rows_affected == 0 {
                    return Err(PeriodError::AlreadyClosed {
                        start: input.start_date,
                        end: input.end_date,
                    });
                }

                accounting_periods::Entity::find_by_id(open.id)
                    .one(&txn)
                    .await
                    .map_err(db_err)?
                    .ok_or_else(|| {
                        PeriodError::Database("period row vanished during close".to_string())
                    })?
            }
            None => accounting_periods::ActiveModel {
                id: Set(Uuid::now_v7()),
                ledger_id: Set(input.ledger_id),
                start_date: Set(input.start_date),
                end_date: Set(input.end_date),
                granularity: Set(input.granularity.into()),
                status: Set(sea_orm_active_enums::PeriodStatus::Closed),
                closing_snapshot_id: Set(Some(snapshot.id)),
                notes: Set(input.notes.clone()),
                closed_at: Set(Some(now.into())),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(&txn)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => PeriodError::AlreadyClosed {
                    start: input.start_date,
                    end: input.end_date,
                },
                _ => db_err(e),
            })?,
        };

        txn.commit().await.map_err(db_err)?;

        tracing::info!(
            ledger_id = %input.ledger_id,
            period_id = %period.id,
            content_hash = %snapshot.content_hash,
            "period closed"
        );

        Ok(ClosedPeriod { period, snapshot })
    }

    /// Takes a trial-balance snapshot outside the close path, persisting it
    /// for audit even when the books do not balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the computation or insert fails.
    pub async fn take_snapshot(
        &self,
        ledger_id: Uuid,
        through: NaiveDate,
    ) -> Result<trial_balance_snapshots::Model, PeriodError> {
        let rows = account::trial_balance_rows(&self.db, ledger_id, through)
            .await
            .map_err(|e| PeriodError::Database(e.to_string()))?;
        let now = Utc::now();
        let trial_balance = TrialBalance::new(rows, now);
        let is_balanced = trial_balance.is_balanced_within(self.balance_tolerance);

        let balances = serde_json::to_value(&trial_balance.rows)
            .map_err(|e| PeriodError::Database(e.to_string()))?;

        trial_balance_snapshots::ActiveModel {
            id: Set(Uuid::now_v7()),
            ledger_id: Set(ledger_id),
            balances: Set(balances),
            content_hash: Set(trial_balance.content_hash()),
            total_debits: Set(trial_balance.total_debits),
            total_credits: Set(trial_balance.total_credits),
            is_balanced: Set(is_balanced),
            taken_at: Set(now.into()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)
    }

    /// Returns the most recent snapshot for a ledger, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn latest_snapshot(
        &self,
        ledger_id: Uuid,
    ) -> Result<Option<trial_balance_snapshots::Model>, PeriodError> {
        trial_balance_snapshots::Entity::find()
            .filter(trial_balance_snapshots::Column::LedgerId.eq(ledger_id))
            .order_by_desc(trial_balance_snapshots::Column::TakenAt)
            .one(&self.db)
            .await
            .map_err(db_err)
    }
}

fn db_err(e: DbErr) -> PeriodError {
    PeriodError::Database(e.to_string())
}
