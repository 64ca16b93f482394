//! Reconciliation repository: bank record import and match persistence.
//!
//! The matching decisions live in `quill_core::reconcile`; this repository
//! loads the unmatched sides, persists the pairs, and enforces the
//! one-to-one rule with the unique constraint on `matched_transaction_id`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use quill_core::reconcile::{
    self, MatchReport, ReconcileError, UnmatchedBankRecord, UnmatchedTransaction,
};

use crate::entities::{
    bank_records, transactions,
    sea_orm_active_enums::TransactionStatus,
};

/// One bank statement line to import.
#[derive(Debug, Clone)]
pub struct ImportBankRecordInput {
    /// Statement line reference, unique per ledger.
    pub external_ref: String,
    /// Signed amount.
    pub amount: Decimal,
    /// Statement date.
    pub posted_at: DateTime<Utc>,
}

/// Outcome of a manual match.
#[derive(Debug, Clone, Copy)]
pub struct ManualMatch {
    /// True when the two sides disagree on amount beyond the tolerance.
    pub amount_mismatch: bool,
}

/// Both unmatched sides of a ledger, for manual review.
#[derive(Debug, Clone)]
pub struct UnmatchedSides {
    /// Completed transactions no bank record points at.
    pub transactions: Vec<UnmatchedTransaction>,
    /// Bank records with no match.
    pub bank_records: Vec<UnmatchedBankRecord>,
}

/// Reconciliation repository.
#[derive(Debug, Clone)]
pub struct ReconciliationRepository {
    db: DatabaseConnection,
}

impl ReconciliationRepository {
    /// Creates a new reconciliation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Imports bank statement lines, skipping lines already imported
    /// (same `external_ref`). Returns the number of new records.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn import_records(
        &self,
        ledger_id: Uuid,
        records: Vec<ImportBankRecordInput>,
    ) -> Result<u64, ReconcileError> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let models: Vec<bank_records::ActiveModel> = records
            .into_iter()
            .map(|r| bank_records::ActiveModel {
                id: Set(Uuid::now_v7()),
                ledger_id: Set(ledger_id),
                external_ref: Set(r.external_ref),
                amount: Set(r.amount),
                posted_at: Set(r.posted_at.into()),
                matched_transaction_id: Set(None),
                matched_at: Set(None),
                created_at: Set(now.into()),
            })
            .collect();

        let result = bank_records::Entity::insert_many(models)
            .on_conflict(
                OnConflict::columns([
                    bank_records::Column::LedgerId,
                    bank_records::Column::ExternalRef,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result)
    }

    /// Loads both unmatched sides of a ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn list_unmatched(&self, ledger_id: Uuid) -> Result<UnmatchedSides, ReconcileError> {
        let matched_ids: Vec<Uuid> = bank_records::Entity::find()
            .select_only()
            .column(bank_records::Column::MatchedTransactionId)
            .filter(bank_records::Column::LedgerId.eq(ledger_id))
            .filter(bank_records::Column::MatchedTransactionId.is_not_null())
            .into_tuple::<Option<Uuid>>()
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .flatten()
            .collect();

        let mut txn_query = transactions::Entity::find()
            .filter(transactions::Column::LedgerId.eq(ledger_id))
            .filter(transactions::Column::Status.eq(TransactionStatus::Completed));
        if !matched_ids.is_empty() {
            txn_query = txn_query.filter(transactions::Column::Id.is_not_in(matched_ids));
        }
        let txns = txn_query
            .order_by_asc(transactions::Column::EffectiveDate)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let records = bank_records::Entity::find()
            .filter(bank_records::Column::LedgerId.eq(ledger_id))
            .filter(bank_records::Column::MatchedTransactionId.is_null())
            .order_by_asc(bank_records::Column::PostedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(UnmatchedSides {
            transactions: txns.into_iter().map(to_unmatched_txn).collect(),
            bank_records: records.into_iter().map(to_unmatched_record).collect(),
        })
    }

    /// Runs an auto-match pass over a ledger and persists the pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if a query or update fails.
    pub async fn auto_match(&self, ledger_id: Uuid) -> Result<MatchReport, ReconcileError> {
        let sides = self.list_unmatched(ledger_id).await?;
        let report = reconcile::auto_match(&sides.transactions, &sides.bank_records);

        if report.matched.is_empty() {
            return Ok(report);
        }

        let txn = self.db.begin().await.map_err(db_err)?;
        let now = Utc::now();
        for pair in &report.matched {
            set_match(&txn, pair.bank_record_id, Some(pair.transaction_id), Some(now)).await?;
        }
        txn.commit().await.map_err(db_err)?;

        tracing::info!(
            ledger_id = %ledger_id,
            matched = report.matched.len(),
            ambiguous = report.ambiguous.len(),
            "auto-match pass complete"
        );

        Ok(report)
    }

    /// Manually pairs one bank record with one transaction. Both must
    /// belong to the given ledger. Amounts are allowed to disagree; the
    /// disagreement is reported back as a warning, since a manual match is
    /// the operator overriding the tolerance.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyMatched` variants when either side is consumed and
    /// `NotFound` when either side is missing from the ledger.
    pub async fn manual_match(
        &self,
        ledger_id: Uuid,
        bank_record_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<ManualMatch, ReconcileError> {
        let record = bank_records::Entity::find_by_id(bank_record_id)
            .filter(bank_records::Column::LedgerId.eq(ledger_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(ReconcileError::NotFound(bank_record_id))?;
        if record.matched_transaction_id.is_some() {
            return Err(ReconcileError::BankRecordAlreadyMatched(bank_record_id));
        }

        let transaction = transactions::Entity::find_by_id(transaction_id)
            .filter(transactions::Column::LedgerId.eq(ledger_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(ReconcileError::NotFound(transaction_id))?;

        let taken = bank_records::Entity::find()
            .filter(bank_records::Column::MatchedTransactionId.eq(transaction_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if taken.is_some() {
            return Err(ReconcileError::TransactionAlreadyMatched(transaction_id));
        }

        let amount_mismatch = !reconcile::amounts_agree(record.amount, transaction.amount);

        set_match(&self.db, bank_record_id, Some(transaction_id), Some(Utc::now()))
            .await
            .map_err(|e| match e {
                // Unique constraint on matched_transaction_id: a concurrent
                // match took the transaction first.
                ReconcileError::Database(msg) if msg.contains("unique") => {
                    ReconcileError::TransactionAlreadyMatched(transaction_id)
                }
                other => other,
            })?;

        Ok(ManualMatch { amount_mismatch })
    }

    /// Clears a match on a record in the given ledger. Mutates neither
    /// side's economic fields.
    ///
    /// # Errors
    ///
    /// Returns `NotMatched` if the record has no match to clear.
    pub async fn unmatch(&self, ledger_id: Uuid, bank_record_id: Uuid) -> Result<(), ReconcileError> {
        let record = bank_records::Entity::find_by_id(bank_record_id)
            .filter(bank_records::Column::LedgerId.eq(ledger_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(ReconcileError::NotFound(bank_record_id))?;
        if record.matched_transaction_id.is_none() {
            return Err(ReconcileError::NotMatched(bank_record_id));
        }

        set_match(&self.db, bank_record_id, None, None).await
    }
}

async fn set_match<C: sea_orm::ConnectionTrait>(
    conn: &C,
    bank_record_id: Uuid,
    transaction_id: Option<Uuid>,
    matched_at: Option<DateTime<Utc>>,
) -> Result<(), ReconcileError> {
    let record = bank_records::Entity::find_by_id(bank_record_id)
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(ReconcileError::NotFound(bank_record_id))?;

    let mut active: bank_records::ActiveModel = record.into();
    active.matched_transaction_id = Set(transaction_id);
    active.matched_at = Set(matched_at.map(Into::into));
    active.update(conn).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => ReconcileError::Database(format!("unique: {msg}")),
        _ => db_err(e),
    })?;
    Ok(())
}

fn to_unmatched_txn(model: transactions::Model) -> UnmatchedTransaction {
    UnmatchedTransaction {
        id: model.id,
        amount: model.amount,
        effective_date: model.effective_date,
    }
}

fn to_unmatched_record(model: bank_records::Model) -> UnmatchedBankRecord {
    UnmatchedBankRecord {
        id: model.id,
        amount: model.amount,
        posted_at: model.posted_at.into(),
    }
}

fn db_err(e: DbErr) -> ReconcileError {
    ReconcileError::Database(e.to_string())
}
