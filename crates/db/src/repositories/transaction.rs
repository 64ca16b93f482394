//! Transaction repository for double-entry posting, voiding, and reversal.
//!
//! A transaction and its entries always commit together. The balance
//! invariant is validated in `quill-core` before anything touches the
//! database; the unique constraints are the backstop under concurrency.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use quill_core::correction::{self, AdjustmentJournalInput, PostedEntry};
use quill_core::ledger::{EntryInput, LedgerError, LedgerService, TransactionType};
use quill_core::period::PeriodStatus;

use crate::entities::{
    accounting_periods, adjustment_journals, ledger_entries, transactions,
    sea_orm_active_enums::{self, TransactionStatus},
};
use crate::repositories::account;

/// Input for creating a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    /// Owning ledger.
    pub ledger_id: Uuid,
    /// Business meaning.
    pub transaction_type: TransactionType,
    /// Gross amount; sign carries direction.
    pub amount: Decimal,
    /// ISO currency code.
    pub currency: String,
    /// Description.
    pub description: Option<String>,
    /// Caller idempotency key, unique per ledger.
    pub reference_id: Option<String>,
    /// Accounting date.
    pub effective_date: NaiveDate,
    /// Balanced entry set.
    pub entries: Vec<EntryInput>,
}

/// Input for reversing a completed transaction.
#[derive(Debug, Clone)]
pub struct ReverseTransactionInput {
    /// The transaction to reverse.
    pub original_id: Uuid,
    /// Date of the correcting transaction; must fall in an open period.
    pub effective_date: NaiveDate,
    /// Journal metadata documenting the correction.
    pub journal: AdjustmentJournalInput,
}

/// Input for posting a caller-supplied adjustment entry set.
#[derive(Debug, Clone)]
pub struct RecordAdjustmentInput {
    /// Owning ledger.
    pub ledger_id: Uuid,
    /// Accounting date; must fall in an open period.
    pub effective_date: NaiveDate,
    /// Balanced adjustment entries.
    pub entries: Vec<EntryInput>,
    /// Journal metadata documenting the adjustment.
    pub journal: AdjustmentJournalInput,
}

/// Adjustment transaction with its entries and journal row.
#[derive(Debug, Clone)]
pub struct AdjustmentRecord {
    /// The adjustment transaction.
    pub transaction: transactions::Model,
    /// Ledger entries.
    pub entries: Vec<ledger_entries::Model>,
    /// Audit journal documenting who adjusted what and why.
    pub journal: adjustment_journals::Model,
}

/// Transaction with its entries.
#[derive(Debug, Clone)]
pub struct TransactionWithEntries {
    /// Transaction header.
    pub transaction: transactions::Model,
    /// Ledger entries.
    pub entries: Vec<ledger_entries::Model>,
}

/// Transaction repository.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
    balance_tolerance: Decimal,
}

impl TransactionRepository {
    /// Creates a new transaction repository with the configured balance
    /// tolerance.
    #[must_use]
    pub const fn new(db: DatabaseConnection, balance_tolerance: Decimal) -> Self {
        Self {
            db,
            balance_tolerance,
        }
    }

    /// Records a balanced transaction with its entries atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The entry set fails validation (count, positivity, balance)
    /// - The reference id already exists for the ledger
    /// - The effective date falls in a closed period
    /// - A database operation fails
    pub async fn create_transaction(
        &self,
        input: CreateTransactionInput,
    ) -> Result<TransactionWithEntries, LedgerError> {
        LedgerService::validate_entry_set(&input.entries, self.balance_tolerance)?;

        if let Some(reference) = &input.reference_id {
            let existing = transactions::Entity::find()
                .filter(transactions::Column::LedgerId.eq(input.ledger_id))
                .filter(transactions::Column::ReferenceId.eq(reference.clone()))
                .one(&self.db)
                .await
                .map_err(db_err)?;
            if existing.is_some() {
                return Err(LedgerError::DuplicateReference(reference.clone()));
            }
        }

        guard_period_open(&self.db, input.ledger_id, input.effective_date).await?;

        let txn = self.db.begin().await.map_err(db_err)?;

        let transaction = insert_transaction(&txn, &input).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => LedgerError::DuplicateReference(
                input.reference_id.clone().unwrap_or_default(),
            ),
            _ => db_err(e),
        })?;

        let entries = insert_entries(&txn, input.ledger_id, transaction.id, &input.entries)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        tracing::info!(
            ledger_id = %input.ledger_id,
            transaction_id = %transaction.id,
            entry_count = entries.len(),
            "transaction recorded"
        );

        Ok(TransactionWithEntries {
            transaction,
            entries,
        })
    }

    /// Loads a transaction with its entries.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if no such transaction exists.
    pub async fn find_with_entries(
        &self,
        transaction_id: Uuid,
    ) -> Result<TransactionWithEntries, LedgerError> {
        let transaction = transactions::Entity::find_by_id(transaction_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::TransactionNotFound(transaction_id))?;

        let entries = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::TransactionId.eq(transaction_id))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(TransactionWithEntries {
            transaction,
            entries,
        })
    }

    /// True if the ledger already carries an opening balance transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn has_opening_balance(&self, ledger_id: Uuid) -> Result<bool, LedgerError> {
        let existing = transactions::Entity::find()
            .filter(transactions::Column::LedgerId.eq(ledger_id))
            .filter(
                transactions::Column::TransactionType
                    .eq(sea_orm_active_enums::TransactionType::OpeningBalance),
            )
            .filter(transactions::Column::Status.ne(TransactionStatus::Voided))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(existing.is_some())
    }

    /// Voids a completed transaction. Status transition only; entries are
    /// kept but stop counting toward balances.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is missing, already voided or
    /// reversed, or dated in a closed period.
    pub async fn void_transaction(&self, transaction_id: Uuid) -> Result<transactions::Model, LedgerError> {
        let transaction = transactions::Entity::find_by_id(transaction_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::TransactionNotFound(transaction_id))?;

        match transaction.status {
            TransactionStatus::Voided => {
                return Err(LedgerError::AlreadyVoided(transaction_id));
            }
            TransactionStatus::Reversed => return Err(LedgerError::NotReversible),
            TransactionStatus::Draft | TransactionStatus::Completed => {}
        }

        guard_period_open(&self.db, transaction.ledger_id, transaction.effective_date).await?;

        let mut active: transactions::ActiveModel = transaction.into();
        active.status = Set(TransactionStatus::Voided);
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await.map_err(db_err)
    }

    /// Reverses a completed transaction with a forward-dated correction.
    ///
    /// The correcting transaction carries the exact debit/credit swap of the
    /// original entries, dated in the open period, and is documented by an
    /// adjustment journal row. The original is marked `reversed`. All of it
    /// commits in one database transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the original is missing or not `completed`, the
    /// correction date falls in a closed period, the journal metadata is
    /// incomplete, or a database operation fails.
    pub async fn reverse_transaction(
        &self,
        input: ReverseTransactionInput,
    ) -> Result<AdjustmentRecord, LedgerError> {
        correction::validate_journal(&input.journal)
            .map_err(|e| LedgerError::InvalidAdjustment(e.to_string()))?;

        let original = self.find_with_entries(input.original_id).await?;
        if original.transaction.status != TransactionStatus::Completed {
            return Err(LedgerError::NotReversible);
        }

        guard_period_open(&self.db, original.transaction.ledger_id, input.effective_date).await?;

        let posted: Vec<PostedEntry> = original
            .entries
            .iter()
            .map(|e| PostedEntry {
                account_id: e.account_id,
                entry_type: e.entry_type.clone().into(),
                amount: e.amount,
            })
            .collect();
        let reversal = correction::reversal_entries(&posted)
            .map_err(|e| LedgerError::InvalidAdjustment(e.to_string()))?;

        let txn = self.db.begin().await.map_err(db_err)?;
        let now = Utc::now();

        let correcting = transactions::ActiveModel {
            id: Set(Uuid::now_v7()),
            ledger_id: Set(original.transaction.ledger_id),
            transaction_type: Set(sea_orm_active_enums::TransactionType::Adjustment),
            status: Set(TransactionStatus::Completed),
            amount: Set(-original.transaction.amount),
            currency: Set(original.transaction.currency.clone()),
            description: Set(Some(format!(
                "Reversal of {}",
                original.transaction.id
            ))),
            reference_id: Set(None),
            reverses_transaction_id: Set(Some(original.transaction.id)),
            effective_date: Set(input.effective_date),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        let mut entries = Vec::with_capacity(reversal.len());
        for entry in &reversal {
            let model = ledger_entries::ActiveModel {
                id: Set(Uuid::now_v7()),
                transaction_id: Set(correcting.id),
                account_id: Set(entry.account_id),
                entry_type: Set(entry.entry_type.clone().into()),
                amount: Set(entry.amount),
                created_at: Set(now.into()),
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;
            entries.push(model);
        }

        let journal = adjustment_journals::ActiveModel {
            id: Set(Uuid::now_v7()),
            transaction_id: Set(correcting.id),
            original_transaction_id: Set(Some(original.transaction.id)),
            adjustment_type: Set(input.journal.adjustment_type.clone()),
            reason: Set(input.journal.reason.clone()),
            prepared_by: Set(input.journal.prepared_by.clone()),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        let mut original_active: transactions::ActiveModel = original.transaction.into();
        original_active.status = Set(TransactionStatus::Reversed);
        original_active.updated_at = Set(now.into());
        original_active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        tracing::info!(
            transaction_id = %correcting.id,
            original_id = %input.original_id,
            "correction posted"
        );

        Ok(AdjustmentRecord {
            transaction: correcting,
            entries,
            journal,
        })
    }

    /// Posts a caller-supplied adjustment entry set with its journal row.
    ///
    /// Unlike `reverse_transaction`, the entries are authored by the caller
    /// rather than derived from an original. The transaction, its entries,
    /// and the journal commit together.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal metadata is incomplete, the entry
    /// set fails validation, the effective date falls in a closed period,
    /// or a database operation fails.
    pub async fn record_adjustment(
        &self,
        input: RecordAdjustmentInput,
    ) -> Result<AdjustmentRecord, LedgerError> {
        correction::validate_journal(&input.journal)
            .map_err(|e| LedgerError::InvalidAdjustment(e.to_string()))?;
        let totals = LedgerService::validate_entry_set(&input.entries, self.balance_tolerance)?;

        guard_period_open(&self.db, input.ledger_id, input.effective_date).await?;

        let txn = self.db.begin().await.map_err(db_err)?;
        let now = Utc::now();

        let transaction = transactions::ActiveModel {
            id: Set(Uuid::now_v7()),
            ledger_id: Set(input.ledger_id),
            transaction_type: Set(sea_orm_active_enums::TransactionType::Adjustment),
            status: Set(TransactionStatus::Completed),
            amount: Set(totals.debits),
            currency: Set("USD".to_string()),
            description: Set(Some(input.journal.reason.clone())),
            reference_id: Set(None),
            reverses_transaction_id: Set(None),
            effective_date: Set(input.effective_date),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        let entries = insert_entries(&txn, input.ledger_id, transaction.id, &input.entries)
            .await
            .map_err(db_err)?;

        let journal = adjustment_journals::ActiveModel {
            id: Set(Uuid::now_v7()),
            transaction_id: Set(transaction.id),
            original_transaction_id: Set(input.journal.original_transaction_id),
            adjustment_type: Set(input.journal.adjustment_type.clone()),
            reason: Set(input.journal.reason.clone()),
            prepared_by: Set(input.journal.prepared_by.clone()),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        tracing::info!(
            ledger_id = %input.ledger_id,
            transaction_id = %transaction.id,
            adjustment_type = %journal.adjustment_type,
            "adjustment posted"
        );

        Ok(AdjustmentRecord {
            transaction,
            entries,
            journal,
        })
    }
}

fn db_err(e: DbErr) -> LedgerError {
    LedgerError::Database(e.to_string())
}

/// Rejects the operation when `date` falls inside a closed or locked period.
async fn guard_period_open<C: ConnectionTrait>(
    conn: &C,
    ledger_id: Uuid,
    date: NaiveDate,
) -> Result<(), LedgerError> {
    let period = accounting_periods::Entity::find()
        .filter(accounting_periods::Column::LedgerId.eq(ledger_id))
        .filter(accounting_periods::Column::StartDate.lte(date))
        .filter(accounting_periods::Column::EndDate.gte(date))
        .one(conn)
        .await
        .map_err(db_err)?;

    // No period row means the range was never closed, which is open.
    if let Some(period) = period {
        let status: PeriodStatus = period.status.into();
        if !status.allows_posting() {
            return Err(LedgerError::PeriodClosed(date));
        }
    }
    Ok(())
}

async fn insert_transaction(
    txn: &DatabaseTransaction,
    input: &CreateTransactionInput,
) -> Result<transactions::Model, DbErr> {
    let now = Utc::now();
    transactions::ActiveModel {
        id: Set(Uuid::now_v7()),
        ledger_id: Set(input.ledger_id),
        transaction_type: Set(input.transaction_type.into()),
        status: Set(TransactionStatus::Completed),
        amount: Set(input.amount),
        currency: Set(input.currency.clone()),
        description: Set(input.description.clone()),
        reference_id: Set(input.reference_id.clone()),
        reverses_transaction_id: Set(None),
        effective_date: Set(input.effective_date),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(txn)
    .await
}

async fn insert_entries(
    txn: &DatabaseTransaction,
    ledger_id: Uuid,
    transaction_id: Uuid,
    entries: &[EntryInput],
) -> Result<Vec<ledger_entries::Model>, DbErr> {
    let now = Utc::now();
    let mut models = Vec::with_capacity(entries.len());
    for entry in entries {
        let acct = account::find_or_create(txn, ledger_id, entry.account).await?;
        let model = ledger_entries::ActiveModel {
            id: Set(Uuid::now_v7()),
            transaction_id: Set(transaction_id),
            account_id: Set(acct.id),
            entry_type: Set(entry.entry_type.into()),
            amount: Set(entry.amount),
            created_at: Set(now.into()),
        }
        .insert(txn)
        .await?;
        models.push(model);
    }
    Ok(models)
}
