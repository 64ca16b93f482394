//! Account repository: auto-provisioning and derived balances.
//!
//! Balances are never stored. Everything here is a sum over ledger entries
//! whose owning transaction is `completed`, signed by the account class.

use chrono::{NaiveDate, Utc};
use quill_core::ledger::{AccountKey, AccountType};
use quill_core::snapshot::TrialBalanceRow;
use quill_shared::types::AccountId;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, QueryFilter, Set, Statement,
};
use uuid::Uuid;

use crate::entities::{accounts, sea_orm_active_enums};

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Account not found.
    #[error("Account not found: {0}")]
    NotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Finds the account for `(ledger, account_type, entity_id)`, creating it on
/// first reference. Works inside an open database transaction so the account
/// and its first entries commit together.
///
/// # Errors
///
/// Returns an error if the lookup or insert fails.
pub async fn find_or_create<C: ConnectionTrait>(
    conn: &C,
    ledger_id: Uuid,
    key: AccountKey,
) -> Result<accounts::Model, DbErr> {
    let db_type: sea_orm_active_enums::AccountType = key.account_type.into();

    let mut query = accounts::Entity::find()
        .filter(accounts::Column::LedgerId.eq(ledger_id))
        .filter(accounts::Column::AccountType.eq(db_type.clone()));
    query = match key.entity_id {
        Some(entity_id) => query.filter(accounts::Column::EntityId.eq(entity_id)),
        None => query.filter(accounts::Column::EntityId.is_null()),
    };

    if let Some(existing) = query.one(conn).await? {
        return Ok(existing);
    }

    let account = accounts::ActiveModel {
        id: Set(Uuid::now_v7()),
        ledger_id: Set(ledger_id),
        account_type: Set(db_type),
        entity_id: Set(key.entity_id),
        created_at: Set(Utc::now().into()),
    };

    account.insert(conn).await
}

/// Account repository for derived balance queries.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Signed balance of one account over countable entries, scoped to the
    /// given ledger.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist in that ledger.
    pub async fn account_balance(
        &self,
        ledger_id: Uuid,
        account_id: Uuid,
    ) -> Result<Decimal, AccountError> {
        let account = accounts::Entity::find_by_id(account_id)
            .filter(accounts::Column::LedgerId.eq(ledger_id))
            .one(&self.db)
            .await?
            .ok_or(AccountError::NotFound(account_id))?;

        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                ACCOUNT_TOTALS_SQL,
                [account_id.into()],
            ))
            .await?
            .ok_or(AccountError::NotFound(account_id))?;

        let debit_total: Decimal = row.try_get("", "debit_total")?;
        let credit_total: Decimal = row.try_get("", "credit_total")?;

        let account_type: AccountType = account.account_type.into();
        Ok(account_type.class().balance_change(debit_total, credit_total))
    }
}

/// Free-function form of the trial balance query, usable inside an open
/// database transaction during period close.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn trial_balance_rows<C: ConnectionTrait>(
    conn: &C,
    ledger_id: Uuid,
    through: NaiveDate,
) -> Result<Vec<TrialBalanceRow>, AccountError> {
    let rows = conn
        .query_all(Statement::from_sql_and_values(
            DbBackend::Postgres,
            TRIAL_BALANCE_SQL,
            [ledger_id.into(), through.into()],
        ))
        .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let id: Uuid = row.try_get("", "id")?;
        let account_type_raw: String = row.try_get("", "account_type")?;
        let entity_id: Option<Uuid> = row.try_get("", "entity_id")?;
        let debit_total: Decimal = row.try_get("", "debit_total")?;
        let credit_total: Decimal = row.try_get("", "credit_total")?;

        let account_type: AccountType = account_type_raw.parse().map_err(DbErr::Custom)?;
        let balance = account_type.class().balance_change(debit_total, credit_total);

        out.push(TrialBalanceRow {
            account_id: AccountId::from_uuid(id),
            account_type,
            entity_id,
            debit_total,
            credit_total,
            balance,
        });
    }

    Ok(out)
}

const ACCOUNT_TOTALS_SQL: &str = r"
SELECT
    COALESCE(SUM(e.amount) FILTER (WHERE e.entry_type = 'debit'
        AND t.status = 'completed'), 0) AS debit_total,
    COALESCE(SUM(e.amount) FILTER (WHERE e.entry_type = 'credit'
        AND t.status = 'completed'), 0) AS credit_total
FROM ledger_entries e
JOIN transactions t ON t.id = e.transaction_id
WHERE e.account_id = $1
";

const TRIAL_BALANCE_SQL: &str = r"
SELECT
    a.id,
    a.account_type::text AS account_type,
    a.entity_id,
    COALESCE(SUM(e.amount) FILTER (WHERE e.entry_type = 'debit'
        AND t.status = 'completed' AND t.effective_date <= $2), 0) AS debit_total,
    COALESCE(SUM(e.amount) FILTER (WHERE e.entry_type = 'credit'
        AND t.status = 'completed' AND t.effective_date <= $2), 0) AS credit_total
FROM accounts a
LEFT JOIN ledger_entries e ON e.account_id = a.id
LEFT JOIN transactions t ON t.id = e.transaction_id
WHERE a.ledger_id = $1
GROUP BY a.id, a.account_type, a.entity_id
ORDER BY a.id
";
