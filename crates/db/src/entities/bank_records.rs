//! `SeaORM` Entity for bank_records table.
//!
//! The reconciliation link lives only on this side: `matched_transaction_id`
//! plus a unique constraint. Unmatching clears that column and touches
//! nothing else.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "bank_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub ledger_id: Uuid,
    /// Statement line reference from the bank feed, unique per ledger.
    pub external_ref: String,
    /// Sign carries direction.
    pub amount: Decimal,
    pub posted_at: DateTimeWithTimeZone,
    /// A transaction is consumed by at most one bank record.
    pub matched_transaction_id: Option<Uuid>,
    pub matched_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ledgers::Entity",
        from = "Column::LedgerId",
        to = "super::ledgers::Column::Id"
    )]
    Ledgers,
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::MatchedTransactionId",
        to = "super::transactions::Column::Id"
    )]
    Transactions,
}

impl Related<super::ledgers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ledgers.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
