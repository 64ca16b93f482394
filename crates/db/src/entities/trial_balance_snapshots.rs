//! `SeaORM` Entity for trial_balance_snapshots table.
//!
//! A snapshot freezes the trial balance of a ledger at a point in time.
//! The per-account rows are stored as JSON sorted by account id, and the
//! SHA-256 of their canonical serialization is stored alongside so a later
//! audit can recompute and compare.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trial_balance_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub ledger_id: Uuid,
    /// Per-account balance rows, sorted by account id.
    pub balances: Json,
    /// SHA-256 of the canonical serialization, lowercase hex.
    pub content_hash: String,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub is_balanced: bool,
    pub taken_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ledgers::Entity",
        from = "Column::LedgerId",
        to = "super::ledgers::Column::Id"
    )]
    Ledgers,
}

impl Related<super::ledgers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ledgers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
