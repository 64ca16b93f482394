//! `SeaORM` Entity for accounting_periods table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{PeriodGranularity, PeriodStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounting_periods")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub ledger_id: Uuid,
    pub start_date: Date,
    pub end_date: Date,
    pub granularity: PeriodGranularity,
    pub status: PeriodStatus,
    /// The trial balance frozen when the period closed.
    pub closing_snapshot_id: Option<Uuid>,
    pub notes: Option<String>,
    pub closed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
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
        belongs_to = "super::trial_balance_snapshots::Entity",
        from = "Column::ClosingSnapshotId",
        to = "super::trial_balance_snapshots::Column::Id"
    )]
    TrialBalanceSnapshots,
}

impl Related<super::ledgers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ledgers.def()
    }
}

impl Related<super::trial_balance_snapshots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrialBalanceSnapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
