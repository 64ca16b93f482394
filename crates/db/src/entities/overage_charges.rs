//! `SeaORM` Entity for overage_charges table.
//!
//! One row per organization per billing period, keyed by `period_start`.
//! The row doubles as the dunning state machine: attempts, last error, and
//! the time the next attempt becomes due all live here so a claim can be a
//! single atomic statement.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ChargeStatusDb;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "overage_charges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub period_start: Date,
    pub period_end: Date,
    pub amount_cents: i64,
    pub currency: String,
    /// Billable lines as produced by the usage meter.
    pub detail: Json,
    pub status: ChargeStatusDb,
    pub attempts: i32,
    pub last_attempt_at: Option<DateTimeWithTimeZone>,
    pub next_retry_at: Option<DateTimeWithTimeZone>,
    pub last_error: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organizations::Entity",
        from = "Column::OrganizationId",
        to = "super::organizations::Column::Id"
    )]
    Organizations,
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
