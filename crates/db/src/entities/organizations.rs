//! `SeaORM` Entity for organizations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::BillingStatusDb;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub billing_status: BillingStatusDb,
    /// Payment-method handle at the payment collaborator, if billing is set up.
    pub billing_customer_ref: Option<String>,
    /// Plan allowances; -1 means unlimited.
    pub included_ledgers: i64,
    pub included_members: i64,
    pub ledger_overage_cents: i64,
    pub member_overage_cents: i64,
    /// Maintained by the team-management surface; read here for metering.
    pub team_member_count: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ledgers::Entity")]
    Ledgers,
    #[sea_orm(has_many = "super::overage_charges::Entity")]
    OverageCharges,
}

impl Related<super::ledgers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ledgers.def()
    }
}

impl Related<super::overage_charges::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OverageCharges.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
