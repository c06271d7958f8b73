//! Owner entity
//!
//! An owner row is identified by its unique email. Resubmissions from
//! the same email overwrite name and phone rather than creating a
//! second row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "owners")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub email: String,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub phone: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bike::Entity")]
    Bikes,

    #[sea_orm(has_many = "super::theft_report::Entity")]
    TheftReports,
}

impl Related<super::bike::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bikes.def()
    }
}

impl Related<super::theft_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TheftReports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
