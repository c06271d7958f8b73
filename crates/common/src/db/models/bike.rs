//! Bike entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bikes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// The most recent reporter to register this bike
    pub owner_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub make: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub model: Option<String>,

    pub year: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub color: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub category: Option<String>,

    /// Vehicle identification number; unique when present
    #[sea_orm(column_type = "Text", nullable, unique)]
    pub vin: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub engine_number: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub plate_number: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::owner::Entity",
        from = "Column::OwnerId",
        to = "super::owner::Column::Id"
    )]
    Owner,

    #[sea_orm(has_many = "super::theft_report::Entity")]
    TheftReports,

    #[sea_orm(has_many = "super::bike_image::Entity")]
    Images,
}

impl Related<super::owner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::theft_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TheftReports.def()
    }
}

impl Related<super::bike_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
