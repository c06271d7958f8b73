//! Theft report entity
//!
//! Reports are created by the intake flow and never updated by it; the
//! status field moves to `APPROVED` through moderation outside this
//! service. A bike counts as stolen iff at least one of its reports is
//! approved.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Moderation status of a theft report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    Approved,
    Rejected,
}

impl From<String> for ReportStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "APPROVED" => ReportStatus::Approved,
            "REJECTED" => ReportStatus::Rejected,
            _ => ReportStatus::Pending,
        }
    }
}

impl From<ReportStatus> for String {
    fn from(status: ReportStatus) -> Self {
        match status {
            ReportStatus::Pending => "PENDING".to_string(),
            ReportStatus::Approved => "APPROVED".to_string(),
            ReportStatus::Rejected => "REJECTED".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "theft_reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub bike_id: Uuid,

    /// Owner who filed the report
    pub reported_by: Uuid,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub theft_date: DateTimeWithTimeZone,

    #[sea_orm(column_type = "Text")]
    pub theft_location: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// External police report reference
    #[sea_orm(column_type = "Text", nullable)]
    pub police_report: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the report status as an enum
    pub fn report_status(&self) -> ReportStatus {
        ReportStatus::from(self.status.clone())
    }

    /// Whether this report marks its bike as stolen
    pub fn is_approved(&self) -> bool {
        self.report_status() == ReportStatus::Approved
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bike::Entity",
        from = "Column::BikeId",
        to = "super::bike::Column::Id"
    )]
    Bike,

    #[sea_orm(
        belongs_to = "super::owner::Entity",
        from = "Column::ReportedBy",
        to = "super::owner::Column::Id"
    )]
    Reporter,
}

impl Related<super::bike::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bike.def()
    }
}

impl Related<super::owner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reporter.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        assert_eq!(ReportStatus::from(String::from(ReportStatus::Approved)), ReportStatus::Approved);
        assert_eq!(String::from(ReportStatus::Pending), "PENDING");
    }

    #[test]
    fn test_unknown_status_defaults_to_pending() {
        assert_eq!(ReportStatus::from("bogus".to_string()), ReportStatus::Pending);
    }
}
