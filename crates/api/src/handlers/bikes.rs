//! Bike detail retrieval handler
//!
//! Returns the full picture for one bike: vehicle attributes, owner
//! contact info, every image, and the complete report history
//! (newest first) with each report's reporter.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::AppState;
use moto_registry_common::{
    db::models::{Owner, TheftReport},
    db::Repository,
    errors::{AppError, Result},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeDetailResponse {
    pub id: Uuid,
    pub status: String,
    pub bike: BikeDetail,
    pub reports: Vec<ReportEntry>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeDetail {
    pub make: String,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub vin: Option<String>,
    pub engine_number: Option<String>,
    pub plate_number: Option<String>,
    pub owner: OwnerContact,
    pub images: Vec<ImageEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerContact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntry {
    pub id: Uuid,
    pub url: String,
    pub filename: String,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub id: Uuid,
    pub status: String,
    pub theft_date: DateTime<FixedOffset>,
    pub theft_location: String,
    pub description: Option<String>,
    pub police_report: Option<String>,
    pub reported_at: DateTime<FixedOffset>,
    pub reporter: ReporterIdentity,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporterIdentity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Derived status over the full report history: stolen iff any
/// report is approved
fn bike_status(reports: &[TheftReport]) -> &'static str {
    if reports.iter().any(|r| r.is_approved()) {
        "stolen"
    } else {
        "clean"
    }
}

fn reporter_identity(owner: Option<&Owner>) -> ReporterIdentity {
    match owner {
        Some(o) => ReporterIdentity {
            id: o.id,
            name: o.name.clone(),
            email: o.email.clone(),
        },
        // FK should make this unreachable; degrade rather than fail
        // the whole response
        None => ReporterIdentity {
            id: Uuid::nil(),
            name: String::new(),
            email: String::new(),
        },
    }
}

/// Get full detail for a bike by ID
pub async fn get_bike(
    State(state): State<AppState>,
    Path(bike_id): Path<Uuid>,
) -> Result<Json<BikeDetailResponse>> {
    let repo = Repository::new(state.db.clone());

    let bike = repo
        .find_bike_by_id(bike_id)
        .await?
        .ok_or_else(|| AppError::BikeNotFound {
            id: bike_id.to_string(),
        })?;

    let owner = repo
        .find_owner_by_id(bike.owner_id)
        .await?
        .ok_or_else(|| AppError::Internal {
            message: format!("bike {} has no owner row", bike.id),
        })?;

    let images = repo.images_for_bike(bike.id).await?;
    let reports = repo.reports_for_bike(bike.id).await?;

    // Resolve each distinct reporter once
    let mut reporters: HashMap<Uuid, Owner> = HashMap::new();
    for report in &reports {
        if !reporters.contains_key(&report.reported_by) {
            if let Some(reporter) = repo.find_owner_by_id(report.reported_by).await? {
                reporters.insert(report.reported_by, reporter);
            }
        }
    }

    let status = bike_status(&reports);

    Ok(Json(BikeDetailResponse {
        id: bike.id,
        status: status.to_string(),
        bike: BikeDetail {
            make: bike.make,
            model: bike.model,
            year: bike.year,
            color: bike.color,
            category: bike.category,
            vin: bike.vin,
            engine_number: bike.engine_number,
            plate_number: bike.plate_number,
            owner: OwnerContact {
                id: owner.id,
                name: owner.name,
                email: owner.email,
                phone: owner.phone,
            },
            images: images
                .into_iter()
                .map(|i| ImageEntry {
                    id: i.id,
                    url: i.url,
                    filename: i.filename,
                    created_at: i.created_at,
                })
                .collect(),
        },
        reports: reports
            .into_iter()
            .map(|r| {
                let reporter = reporter_identity(reporters.get(&r.reported_by));
                ReportEntry {
                    id: r.id,
                    status: r.status,
                    theft_date: r.theft_date,
                    theft_location: r.theft_location,
                    description: r.description,
                    police_report: r.police_report,
                    reported_at: r.created_at,
                    reporter,
                }
            })
            .collect(),
        created_at: bike.created_at,
        updated_at: bike.updated_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use moto_registry_common::db::models::ReportStatus;

    fn report(status: ReportStatus) -> TheftReport {
        let now: DateTime<FixedOffset> = Utc::now().into();
        TheftReport {
            id: Uuid::new_v4(),
            bike_id: Uuid::new_v4(),
            reported_by: Uuid::new_v4(),
            status: String::from(status),
            theft_date: now,
            theft_location: "Bandung".to_string(),
            description: None,
            police_report: None,
            created_at: now,
        }
    }

    #[test]
    fn test_any_approved_report_marks_stolen() {
        let reports = vec![report(ReportStatus::Rejected), report(ReportStatus::Approved)];
        assert_eq!(bike_status(&reports), "stolen");
    }

    #[test]
    fn test_pending_reports_stay_clean() {
        let reports = vec![report(ReportStatus::Pending), report(ReportStatus::Rejected)];
        assert_eq!(bike_status(&reports), "clean");
    }

    #[test]
    fn test_no_reports_is_clean() {
        assert_eq!(bike_status(&[]), "clean");
    }
}
