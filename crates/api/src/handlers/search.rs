//! Identifier lookup handler
//!
//! Resolves a typed identifier (VIN, engine number, or plate number)
//! to at most one bike by case-insensitive equality, joined to its
//! most recent approved theft report. "No match" is a successful
//! response with `found: false`, not an error.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::AppState;
use moto_registry_common::{
    db::{IdentifierKind, Repository},
    errors::{AppError, Result},
    metrics,
};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(rename = "type")]
    pub identifier_type: Option<String>,
    pub value: Option<String>,
}

/// Resolve and validate the query parameters
fn parse_params(params: SearchParams) -> Result<(IdentifierKind, String)> {
    let (Some(identifier_type), Some(value)) = (params.identifier_type, params.value) else {
        return Err(AppError::Validation {
            message: "Missing search parameters".to_string(),
            field: None,
        });
    };

    let kind = identifier_type
        .parse::<IdentifierKind>()
        .map_err(|_| AppError::Validation {
            message: "Invalid search type".to_string(),
            field: Some("type".to_string()),
        })?;

    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(AppError::Validation {
            message: "Search value cannot be empty".to_string(),
            field: Some("value".to_string()),
        });
    }

    Ok((kind, value))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bike: Option<BikeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theft_report: Option<TheftReportSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<FixedOffset>>,
    pub searched_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeSummary {
    pub id: Uuid,
    pub make: String,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub images: Vec<ImageSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    pub id: Uuid,
    pub url: String,
    pub filename: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TheftReportSummary {
    pub id: Uuid,
    pub theft_date: DateTime<FixedOffset>,
    pub theft_location: String,
    pub description: Option<String>,
    pub police_report: Option<String>,
    pub reported_at: DateTime<FixedOffset>,
}

/// Derived status: stolen iff an approved report exists
fn derive_status(has_approved_report: bool) -> &'static str {
    if has_approved_report { "stolen" } else { "clean" }
}

/// Look up a bike by identifier
pub async fn search_bike(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();
    let (kind, value) = parse_params(params)?;

    let repo = Repository::new(state.db.clone());

    let Some(bike) = repo.find_bike_by_identifier(kind, &value).await? else {
        metrics::record_search(start.elapsed().as_secs_f64(), &kind.to_string(), false);

        return Ok(Json(SearchResponse {
            found: false,
            message: Some("No bike found with the provided information".to_string()),
            status: None,
            bike: None,
            theft_report: None,
            last_updated: None,
            searched_at: Utc::now(),
        }));
    };

    let images = repo.images_for_bike(bike.id).await?;
    let approved = repo.latest_approved_report(bike.id).await?;
    let status = derive_status(approved.is_some());

    metrics::record_search(start.elapsed().as_secs_f64(), &kind.to_string(), true);

    tracing::info!(
        bike_id = %bike.id,
        identifier = %kind,
        status = status,
        "Bike lookup completed"
    );

    Ok(Json(SearchResponse {
        found: true,
        message: None,
        status: Some(status.to_string()),
        bike: Some(BikeSummary {
            id: bike.id,
            make: bike.make,
            model: bike.model,
            year: bike.year,
            color: bike.color,
            category: bike.category,
            images: images
                .into_iter()
                .map(|i| ImageSummary {
                    id: i.id,
                    url: i.url,
                    filename: i.filename,
                })
                .collect(),
        }),
        theft_report: approved.map(|r| TheftReportSummary {
            id: r.id,
            theft_date: r.theft_date,
            theft_location: r.theft_location,
            description: r.description,
            police_report: r.police_report,
            reported_at: r.created_at,
        }),
        last_updated: Some(bike.updated_at),
        searched_at: Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(kind: Option<&str>, value: Option<&str>) -> SearchParams {
        SearchParams {
            identifier_type: kind.map(str::to_string),
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn test_missing_params_rejected() {
        assert!(parse_params(params(None, Some("ABC"))).is_err());
        assert!(parse_params(params(Some("vin"), None)).is_err());
    }

    #[test]
    fn test_invalid_type_rejected() {
        let err = parse_params(params(Some("chassis"), Some("ABC"))).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_blank_value_rejected() {
        assert!(parse_params(params(Some("vin"), Some("   "))).is_err());
    }

    #[test]
    fn test_value_is_trimmed() {
        let (kind, value) = parse_params(params(Some("plate"), Some("  B1234XYZ "))).unwrap();
        assert_eq!(kind, IdentifierKind::Plate);
        assert_eq!(value, "B1234XYZ");
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(derive_status(true), "stolen");
        assert_eq!(derive_status(false), "clean");
    }
}
