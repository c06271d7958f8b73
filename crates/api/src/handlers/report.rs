//! Theft report intake handler
//!
//! Accepts a multipart submission with owner contact info, vehicle
//! attributes, theft details, and zero or more images. Validation
//! happens before any database write; image uploads are awaited
//! sequentially and any storage failure fails the whole submission.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::AppState;
use moto_registry_common::{
    db::{BikeInput, Repository, TheftInput},
    errors::{AppError, Result},
    metrics, storage,
};

/// Raw form fields as collected from the multipart body
#[derive(Debug, Default)]
pub struct ReportForm {
    pub reporter_email: Option<String>,
    pub reporter_name: Option<String>,
    pub reporter_phone: Option<String>,
    pub vin: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub engine_number: Option<String>,
    pub plate_number: Option<String>,
    pub theft_date: Option<String>,
    pub theft_location: Option<String>,
    pub description: Option<String>,
    pub police_report: Option<String>,
    pub images: Vec<UploadedImage>,
}

#[derive(Debug)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A submission that passed validation
#[derive(Debug)]
pub struct ValidatedReport {
    pub reporter_email: String,
    pub reporter_name: String,
    pub reporter_phone: Option<String>,
    pub bike: BikeInput,
    pub theft: TheftInput,
    pub images: Vec<UploadedImage>,
}

/// Empty or whitespace-only form values are treated as absent
fn normalize(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    })
}

fn require(value: Option<String>, field: &str) -> Result<String> {
    normalize(value).ok_or_else(|| AppError::MissingField {
        field: field.to_string(),
    })
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates
fn parse_theft_date(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| AppError::InvalidFormat {
            message: format!("theftDate is not a valid date: {}", raw),
        })
}

impl ReportForm {
    /// Validate required fields and normalize the rest.
    ///
    /// Required: make, theftDate, theftLocation, reporterEmail.
    /// An empty VIN is stored as NULL, never as an empty string.
    pub fn validate(self) -> Result<ValidatedReport> {
        let make = require(self.make, "make")?;
        let theft_date_raw = require(self.theft_date, "theftDate")?;
        let theft_location = require(self.theft_location, "theftLocation")?;
        let reporter_email = require(self.reporter_email, "reporterEmail")?;

        if !reporter_email.validate_email() {
            return Err(AppError::Validation {
                message: "reporterEmail is not a valid email address".to_string(),
                field: Some("reporterEmail".to_string()),
            });
        }

        let theft_date = parse_theft_date(&theft_date_raw)?;

        let year = match normalize(self.year) {
            Some(raw) => Some(raw.parse::<i32>().map_err(|_| AppError::InvalidFormat {
                message: format!("year is not a valid number: {}", raw),
            })?),
            None => None,
        };

        Ok(ValidatedReport {
            reporter_email,
            reporter_name: normalize(self.reporter_name).unwrap_or_default(),
            reporter_phone: normalize(self.reporter_phone),
            bike: BikeInput {
                vin: normalize(self.vin),
                make,
                model: normalize(self.model),
                year,
                color: normalize(self.color),
                category: normalize(self.category),
                engine_number: normalize(self.engine_number),
                plate_number: normalize(self.plate_number),
            },
            theft: TheftInput {
                theft_date,
                theft_location,
                description: normalize(self.description),
                police_report: normalize(self.police_report),
            },
            images: self.images,
        })
    }
}

/// Drain the multipart body into a [`ReportForm`]
async fn collect_form(multipart: &mut Multipart) -> Result<ReportForm> {
    let mut form = ReportForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| AppError::Validation {
        message: format!("malformed multipart body: {}", e),
        field: None,
    })? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "images" {
            let filename = field.file_name().unwrap_or("image").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation {
                    message: format!("failed to read image field: {}", e),
                    field: Some("images".to_string()),
                })?
                .to_vec();

            form.images.push(UploadedImage {
                filename,
                content_type,
                bytes,
            });
            continue;
        }

        let value = field.text().await.map_err(|e| AppError::Validation {
            message: format!("failed to read field {}: {}", name, e),
            field: Some(name.clone()),
        })?;

        match name.as_str() {
            "reporterEmail" => form.reporter_email = Some(value),
            "reporterName" => form.reporter_name = Some(value),
            "reporterPhone" => form.reporter_phone = Some(value),
            "vin" => form.vin = Some(value),
            "make" => form.make = Some(value),
            "model" => form.model = Some(value),
            "year" => form.year = Some(value),
            "color" => form.color = Some(value),
            "category" => form.category = Some(value),
            "engineNumber" => form.engine_number = Some(value),
            "plateNumber" => form.plate_number = Some(value),
            "theftDate" => form.theft_date = Some(value),
            "theftLocation" => form.theft_location = Some(value),
            "description" => form.description = Some(value),
            "policeReport" => form.police_report = Some(value),
            _ => {}
        }
    }

    Ok(form)
}

/// Response after a successful submission
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportResponse {
    pub message: String,
    pub report_id: Uuid,
    pub bike_id: Uuid,
    pub image_count: usize,
    pub image_urls: Vec<String>,
}

/// Submit a theft report
pub async fn submit_report(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitReportResponse>)> {
    let start = Instant::now();

    let report = collect_form(&mut multipart).await?.validate()?;

    let repo = Repository::new(state.db.clone());

    // Owner keyed on email: create, or overwrite name/phone
    let owner = repo
        .upsert_owner(
            &report.reporter_email,
            &report.reporter_name,
            report.reporter_phone.as_deref(),
        )
        .await?;

    // Vehicle identity policy: upsert keyed on VIN when one is
    // supplied, otherwise always create a new row
    let bike = if report.bike.vin.is_some() {
        repo.upsert_bike_by_vin(&report.bike, owner.id).await?
    } else {
        repo.create_bike(&report.bike, owner.id).await?
    };

    // Persist images sequentially; record each resulting URL
    let mut image_urls = Vec::new();
    for image in &report.images {
        if image.bytes.is_empty() {
            continue;
        }

        let key = storage::image_key(Utc::now().timestamp_millis(), bike.id, &image.filename);
        let url = state
            .images
            .put(&key, image.bytes.clone(), image.content_type.as_deref())
            .await?;

        repo.create_bike_image(bike.id, &url, &image.filename).await?;
        image_urls.push(url);
    }

    // The report row is created last, after vehicle, owner, and all
    // images are resolved
    let theft_report = repo
        .create_theft_report(bike.id, owner.id, &report.theft)
        .await?;

    metrics::record_report_submitted(start.elapsed().as_secs_f64(), image_urls.len());

    tracing::info!(
        report_id = %theft_report.id,
        bike_id = %bike.id,
        owner_id = %owner.id,
        images = image_urls.len(),
        "Theft report submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitReportResponse {
            message: "Theft report submitted successfully".to_string(),
            report_id: theft_report.id,
            bike_id: bike.id,
            image_count: image_urls.len(),
            image_urls,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn minimal_form() -> ReportForm {
        ReportForm {
            reporter_email: Some("owner@example.com".to_string()),
            make: Some("Honda".to_string()),
            theft_date: Some("2024-06-01".to_string()),
            theft_location: Some("Jakarta".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_submission_validates() {
        let report = minimal_form().validate().unwrap();
        assert_eq!(report.bike.make, "Honda");
        assert_eq!(report.theft.theft_location, "Jakarta");
        assert!(report.bike.vin.is_none());
        assert_eq!(report.theft.theft_date.year(), 2024);
    }

    #[test]
    fn test_missing_location_is_rejected() {
        let mut form = minimal_form();
        form.theft_location = None;
        let err = form.validate().unwrap_err();
        assert!(matches!(err, AppError::MissingField { ref field } if field == "theftLocation"));
    }

    #[test]
    fn test_blank_required_field_is_rejected() {
        let mut form = minimal_form();
        form.make = Some("   ".to_string());
        let err = form.validate().unwrap_err();
        assert!(matches!(err, AppError::MissingField { ref field } if field == "make"));
    }

    #[test]
    fn test_empty_vin_normalized_to_none() {
        let mut form = minimal_form();
        form.vin = Some("".to_string());
        let report = form.validate().unwrap();
        assert!(report.bike.vin.is_none());

        let mut form = minimal_form();
        form.vin = Some("  MH1KC12345K678901  ".to_string());
        let report = form.validate().unwrap();
        assert_eq!(report.bike.vin.as_deref(), Some("MH1KC12345K678901"));
    }

    #[test]
    fn test_invalid_email_is_rejected() {
        let mut form = minimal_form();
        form.reporter_email = Some("not-an-email".to_string());
        let err = form.validate().unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_theft_date_formats() {
        assert!(parse_theft_date("2024-06-01").is_ok());
        assert!(parse_theft_date("2024-06-01T10:30:00Z").is_ok());
        assert!(parse_theft_date("yesterday").is_err());
    }

    #[test]
    fn test_invalid_year_is_rejected() {
        let mut form = minimal_form();
        form.year = Some("twenty-twenty".to_string());
        let err = form.validate().unwrap_err();
        assert!(matches!(err, AppError::InvalidFormat { .. }));
    }

    #[test]
    fn test_year_parses() {
        let mut form = minimal_form();
        form.year = Some("2021".to_string());
        let report = form.validate().unwrap();
        assert_eq!(report.bike.year, Some(2021));
    }
}
