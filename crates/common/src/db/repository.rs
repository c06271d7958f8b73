//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling. Duplicate-VIN and duplicate-email
//! races are resolved by the database's unique constraints and
//! upserts; the repository adds no locking of its own.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, Set, Statement,
};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier used for bike lookups. Resolves the `type` query
/// parameter to its backing column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Vin,
    Engine,
    Plate,
}

impl IdentifierKind {
    /// Column backing this identifier
    pub fn column_name(&self) -> &'static str {
        match self {
            IdentifierKind::Vin => "vin",
            IdentifierKind::Engine => "engine_number",
            IdentifierKind::Plate => "plate_number",
        }
    }
}

impl FromStr for IdentifierKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "vin" => Ok(IdentifierKind::Vin),
            "engine" => Ok(IdentifierKind::Engine),
            "plate" => Ok(IdentifierKind::Plate),
            _ => Err(()),
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IdentifierKind::Vin => "vin",
            IdentifierKind::Engine => "engine",
            IdentifierKind::Plate => "plate",
        };
        f.write_str(s)
    }
}

/// Vehicle attributes accepted by the intake flow
#[derive(Debug, Clone, Default)]
pub struct BikeInput {
    pub vin: Option<String>,
    pub make: String,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub engine_number: Option<String>,
    pub plate_number: Option<String>,
}

/// Theft details accepted by the intake flow
#[derive(Debug, Clone)]
pub struct TheftInput {
    pub theft_date: chrono::DateTime<chrono::Utc>,
    pub theft_location: String,
    pub description: Option<String>,
    pub police_report: Option<String>,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Owner Operations
    // ========================================================================

    /// Create or update an owner keyed on email.
    ///
    /// Name and phone are unconditionally overwritten on resubmission
    /// from the same email; the row count never grows for a known email.
    pub async fn upsert_owner(
        &self,
        email: &str,
        name: &str,
        phone: Option<&str>,
    ) -> Result<Owner> {
        let now = chrono::Utc::now();

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO owners (id, email, name, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (email) DO UPDATE SET
                name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
            vec![
                Uuid::new_v4().into(),
                email.into(),
                name.into(),
                phone.map(str::to_string).into(),
                now.into(),
            ],
        );

        let owner = OwnerEntity::find()
            .from_raw_sql(stmt)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| crate::errors::AppError::Internal {
                message: "owner upsert returned no row".to_string(),
            })?;

        Ok(owner)
    }

    /// Find owner by ID
    pub async fn find_owner_by_id(&self, id: Uuid) -> Result<Option<Owner>> {
        OwnerEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Bike Operations
    // ========================================================================

    /// Create or update a bike keyed on its VIN.
    ///
    /// On conflict every vehicle field and the owner link are
    /// overwritten with the submitted values. Callers must pass a
    /// non-empty VIN; VIN-less submissions go through [`Self::create_bike`].
    pub async fn upsert_bike_by_vin(&self, input: &BikeInput, owner_id: Uuid) -> Result<Bike> {
        let now = chrono::Utc::now();

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO bikes (
                id, owner_id, make, model, year, color, category,
                vin, engine_number, plate_number, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            ON CONFLICT (vin) DO UPDATE SET
                owner_id = EXCLUDED.owner_id,
                make = EXCLUDED.make,
                model = EXCLUDED.model,
                year = EXCLUDED.year,
                color = EXCLUDED.color,
                category = EXCLUDED.category,
                engine_number = EXCLUDED.engine_number,
                plate_number = EXCLUDED.plate_number,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
            vec![
                Uuid::new_v4().into(),
                owner_id.into(),
                input.make.clone().into(),
                input.model.clone().into(),
                input.year.into(),
                input.color.clone().into(),
                input.category.clone().into(),
                input.vin.clone().into(),
                input.engine_number.clone().into(),
                input.plate_number.clone().into(),
                now.into(),
            ],
        );

        let bike = BikeEntity::find()
            .from_raw_sql(stmt)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| crate::errors::AppError::Internal {
                message: "bike upsert returned no row".to_string(),
            })?;

        Ok(bike)
    }

    /// Create a new bike row. Used for VIN-less submissions, which
    /// always create a fresh row.
    pub async fn create_bike(&self, input: &BikeInput, owner_id: Uuid) -> Result<Bike> {
        let now = chrono::Utc::now();

        let bike = BikeActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            make: Set(input.make.clone()),
            model: Set(input.model.clone()),
            year: Set(input.year),
            color: Set(input.color.clone()),
            category: Set(input.category.clone()),
            vin: Set(input.vin.clone()),
            engine_number: Set(input.engine_number.clone()),
            plate_number: Set(input.plate_number.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        bike.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find bike by ID
    pub async fn find_bike_by_id(&self, id: Uuid) -> Result<Option<Bike>> {
        BikeEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Case-insensitive single-identifier lookup, at most one bike.
    ///
    /// The column name comes from the [`IdentifierKind`] enum, never
    /// from user input.
    pub async fn find_bike_by_identifier(
        &self,
        kind: IdentifierKind,
        value: &str,
    ) -> Result<Option<Bike>> {
        let sql = format!(
            "SELECT * FROM bikes WHERE lower({}) = lower($1) LIMIT 1",
            kind.column_name()
        );

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, &sql, vec![value.into()]);

        BikeEntity::find()
            .from_raw_sql(stmt)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Get all images for a bike
    pub async fn images_for_bike(&self, bike_id: Uuid) -> Result<Vec<BikeImage>> {
        BikeImageEntity::find()
            .filter(BikeImageColumn::BikeId.eq(bike_id))
            .order_by_asc(BikeImageColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Record a stored image for a bike
    pub async fn create_bike_image(
        &self,
        bike_id: Uuid,
        url: &str,
        filename: &str,
    ) -> Result<BikeImage> {
        let now = chrono::Utc::now();

        let image = BikeImageActiveModel {
            id: Set(Uuid::new_v4()),
            bike_id: Set(bike_id),
            url: Set(url.to_string()),
            filename: Set(filename.to_string()),
            created_at: Set(now.into()),
        };

        image.insert(self.write_conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Theft Report Operations
    // ========================================================================

    /// Create a theft report linking bike and reporter. New reports
    /// start in the pending state.
    pub async fn create_theft_report(
        &self,
        bike_id: Uuid,
        reported_by: Uuid,
        theft: &TheftInput,
    ) -> Result<TheftReport> {
        let now = chrono::Utc::now();

        let report = TheftReportActiveModel {
            id: Set(Uuid::new_v4()),
            bike_id: Set(bike_id),
            reported_by: Set(reported_by),
            status: Set(String::from(ReportStatus::Pending)),
            theft_date: Set(theft.theft_date.into()),
            theft_location: Set(theft.theft_location.clone()),
            description: Set(theft.description.clone()),
            police_report: Set(theft.police_report.clone()),
            created_at: Set(now.into()),
        };

        report.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Full report history for a bike, newest first
    pub async fn reports_for_bike(&self, bike_id: Uuid) -> Result<Vec<TheftReport>> {
        TheftReportEntity::find()
            .filter(TheftReportColumn::BikeId.eq(bike_id))
            .order_by_desc(TheftReportColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// The single most recent approved report for a bike, if any
    pub async fn latest_approved_report(&self, bike_id: Uuid) -> Result<Option<TheftReport>> {
        TheftReportEntity::find()
            .filter(TheftReportColumn::BikeId.eq(bike_id))
            .filter(TheftReportColumn::Status.eq(String::from(ReportStatus::Approved)))
            .order_by_desc(TheftReportColumn::CreatedAt)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_kind_parsing() {
        assert_eq!("vin".parse::<IdentifierKind>(), Ok(IdentifierKind::Vin));
        assert_eq!("engine".parse::<IdentifierKind>(), Ok(IdentifierKind::Engine));
        assert_eq!("plate".parse::<IdentifierKind>(), Ok(IdentifierKind::Plate));
        assert!("chassis".parse::<IdentifierKind>().is_err());
        assert!("VIN".parse::<IdentifierKind>().is_err());
    }

    #[test]
    fn test_identifier_column_mapping() {
        assert_eq!(IdentifierKind::Vin.column_name(), "vin");
        assert_eq!(IdentifierKind::Engine.column_name(), "engine_number");
        assert_eq!(IdentifierKind::Plate.column_name(), "plate_number");
    }

    #[test]
    fn test_identifier_display() {
        assert_eq!(IdentifierKind::Plate.to_string(), "plate");
    }
}
