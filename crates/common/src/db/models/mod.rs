//! SeaORM entity models
//!
//! Database entities for the Moto Registry

mod bike;
mod bike_image;
mod owner;
mod theft_report;

pub use bike::{
    Entity as BikeEntity,
    Model as Bike,
    ActiveModel as BikeActiveModel,
    Column as BikeColumn,
};

pub use bike_image::{
    Entity as BikeImageEntity,
    Model as BikeImage,
    ActiveModel as BikeImageActiveModel,
    Column as BikeImageColumn,
};

pub use owner::{
    Entity as OwnerEntity,
    Model as Owner,
    ActiveModel as OwnerActiveModel,
    Column as OwnerColumn,
};

pub use theft_report::{
    Entity as TheftReportEntity,
    Model as TheftReport,
    ActiveModel as TheftReportActiveModel,
    Column as TheftReportColumn,
    ReportStatus,
};
