//! Moto Registry Common Library
//!
//! Shared code for the stolen-motorcycle registry service including:
//! - Database models and repository pattern
//! - Image storage abstraction (S3 or local filesystem)
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod storage;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{IdentifierKind, Repository};
pub use errors::{AppError, Result};
pub use storage::ImageStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
