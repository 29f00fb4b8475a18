//! Clinical data source abstraction
//!
//! Defines the trait the export processor pulls user data through. The
//! mobile app's local database sits behind this seam in production; tests
//! use the in-memory source.

use crate::domain::ids::UserId;
use crate::domain::request::{DataCategory, DateRange};
use crate::domain::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One clinical record as delivered by a data source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalRecord {
    /// Source-assigned record identifier
    pub id: String,

    /// User the record belongs to
    pub user_id: UserId,

    /// Category the record falls under
    pub category: DataCategory,

    /// When the record was captured
    pub recorded_at: DateTime<Utc>,

    /// Short human-readable summary line
    pub summary: String,

    /// Structured record body
    pub details: serde_json::Value,
}

impl ClinicalRecord {
    /// Create a record with an empty detail body
    pub fn new(
        id: impl Into<String>,
        user_id: UserId,
        category: DataCategory,
        recorded_at: DateTime<Utc>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id,
            category,
            recorded_at,
            summary: summary.into(),
            details: serde_json::Value::Null,
        }
    }

    /// Attach a structured detail body
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Trait for clinical data source implementations
///
/// Returns the records for a user filtered by category and date range.
/// Implementations must return records sorted by `recorded_at` ascending.
#[async_trait]
pub trait ClinicalDataSource: Send + Sync {
    /// Fetch records for the user covering the given categories and range
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    async fn fetch_records(
        &self,
        user_id: &UserId,
        categories: &[DataCategory],
        range: &DateRange,
    ) -> Result<Vec<ClinicalRecord>>;
}
