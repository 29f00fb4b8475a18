//! Domain models and types for the export engine.
//!
//! This module contains the core domain models, types, and business rules.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`ExportId`], [`UserId`], [`ConsentId`], [`ShareId`])
//! - **The export request model** ([`UnifiedExportRequest`] and its enums)
//! - **Clinical rating scales** ([`RiskLevel`], [`ClinicalImpact`], [`ErrorSeverity`])
//! - **Error types** ([`BeingError`], [`ExportErrorCode`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! The newtype pattern keeps different ID kinds from being mixed:
//!
//! ```rust
//! use being_export::domain::{ExportId, UserId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let export_id = ExportId::new("exp-123")?;
//! let user_id = UserId::new("user-456")?;
//!
//! // This won't compile - type safety prevents mixing IDs
//! // let wrong: ExportId = user_id;  // Compile error!
//! # Ok(())
//! # }
//! ```

pub mod clinical;
pub mod errors;
pub mod ids;
pub mod request;
pub mod result;

// Re-export commonly used types for convenience
pub use clinical::{ClinicalImpact, ClinicalSignificance, ErrorSeverity, ReviewStatus, RiskLevel};
pub use errors::{BeingError, ExportErrorCode};
pub use ids::{ConsentId, ExportId, ShareId, UserId};
pub use request::{
    DataCategory, DateRange, ExportFormat, ExportPurpose, ExportUrgency, UnifiedExportRequest,
};
pub use result::Result;
