//! Domain error types
//!
//! The error hierarchy for the export engine. All errors are domain-specific
//! and don't expose third-party types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type
///
/// This is the primary error type used throughout the engine.
/// It wraps specific error kinds and provides context for error handling.
#[derive(Debug, Error)]
pub enum BeingError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Export request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Consent-related errors
    #[error("Consent error: {0}")]
    Consent(String),

    /// Export process errors
    #[error("Process error: {0}")]
    Process(String),

    /// History record-keeping errors
    #[error("History error: {0}")]
    History(String),

    /// Error recovery errors
    #[error("Recovery error: {0}")]
    Recovery(String),

    /// Workflow orchestration errors
    #[error("Workflow error: {0}")]
    Workflow(String),

    /// Concurrent workflow limit reached
    #[error("Workflow limit reached: {0}")]
    WorkflowLimit(String),

    /// Snapshot storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Lookups for unknown exports, shares, or consents
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Closed set of export error codes
///
/// Every failure the engine records is tagged with one of these codes.
/// Classification and recovery-plan generation match on the code
/// exhaustively, so adding a code is a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportErrorCode {
    // Data integrity
    /// Source data failed an integrity check
    DataCorruption,
    /// Source returned fewer records than the range should hold
    DataIncomplete,
    /// Collected data failed validation before rendering
    DataValidationFailed,

    // Privacy / consent
    /// No consent record covers a requested category
    ConsentMissing,
    /// A covering consent record has expired
    ConsentExpired,
    /// Data left the consented scope
    PrivacyBreach,
    /// Caller is not authorized for the target user
    UnauthorizedAccess,

    // Generation
    /// Rendering did not finish within its budget
    GenerationTimeout,
    /// The renderer rejected the collected data
    RenderFailed,
    /// Requested format is not available for this data
    FormatUnsupported,
    /// Out of memory or disk while rendering
    ResourceExhausted,

    // Sharing
    /// Delivery to the recipient failed
    ShareDeliveryFailed,
    /// The share link expired before delivery
    ShareExpired,
    /// The recipient declined the share
    RecipientRejected,

    // Clinical accuracy
    /// Rendered output disagrees with source clinical data
    ClinicalInconsistency,
    /// Risk assessment data predates the export window
    RiskAssessmentStale,

    // System
    /// Snapshot store failure
    StorageFailure,
    /// Transient platform failure
    NetworkUnavailable,
    /// Unclassified internal failure
    Internal,
}

impl ExportErrorCode {
    /// Stable string form of the code (matches the serde representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataCorruption => "data-corruption",
            Self::DataIncomplete => "data-incomplete",
            Self::DataValidationFailed => "data-validation-failed",
            Self::ConsentMissing => "consent-missing",
            Self::ConsentExpired => "consent-expired",
            Self::PrivacyBreach => "privacy-breach",
            Self::UnauthorizedAccess => "unauthorized-access",
            Self::GenerationTimeout => "generation-timeout",
            Self::RenderFailed => "render-failed",
            Self::FormatUnsupported => "format-unsupported",
            Self::ResourceExhausted => "resource-exhausted",
            Self::ShareDeliveryFailed => "share-delivery-failed",
            Self::ShareExpired => "share-expired",
            Self::RecipientRejected => "recipient-rejected",
            Self::ClinicalInconsistency => "clinical-inconsistency",
            Self::RiskAssessmentStale => "risk-assessment-stale",
            Self::StorageFailure => "storage-failure",
            Self::NetworkUnavailable => "network-unavailable",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ExportErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for BeingError {
    fn from(err: std::io::Error) -> Self {
        BeingError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for BeingError {
    fn from(err: serde_json::Error) -> Self {
        BeingError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for BeingError {
    fn from(err: toml::de::Error) -> Self {
        BeingError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_being_error_display() {
        let err = BeingError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: BeingError = io_err.into();
        assert!(matches!(err, BeingError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: BeingError = json_err.into();
        assert!(matches!(err, BeingError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: BeingError = toml_err.into();
        assert!(matches!(err, BeingError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_error_code_str_matches_serde() {
        let code = ExportErrorCode::ConsentExpired;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, format!("\"{}\"", code.as_str()));
    }

    #[test]
    fn test_being_error_implements_std_error() {
        let err = BeingError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
