//! Error classification
//!
//! Maps every [`ExportErrorCode`] to a clinical error type: its category,
//! severity, and the two safety flags that gate automatic recovery and
//! trigger mandatory clinical review. Matching is exhaustive, so a new code
//! cannot ship without a classification.

use crate::core::integration::workflow::WorkflowStage;
use crate::domain::clinical::{ClinicalImpact, ErrorSeverity};
use crate::domain::ids::ExportId;
use crate::domain::ExportErrorCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a classified export error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    DataIntegrity,
    PrivacyViolation,
    GenerationFailure,
    SharingError,
    ClinicalAccuracy,
    SystemError,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DataIntegrity => "data-integrity",
            Self::PrivacyViolation => "privacy-violation",
            Self::GenerationFailure => "generation-failure",
            Self::SharingError => "sharing-error",
            Self::ClinicalAccuracy => "clinical-accuracy",
            Self::SystemError => "system-error",
        };
        write!(f, "{name}")
    }
}

/// Codes that always affect patient safety, regardless of impact level
const SAFETY_CRITICAL_CODES: [ExportErrorCode; 3] = [
    ExportErrorCode::DataCorruption,
    ExportErrorCode::ClinicalInconsistency,
    ExportErrorCode::RiskAssessmentStale,
];

/// One error occurrence tied to an export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportError {
    /// Export the error belongs to
    pub export_id: ExportId,

    /// Classified failure code
    pub code: ExportErrorCode,

    /// Human-readable detail (technical; never shown to users by default)
    pub message: String,

    /// Workflow stage the error surfaced in
    pub stage: WorkflowStage,

    /// Clinical impact of the failure
    pub clinical_impact: ClinicalImpact,

    /// When the error occurred
    pub occurred_at: DateTime<Utc>,
}

impl ExportError {
    /// Create an error with the code's default clinical impact
    pub fn new(
        export_id: ExportId,
        code: ExportErrorCode,
        message: impl Into<String>,
        stage: WorkflowStage,
    ) -> Self {
        Self {
            export_id,
            code,
            message: message.into(),
            stage,
            clinical_impact: default_clinical_impact(code),
            occurred_at: Utc::now(),
        }
    }

    /// Override the clinical impact
    pub fn with_clinical_impact(mut self, impact: ClinicalImpact) -> Self {
        self.clinical_impact = impact;
        self
    }
}

/// Derived classification of an export error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalErrorType {
    /// Error category
    pub category: ErrorCategory,

    /// Severity
    pub severity: ErrorSeverity,

    /// Whether the error could affect patient safety
    pub affects_patient_safety: bool,

    /// Whether the error is a consent/privacy compliance violation
    pub compliance_violation: bool,
}

/// Category for a code; exhaustive by construction
pub fn category_for(code: ExportErrorCode) -> ErrorCategory {
    use ExportErrorCode::*;
    match code {
        DataCorruption | DataIncomplete | DataValidationFailed => ErrorCategory::DataIntegrity,
        ConsentMissing | ConsentExpired | PrivacyBreach | UnauthorizedAccess => {
            ErrorCategory::PrivacyViolation
        }
        GenerationTimeout | RenderFailed | FormatUnsupported | ResourceExhausted => {
            ErrorCategory::GenerationFailure
        }
        ShareDeliveryFailed | ShareExpired | RecipientRejected => ErrorCategory::SharingError,
        ClinicalInconsistency | RiskAssessmentStale => ErrorCategory::ClinicalAccuracy,
        StorageFailure | NetworkUnavailable | Internal => ErrorCategory::SystemError,
    }
}

/// Default severity for a code
pub fn default_severity(code: ExportErrorCode) -> ErrorSeverity {
    use ExportErrorCode::*;
    match code {
        DataCorruption | PrivacyBreach | UnauthorizedAccess | ClinicalInconsistency => {
            ErrorSeverity::Critical
        }
        ConsentMissing | ConsentExpired | ResourceExhausted | RiskAssessmentStale
        | StorageFailure | Internal => ErrorSeverity::High,
        DataIncomplete | DataValidationFailed | GenerationTimeout | RenderFailed
        | ShareDeliveryFailed | NetworkUnavailable => ErrorSeverity::Medium,
        FormatUnsupported | ShareExpired | RecipientRejected => ErrorSeverity::Low,
    }
}

/// Default clinical impact for a code
pub fn default_clinical_impact(code: ExportErrorCode) -> ClinicalImpact {
    use ExportErrorCode::*;
    match code {
        ClinicalInconsistency => ClinicalImpact::Severe,
        DataCorruption | RiskAssessmentStale => ClinicalImpact::Significant,
        PrivacyBreach | UnauthorizedAccess | DataIncomplete | DataValidationFailed => {
            ClinicalImpact::Moderate
        }
        ConsentMissing | ConsentExpired | GenerationTimeout | RenderFailed | FormatUnsupported
        | ResourceExhausted | ShareDeliveryFailed | ShareExpired | RecipientRejected
        | StorageFailure | NetworkUnavailable | Internal => ClinicalImpact::Minimal,
    }
}

/// Classify an error code at a given clinical impact
///
/// `affects_patient_safety` is set when the impact is severe or the code is
/// in the fixed safety-critical set; `compliance_violation` is set for the
/// consent/privacy codes.
pub fn classify(code: ExportErrorCode, clinical_impact: ClinicalImpact) -> ClinicalErrorType {
    use ExportErrorCode::*;

    let affects_patient_safety =
        clinical_impact == ClinicalImpact::Severe || SAFETY_CRITICAL_CODES.contains(&code);

    let compliance_violation = matches!(
        code,
        ConsentMissing | ConsentExpired | PrivacyBreach | UnauthorizedAccess
    );

    ClinicalErrorType {
        category: category_for(code),
        severity: default_severity(code),
        affects_patient_safety,
        compliance_violation,
    }
}

/// Classify an error occurrence
pub fn classify_error(error: &ExportError) -> ClinicalErrorType {
    classify(error.code, error.clinical_impact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ExportErrorCode::DataCorruption, ErrorCategory::DataIntegrity)]
    #[test_case(ExportErrorCode::ConsentExpired, ErrorCategory::PrivacyViolation)]
    #[test_case(ExportErrorCode::RenderFailed, ErrorCategory::GenerationFailure)]
    #[test_case(ExportErrorCode::ShareDeliveryFailed, ErrorCategory::SharingError)]
    #[test_case(ExportErrorCode::ClinicalInconsistency, ErrorCategory::ClinicalAccuracy)]
    #[test_case(ExportErrorCode::Internal, ErrorCategory::SystemError)]
    fn test_category_mapping(code: ExportErrorCode, expected: ErrorCategory) {
        assert_eq!(category_for(code), expected);
    }

    #[test]
    fn test_safety_critical_codes_flag_patient_safety() {
        for code in SAFETY_CRITICAL_CODES {
            let classified = classify(code, ClinicalImpact::Minimal);
            assert!(
                classified.affects_patient_safety,
                "{code} should affect patient safety regardless of impact"
            );
        }
    }

    #[test]
    fn test_severe_impact_flags_patient_safety() {
        let classified = classify(ExportErrorCode::RenderFailed, ClinicalImpact::Severe);
        assert!(classified.affects_patient_safety);

        let classified = classify(ExportErrorCode::RenderFailed, ClinicalImpact::Moderate);
        assert!(!classified.affects_patient_safety);
    }

    #[test]
    fn test_compliance_codes() {
        for code in [
            ExportErrorCode::ConsentMissing,
            ExportErrorCode::ConsentExpired,
            ExportErrorCode::PrivacyBreach,
            ExportErrorCode::UnauthorizedAccess,
        ] {
            assert!(classify(code, ClinicalImpact::Minimal).compliance_violation);
        }
        assert!(!classify(ExportErrorCode::RenderFailed, ClinicalImpact::Minimal).compliance_violation);
    }

    #[test]
    fn test_export_error_defaults() {
        let error = ExportError::new(
            ExportId::new("exp-1").unwrap(),
            ExportErrorCode::ClinicalInconsistency,
            "render disagrees with source",
            WorkflowStage::ClinicalValidation,
        );

        assert_eq!(error.clinical_impact, ClinicalImpact::Severe);
        let classified = classify_error(&error);
        assert!(classified.affects_patient_safety);
        assert_eq!(classified.severity, ErrorSeverity::Critical);
    }
}
