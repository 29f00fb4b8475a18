//! Recovery and validation seams
//!
//! The recovery manager executes remediation steps and safety checks through
//! these traits. The processor implements [`RecoveryBackend`]; the default
//! [`RuleBasedSafetyValidator`] implements [`SafetyValidator`] with
//! deterministic rules. A real clinical validation service slots in behind
//! the same trait.

use crate::core::recovery::plan::{SafetyCheck, SafetyCheckKind};
use crate::core::recovery::service::ErrorRecord;
use crate::domain::clinical::RiskLevel;
use crate::domain::ids::ExportId;
use crate::domain::request::{DataCategory, ExportPurpose, UnifiedExportRequest};
use crate::domain::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of a clinical validation check on an export request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalCheckOutcome {
    /// Whether the export may proceed
    pub passed: bool,

    /// Risk level the validator assigned to the export
    pub risk_level: RiskLevel,

    /// Explanation of the outcome
    pub notes: String,
}

/// Remediation actions the recovery manager can ask for
///
/// Steps prepare state for a retry rather than restarting jobs themselves;
/// the coordinator owns the single restart that follows a successful
/// recovery.
#[async_trait]
pub trait RecoveryBackend: Send + Sync {
    /// Re-read the export's source data; `true` if it reads back cleanly
    async fn validate_data(&self, export_id: &ExportId) -> Result<bool>;

    /// Confirm the job is in a retryable state
    async fn prepare_retry(&self, export_id: &ExportId) -> Result<bool>;

    /// Flag the next run to collect categories independently
    async fn reduce_scope(&self, export_id: &ExportId) -> Result<bool>;

    /// Flag the next run to render in the safe fallback format
    async fn apply_fallback_format(&self, export_id: &ExportId) -> Result<bool>;
}

/// Clinical safety validation seam
#[async_trait]
pub trait SafetyValidator: Send + Sync {
    /// Clinical-validation stage check on an export request
    async fn validate_export(
        &self,
        request: &UnifiedExportRequest,
    ) -> Result<ClinicalCheckOutcome>;

    /// Run one pre-recovery safety check against a recorded error
    async fn run_safety_check(&self, check: &SafetyCheck, error: &ErrorRecord) -> bool;
}

/// Deterministic rule-based safety validator
///
/// Stands in for a real clinical validation service. The rules are fixed:
/// high-risk categories may not leave the therapeutic context through a
/// migration export, and recovery is blocked while an error endangers
/// patient safety or stands as a compliance violation.
#[derive(Debug, Default)]
pub struct RuleBasedSafetyValidator;

impl RuleBasedSafetyValidator {
    /// Create the validator
    pub fn new() -> Self {
        Self
    }

    fn assess_risk(request: &UnifiedExportRequest) -> RiskLevel {
        if request
            .categories
            .contains(&DataCategory::CrisisEpisodes)
        {
            RiskLevel::High
        } else if request.categories.contains(&DataCategory::TherapyNotes)
            || request.categories.contains(&DataCategory::AssessmentScores)
        {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

#[async_trait]
impl SafetyValidator for RuleBasedSafetyValidator {
    async fn validate_export(
        &self,
        request: &UnifiedExportRequest,
    ) -> Result<ClinicalCheckOutcome> {
        let risk_level = Self::assess_risk(request);

        if request.includes_high_risk_data() && request.purpose == ExportPurpose::Migration {
            return Ok(ClinicalCheckOutcome {
                passed: false,
                risk_level,
                notes: "High-risk categories cannot leave the therapeutic context through a \
                        migration export"
                    .to_string(),
            });
        }

        Ok(ClinicalCheckOutcome {
            passed: true,
            risk_level,
            notes: "Export cleared by rule-based validation".to_string(),
        })
    }

    async fn run_safety_check(&self, check: &SafetyCheck, error: &ErrorRecord) -> bool {
        match check.kind {
            SafetyCheckKind::ClinicalDataSafety => !error.clinical_type.affects_patient_safety,
            SafetyCheckKind::PrivacyCompliance => !error.clinical_type.compliance_violation,
            SafetyCheckKind::StorageCapacity => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::UserId;
    use crate::domain::request::{DateRange, ExportFormat};

    fn request(categories: Vec<DataCategory>, purpose: ExportPurpose) -> UnifiedExportRequest {
        UnifiedExportRequest::new(
            UserId::new("user-1").unwrap(),
            ExportFormat::Pdf,
            categories,
            DateRange::last_days(7),
        )
        .with_purpose(purpose)
    }

    #[tokio::test]
    async fn test_routine_export_passes() {
        let validator = RuleBasedSafetyValidator::new();
        let outcome = validator
            .validate_export(&request(
                vec![DataCategory::MoodLog],
                ExportPurpose::PersonalRecord,
            ))
            .await
            .unwrap();

        assert!(outcome.passed);
        assert_eq!(outcome.risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_crisis_migration_fails() {
        let validator = RuleBasedSafetyValidator::new();
        let outcome = validator
            .validate_export(&request(
                vec![DataCategory::CrisisEpisodes],
                ExportPurpose::Migration,
            ))
            .await
            .unwrap();

        assert!(!outcome.passed);
        assert_eq!(outcome.risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_crisis_clinical_review_passes_at_high_risk() {
        let validator = RuleBasedSafetyValidator::new();
        let outcome = validator
            .validate_export(&request(
                vec![DataCategory::CrisisEpisodes],
                ExportPurpose::ClinicalReview,
            ))
            .await
            .unwrap();

        assert!(outcome.passed);
        assert_eq!(outcome.risk_level, RiskLevel::High);
    }
}
