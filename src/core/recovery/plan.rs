//! Recovery plan generation
//!
//! Every classified error gets a derived, category-specific plan: ordered
//! remediation steps, the safety checks that must pass before execution, and
//! ranked fallback options. Plans are regenerated per error and never
//! persisted across sessions.

use crate::core::recovery::classify::{ClinicalErrorType, ErrorCategory};
use crate::domain::ids::ExportId;
use crate::domain::request::ExportFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of remediation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryStepKind {
    /// Re-read the source to confirm the data is intact
    ValidateData,
    /// Prepare the failed job for another run
    RetryExport,
    /// Retry collecting categories independently, skipping broken ones
    RetryReducedScope,
    /// Re-render in the safe fallback format
    FallbackFormat,
    /// User must re-confirm consent before anything proceeds
    ManualConsentRecheck,
    /// A clinician must look at the data before anything proceeds
    ManualClinicalReview,
}

impl RecoveryStepKind {
    /// Whether the step can run without a human in the loop
    pub fn is_automatic(&self) -> bool {
        !matches!(self, Self::ManualConsentRecheck | Self::ManualClinicalReview)
    }
}

impl std::fmt::Display for RecoveryStepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ValidateData => "validate-data",
            Self::RetryExport => "retry-export",
            Self::RetryReducedScope => "retry-reduced-scope",
            Self::FallbackFormat => "fallback-format",
            Self::ManualConsentRecheck => "manual-consent-recheck",
            Self::ManualClinicalReview => "manual-clinical-review",
        };
        write!(f, "{name}")
    }
}

/// Execution constraints for one step
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StepValidation {
    /// Budget for the step; the executor races the step against this
    pub timeout_ms: u64,

    /// Whether plan success requires this step to succeed
    pub required: bool,
}

/// One ordered remediation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryStep {
    /// Position in the plan, 1-based
    pub order: u32,

    /// What the step does
    pub kind: RecoveryStepKind,

    /// Human-readable description
    pub description: String,

    /// Whether the step runs without user approval
    pub automatic: bool,

    /// Execution constraints
    pub validation: StepValidation,
}

impl RecoveryStep {
    fn new(order: u32, kind: RecoveryStepKind, description: &str, timeout_ms: u64) -> Self {
        Self {
            order,
            kind,
            description: description.to_string(),
            automatic: kind.is_automatic(),
            validation: StepValidation {
                timeout_ms,
                required: true,
            },
        }
    }
}

/// Kind of pre-execution safety check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SafetyCheckKind {
    /// The error must not endanger clinical data integrity
    ClinicalDataSafety,
    /// The error must not be an unresolved compliance violation
    PrivacyCompliance,
    /// Advisory headroom check on the snapshot store
    StorageCapacity,
}

/// One safety check gating recovery execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyCheck {
    /// What is being checked
    pub kind: SafetyCheckKind,

    /// A failing critical check aborts the attempt before any step runs
    pub critical: bool,

    /// Human-readable description
    pub description: String,
}

/// What to offer the user when recovery cannot fix the export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackAction {
    /// Try again later
    RetryLater,
    /// Re-export in another format
    AlternativeFormat(ExportFormat),
    /// Hand off to support
    ContactSupport,
}

/// One ranked fallback option
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackOption {
    /// Rank, 1 is offered first
    pub rank: u32,

    /// What the option does
    pub action: FallbackAction,

    /// Human-readable description
    pub description: String,
}

/// Derived plan for recovering from one error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryPlan {
    /// Export the plan applies to
    pub export_id: ExportId,

    /// Category the plan was generated for
    pub category: ErrorCategory,

    /// Ordered remediation steps
    pub steps: Vec<RecoveryStep>,

    /// Checks that must pass before any step runs
    pub safety_checks: Vec<SafetyCheck>,

    /// Whether a clinician must validate before/after recovery
    pub requires_clinical_validation: bool,

    /// Whether the user must approve execution
    pub requires_user_approval: bool,

    /// Whether the engine may execute the plan unattended
    pub automatic_recovery_allowed: bool,

    /// Ranked fallbacks when recovery cannot fix the export
    pub fallbacks: Vec<FallbackOption>,

    /// When the plan was generated
    pub generated_at: DateTime<Utc>,
}

fn standard_safety_checks() -> Vec<SafetyCheck> {
    vec![
        SafetyCheck {
            kind: SafetyCheckKind::ClinicalDataSafety,
            critical: true,
            description: "Recovery must not endanger clinical data".to_string(),
        },
        SafetyCheck {
            kind: SafetyCheckKind::PrivacyCompliance,
            critical: true,
            description: "Recovery must not proceed past a compliance violation".to_string(),
        },
        SafetyCheck {
            kind: SafetyCheckKind::StorageCapacity,
            critical: false,
            description: "Snapshot store should have headroom".to_string(),
        },
    ]
}

fn standard_fallbacks(first: FallbackAction) -> Vec<FallbackOption> {
    let mut options = vec![
        FallbackOption {
            rank: 1,
            description: fallback_description(&first),
            action: first,
        },
        FallbackOption {
            rank: 2,
            action: FallbackAction::AlternativeFormat(ExportFormat::Summary),
            description: "Export a plain-text summary instead".to_string(),
        },
        FallbackOption {
            rank: 3,
            action: FallbackAction::ContactSupport,
            description: "Contact support for help with this export".to_string(),
        },
    ];

    let mut seen: Vec<FallbackAction> = Vec::new();
    options.retain(|option| {
        if seen.contains(&option.action) {
            false
        } else {
            seen.push(option.action.clone());
            true
        }
    });
    for (index, option) in options.iter_mut().enumerate() {
        option.rank = index as u32 + 1;
    }
    options
}

fn fallback_description(action: &FallbackAction) -> String {
    match action {
        FallbackAction::RetryLater => "Try the export again in a little while".to_string(),
        FallbackAction::AlternativeFormat(format) => {
            format!("Export in {format} format instead")
        }
        FallbackAction::ContactSupport => "Contact support for help with this export".to_string(),
    }
}

/// Generate the recovery plan for a classified error
///
/// Plans for errors affecting patient safety require explicit user approval
/// and disable automatic recovery; privacy violations are never recovered
/// automatically.
pub fn generate_recovery_plan(
    export_id: &ExportId,
    clinical_type: &ClinicalErrorType,
) -> RecoveryPlan {
    let steps = match clinical_type.category {
        ErrorCategory::DataIntegrity => vec![
            RecoveryStep::new(
                1,
                RecoveryStepKind::ValidateData,
                "Re-read the source and confirm the data is intact",
                5_000,
            ),
            RecoveryStep::new(
                2,
                RecoveryStepKind::RetryReducedScope,
                "Retry collection per category, skipping broken ones",
                30_000,
            ),
        ],
        ErrorCategory::PrivacyViolation => vec![RecoveryStep::new(
            1,
            RecoveryStepKind::ManualConsentRecheck,
            "User must re-confirm consent before the export can continue",
            0,
        )],
        ErrorCategory::GenerationFailure => vec![
            RecoveryStep::new(
                1,
                RecoveryStepKind::RetryExport,
                "Prepare the job for another run",
                30_000,
            ),
            RecoveryStep::new(
                2,
                RecoveryStepKind::FallbackFormat,
                "Switch to the plain-text summary format",
                30_000,
            ),
        ],
        ErrorCategory::SharingError => vec![RecoveryStep::new(
            1,
            RecoveryStepKind::RetryExport,
            "Prepare the delivery for another run",
            30_000,
        )],
        ErrorCategory::ClinicalAccuracy => vec![
            RecoveryStep::new(
                1,
                RecoveryStepKind::ValidateData,
                "Re-read the source and confirm clinical consistency",
                5_000,
            ),
            RecoveryStep::new(
                2,
                RecoveryStepKind::ManualClinicalReview,
                "A clinician must review the discrepancy",
                0,
            ),
        ],
        ErrorCategory::SystemError => vec![RecoveryStep::new(
            1,
            RecoveryStepKind::RetryExport,
            "Prepare the job for another run",
            30_000,
        )],
    };

    let requires_user_approval = clinical_type.affects_patient_safety
        || clinical_type.category == ErrorCategory::PrivacyViolation;

    let first_fallback = match clinical_type.category {
        ErrorCategory::PrivacyViolation => FallbackAction::ContactSupport,
        _ => FallbackAction::RetryLater,
    };

    RecoveryPlan {
        export_id: export_id.clone(),
        category: clinical_type.category,
        steps,
        safety_checks: standard_safety_checks(),
        requires_clinical_validation: clinical_type.affects_patient_safety
            || clinical_type.category == ErrorCategory::ClinicalAccuracy,
        requires_user_approval,
        automatic_recovery_allowed: !requires_user_approval,
        fallbacks: standard_fallbacks(first_fallback),
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::recovery::classify::classify;
    use crate::domain::clinical::ClinicalImpact;
    use crate::domain::ExportErrorCode;

    fn plan_for(code: ExportErrorCode, impact: ClinicalImpact) -> RecoveryPlan {
        let clinical_type = classify(code, impact);
        generate_recovery_plan(&ExportId::new("exp-1").unwrap(), &clinical_type)
    }

    #[test]
    fn test_data_integrity_plan_order() {
        let plan = plan_for(ExportErrorCode::DataIncomplete, ClinicalImpact::Moderate);
        let kinds: Vec<RecoveryStepKind> = plan.steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecoveryStepKind::ValidateData,
                RecoveryStepKind::RetryReducedScope
            ]
        );
        assert!(plan.automatic_recovery_allowed);
    }

    #[test]
    fn test_privacy_plan_is_manual_only() {
        let plan = plan_for(ExportErrorCode::ConsentExpired, ClinicalImpact::Moderate);
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].kind, RecoveryStepKind::ManualConsentRecheck);
        assert!(!plan.steps[0].automatic);
        assert!(plan.requires_user_approval);
        assert!(!plan.automatic_recovery_allowed);
    }

    #[test]
    fn test_generation_plan_retries_then_falls_back() {
        let plan = plan_for(ExportErrorCode::RenderFailed, ClinicalImpact::Minimal);
        let kinds: Vec<RecoveryStepKind> = plan.steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![RecoveryStepKind::RetryExport, RecoveryStepKind::FallbackFormat]
        );
    }

    #[test]
    fn test_patient_safety_disables_automatic_recovery() {
        let plan = plan_for(ExportErrorCode::ClinicalInconsistency, ClinicalImpact::Severe);
        assert!(plan.requires_user_approval);
        assert!(!plan.automatic_recovery_allowed);
        assert!(plan.requires_clinical_validation);
    }

    #[test]
    fn test_safety_check_pair_always_present() {
        let plan = plan_for(ExportErrorCode::Internal, ClinicalImpact::Minimal);
        let criticals: Vec<SafetyCheckKind> = plan
            .safety_checks
            .iter()
            .filter(|c| c.critical)
            .map(|c| c.kind)
            .collect();
        assert_eq!(
            criticals,
            vec![
                SafetyCheckKind::ClinicalDataSafety,
                SafetyCheckKind::PrivacyCompliance
            ]
        );
    }

    #[test]
    fn test_fallbacks_are_ranked() {
        let plan = plan_for(ExportErrorCode::RenderFailed, ClinicalImpact::Minimal);
        let ranks: Vec<u32> = plan.fallbacks.iter().map(|f| f.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(plan.fallbacks[0].action, FallbackAction::RetryLater);
    }

    #[test]
    fn test_privacy_fallbacks_deduplicated() {
        let plan = plan_for(ExportErrorCode::PrivacyBreach, ClinicalImpact::Moderate);
        assert_eq!(plan.fallbacks[0].action, FallbackAction::ContactSupport);
        let ranks: Vec<u32> = plan.fallbacks.iter().map(|f| f.rank).collect();
        assert_eq!(ranks, vec![1, 2]);
    }

    #[test]
    fn test_steps_carry_timeouts() {
        let plan = plan_for(ExportErrorCode::DataIncomplete, ClinicalImpact::Moderate);
        assert!(plan.steps.iter().all(|s| s.validation.required));
        assert_eq!(plan.steps[0].validation.timeout_ms, 5_000);
    }
}
