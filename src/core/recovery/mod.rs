//! Error classification and recovery
//!
//! Every workflow failure lands here: the [`RecoveryManager`] classifies the
//! error, derives a safety-checked recovery plan, executes bounded recovery
//! attempts through the [`RecoveryBackend`] seam, pairs the error with
//! therapeutic guidance, and tracks mandatory clinical reviews.

pub mod analytics;
pub mod backend;
pub mod classify;
pub mod guidance;
pub mod plan;
pub mod service;
pub mod traits;

pub use analytics::{analyze_error_patterns, ErrorPattern, ErrorPatternReport, RecoveryEffectiveness};
pub use classify::{classify, classify_error, ClinicalErrorType, ErrorCategory, ExportError};
pub use guidance::{generate_guidance, GuidanceTone, SupportResource, TherapeuticGuidance};
pub use plan::{
    generate_recovery_plan, FallbackAction, FallbackOption, RecoveryPlan, RecoveryStep,
    RecoveryStepKind, SafetyCheck, SafetyCheckKind, StepValidation,
};
pub use service::{
    ClinicalErrorReview, DetailedErrorInfo, ErrorRecord, ErrorResolution, RecoveryAttempt,
    RecoveryManager, ResolutionMethod, ReviewReason,
};
pub use traits::{ClinicalCheckOutcome, RecoveryBackend, RuleBasedSafetyValidator, SafetyValidator};
