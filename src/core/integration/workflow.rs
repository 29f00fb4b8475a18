//! Workflow state machine
//!
//! The fixed stage pipeline an export moves through, the per-stage progress
//! weights, and the workflow status record tracked for every in-flight
//! export. Overall progress is always derived from `(stage, stage_progress)`
//! with the fixed weights; nothing sets it directly.

use crate::domain::ids::ExportId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage of an export workflow
///
/// The happy path runs the first eight stages in order. `ErrorHandling` and
/// `Recovery` are reachable from any stage and contribute no progress
/// weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowStage {
    ConfigurationValidation,
    ConsentVerification,
    DataCollection,
    ClinicalValidation,
    FormatGeneration,
    QualityAssurance,
    HistoryRecording,
    Completion,
    ErrorHandling,
    Recovery,
}

impl WorkflowStage {
    /// The happy-path stages in execution order
    pub fn happy_path() -> [WorkflowStage; 8] {
        [
            Self::ConfigurationValidation,
            Self::ConsentVerification,
            Self::DataCollection,
            Self::ClinicalValidation,
            Self::FormatGeneration,
            Self::QualityAssurance,
            Self::HistoryRecording,
            Self::Completion,
        ]
    }

    /// Progress weight of the stage; the happy path sums to exactly 100
    pub fn weight(&self) -> u8 {
        match self {
            Self::ConfigurationValidation => 10,
            Self::ConsentVerification => 10,
            Self::DataCollection => 20,
            Self::ClinicalValidation => 15,
            Self::FormatGeneration => 25,
            Self::QualityAssurance => 10,
            Self::HistoryRecording => 5,
            Self::Completion => 5,
            Self::ErrorHandling | Self::Recovery => 0,
        }
    }

    /// Whether this is one of the exceptional (error/recovery) stages
    pub fn is_exceptional(&self) -> bool {
        matches!(self, Self::ErrorHandling | Self::Recovery)
    }
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ConfigurationValidation => "configuration-validation",
            Self::ConsentVerification => "consent-verification",
            Self::DataCollection => "data-collection",
            Self::ClinicalValidation => "clinical-validation",
            Self::FormatGeneration => "format-generation",
            Self::QualityAssurance => "quality-assurance",
            Self::HistoryRecording => "history-recording",
            Self::Completion => "completion",
            Self::ErrorHandling => "error-handling",
            Self::Recovery => "recovery",
        };
        write!(f, "{name}")
    }
}

/// Derived overall progress for a happy-path stage
///
/// Sums the weights of all stages before `stage`, plus the weighted share of
/// the current stage. Returns `None` for the exceptional stages, which
/// contribute nothing and freeze the previous value.
pub fn derive_overall_progress(stage: WorkflowStage, stage_progress: u8) -> Option<u8> {
    if stage.is_exceptional() {
        return None;
    }

    let mut acc: u32 = 0;
    for s in WorkflowStage::happy_path() {
        if s == stage {
            acc += u32::from(s.weight()) * u32::from(stage_progress.min(100)) / 100;
            return Some(acc.min(100) as u8);
        }
        acc += u32::from(s.weight());
    }
    None
}

/// State of the clinical-validation stage for one workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClinicalValidationState {
    NotRequired,
    Pending,
    Passed,
    Failed,
}

/// Status of one in-flight export workflow
///
/// Created when a unified export starts, mutated only by the coordinator,
/// and removed from the active map after the cleanup delay once the
/// workflow completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportWorkflowStatus {
    /// Export this workflow drives
    pub export_id: ExportId,

    /// Current stage
    pub stage: WorkflowStage,

    /// Progress within the current stage, 0-100
    pub stage_progress: u8,

    /// Derived overall progress, 0-100
    pub overall_progress: u8,

    /// Rough time remaining, when the coordinator can estimate one
    pub estimated_time_remaining_ms: Option<u64>,

    /// Whether cancellation is currently possible
    pub can_cancel: bool,

    /// Whether a retry is currently possible
    pub can_retry: bool,

    /// Whether the user must act before the workflow proceeds
    pub requires_user_action: bool,

    /// Clinical-validation state
    pub clinical_validation: ClinicalValidationState,

    /// When the status last changed
    pub last_update: DateTime<Utc>,
}

impl ExportWorkflowStatus {
    /// Status for a freshly validated export: stage 1 complete, 10% overall
    pub fn new(export_id: ExportId) -> Self {
        let stage = WorkflowStage::ConfigurationValidation;
        let stage_progress = 100;
        Self {
            export_id,
            stage,
            stage_progress,
            overall_progress: derive_overall_progress(stage, stage_progress).unwrap_or(0),
            estimated_time_remaining_ms: None,
            can_cancel: true,
            can_retry: false,
            requires_user_action: false,
            clinical_validation: ClinicalValidationState::NotRequired,
            last_update: Utc::now(),
        }
    }

    /// Apply a partial update, re-deriving overall progress and stamping
    /// `last_update`
    pub fn apply(&mut self, update: WorkflowUpdate) {
        if let Some(stage) = update.stage {
            self.stage = stage;
        }
        if let Some(progress) = update.stage_progress {
            self.stage_progress = progress.min(100);
        }
        if let Some(can_cancel) = update.can_cancel {
            self.can_cancel = can_cancel;
        }
        if let Some(can_retry) = update.can_retry {
            self.can_retry = can_retry;
        }
        if let Some(requires) = update.requires_user_action {
            self.requires_user_action = requires;
        }
        if let Some(clinical) = update.clinical_validation {
            self.clinical_validation = clinical;
        }
        if let Some(estimate) = update.estimated_time_remaining_ms {
            self.estimated_time_remaining_ms = estimate;
        }

        if let Some(overall) = derive_overall_progress(self.stage, self.stage_progress) {
            self.overall_progress = overall;
        }
        self.last_update = Utc::now();
    }
}

/// Partial update to a workflow status
#[derive(Debug, Clone, Default)]
pub struct WorkflowUpdate {
    pub stage: Option<WorkflowStage>,
    pub stage_progress: Option<u8>,
    pub can_cancel: Option<bool>,
    pub can_retry: Option<bool>,
    pub requires_user_action: Option<bool>,
    pub clinical_validation: Option<ClinicalValidationState>,
    pub estimated_time_remaining_ms: Option<Option<u64>>,
}

impl WorkflowUpdate {
    /// Update that moves to a stage at 0% stage progress
    pub fn enter_stage(stage: WorkflowStage) -> Self {
        Self {
            stage: Some(stage),
            stage_progress: Some(0),
            ..Self::default()
        }
    }

    /// Update that sets stage progress only
    pub fn progress(stage_progress: u8) -> Self {
        Self {
            stage_progress: Some(stage_progress),
            ..Self::default()
        }
    }

    /// Set the clinical-validation state on this update
    pub fn with_clinical(mut self, state: ClinicalValidationState) -> Self {
        self.clinical_validation = Some(state);
        self
    }

    /// Set the stage progress on this update
    pub fn with_progress(mut self, stage_progress: u8) -> Self {
        self.stage_progress = Some(stage_progress);
        self
    }
}
