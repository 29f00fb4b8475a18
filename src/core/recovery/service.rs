//! Recovery manager
//!
//! Classifies every recorded error, generates its recovery plan and
//! therapeutic guidance, executes bounded safety-checked recovery attempts,
//! and tracks clinical review requirements. Errors affecting patient safety
//! or compliance always register a clinical review, independent of whether
//! recovery is attempted - that rule is not bypassable.

use crate::config::RecoveryConfig;
use crate::core::recovery::classify::{classify_error, ClinicalErrorType, ExportError};
use crate::core::recovery::guidance::{generate_guidance, TherapeuticGuidance};
use crate::core::recovery::plan::{generate_recovery_plan, RecoveryPlan, RecoveryStepKind};
use crate::core::recovery::traits::{RecoveryBackend, SafetyValidator};
use crate::domain::clinical::ReviewStatus;
use crate::domain::ids::ExportId;
use crate::domain::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Why a clinical review was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewReason {
    PatientSafety,
    ComplianceViolation,
}

/// A requested clinical review of an error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalErrorReview {
    /// Export under review
    pub export_id: ExportId,

    /// Why the review was requested
    pub reason: ReviewReason,

    /// Review lifecycle status
    pub status: ReviewStatus,

    /// When the review was requested
    pub requested_at: DateTime<Utc>,

    /// Reviewer's notes once completed
    pub reviewer_notes: Option<String>,

    /// When the review finished
    pub completed_at: Option<DateTime<Utc>>,
}

/// One recorded recovery attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryAttempt {
    /// 1-based attempt number for this export
    pub attempt_number: u32,

    /// When the attempt started
    pub started_at: DateTime<Utc>,

    /// When the attempt finished
    pub completed_at: DateTime<Utc>,

    /// Whether every safety check passed
    pub safety_checks_passed: bool,

    /// Steps that actually executed
    pub steps_executed: Vec<RecoveryStepKind>,

    /// Whether the attempt fixed the error
    pub success: bool,

    /// Why the attempt failed, when it did
    pub failure_reason: Option<String>,
}

/// How an error was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMethod {
    AutomaticRecovery,
    UserIntervention,
    OperatorOverride,
}

/// Resolution details for a closed error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResolution {
    /// How it was resolved
    pub method: ResolutionMethod,

    /// When it was resolved
    pub resolved_at: DateTime<Utc>,

    /// Free-text notes
    pub notes: String,
}

/// Everything tracked about one error occurrence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// The underlying error
    pub error: ExportError,

    /// Derived classification
    pub clinical_type: ClinicalErrorType,

    /// Generated recovery plan
    pub plan: RecoveryPlan,

    /// Recovery attempts made so far
    pub recovery_attempts: Vec<RecoveryAttempt>,

    /// Resolution, once closed
    pub resolution: Option<ErrorResolution>,

    /// User-facing guidance
    pub guidance: TherapeuticGuidance,

    /// Clinical review, when one was requested
    pub review: Option<ClinicalErrorReview>,
}

/// Read-only error view for the UI layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedErrorInfo {
    /// Export the error belongs to
    pub export_id: ExportId,

    /// User-facing guidance
    pub guidance: TherapeuticGuidance,

    /// Error category
    pub category: crate::core::recovery::classify::ErrorCategory,

    /// Whether another recovery attempt is possible
    pub can_retry: bool,

    /// Whether the user must act before anything proceeds
    pub requires_user_action: bool,

    /// Recovery attempts left within the bound
    pub attempts_remaining: u32,

    /// Raw technical detail; present only behind the privacy opt-in
    pub technical_detail: Option<String>,
}

#[derive(Default)]
struct RecoveryState {
    active_errors: HashMap<ExportId, ErrorRecord>,
    resolved_errors: Vec<ErrorRecord>,
    recovery_in_progress: HashSet<ExportId>,
    clinical_review_requests: HashSet<ExportId>,
}

/// Error classification and bounded recovery service
pub struct RecoveryManager {
    state: RwLock<RecoveryState>,
    backend: Arc<dyn RecoveryBackend>,
    validator: Arc<dyn SafetyValidator>,
    config: RecoveryConfig,
}

impl RecoveryManager {
    /// Create a manager over a backend and validator
    pub fn new(
        backend: Arc<dyn RecoveryBackend>,
        validator: Arc<dyn SafetyValidator>,
        config: RecoveryConfig,
    ) -> Self {
        Self {
            state: RwLock::new(RecoveryState::default()),
            backend,
            validator,
            config,
        }
    }

    /// Record an error: classify it, generate plan and guidance, and
    /// register a clinical review when safety or compliance demands one
    ///
    /// Re-recording an error for an export that already has one preserves
    /// the existing recovery attempts, keeping the attempt bound intact
    /// across repeated failures.
    pub async fn record_error(&self, error: ExportError) -> ErrorRecord {
        let clinical_type = classify_error(&error);
        let plan = generate_recovery_plan(&error.export_id, &clinical_type);
        let guidance = generate_guidance(&error, &clinical_type);
        let export_id = error.export_id.clone();

        let review_reason = if clinical_type.affects_patient_safety {
            Some(ReviewReason::PatientSafety)
        } else if clinical_type.compliance_violation {
            Some(ReviewReason::ComplianceViolation)
        } else {
            None
        };

        let mut state = self.state.write().await;

        let previous_attempts = state
            .active_errors
            .remove(&export_id)
            .map(|r| r.recovery_attempts)
            .unwrap_or_default();

        let review = review_reason.map(|reason| {
            state.clinical_review_requests.insert(export_id.clone());
            tracing::warn!(
                export_id = %export_id,
                reason = ?reason,
                "Clinical review requested"
            );
            ClinicalErrorReview {
                export_id: export_id.clone(),
                reason,
                status: ReviewStatus::Pending,
                requested_at: Utc::now(),
                reviewer_notes: None,
                completed_at: None,
            }
        });

        let record = ErrorRecord {
            error,
            clinical_type,
            plan,
            recovery_attempts: previous_attempts,
            resolution: None,
            guidance,
            review,
        };

        tracing::error!(
            export_id = %export_id,
            category = %clinical_type.category,
            severity = ?clinical_type.severity,
            patient_safety = clinical_type.affects_patient_safety,
            "Export error recorded"
        );

        state.active_errors.insert(export_id, record.clone());
        record
    }

    /// Execute one bounded, safety-checked recovery attempt
    ///
    /// Refuses (returning `false` without recording an attempt) when the
    /// export has no active error, recovery is already in progress, the
    /// attempt bound is reached, or the plan requires user approval that
    /// wasn't given. A failing critical safety check records an attempt with
    /// `safety_checks_passed: false` and executes nothing.
    pub async fn attempt_recovery(&self, export_id: &ExportId, user_approved: bool) -> Result<bool> {
        let plan = {
            let mut state = self.state.write().await;

            let Some(record) = state.active_errors.get(export_id) else {
                return Ok(false);
            };

            if state.recovery_in_progress.contains(export_id) {
                tracing::debug!(export_id = %export_id, "Recovery already in progress");
                return Ok(false);
            }

            if record.recovery_attempts.len() as u32 >= self.config.max_recovery_attempts {
                tracing::warn!(
                    export_id = %export_id,
                    attempts = record.recovery_attempts.len(),
                    "Recovery attempt bound reached"
                );
                return Ok(false);
            }

            if !record.plan.automatic_recovery_allowed && !user_approved {
                tracing::info!(
                    export_id = %export_id,
                    "Recovery requires explicit user approval"
                );
                return Ok(false);
            }

            let plan = record.plan.clone();
            state.recovery_in_progress.insert(export_id.clone());
            plan
        };

        let started_at = Utc::now();

        // Safety checks run before anything else; a critical failure aborts
        // the attempt without executing any step.
        let Some(record_view) = self.active_error(export_id).await else {
            // Resolved out from under us; nothing left to recover
            self.state.write().await.recovery_in_progress.remove(export_id);
            return Ok(false);
        };

        let mut checks_passed = true;
        let mut critical_failed = false;
        for check in &plan.safety_checks {
            let passed = self.validator.run_safety_check(check, &record_view).await;
            if !passed {
                checks_passed = false;
                if check.critical {
                    critical_failed = true;
                }
                tracing::warn!(
                    export_id = %export_id,
                    check = ?check.kind,
                    critical = check.critical,
                    "Safety check failed"
                );
            }
        }

        if critical_failed {
            self.finish_attempt(
                export_id,
                RecoveryAttempt {
                    attempt_number: 0, // stamped in finish_attempt
                    started_at,
                    completed_at: Utc::now(),
                    safety_checks_passed: false,
                    steps_executed: Vec::new(),
                    success: false,
                    failure_reason: Some("Critical safety check failed".to_string()),
                },
            )
            .await;
            return Ok(false);
        }

        // Execute the plan's steps in order, each under its timeout.
        let mut steps_executed = Vec::new();
        let mut success = true;
        let mut failure_reason = None;

        for step in &plan.steps {
            if !step.automatic && !user_approved {
                success = false;
                failure_reason = Some(format!("Step '{}' requires the user", step.kind));
                break;
            }

            let outcome = if step.kind.is_automatic() {
                let action = async {
                    match step.kind {
                        RecoveryStepKind::ValidateData => {
                            self.backend.validate_data(export_id).await
                        }
                        RecoveryStepKind::RetryExport => self.backend.prepare_retry(export_id).await,
                        RecoveryStepKind::RetryReducedScope => {
                            self.backend.reduce_scope(export_id).await
                        }
                        RecoveryStepKind::FallbackFormat => {
                            self.backend.apply_fallback_format(export_id).await
                        }
                        RecoveryStepKind::ManualConsentRecheck
                        | RecoveryStepKind::ManualClinicalReview => Ok(true),
                    }
                };
                match tokio::time::timeout(
                    std::time::Duration::from_millis(step.validation.timeout_ms.max(1)),
                    action,
                )
                .await
                {
                    Ok(Ok(ok)) => ok,
                    Ok(Err(e)) => {
                        failure_reason = Some(format!("Step '{}' errored: {e}", step.kind));
                        false
                    }
                    Err(_) => {
                        failure_reason = Some(format!("Step '{}' timed out", step.kind));
                        false
                    }
                }
            } else {
                // Manual step with user approval: the user performed the
                // action out of band before approving.
                true
            };

            steps_executed.push(step.kind);
            if !outcome && step.validation.required {
                success = false;
                failure_reason
                    .get_or_insert_with(|| format!("Step '{}' did not succeed", step.kind));
                break;
            }
        }

        if steps_executed.is_empty() {
            success = false;
            failure_reason.get_or_insert_with(|| "No executable steps".to_string());
        }

        self.finish_attempt(
            export_id,
            RecoveryAttempt {
                attempt_number: 0,
                started_at,
                completed_at: Utc::now(),
                safety_checks_passed: checks_passed,
                steps_executed,
                success,
                failure_reason,
            },
        )
        .await;

        if success {
            let method = if user_approved {
                ResolutionMethod::UserIntervention
            } else {
                ResolutionMethod::AutomaticRecovery
            };
            self.resolve_error(export_id, method, "Recovery plan executed successfully")
                .await?;
        }

        Ok(success)
    }

    async fn finish_attempt(&self, export_id: &ExportId, mut attempt: RecoveryAttempt) {
        let mut state = self.state.write().await;
        state.recovery_in_progress.remove(export_id);
        if let Some(record) = state.active_errors.get_mut(export_id) {
            attempt.attempt_number = record.recovery_attempts.len() as u32 + 1;
            tracing::info!(
                export_id = %export_id,
                attempt = attempt.attempt_number,
                success = attempt.success,
                safety_checks_passed = attempt.safety_checks_passed,
                "Recovery attempt recorded"
            );
            record.recovery_attempts.push(attempt);
        }
    }

    /// Close an active error
    ///
    /// Clears the export from every active-error and recovery structure.
    /// A requested clinical review stays open; it is independent of
    /// recovery outcome.
    pub async fn resolve_error(
        &self,
        export_id: &ExportId,
        method: ResolutionMethod,
        notes: impl Into<String>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let Some(mut record) = state.active_errors.remove(export_id) else {
            return Err(crate::domain::BeingError::NotFound(format!(
                "Active error for {export_id}"
            )));
        };

        record.resolution = Some(ErrorResolution {
            method,
            resolved_at: Utc::now(),
            notes: notes.into(),
        });
        state.recovery_in_progress.remove(export_id);
        state.resolved_errors.push(record);

        tracing::info!(export_id = %export_id, method = ?method, "Error resolved");
        Ok(())
    }

    /// Complete a pending clinical review
    pub async fn complete_clinical_review(
        &self,
        export_id: &ExportId,
        notes: impl Into<String>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.clinical_review_requests.remove(export_id) {
            return Err(crate::domain::BeingError::NotFound(format!(
                "Clinical review request for {export_id}"
            )));
        }

        let notes = notes.into();
        let stamp = |review: &mut ClinicalErrorReview| {
            review.status = ReviewStatus::Completed;
            review.reviewer_notes = Some(notes.clone());
            review.completed_at = Some(Utc::now());
        };

        if let Some(record) = state.active_errors.get_mut(export_id) {
            if let Some(review) = record.review.as_mut() {
                stamp(review);
            }
        }
        for record in state.resolved_errors.iter_mut() {
            if &record.error.export_id == export_id {
                if let Some(review) = record.review.as_mut() {
                    stamp(review);
                }
            }
        }

        tracing::info!(export_id = %export_id, "Clinical review completed");
        Ok(())
    }

    /// The active error record for an export, if any
    pub async fn active_error(&self, export_id: &ExportId) -> Option<ErrorRecord> {
        self.state.read().await.active_errors.get(export_id).cloned()
    }

    /// Whether the export currently has an active error
    pub async fn has_active_error(&self, export_id: &ExportId) -> bool {
        self.state.read().await.active_errors.contains_key(export_id)
    }

    /// IDs of all exports with active errors
    pub async fn active_error_ids(&self) -> Vec<ExportId> {
        self.state.read().await.active_errors.keys().cloned().collect()
    }

    /// Number of active errors
    pub async fn active_error_count(&self) -> usize {
        self.state.read().await.active_errors.len()
    }

    /// Exports with an open clinical review request
    pub async fn pending_clinical_reviews(&self) -> Vec<ExportId> {
        self.state
            .read()
            .await
            .clinical_review_requests
            .iter()
            .cloned()
            .collect()
    }

    /// Active errors that affect patient safety
    pub async fn patient_safety_error_count(&self) -> usize {
        self.state
            .read()
            .await
            .active_errors
            .values()
            .filter(|r| r.clinical_type.affects_patient_safety)
            .count()
    }

    /// All error records, active then resolved
    pub async fn all_error_records(&self) -> Vec<ErrorRecord> {
        let state = self.state.read().await;
        state
            .active_errors
            .values()
            .cloned()
            .chain(state.resolved_errors.iter().cloned())
            .collect()
    }

    /// Recovery attempts remaining for an export within the bound
    pub async fn attempts_remaining(&self, export_id: &ExportId) -> u32 {
        let state = self.state.read().await;
        let used = state
            .active_errors
            .get(export_id)
            .map(|r| r.recovery_attempts.len() as u32)
            .unwrap_or(0);
        self.config.max_recovery_attempts.saturating_sub(used)
    }

    /// UI-facing error view
    pub async fn detailed_error_info(
        &self,
        export_id: &ExportId,
        show_technical_details: bool,
    ) -> Option<DetailedErrorInfo> {
        let state = self.state.read().await;
        let record = state.active_errors.get(export_id)?;
        let used = record.recovery_attempts.len() as u32;
        let attempts_remaining = self.config.max_recovery_attempts.saturating_sub(used);

        Some(DetailedErrorInfo {
            export_id: export_id.clone(),
            guidance: record.guidance.clone(),
            category: record.clinical_type.category,
            can_retry: attempts_remaining > 0,
            requires_user_action: record.plan.requires_user_approval,
            attempts_remaining,
            technical_detail: show_technical_details.then(|| record.error.message.clone()),
        })
    }

    /// Drop resolved errors older than the retention window and close out
    /// stale active errors; returns how many records were cleaned
    pub async fn cleanup_stale_errors(&self) -> usize {
        let cutoff = Utc::now() - Duration::days(self.config.error_retention_days);
        let mut state = self.state.write().await;

        let before = state.resolved_errors.len();
        state.resolved_errors.retain(|r| {
            r.resolution
                .as_ref()
                .map(|res| res.resolved_at >= cutoff)
                .unwrap_or(true)
        });
        let mut cleaned = before - state.resolved_errors.len();

        let stale: Vec<ExportId> = state
            .active_errors
            .values()
            .filter(|r| r.error.occurred_at < cutoff)
            .map(|r| r.error.export_id.clone())
            .collect();
        for export_id in stale {
            if let Some(mut record) = state.active_errors.remove(&export_id) {
                tracing::warn!(export_id = %export_id, "Closing stale unresolved error");
                record.resolution = Some(ErrorResolution {
                    method: ResolutionMethod::OperatorOverride,
                    resolved_at: Utc::now(),
                    notes: "Closed by retention cleanup".to_string(),
                });
                state.resolved_errors.push(record);
                state.recovery_in_progress.remove(&export_id);
                cleaned += 1;
            }
        }

        cleaned
    }

    /// Check the recent failed-attempt fraction against the configured
    /// threshold; returns whether the threshold was exceeded
    pub async fn check_error_rate_threshold(&self) -> bool {
        let window_start = Utc::now() - Duration::hours(1);
        let state = self.state.read().await;

        let recent: Vec<&RecoveryAttempt> = state
            .active_errors
            .values()
            .chain(state.resolved_errors.iter())
            .flat_map(|r| r.recovery_attempts.iter())
            .filter(|a| a.completed_at >= window_start)
            .collect();

        if recent.is_empty() {
            return false;
        }

        let failed = recent.iter().filter(|a| !a.success).count();
        let rate = failed as f64 / recent.len() as f64;
        let exceeded = rate > self.config.error_rate_threshold;

        if exceeded {
            tracing::warn!(
                rate = format!("{rate:.2}"),
                threshold = self.config.error_rate_threshold,
                attempts = recent.len(),
                "Recovery failure rate above threshold"
            );
        }
        exceeded
    }
}
