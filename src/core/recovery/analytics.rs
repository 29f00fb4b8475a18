//! Error pattern analytics
//!
//! Aggregates recorded errors into frequency-ranked patterns, measures how
//! well each recovery step kind performs, and derives prevention
//! recommendations for the most frequent high-risk patterns.

use crate::core::recovery::classify::ErrorCategory;
use crate::core::recovery::plan::RecoveryStepKind;
use crate::core::recovery::service::ErrorRecord;
use crate::domain::clinical::ErrorSeverity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One `(category, severity)` error pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPattern {
    /// Error category
    pub category: ErrorCategory,

    /// Severity bucket
    pub severity: ErrorSeverity,

    /// How many errors matched the pattern
    pub occurrences: u64,

    /// When the pattern last occurred
    pub last_occurred: DateTime<Utc>,
}

/// Effectiveness of one recovery step kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryEffectiveness {
    /// Step kind measured
    pub step_kind: RecoveryStepKind,

    /// Attempts that executed this step
    pub attempts: u64,

    /// Of those, attempts that succeeded
    pub successes: u64,

    /// successes / attempts
    pub success_rate: f64,

    /// Mean attempt duration
    pub average_duration_ms: f64,

    /// Fraction of attempts whose safety checks passed
    pub clinical_safety_rate: f64,
}

/// Full error pattern report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPatternReport {
    /// Patterns, most frequent first
    pub patterns: Vec<ErrorPattern>,

    /// Per-step-kind recovery effectiveness
    pub effectiveness: Vec<RecoveryEffectiveness>,

    /// Prevention recommendations for frequent high-risk patterns
    pub recommendations: Vec<String>,

    /// When the report was generated
    pub generated_at: DateTime<Utc>,
}

fn recommendation_for(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::DataIntegrity => {
            "Run source integrity validation before export windows with heavy data churn"
        }
        ErrorCategory::PrivacyViolation => {
            "Prompt users to review consent coverage before requesting exports"
        }
        ErrorCategory::GenerationFailure => {
            "Prefer lighter formats for large date ranges to reduce render pressure"
        }
        ErrorCategory::SharingError => {
            "Verify recipient reachability before creating shares"
        }
        ErrorCategory::ClinicalAccuracy => {
            "Schedule clinical reviews ahead of exports that include assessment data"
        }
        ErrorCategory::SystemError => {
            "Check snapshot store health and storage headroom"
        }
    }
}

/// Aggregate patterns, effectiveness, and recommendations from error records
pub fn analyze_error_patterns(records: &[ErrorRecord]) -> ErrorPatternReport {
    // Frequency-ranked (category, severity) patterns
    let mut pattern_map: HashMap<(ErrorCategory, ErrorSeverity), (u64, DateTime<Utc>)> =
        HashMap::new();
    for record in records {
        let key = (record.clinical_type.category, record.clinical_type.severity);
        let entry = pattern_map
            .entry(key)
            .or_insert((0, record.error.occurred_at));
        entry.0 += 1;
        if record.error.occurred_at > entry.1 {
            entry.1 = record.error.occurred_at;
        }
    }
    let mut patterns: Vec<ErrorPattern> = pattern_map
        .into_iter()
        .map(|((category, severity), (occurrences, last_occurred))| ErrorPattern {
            category,
            severity,
            occurrences,
            last_occurred,
        })
        .collect();
    patterns.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));

    // Per-step-kind effectiveness over all attempts that executed the step
    let mut step_map: HashMap<RecoveryStepKind, (u64, u64, u64, u64)> = HashMap::new();
    for record in records {
        for attempt in &record.recovery_attempts {
            let duration_ms =
                (attempt.completed_at - attempt.started_at).num_milliseconds().max(0) as u64;
            for kind in &attempt.steps_executed {
                let entry = step_map.entry(*kind).or_insert((0, 0, 0, 0));
                entry.0 += 1;
                if attempt.success {
                    entry.1 += 1;
                }
                entry.2 += duration_ms;
                if attempt.safety_checks_passed {
                    entry.3 += 1;
                }
            }
        }
    }
    let mut effectiveness: Vec<RecoveryEffectiveness> = step_map
        .into_iter()
        .map(
            |(step_kind, (attempts, successes, total_duration, safe))| RecoveryEffectiveness {
                step_kind,
                attempts,
                successes,
                success_rate: successes as f64 / attempts as f64,
                average_duration_ms: total_duration as f64 / attempts as f64,
                clinical_safety_rate: safe as f64 / attempts as f64,
            },
        )
        .collect();
    effectiveness.sort_by(|a, b| b.attempts.cmp(&a.attempts));

    // Recommendations for frequent high-risk patterns
    let mut recommendations = Vec::new();
    for pattern in &patterns {
        if pattern.occurrences >= 2 && pattern.severity.is_high_risk() {
            let recommendation = recommendation_for(pattern.category).to_string();
            if !recommendations.contains(&recommendation) {
                recommendations.push(recommendation);
            }
        }
    }

    ErrorPatternReport {
        patterns,
        effectiveness,
        recommendations,
        generated_at: Utc::now(),
    }
}
