//! Clinical rating scales
//!
//! Shared scales used to rate the clinical risk of exported data and the
//! clinical weight of errors. These gate automatic recovery and trigger
//! mandatory human review.

use serde::{Deserialize, Serialize};

/// Risk level attached to exported data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskLevel {
    /// Routine therapeutic data
    Low,
    /// Data that warrants clinician awareness
    Moderate,
    /// Data tied to elevated risk episodes
    High,
    /// Data from active crisis episodes
    Critical,
}

impl Default for RiskLevel {
    fn default() -> Self {
        Self::Low
    }
}

/// Clinical impact level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClinicalImpact {
    /// No bearing on clinical interpretation
    Minimal,
    /// May degrade the usefulness of the export
    Moderate,
    /// Likely to mislead a clinical reader
    Significant,
    /// Could directly affect patient safety
    Severe,
}

impl Default for ClinicalImpact {
    fn default() -> Self {
        Self::Minimal
    }
}

/// Severity of an export error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Whether this severity counts as high-risk for pattern analysis
    pub fn is_high_risk(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

/// Clinical significance of an export record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClinicalSignificance {
    /// Everyday self-tracking data
    Routine,
    /// Contains data a clinician would want flagged
    Elevated,
    /// Contains crisis or assessment data
    Significant,
}

impl ClinicalSignificance {
    /// Whether the record is clinically significant for search purposes
    pub fn is_significant(&self) -> bool {
        matches!(self, Self::Elevated | Self::Significant)
    }
}

impl Default for ClinicalSignificance {
    fn default() -> Self {
        Self::Routine
    }
}

/// Status of a clinical review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewStatus {
    /// No review required
    NotRequired,
    /// Review requested, not yet started
    Pending,
    /// Under review by a clinician
    InReview,
    /// Review completed
    Completed,
}

impl Default for ReviewStatus {
    fn default() -> Self {
        Self::NotRequired
    }
}
