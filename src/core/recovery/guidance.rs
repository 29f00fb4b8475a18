//! Therapeutic guidance generation
//!
//! Every recorded error is paired with user-facing guidance written in a
//! therapeutic register: a plain-language message, concrete alternatives,
//! and support resources. Raw technical detail is attached only behind the
//! explicit privacy opt-in.

use crate::core::recovery::classify::{ClinicalErrorType, ErrorCategory, ExportError};
use serde::{Deserialize, Serialize};

/// Tone of a guidance message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuidanceTone {
    /// Warm, steady, for user-actionable problems
    Supportive,
    /// Direct, for problems that need attention now
    Urgent,
    /// Calm, for transient problems the engine will handle
    Reassuring,
}

/// A support resource offered alongside guidance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportResource {
    /// Resource name
    pub name: String,

    /// How to reach it
    pub contact: String,
}

/// User-facing guidance for one error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapeuticGuidance {
    /// Short headline
    pub title: String,

    /// Message tone
    pub tone: GuidanceTone,

    /// Plain-language explanation of what happened and what happens next
    pub message: String,

    /// Concrete things the user can do instead
    pub alternatives: Vec<String>,

    /// Where to get help
    pub support_resources: Vec<SupportResource>,
}

fn default_resources() -> Vec<SupportResource> {
    vec![
        SupportResource {
            name: "In-app support".to_string(),
            contact: "Settings > Help & Support".to_string(),
        },
        SupportResource {
            name: "Care team".to_string(),
            contact: "support@being.example".to_string(),
        },
    ]
}

/// Generate guidance for a classified error
pub fn generate_guidance(
    _error: &ExportError,
    clinical_type: &ClinicalErrorType,
) -> TherapeuticGuidance {
    let tone = if clinical_type.affects_patient_safety {
        GuidanceTone::Urgent
    } else {
        match clinical_type.category {
            ErrorCategory::GenerationFailure | ErrorCategory::SystemError => {
                GuidanceTone::Reassuring
            }
            _ => GuidanceTone::Supportive,
        }
    };

    let (title, message, alternatives) = match clinical_type.category {
        ErrorCategory::DataIntegrity => (
            "We're double-checking your data",
            "Part of your data didn't read back cleanly, so we paused the export to \
             protect it. Your records in the app are safe and unchanged.",
            vec![
                "Try the export again in a few minutes".to_string(),
                "Export a shorter date range".to_string(),
            ],
        ),
        ErrorCategory::PrivacyViolation => (
            "Your consent needs a quick review",
            "We stopped the export because its consent coverage needs your confirmation. \
             Nothing was shared.",
            vec![
                "Review your sharing consents in Settings".to_string(),
                "Re-run the export after confirming consent".to_string(),
            ],
        ),
        ErrorCategory::GenerationFailure => (
            "The export needs another try",
            "The document didn't finish generating. This is usually temporary, and \
             your data is unaffected.",
            vec![
                "Try again now".to_string(),
                "Switch to the summary format, which is lighter".to_string(),
            ],
        ),
        ErrorCategory::SharingError => (
            "The share didn't go through",
            "We couldn't deliver the export to your recipient. Your data stayed \
             private and nothing was exposed.",
            vec![
                "Check the recipient details and try again".to_string(),
                "Download the export and share it yourself".to_string(),
            ],
        ),
        ErrorCategory::ClinicalAccuracy => (
            "We paused this export for a careful look",
            "Something in the generated document didn't line up with your records, \
             so we stopped rather than share something inaccurate. A reviewer will \
             take a look.",
            vec![
                "Wait for the review to finish".to_string(),
                "Export a summary in the meantime".to_string(),
            ],
        ),
        ErrorCategory::SystemError => (
            "A hiccup on our side",
            "Something went wrong in the app itself, not with your data. We're on it.",
            vec![
                "Try again in a few minutes".to_string(),
                "Restart the app if it keeps happening".to_string(),
            ],
        ),
    };

    TherapeuticGuidance {
        title: title.to_string(),
        tone,
        message: message.to_string(),
        alternatives,
        support_resources: default_resources(),
    }
}
