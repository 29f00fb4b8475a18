//! Export request model
//!
//! The immutable description of what a user asked to export: output format,
//! data categories, date range, purpose, and urgency. A request is identified
//! by a generated [`ExportId`] and never mutated after submission.

use crate::domain::ids::{ExportId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Printable clinical report
    Pdf,
    /// Tabular data for spreadsheets
    Csv,
    /// Structured data for machine consumption
    Json,
    /// Short plain-text overview
    Summary,
}

impl ExportFormat {
    /// File extension for the rendered payload
    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Summary => "txt",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pdf => "pdf",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Summary => "summary",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "summary" => Ok(Self::Summary),
            other => Err(format!(
                "Unknown export format '{other}'. Must be one of: pdf, csv, json, summary"
            )),
        }
    }
}

/// Category of therapeutic data included in an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataCategory {
    /// Daily mood check-ins
    MoodLog,
    /// Guided meditation session records
    MeditationSessions,
    /// CBT/MBCT thought records
    ThoughtRecords,
    /// Crisis episode logs
    CrisisEpisodes,
    /// Standardized assessment scores (PHQ-9, GAD-7)
    AssessmentScores,
    /// Free-form therapy notes
    TherapyNotes,
}

impl DataCategory {
    /// All known categories
    pub fn all() -> [DataCategory; 6] {
        [
            Self::MoodLog,
            Self::MeditationSessions,
            Self::ThoughtRecords,
            Self::CrisisEpisodes,
            Self::AssessmentScores,
            Self::TherapyNotes,
        ]
    }

    /// Categories that carry elevated clinical risk when leaving the app
    pub fn is_high_risk(&self) -> bool {
        matches!(self, Self::CrisisEpisodes | Self::TherapyNotes)
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MoodLog => "mood-log",
            Self::MeditationSessions => "meditation-sessions",
            Self::ThoughtRecords => "thought-records",
            Self::CrisisEpisodes => "crisis-episodes",
            Self::AssessmentScores => "assessment-scores",
            Self::TherapyNotes => "therapy-notes",
        };
        write!(f, "{name}")
    }
}

impl FromStr for DataCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mood-log" => Ok(Self::MoodLog),
            "meditation-sessions" => Ok(Self::MeditationSessions),
            "thought-records" => Ok(Self::ThoughtRecords),
            "crisis-episodes" => Ok(Self::CrisisEpisodes),
            "assessment-scores" => Ok(Self::AssessmentScores),
            "therapy-notes" => Ok(Self::TherapyNotes),
            other => Err(format!("Unknown data category '{other}'")),
        }
    }
}

/// Inclusive date range of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Start of the range (inclusive)
    pub start: DateTime<Utc>,
    /// End of the range (inclusive)
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a range, rejecting start > end
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, String> {
        if start > end {
            return Err(format!(
                "Date range start {start} is after end {end}"
            ));
        }
        Ok(Self { start, end })
    }

    /// Range covering the last `days` days up to now
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - chrono::Duration::days(days),
            end,
        }
    }

    /// Whether a timestamp falls inside the range
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Length of the range in whole days
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Purpose the user stated for the export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportPurpose {
    /// Personal copy for the user's own records
    PersonalRecord,
    /// Handing data to a care provider
    ProviderSharing,
    /// Formal clinical review
    ClinicalReview,
    /// Moving data to another system
    Migration,
}

impl Default for ExportPurpose {
    fn default() -> Self {
        Self::PersonalRecord
    }
}

/// How urgently the export is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportUrgency {
    Routine,
    Priority,
    Immediate,
}

impl Default for ExportUrgency {
    fn default() -> Self {
        Self::Routine
    }
}

/// A unified export request
///
/// Captures user intent for one export. Immutable once submitted; every
/// downstream artifact references it by `export_id`.
///
/// # Examples
///
/// ```
/// use being_export::domain::request::{DateRange, ExportFormat, DataCategory, UnifiedExportRequest};
/// use being_export::domain::ids::UserId;
///
/// let request = UnifiedExportRequest::new(
///     UserId::new("user-1").unwrap(),
///     ExportFormat::Pdf,
///     vec![DataCategory::MoodLog],
///     DateRange::last_days(7),
/// );
/// assert_eq!(request.format, ExportFormat::Pdf);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedExportRequest {
    /// Generated identifier for this export
    pub export_id: ExportId,

    /// User whose data is exported
    pub user_id: UserId,

    /// Output format
    pub format: ExportFormat,

    /// Data categories to include
    pub categories: Vec<DataCategory>,

    /// Date range to cover
    pub date_range: DateRange,

    /// Stated purpose
    pub purpose: ExportPurpose,

    /// Urgency of the request
    pub urgency: ExportUrgency,

    /// Caller's estimate of how many records the range covers
    pub estimated_record_count: u64,

    /// When the request was submitted
    pub requested_at: DateTime<Utc>,
}

impl UnifiedExportRequest {
    /// Creates a request with a generated export ID and default purpose/urgency
    pub fn new(
        user_id: UserId,
        format: ExportFormat,
        categories: Vec<DataCategory>,
        date_range: DateRange,
    ) -> Self {
        Self {
            export_id: ExportId::generate(),
            user_id,
            format,
            categories,
            date_range,
            purpose: ExportPurpose::default(),
            urgency: ExportUrgency::default(),
            estimated_record_count: 0,
            requested_at: Utc::now(),
        }
    }

    /// Sets the purpose
    pub fn with_purpose(mut self, purpose: ExportPurpose) -> Self {
        self.purpose = purpose;
        self
    }

    /// Sets the urgency
    pub fn with_urgency(mut self, urgency: ExportUrgency) -> Self {
        self.urgency = urgency;
        self
    }

    /// Sets the estimated record count
    pub fn with_estimated_records(mut self, count: u64) -> Self {
        self.estimated_record_count = count;
        self
    }

    /// Whether any requested category carries elevated clinical risk
    pub fn includes_high_risk_data(&self) -> bool {
        self.categories.iter().any(DataCategory::is_high_risk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn request(categories: Vec<DataCategory>) -> UnifiedExportRequest {
        UnifiedExportRequest::new(
            UserId::new("user-1").unwrap(),
            ExportFormat::Pdf,
            categories,
            DateRange::last_days(7),
        )
    }

    #[test_case("pdf", ExportFormat::Pdf)]
    #[test_case("csv", ExportFormat::Csv)]
    #[test_case("json", ExportFormat::Json)]
    #[test_case("summary", ExportFormat::Summary)]
    fn test_format_from_str(input: &str, expected: ExportFormat) {
        assert_eq!(ExportFormat::from_str(input).unwrap(), expected);
    }

    #[test]
    fn test_format_from_str_invalid() {
        assert!(ExportFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_category_roundtrip() {
        for category in DataCategory::all() {
            let parsed = DataCategory::from_str(&category.to_string()).unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn test_category_serde_kebab() {
        let json = serde_json::to_string(&DataCategory::MoodLog).unwrap();
        assert_eq!(json, "\"mood-log\"");
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        let now = Utc::now();
        assert!(DateRange::new(now, now - chrono::Duration::days(1)).is_err());
    }

    #[test]
    fn test_date_range_contains() {
        let range = DateRange::last_days(7);
        assert!(range.contains(Utc::now() - chrono::Duration::days(3)));
        assert!(!range.contains(Utc::now() - chrono::Duration::days(10)));
        assert_eq!(range.days(), 7);
    }

    #[test]
    fn test_request_defaults() {
        let req = request(vec![DataCategory::MoodLog]);
        assert_eq!(req.purpose, ExportPurpose::PersonalRecord);
        assert_eq!(req.urgency, ExportUrgency::Routine);
        assert_eq!(req.estimated_record_count, 0);
        assert!(req.export_id.as_str().starts_with("exp-"));
    }

    #[test]
    fn test_high_risk_detection() {
        assert!(!request(vec![DataCategory::MoodLog]).includes_high_risk_data());
        assert!(request(vec![DataCategory::MoodLog, DataCategory::CrisisEpisodes])
            .includes_high_risk_data());
    }

    #[test]
    fn test_request_builder_methods() {
        let req = request(vec![DataCategory::MoodLog])
            .with_purpose(ExportPurpose::ClinicalReview)
            .with_urgency(ExportUrgency::Immediate)
            .with_estimated_records(250);

        assert_eq!(req.purpose, ExportPurpose::ClinicalReview);
        assert_eq!(req.urgency, ExportUrgency::Immediate);
        assert_eq!(req.estimated_record_count, 250);
    }
}
