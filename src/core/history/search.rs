//! Export history search
//!
//! In-memory filter/sort/paginate over the export history. Criteria compose
//! with AND semantics; the quality filter uses the weighted overall score.

use crate::core::history::record::{ExportHistoryRecord, ExportRecordStatus};
use crate::domain::request::{DataCategory, DateRange, ExportFormat};
use serde::{Deserialize, Serialize};

/// Field to sort results by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortField {
    CreatedAt,
    QualityScore,
    FileSize,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Search criteria over the export history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Substring match against export ID, format, and categories
    pub text_query: Option<String>,

    /// Restrict to records created inside this range
    pub created_range: Option<DateRange>,

    /// Restrict to one format
    pub format: Option<ExportFormat>,

    /// Require all of these categories to be present
    pub categories: Vec<DataCategory>,

    /// Restrict to one status
    pub status: Option<ExportRecordStatus>,

    /// Minimum weighted overall quality score
    pub min_quality_score: Option<f64>,

    /// Only records that have been shared
    pub shared_only: bool,

    /// Only clinically significant records
    pub clinically_significant_only: bool,

    /// Sort field
    pub sort_field: SortField,

    /// Sort direction
    pub sort_order: SortOrder,

    /// Records to skip
    pub offset: usize,

    /// Maximum records to return
    pub limit: usize,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            text_query: None,
            created_range: None,
            format: None,
            categories: Vec::new(),
            status: None,
            min_quality_score: None,
            shared_only: false,
            clinically_significant_only: false,
            sort_field: SortField::CreatedAt,
            sort_order: SortOrder::Descending,
            offset: 0,
            limit: 50,
        }
    }
}

impl SearchCriteria {
    fn matches(&self, record: &ExportHistoryRecord) -> bool {
        if let Some(query) = &self.text_query {
            let query = query.to_lowercase();
            let haystack = format!(
                "{} {} {}",
                record.id,
                record.format,
                record
                    .categories
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            )
            .to_lowercase();
            if !haystack.contains(&query) {
                return false;
            }
        }

        if let Some(range) = &self.created_range {
            if !range.contains(record.created_at) {
                return false;
            }
        }

        if let Some(format) = self.format {
            if record.format != format {
                return false;
            }
        }

        if !self
            .categories
            .iter()
            .all(|c| record.categories.contains(c))
        {
            return false;
        }

        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }

        if let Some(min) = self.min_quality_score {
            if record.quality.overall_score() < min {
                return false;
            }
        }

        if self.shared_only && record.status != ExportRecordStatus::Shared {
            return false;
        }

        if self.clinically_significant_only
            && !record.clinical.clinical_significance.is_significant()
        {
            return false;
        }

        true
    }
}

/// One page of search results
#[derive(Debug, Clone)]
pub struct SearchResults {
    /// Matching records in this page
    pub records: Vec<ExportHistoryRecord>,

    /// Total matches before pagination
    pub total_matches: usize,

    /// Offset the page starts at
    pub offset: usize,

    /// Page size limit applied
    pub limit: usize,
}

/// Filter, sort, and paginate records against the criteria
pub fn search_records(
    records: impl IntoIterator<Item = ExportHistoryRecord>,
    criteria: &SearchCriteria,
) -> SearchResults {
    let mut matched: Vec<ExportHistoryRecord> = records
        .into_iter()
        .filter(|r| criteria.matches(r))
        .collect();

    matched.sort_by(|a, b| {
        let ordering = match criteria.sort_field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::QualityScore => a
                .quality
                .overall_score()
                .partial_cmp(&b.quality.overall_score())
                .unwrap_or(std::cmp::Ordering::Equal),
            SortField::FileSize => a.file_size.cmp(&b.file_size),
        };
        match criteria.sort_order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });

    let total_matches = matched.len();
    let records = matched
        .into_iter()
        .skip(criteria.offset)
        .take(criteria.limit)
        .collect();

    SearchResults {
        records,
        total_matches,
        offset: criteria.offset,
        limit: criteria.limit,
    }
}
