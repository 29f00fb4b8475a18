//! Export history analytics
//!
//! Aggregations over the export history: totals, quality, formats, trends,
//! sharing patterns, per-category usage, performance, and retention
//! compliance. All computed in memory against the live record set.

use crate::core::history::record::ExportHistoryRecord;
use crate::core::history::sharing::{RecipientType, SharingHistoryRecord};
use crate::domain::ids::ExportId;
use crate::domain::request::{DataCategory, ExportFormat};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Exports recorded on one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendBucket {
    /// The day
    pub date: NaiveDate,
    /// Exports created that day
    pub exports: u64,
}

/// Shares grouped by recipient kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharingPattern {
    /// Recipient kind
    pub recipient_type: RecipientType,
    /// Number of shares to this kind
    pub shares: u64,
}

/// Usage of one data category across the history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryUsage {
    /// The category
    pub category: DataCategory,
    /// Exports including the category
    pub exports: u64,
    /// Records attributed to exports including the category
    pub records: u64,
    /// Bytes attributed to exports including the category
    pub bytes: u64,
}

/// Aggregate job timing across the history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceAggregate {
    /// Mean job duration
    pub average_duration_ms: f64,
    /// Mean throughput
    pub average_records_per_second: f64,
    /// Total records across all exports
    pub total_records: u64,
}

/// Retention compliance counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionCompliance {
    /// Records expiring within the configured window
    pub expiring_soon: u64,
    /// Records already past their expiration
    pub overdue: u64,
    /// Records with auto-delete enabled
    pub auto_delete_enabled: u64,
}

/// Full analytics report over the export history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryAnalytics {
    /// Total records in the history
    pub total_exports: u64,

    /// Bytes of payload tracked by the storage counter
    pub total_storage_used: u64,

    /// Mean weighted quality score
    pub average_quality_score: f64,

    /// Format appearing most often
    pub most_used_format: Option<ExportFormat>,

    /// Export with the highest access count
    pub most_accessed_export: Option<ExportId>,

    /// Daily export counts over the trailing 30 days
    pub daily_trend: Vec<TrendBucket>,

    /// Shares grouped by recipient kind
    pub sharing_patterns: Vec<SharingPattern>,

    /// Per-category usage
    pub category_usage: Vec<CategoryUsage>,

    /// Aggregate job timing
    pub performance: PerformanceAggregate,

    /// Retention compliance counters
    pub retention: RetentionCompliance,

    /// When the report was generated
    pub generated_at: DateTime<Utc>,
}

/// Compute analytics over the current history state
pub fn generate_analytics(
    records: &[ExportHistoryRecord],
    sharing: &[SharingHistoryRecord],
    total_storage_used: u64,
    expiring_soon_days: i64,
) -> HistoryAnalytics {
    let now = Utc::now();
    let total_exports = records.len() as u64;

    let average_quality_score = if records.is_empty() {
        0.0
    } else {
        records
            .iter()
            .map(|r| r.quality.overall_score())
            .sum::<f64>()
            / records.len() as f64
    };

    let mut format_counts: HashMap<ExportFormat, u64> = HashMap::new();
    for record in records {
        *format_counts.entry(record.format).or_default() += 1;
    }
    let most_used_format = format_counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(format, _)| format);

    let most_accessed_export = records
        .iter()
        .filter(|r| r.access_count > 0)
        .max_by_key(|r| r.access_count)
        .map(|r| r.id.clone());

    // 30 trailing daily buckets, oldest first
    let mut daily_trend = Vec::with_capacity(30);
    for day_offset in (0..30).rev() {
        let date = (now - Duration::days(day_offset)).date_naive();
        let exports = records
            .iter()
            .filter(|r| r.created_at.date_naive() == date)
            .count() as u64;
        daily_trend.push(TrendBucket { date, exports });
    }

    let mut share_counts: HashMap<RecipientType, u64> = HashMap::new();
    for share in sharing {
        *share_counts
            .entry(share.recipient.recipient_type)
            .or_default() += 1;
    }
    let mut sharing_patterns: Vec<SharingPattern> = share_counts
        .into_iter()
        .map(|(recipient_type, shares)| SharingPattern {
            recipient_type,
            shares,
        })
        .collect();
    sharing_patterns.sort_by(|a, b| b.shares.cmp(&a.shares));

    let mut category_usage: Vec<CategoryUsage> = DataCategory::all()
        .into_iter()
        .filter_map(|category| {
            let matching: Vec<&ExportHistoryRecord> = records
                .iter()
                .filter(|r| r.categories.contains(&category))
                .collect();
            if matching.is_empty() {
                return None;
            }
            Some(CategoryUsage {
                category,
                exports: matching.len() as u64,
                records: matching.iter().map(|r| r.record_count).sum(),
                bytes: matching.iter().map(|r| r.file_size).sum(),
            })
        })
        .collect();
    category_usage.sort_by(|a, b| b.exports.cmp(&a.exports));

    let performance = if records.is_empty() {
        PerformanceAggregate {
            average_duration_ms: 0.0,
            average_records_per_second: 0.0,
            total_records: 0,
        }
    } else {
        PerformanceAggregate {
            average_duration_ms: records
                .iter()
                .map(|r| r.performance.duration_ms as f64)
                .sum::<f64>()
                / records.len() as f64,
            average_records_per_second: records
                .iter()
                .map(|r| r.performance.records_per_second)
                .sum::<f64>()
                / records.len() as f64,
            total_records: records.iter().map(|r| r.record_count).sum(),
        }
    };

    let retention = RetentionCompliance {
        expiring_soon: records
            .iter()
            .filter(|r| r.expires_within(now, expiring_soon_days))
            .count() as u64,
        overdue: records.iter().filter(|r| r.is_expired(now)).count() as u64,
        auto_delete_enabled: records.iter().filter(|r| r.retention.auto_delete).count() as u64,
    };

    HistoryAnalytics {
        total_exports,
        total_storage_used,
        average_quality_score,
        most_used_format,
        most_accessed_export,
        daily_trend,
        sharing_patterns,
        category_usage,
        performance,
        retention,
        generated_at: now,
    }
}
