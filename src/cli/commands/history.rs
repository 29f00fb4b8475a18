//! History command implementation
//!
//! Searches the persisted export history.

use crate::adapters::source::InMemoryDataSource;
use crate::config::load_config;
use crate::core::history::record::ExportRecordStatus;
use crate::core::history::SearchCriteria;
use crate::domain::request::ExportFormat;
use crate::engine::ExportEngine;
use clap::Args;
use std::str::FromStr;
use std::sync::Arc;

/// Arguments for the history command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Text query against export IDs, formats, and categories
    #[arg(short, long)]
    pub query: Option<String>,

    /// Restrict to one format (pdf, csv, json, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Restrict to one status (completed, shared, downloaded, expired, purged, archived)
    #[arg(short, long)]
    pub status: Option<String>,

    /// Only shared exports
    #[arg(long)]
    pub shared_only: bool,

    /// Maximum records to show
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,
}

impl HistoryArgs {
    /// Execute the history command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        let format = match &self.format {
            Some(f) => Some(ExportFormat::from_str(f).map_err(anyhow::Error::msg)?),
            None => None,
        };
        let status = match self.status.as_deref() {
            None => None,
            Some("completed") => Some(ExportRecordStatus::Completed),
            Some("shared") => Some(ExportRecordStatus::Shared),
            Some("downloaded") => Some(ExportRecordStatus::Downloaded),
            Some("expired") => Some(ExportRecordStatus::Expired),
            Some("purged") => Some(ExportRecordStatus::Purged),
            Some("archived") => Some(ExportRecordStatus::Archived),
            Some(other) => anyhow::bail!("Unknown status '{other}'"),
        };

        let engine = ExportEngine::new(config, Arc::new(InMemoryDataSource::new()))?;
        engine.load_state().await?;

        let criteria = SearchCriteria {
            text_query: self.query.clone(),
            format,
            status,
            shared_only: self.shared_only,
            limit: self.limit,
            ..SearchCriteria::default()
        };
        let results = engine.history.search_exports(&criteria).await;

        println!(
            "📦 {} matching exports (showing {})",
            results.total_matches,
            results.records.len()
        );
        println!();
        for record in &results.records {
            println!(
                "  {}  {:<9} {:<10} {:>6} records  {:>8} bytes  quality {:.2}  {}",
                record.created_at.format("%Y-%m-%d"),
                record.format.to_string(),
                format!("{:?}", record.status).to_lowercase(),
                record.record_count,
                record.file_size,
                record.quality.overall_score(),
                record.id,
            );
        }

        let analytics = engine.history.generate_analytics().await;
        println!();
        println!(
            "Storage used: {} bytes across {} exports",
            analytics.total_storage_used, analytics.total_exports
        );
        println!(
            "Retention: {} expiring soon, {} overdue",
            analytics.retention.expiring_soon, analytics.retention.overdue
        );

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_args_creation() {
        let args = HistoryArgs {
            query: None,
            format: Some("pdf".to_string()),
            status: None,
            shared_only: false,
            limit: 20,
        };
        let _ = format!("{args:?}");
    }
}
