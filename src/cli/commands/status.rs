//! Status command implementation
//!
//! Renders the clinical export dashboard from persisted state.

use crate::adapters::source::InMemoryDataSource;
use crate::config::load_config;
use crate::engine::ExportEngine;
use clap::Args;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        let engine = ExportEngine::new(config, Arc::new(InMemoryDataSource::new()))?;
        engine.load_state().await?;

        let summary = engine.coordinator.refresh_dashboard().await;

        println!("📊 Being Export Status");
        println!();
        println!("Exports:");
        println!("  Completed:  {}", summary.status_counts.completed);
        println!("  Shared:     {}", summary.status_counts.shared);
        println!("  Downloaded: {}", summary.status_counts.downloaded);
        println!("  Expired:    {}", summary.status_counts.expired);
        println!("  Purged:     {}", summary.status_counts.purged);
        println!("  Archived:   {}", summary.status_counts.archived);
        println!();
        println!("Active workflows: {}", summary.active_workflows);
        println!(
            "Average completion time: {:.0} ms",
            summary.average_completion_time_ms
        );
        println!("Success rate: {:.1}%", summary.success_rate);
        if let Some(format) = summary.most_used_format {
            println!("Most used format: {format}");
        }
        println!();
        println!("System health: {:?}", summary.system_health);
        println!(
            "Pending clinical reviews: {}",
            summary.compliance.pending_clinical_reviews
        );
        println!(
            "Cross-store consistency: {}",
            if summary.compliance.cross_store_consistent {
                "ok"
            } else {
                "violated"
            }
        );

        if !summary.recent_activity.is_empty() {
            println!();
            println!("Recent activity:");
            for entry in &summary.recent_activity {
                println!(
                    "  {} {:?} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.event_type,
                    entry.export_id
                );
            }
        }

        Ok(0)
    }
}
