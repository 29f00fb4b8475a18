//! Export command implementation
//!
//! Runs one unified export end to end: builds the engine, submits the
//! request, follows workflow progress, and reports the outcome. Listens for
//! shutdown signals and cancels the export cooperatively.

use crate::adapters::source::InMemoryDataSource;
use crate::config::load_config;
use crate::core::integration::WorkflowStage;
use crate::domain::ids::UserId;
use crate::domain::request::{
    DataCategory, DateRange, ExportFormat, ExportPurpose, UnifiedExportRequest,
};
use crate::engine::ExportEngine;
use clap::Args;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// User to export data for
    #[arg(long, default_value = "local-user")]
    pub user: String,

    /// Output format (pdf, csv, json, summary)
    #[arg(short, long, default_value = "pdf")]
    pub format: String,

    /// Comma-separated data categories (e.g. mood-log,thought-records)
    #[arg(short, long, default_value = "mood-log")]
    pub categories: String,

    /// Number of trailing days to cover
    #[arg(short, long, default_value_t = 30)]
    pub days: i64,

    /// Export purpose (personal-record, provider-sharing, clinical-review, migration)
    #[arg(long, default_value = "personal-record")]
    pub purpose: String,

    /// Seed sample records for the user before exporting (local testing aid)
    #[arg(long)]
    pub seed_sample: bool,

    /// Grant consent for the requested categories first (local testing aid)
    #[arg(long)]
    pub grant_consent: bool,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        let user_id = UserId::new(self.user.clone()).map_err(anyhow::Error::msg)?;
        let format = ExportFormat::from_str(&self.format).map_err(anyhow::Error::msg)?;
        let categories = self
            .categories
            .split(',')
            .map(|c| DataCategory::from_str(c.trim()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(anyhow::Error::msg)?;
        let purpose = match self.purpose.as_str() {
            "personal-record" => ExportPurpose::PersonalRecord,
            "provider-sharing" => ExportPurpose::ProviderSharing,
            "clinical-review" => ExportPurpose::ClinicalReview,
            "migration" => ExportPurpose::Migration,
            other => anyhow::bail!("Unknown purpose '{other}'"),
        };

        let source = Arc::new(InMemoryDataSource::new());
        if self.seed_sample {
            source.seed_sample(&user_id, &categories, self.days).await;
            println!("🌱 Seeded {} days of sample data", self.days);
        }

        let engine = ExportEngine::new(config, source)?;
        engine.load_state().await?;
        engine.scheduler.start();

        if self.grant_consent {
            engine
                .consent
                .grant_consent(user_id.clone(), categories.clone())
                .await?;
            println!("📋 Consent granted for {} categories", categories.len());
        }

        let request = UnifiedExportRequest::new(
            user_id,
            format,
            categories,
            DateRange::last_days(self.days),
        )
        .with_purpose(purpose);

        println!("🚀 Starting export {}", request.export_id);
        let export_id = match engine.coordinator.create_unified_export(request).await {
            Ok(id) => id,
            Err(e) => {
                println!("❌ Export rejected: {e}");
                engine.shutdown().await?;
                return Ok(1);
            }
        };

        // Follow workflow progress until it completes, fails, or is
        // interrupted.
        let mut last_reported = 0u8;
        let exit_code = loop {
            if *shutdown.borrow() {
                println!("\n⚠️  Cancelling export...");
                let _ = engine.coordinator.cancel_export(&export_id).await;
                break 130;
            }

            let Some(status) = engine.coordinator.workflow_status(&export_id).await else {
                // Cleaned up after completion
                break 0;
            };

            if status.overall_progress > last_reported {
                last_reported = status.overall_progress;
                println!(
                    "  [{:>3}%] {}",
                    status.overall_progress, status.stage
                );
            }

            match status.stage {
                WorkflowStage::Completion => {
                    println!("✅ Export completed");
                    if let Some(record) = engine.history.export_record(&export_id).await {
                        println!();
                        println!("Export Summary:");
                        println!("  Records: {}", record.record_count);
                        println!("  Size: {} bytes", record.file_size);
                        println!(
                            "  Quality Score: {:.2}",
                            record.quality.overall_score()
                        );
                        if let Some(checksum) = &record.checksum {
                            println!("  Checksum: {checksum}");
                        }
                    }
                    break 0;
                }
                WorkflowStage::ErrorHandling if status.requires_user_action => {
                    println!("❌ Export failed");
                    if let Some(info) = engine
                        .recovery
                        .detailed_error_info(
                            &export_id,
                            engine.consent.privacy_settings().await.show_technical_details,
                        )
                        .await
                    {
                        println!();
                        println!("{}", info.guidance.title);
                        println!("  {}", info.guidance.message);
                        for alternative in &info.guidance.alternatives {
                            println!("  • {alternative}");
                        }
                        if let Some(detail) = &info.technical_detail {
                            println!("  (technical: {detail})");
                        }
                    }
                    break 1;
                }
                _ => {}
            }

            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_millis(100)) => {}
                _ = shutdown.changed() => {}
            }
        };

        engine.shutdown().await?;
        Ok(exit_code)
    }
}
