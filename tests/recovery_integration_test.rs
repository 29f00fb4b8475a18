//! Integration tests for the error-handling and recovery path
//!
//! These tests verify that:
//! - A failing data source routes the workflow into error handling
//! - Errors are classified and paired with therapeutic guidance
//! - User-approved recovery retries the export once the cause clears
//! - Recovery attempts stay within the configured bound

use being_export::adapters::source::InMemoryDataSource;
use being_export::adapters::storage::MemorySnapshotStore;
use being_export::config::BeingConfig;
use being_export::core::history::record::ExportRecordStatus;
use being_export::core::integration::WorkflowStage;
use being_export::core::recovery::ErrorCategory;
use being_export::domain::ids::{ExportId, UserId};
use being_export::domain::request::{
    DataCategory, DateRange, ExportFormat, UnifiedExportRequest,
};
use being_export::engine::ExportEngine;
use std::sync::Arc;
use std::time::Duration;

fn user() -> UserId {
    UserId::new("user-1").unwrap()
}

fn test_config() -> BeingConfig {
    let mut config = BeingConfig::default();
    config.workflow.cleanup_delay_ms = 100;
    config.maintenance.enabled = false;
    config
}

fn csv_request() -> UnifiedExportRequest {
    UnifiedExportRequest::new(
        user(),
        ExportFormat::Csv,
        vec![DataCategory::MoodLog],
        DateRange::last_days(7),
    )
}

async fn wait_for_active_error(engine: &ExportEngine, export_id: &ExportId) {
    for _ in 0..500 {
        if engine.recovery.has_active_error(export_id).await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("error was never recorded");
}

async fn failing_engine() -> (ExportEngine, Arc<InMemoryDataSource>) {
    let source = Arc::new(InMemoryDataSource::new());
    source
        .seed_sample(&user(), &[DataCategory::MoodLog], 5)
        .await;
    source.fail_for(&user()).await;

    let engine = ExportEngine::with_store(
        test_config(),
        source.clone(),
        Arc::new(MemorySnapshotStore::new()),
    );
    engine
        .consent
        .grant_consent(user(), vec![DataCategory::MoodLog])
        .await
        .unwrap();
    (engine, source)
}

#[tokio::test]
async fn test_source_failure_routes_to_error_handling() {
    let (engine, _source) = failing_engine().await;

    let export_id = engine
        .coordinator
        .create_unified_export(csv_request())
        .await
        .expect("validation passes; failure happens during collection");

    wait_for_active_error(&engine, &export_id).await;

    let record = engine.recovery.active_error(&export_id).await.unwrap();
    assert_eq!(record.clinical_type.category, ErrorCategory::DataIntegrity);
    assert!(!record.guidance.message.is_empty());
    assert!(!record.guidance.alternatives.is_empty());

    // No history record was written for the failed export
    assert_eq!(engine.history.export_count().await, 0);
}

#[tokio::test]
async fn test_guidance_hides_technical_detail_by_default() {
    let (engine, _source) = failing_engine().await;

    let export_id = engine
        .coordinator
        .create_unified_export(csv_request())
        .await
        .unwrap();
    wait_for_active_error(&engine, &export_id).await;

    let info = engine
        .recovery
        .detailed_error_info(&export_id, false)
        .await
        .unwrap();
    assert!(info.technical_detail.is_none());
    assert!(info.can_retry);

    let info = engine
        .recovery
        .detailed_error_info(&export_id, true)
        .await
        .unwrap();
    assert!(info.technical_detail.is_some());
}

#[tokio::test]
async fn test_user_recovery_after_cause_clears() {
    let (engine, source) = failing_engine().await;

    let export_id = engine
        .coordinator
        .create_unified_export(csv_request())
        .await
        .unwrap();
    wait_for_active_error(&engine, &export_id).await;

    // Give the automatic in-flight recovery attempt time to finish (it
    // cannot succeed while the source is still failing)
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Cause clears; the user approves a recovery attempt
    source.recover_for(&user()).await;
    let recovered = engine
        .recovery
        .attempt_recovery(&export_id, true)
        .await
        .unwrap();
    assert!(recovered, "recovery should succeed once the source is back");
    assert!(!engine.recovery.has_active_error(&export_id).await);

    // Retry the export; it should now complete and land in history
    engine
        .coordinator
        .retry_failed_export(&export_id)
        .await
        .unwrap();

    for _ in 0..500 {
        if let Some(record) = engine.history.export_record(&export_id).await {
            assert_eq!(record.status, ExportRecordStatus::Completed);
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("retried export never completed");
}

#[tokio::test]
async fn test_recovery_attempts_bounded_across_workflow_failures() {
    let (engine, _source) = failing_engine().await;

    let export_id = engine
        .coordinator
        .create_unified_export(csv_request())
        .await
        .unwrap();
    wait_for_active_error(&engine, &export_id).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let max = engine.config.recovery.max_recovery_attempts;

    // Burn through the remaining attempts while the source still fails
    for _ in 0..max {
        let _ = engine.recovery.attempt_recovery(&export_id, true).await;
    }
    assert_eq!(engine.recovery.attempts_remaining(&export_id).await, 0);

    // Beyond the bound: refused, no new attempt recorded
    assert!(!engine
        .recovery
        .attempt_recovery(&export_id, true)
        .await
        .unwrap());
    let record = engine.recovery.active_error(&export_id).await.unwrap();
    assert_eq!(record.recovery_attempts.len(), max as usize);
}

#[tokio::test]
async fn test_workflow_stage_reflects_error_state() {
    let (engine, _source) = failing_engine().await;

    let export_id = engine
        .coordinator
        .create_unified_export(csv_request())
        .await
        .unwrap();
    wait_for_active_error(&engine, &export_id).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let status = engine
        .coordinator
        .workflow_status(&export_id)
        .await
        .unwrap();
    assert!(matches!(
        status.stage,
        WorkflowStage::ErrorHandling | WorkflowStage::Recovery
    ));
    assert!(status.can_retry);
    assert!(status.requires_user_action);
}
