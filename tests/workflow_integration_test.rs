//! Integration tests for the end-to-end export workflow
//!
//! These tests verify that:
//! - A valid unified export runs to completion and lands in history
//! - Progress is monotonic and derived from the stage weights
//! - Validation failures reject synchronously without creating workflows
//! - The concurrent workflow cap is enforced
//! - Finished workflows leave the active map after the cleanup delay

use being_export::adapters::source::InMemoryDataSource;
use being_export::adapters::storage::MemorySnapshotStore;
use being_export::config::BeingConfig;
use being_export::core::history::record::ExportRecordStatus;
use being_export::core::integration::WorkflowStage;
use being_export::domain::ids::UserId;
use being_export::domain::request::{
    DataCategory, DateRange, ExportFormat, UnifiedExportRequest,
};
use being_export::domain::BeingError;
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

async fn engine_with_data() -> (ExportEngine, Arc<InMemoryDataSource>) {
    let source = Arc::new(InMemoryDataSource::new());
    source
        .seed_sample(&user(), &[DataCategory::MoodLog], 7)
        .await;
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

fn pdf_request() -> UnifiedExportRequest {
    UnifiedExportRequest::new(
        user(),
        ExportFormat::Pdf,
        vec![DataCategory::MoodLog],
        DateRange::last_days(7),
    )
}

/// Poll until the workflow reaches a stage, panicking after the timeout
async fn wait_for_stage(
    engine: &ExportEngine,
    export_id: &being_export::domain::ids::ExportId,
    target: WorkflowStage,
) {
    for _ in 0..500 {
        if let Some(status) = engine.coordinator.workflow_status(export_id).await {
            if status.stage == target {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("workflow never reached {target}");
}

#[tokio::test]
async fn test_end_to_end_export_completes() {
    let (engine, _source) = engine_with_data().await;

    let export_id = engine
        .coordinator
        .create_unified_export(pdf_request())
        .await
        .expect("export accepted");

    // Initial status: stage 1 at 10% overall
    let status = engine
        .coordinator
        .workflow_status(&export_id)
        .await
        .expect("workflow created");
    assert!(status.overall_progress >= 10);

    wait_for_stage(&engine, &export_id, WorkflowStage::Completion).await;

    let status = engine
        .coordinator
        .workflow_status(&export_id)
        .await
        .expect("workflow still present before cleanup");
    assert_eq!(status.overall_progress, 100);
    assert!(!status.can_cancel);
    assert!(!status.can_retry);

    // Exactly one history record, completed
    let records = engine.history.all_records().await;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.id, export_id);
    assert_eq!(record.status, ExportRecordStatus::Completed);
    assert_eq!(record.record_count, 7);
    assert!(record.file_size > 0);
    assert!(record.checksum.is_some());

    // After the cleanup delay the workflow leaves the active map
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(engine.coordinator.workflow_status(&export_id).await.is_none());
    assert_eq!(engine.coordinator.active_workflow_count().await, 0);
}

#[tokio::test]
async fn test_progress_is_monotonic() {
    let (engine, _source) = engine_with_data().await;

    let export_id = engine
        .coordinator
        .create_unified_export(pdf_request())
        .await
        .unwrap();

    let mut last = 0u8;
    for _ in 0..500 {
        let Some(status) = engine.coordinator.workflow_status(&export_id).await else {
            break;
        };
        assert!(
            status.overall_progress >= last,
            "progress went backwards: {} -> {}",
            last,
            status.overall_progress
        );
        last = status.overall_progress;
        if status.stage == WorkflowStage::Completion {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(last, 100);
}

#[tokio::test]
async fn test_validation_failure_rejects_synchronously() {
    let source = Arc::new(InMemoryDataSource::new());
    let engine = ExportEngine::with_store(
        test_config(),
        source,
        Arc::new(MemorySnapshotStore::new()),
    );
    // No consent granted

    let result = engine
        .coordinator
        .create_unified_export(pdf_request())
        .await;

    assert!(matches!(result, Err(BeingError::Validation(_))));
    assert_eq!(engine.coordinator.active_workflow_count().await, 0);
    assert!(engine
        .coordinator
        .last_operation_error()
        .await
        .expect("error recorded")
        .contains("consent"));
    assert_eq!(engine.history.export_count().await, 0);
}

#[tokio::test]
async fn test_workflow_limit_enforced() {
    let source = Arc::new(InMemoryDataSource::new());
    source
        .seed_sample(&user(), &[DataCategory::MoodLog], 3)
        .await;

    let mut config = test_config();
    config.workflow.max_concurrent_workflows = 1;
    // Long cleanup so the first workflow stays active
    config.workflow.cleanup_delay_ms = 60_000;

    let engine = ExportEngine::with_store(config, source, Arc::new(MemorySnapshotStore::new()));
    engine
        .consent
        .grant_consent(user(), vec![DataCategory::MoodLog])
        .await
        .unwrap();

    engine
        .coordinator
        .create_unified_export(pdf_request())
        .await
        .expect("first export accepted");

    let second = engine
        .coordinator
        .create_unified_export(pdf_request())
        .await;
    assert!(matches!(second, Err(BeingError::WorkflowLimit(_))));
}

#[tokio::test]
async fn test_cancellation_flags_workflow() {
    let (engine, _source) = engine_with_data().await;

    let export_id = engine
        .coordinator
        .create_unified_export(pdf_request())
        .await
        .unwrap();

    // Cancellation races completion with the in-memory source; accept either
    match engine.coordinator.cancel_export(&export_id).await {
        Ok(()) => {
            let status = engine
                .coordinator
                .workflow_status(&export_id)
                .await
                .expect("workflow present");
            assert!(!status.can_cancel);
            assert!(status.can_retry);
        }
        Err(_) => {
            // Job already finished; workflow completes normally
            wait_for_stage(&engine, &export_id, WorkflowStage::Completion).await;
        }
    }
}

#[tokio::test]
async fn test_clinical_validation_blocks_high_risk_migration() {
    let source = Arc::new(InMemoryDataSource::new());
    source
        .seed_sample(&user(), &[DataCategory::CrisisEpisodes], 3)
        .await;
    let engine = ExportEngine::with_store(
        test_config(),
        source,
        Arc::new(MemorySnapshotStore::new()),
    );
    engine
        .consent
        .grant_consent(user(), vec![DataCategory::CrisisEpisodes])
        .await
        .unwrap();

    let request = UnifiedExportRequest::new(
        user(),
        ExportFormat::Json,
        vec![DataCategory::CrisisEpisodes],
        DateRange::last_days(7),
    )
    .with_purpose(being_export::domain::request::ExportPurpose::Migration);
    let export_id = engine
        .coordinator
        .create_unified_export(request)
        .await
        .expect("request passes consent validation");

    // The clinical-validation stage rejects it; the workflow lands in error
    // handling with a recorded error
    wait_for_stage(&engine, &export_id, WorkflowStage::ErrorHandling).await;
    assert!(engine.recovery.has_active_error(&export_id).await);
    assert_eq!(engine.history.export_count().await, 0);

    let status = engine
        .coordinator
        .workflow_status(&export_id)
        .await
        .unwrap();
    assert!(status.can_retry);
    assert!(status.requires_user_action);
}

#[tokio::test]
async fn test_disabled_clinical_validation_skips_stage() {
    let source = Arc::new(InMemoryDataSource::new());
    source
        .seed_sample(&user(), &[DataCategory::MoodLog], 3)
        .await;

    let mut config = test_config();
    config.workflow.enable_clinical_validation = false;
    let engine = ExportEngine::with_store(config, source, Arc::new(MemorySnapshotStore::new()));
    engine
        .consent
        .grant_consent(user(), vec![DataCategory::MoodLog])
        .await
        .unwrap();

    let export_id = engine
        .coordinator
        .create_unified_export(pdf_request())
        .await
        .unwrap();
    wait_for_stage(&engine, &export_id, WorkflowStage::Completion).await;

    let record = engine.history.export_record(&export_id).await.unwrap();
    assert!(!record.config_snapshot.clinical_validation_enabled);
}
