//! Export processor
//!
//! Owns the job execution lifecycle: starting, cancelling, and retrying
//! exports, and maintaining the map of active operations. Progress and
//! completion are published on watch channels the coordinator awaits, so
//! nothing busy-polls and cancellation is observed at the next phase
//! boundary.

use crate::adapters::source::ClinicalDataSource;
use crate::config::ProcessConfig;
use crate::core::process::job::{compute_checksum, ExportResult, PerformanceMetrics};
use crate::core::process::render;
use crate::domain::ids::ExportId;
use crate::domain::request::{ExportFormat, UnifiedExportRequest};
use crate::domain::{BeingError, ExportErrorCode, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// Status of an active export operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    /// Job is executing
    Running,
    /// Job finished and produced an [`ExportResult`]
    Completed,
    /// Job failed; see [`OperationFailure`]
    Failed,
    /// Job was cancelled cooperatively
    Cancelled,
}

/// Point-in-time view of an operation published on its watch channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSnapshot {
    /// Current status
    pub status: OperationStatus,
    /// Job progress, 0-100
    pub progress: u8,
}

/// Why an operation failed
#[derive(Debug, Clone)]
pub struct OperationFailure {
    /// Classified failure code
    pub code: ExportErrorCode,
    /// Human-readable detail
    pub message: String,
}

struct ActiveOperation {
    request: UnifiedExportRequest,
    status: OperationStatus,
    progress: u8,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    attempts: u32,
    reduced_scope: bool,
    fallback_format: Option<ExportFormat>,
    result: Option<ExportResult>,
    failure: Option<OperationFailure>,
    cancel_requested: bool,
    snapshot_tx: watch::Sender<OperationSnapshot>,
}

impl ActiveOperation {
    fn publish(&self) {
        let _ = self.snapshot_tx.send(OperationSnapshot {
            status: self.status,
            progress: self.progress,
        });
    }
}

struct ProcessorInner {
    ops: RwLock<HashMap<ExportId, ActiveOperation>>,
    source: Arc<dyn ClinicalDataSource>,
    config: ProcessConfig,
    dry_run: bool,
}

/// Export job executor
///
/// Cheap to clone; all clones share the same operation table.
#[derive(Clone)]
pub struct ExportProcessor {
    inner: Arc<ProcessorInner>,
}

impl ExportProcessor {
    /// Create a processor over a data source
    pub fn new(source: Arc<dyn ClinicalDataSource>, config: ProcessConfig, dry_run: bool) -> Self {
        Self {
            inner: Arc::new(ProcessorInner {
                ops: RwLock::new(HashMap::new()),
                source,
                config,
                dry_run,
            }),
        }
    }

    /// Start an export job for a validated request
    ///
    /// # Errors
    ///
    /// Returns an error if an operation for this export already exists.
    pub async fn start_export(&self, request: UnifiedExportRequest) -> Result<()> {
        let export_id = request.export_id.clone();
        {
            let mut ops = self.inner.ops.write().await;
            if ops.contains_key(&export_id) {
                return Err(BeingError::Process(format!(
                    "Operation already exists for export {export_id}"
                )));
            }

            let (snapshot_tx, _) = watch::channel(OperationSnapshot {
                status: OperationStatus::Running,
                progress: 0,
            });
            ops.insert(
                export_id.clone(),
                ActiveOperation {
                    request,
                    status: OperationStatus::Running,
                    progress: 0,
                    started_at: Utc::now(),
                    completed_at: None,
                    attempts: 1,
                    reduced_scope: false,
                    fallback_format: None,
                    result: None,
                    failure: None,
                    cancel_requested: false,
                    snapshot_tx,
                },
            );
        }

        tracing::info!(export_id = %export_id, "Export job started");

        let processor = self.clone();
        tokio::spawn(async move {
            processor.run_job(export_id).await;
        });

        Ok(())
    }

    /// Cancel a running export cooperatively
    ///
    /// The job observes the cancellation at its next phase boundary; the
    /// operation is marked cancelled immediately.
    pub async fn cancel_export(&self, export_id: &ExportId) -> Result<()> {
        let mut ops = self.inner.ops.write().await;
        let op = ops
            .get_mut(export_id)
            .ok_or_else(|| BeingError::NotFound(format!("Operation {export_id}")))?;

        if op.status != OperationStatus::Running {
            return Err(BeingError::Process(format!(
                "Export {export_id} is not running"
            )));
        }

        op.cancel_requested = true;
        op.status = OperationStatus::Cancelled;
        op.completed_at = Some(Utc::now());
        op.publish();

        tracing::info!(export_id = %export_id, "Export job cancelled");
        Ok(())
    }

    /// Restart a failed or cancelled export
    pub async fn retry_export(&self, export_id: &ExportId) -> Result<()> {
        {
            let mut ops = self.inner.ops.write().await;
            let op = ops
                .get_mut(export_id)
                .ok_or_else(|| BeingError::NotFound(format!("Operation {export_id}")))?;

            if !matches!(
                op.status,
                OperationStatus::Failed | OperationStatus::Cancelled
            ) {
                return Err(BeingError::Process(format!(
                    "Export {export_id} is not in a retryable state"
                )));
            }

            op.attempts += 1;
            op.status = OperationStatus::Running;
            op.progress = 0;
            op.started_at = Utc::now();
            op.completed_at = None;
            op.result = None;
            op.failure = None;
            op.cancel_requested = false;
            op.publish();

            tracing::info!(export_id = %export_id, attempt = op.attempts, "Export job retried");
        }

        let processor = self.clone();
        let export_id = export_id.clone();
        tokio::spawn(async move {
            processor.run_job(export_id).await;
        });

        Ok(())
    }

    /// Subscribe to the operation's status/progress channel
    pub async fn subscribe(&self, export_id: &ExportId) -> Option<watch::Receiver<OperationSnapshot>> {
        self.inner
            .ops
            .read()
            .await
            .get(export_id)
            .map(|op| op.snapshot_tx.subscribe())
    }

    /// Job progress, 0-100
    pub async fn progress(&self, export_id: &ExportId) -> Option<u8> {
        self.inner.ops.read().await.get(export_id).map(|op| op.progress)
    }

    /// Current operation status
    pub async fn status(&self, export_id: &ExportId) -> Option<OperationStatus> {
        self.inner.ops.read().await.get(export_id).map(|op| op.status)
    }

    /// Failure detail for a failed operation
    pub async fn failure(&self, export_id: &ExportId) -> Option<OperationFailure> {
        self.inner
            .ops
            .read()
            .await
            .get(export_id)
            .and_then(|op| op.failure.clone())
    }

    /// Consume the result of a completed operation
    pub async fn take_result(&self, export_id: &ExportId) -> Option<ExportResult> {
        self.inner
            .ops
            .write()
            .await
            .get_mut(export_id)
            .and_then(|op| op.result.take())
    }

    /// The request the operation was started with
    pub async fn request(&self, export_id: &ExportId) -> Option<UnifiedExportRequest> {
        self.inner
            .ops
            .read()
            .await
            .get(export_id)
            .map(|op| op.request.clone())
    }

    /// Number of retry attempts made so far (1 for the first run)
    pub async fn attempts(&self, export_id: &ExportId) -> Option<u32> {
        self.inner.ops.read().await.get(export_id).map(|op| op.attempts)
    }

    /// Remove a finished operation from the table
    pub async fn remove_operation(&self, export_id: &ExportId) {
        self.inner.ops.write().await.remove(export_id);
    }

    /// Count of currently running operations
    pub async fn running_count(&self) -> usize {
        self.inner
            .ops
            .read()
            .await
            .values()
            .filter(|op| op.status == OperationStatus::Running)
            .count()
    }

    /// Flag the next retry of this export to collect categories
    /// independently, skipping ones whose fetch fails
    pub async fn set_reduced_scope(&self, export_id: &ExportId) -> bool {
        match self.inner.ops.write().await.get_mut(export_id) {
            Some(op) => {
                op.reduced_scope = true;
                true
            }
            None => false,
        }
    }

    /// Override the render format for the next retry of this export
    pub async fn set_fallback_format(&self, export_id: &ExportId, format: ExportFormat) -> bool {
        match self.inner.ops.write().await.get_mut(export_id) {
            Some(op) => {
                op.fallback_format = Some(format);
                true
            }
            None => false,
        }
    }

    /// Whether the operation exists and is in a retryable state
    pub async fn is_retryable(&self, export_id: &ExportId) -> bool {
        matches!(
            self.status(export_id).await,
            Some(OperationStatus::Failed | OperationStatus::Cancelled)
        )
    }

    /// Re-fetch the operation's records to confirm the source is readable
    pub async fn verify_source(&self, export_id: &ExportId) -> Result<bool> {
        let request = match self.inner.ops.read().await.get(export_id) {
            Some(op) => op.request.clone(),
            None => return Ok(false),
        };

        match self
            .inner
            .source
            .fetch_records(&request.user_id, &request.categories, &request.date_range)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(export_id = %export_id, error = %e, "Source verification failed");
                Ok(false)
            }
        }
    }

    async fn run_job(&self, export_id: ExportId) {
        let (request, reduced_scope, fallback_format) =
            match self.inner.ops.read().await.get(&export_id) {
                Some(op) => (
                    op.request.clone(),
                    op.reduced_scope,
                    op.fallback_format,
                ),
                None => return,
            };

        let started_at = Utc::now();

        // Phase 1: collection (progress 0-60)
        let records = if reduced_scope {
            let mut collected = Vec::new();
            let mut failed_categories = 0usize;
            for category in &request.categories {
                if self.cancelled(&export_id).await {
                    return;
                }
                match self
                    .inner
                    .source
                    .fetch_records(&request.user_id, &[*category], &request.date_range)
                    .await
                {
                    Ok(mut records) => collected.append(&mut records),
                    Err(e) => {
                        failed_categories += 1;
                        tracing::warn!(
                            export_id = %export_id,
                            category = %category,
                            error = %e,
                            "Skipping category after source failure (reduced scope)"
                        );
                    }
                }
            }
            if failed_categories == request.categories.len() && !request.categories.is_empty() {
                self.fail_op(
                    &export_id,
                    ExportErrorCode::DataIncomplete,
                    "All categories failed to collect under reduced scope",
                )
                .await;
                return;
            }
            collected
        } else {
            match self
                .inner
                .source
                .fetch_records(&request.user_id, &request.categories, &request.date_range)
                .await
            {
                Ok(records) => records,
                Err(e) => {
                    self.fail_op(
                        &export_id,
                        ExportErrorCode::DataIncomplete,
                        format!("Data collection failed: {e}"),
                    )
                    .await;
                    return;
                }
            }
        };

        // Drive collection progress in batch-sized increments so the
        // workflow can follow along.
        let batch_size = self.inner.config.batch_size.max(1);
        let batches = records.len().div_ceil(batch_size).max(1);
        for batch in 0..batches {
            if self.cancelled(&export_id).await {
                return;
            }
            let progress = (((batch + 1) * 60) / batches) as u8;
            self.update_progress(&export_id, progress).await;
            tokio::task::yield_now().await;
        }

        if self.cancelled(&export_id).await {
            return;
        }

        // Phase 2: render (progress 60-90)
        let format = fallback_format.unwrap_or(request.format);
        let payload = match render::render(format, &request, &records) {
            Ok(payload) => payload,
            Err(e) => {
                self.fail_op(
                    &export_id,
                    ExportErrorCode::RenderFailed,
                    format!("Rendering failed: {e}"),
                )
                .await;
                return;
            }
        };
        self.update_progress(&export_id, 90).await;

        if self.cancelled(&export_id).await {
            return;
        }

        // Phase 3: finalize (progress 90-100)
        let checksum = if self.inner.config.enable_checksum {
            Some(compute_checksum(&payload))
        } else {
            None
        };

        let payload = if self.inner.dry_run { Vec::new() } else { payload };
        let completed_at = Utc::now();
        let record_count = records.len() as u64;
        let result = ExportResult {
            export_id: export_id.clone(),
            format,
            file_size: payload.len() as u64,
            payload,
            record_count,
            checksum,
            performance: PerformanceMetrics::from_run(started_at, completed_at, record_count),
        };

        self.complete_op(&export_id, result).await;
    }

    async fn cancelled(&self, export_id: &ExportId) -> bool {
        match self.inner.ops.read().await.get(export_id) {
            Some(op) => op.cancel_requested || op.status == OperationStatus::Cancelled,
            None => true,
        }
    }

    async fn update_progress(&self, export_id: &ExportId, progress: u8) {
        let mut ops = self.inner.ops.write().await;
        if let Some(op) = ops.get_mut(export_id) {
            if op.status == OperationStatus::Running && progress > op.progress {
                op.progress = progress.min(100);
                op.publish();
            }
        }
    }

    async fn fail_op(
        &self,
        export_id: &ExportId,
        code: ExportErrorCode,
        message: impl Into<String>,
    ) {
        let message = message.into();
        let mut ops = self.inner.ops.write().await;
        if let Some(op) = ops.get_mut(export_id) {
            if op.status != OperationStatus::Running {
                return;
            }
            op.status = OperationStatus::Failed;
            op.completed_at = Some(Utc::now());
            op.failure = Some(OperationFailure {
                code,
                message: message.clone(),
            });
            op.publish();
        }
        tracing::error!(export_id = %export_id, code = %code, message = %message, "Export job failed");
    }

    async fn complete_op(&self, export_id: &ExportId, result: ExportResult) {
        let mut ops = self.inner.ops.write().await;
        if let Some(op) = ops.get_mut(export_id) {
            if op.status != OperationStatus::Running {
                return;
            }
            op.status = OperationStatus::Completed;
            op.progress = 100;
            op.completed_at = Some(Utc::now());
            tracing::info!(
                export_id = %export_id,
                records = result.record_count,
                bytes = result.file_size,
                duration_ms = result.performance.duration_ms,
                "Export job completed"
            );
            op.result = Some(result);
            op.publish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::source::InMemoryDataSource;
    use crate::domain::ids::UserId;
    use crate::domain::request::{DataCategory, DateRange};
    use std::time::Duration;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    async fn seeded_processor() -> (ExportProcessor, Arc<InMemoryDataSource>) {
        let source = Arc::new(InMemoryDataSource::new());
        source
            .seed_sample(&user(), &[DataCategory::MoodLog], 5)
            .await;
        let processor = ExportProcessor::new(source.clone(), ProcessConfig::default(), false);
        (processor, source)
    }

    fn request() -> UnifiedExportRequest {
        UnifiedExportRequest::new(
            user(),
            ExportFormat::Csv,
            vec![DataCategory::MoodLog],
            DateRange::last_days(7),
        )
    }

    async fn wait_terminal(processor: &ExportProcessor, id: &ExportId) -> OperationStatus {
        let mut rx = processor.subscribe(id).await.expect("operation exists");
        loop {
            let snap = *rx.borrow_and_update();
            if snap.status != OperationStatus::Running {
                return snap.status;
            }
            if tokio::time::timeout(Duration::from_secs(5), rx.changed())
                .await
                .is_err()
            {
                panic!("job did not reach a terminal state");
            }
        }
    }

    #[tokio::test]
    async fn test_job_completes_with_result() {
        let (processor, _source) = seeded_processor().await;
        let req = request();
        let id = req.export_id.clone();

        processor.start_export(req).await.unwrap();
        let status = wait_terminal(&processor, &id).await;

        assert_eq!(status, OperationStatus::Completed);
        let result = processor.take_result(&id).await.unwrap();
        assert_eq!(result.record_count, 5);
        assert!(result.file_size > 0);
        assert!(result.checksum.is_some());
        // Result is consumed
        assert!(processor.take_result(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_start_rejected() {
        let (processor, _source) = seeded_processor().await;
        let req = request();

        processor.start_export(req.clone()).await.unwrap();
        assert!(processor.start_export(req).await.is_err());
    }

    #[tokio::test]
    async fn test_job_fails_on_source_error() {
        let source = Arc::new(InMemoryDataSource::new());
        source.fail_for(&user()).await;
        let processor = ExportProcessor::new(source, ProcessConfig::default(), false);

        let req = request();
        let id = req.export_id.clone();
        processor.start_export(req).await.unwrap();

        let status = wait_terminal(&processor, &id).await;
        assert_eq!(status, OperationStatus::Failed);

        let failure = processor.failure(&id).await.unwrap();
        assert_eq!(failure.code, ExportErrorCode::DataIncomplete);
    }

    #[tokio::test]
    async fn test_retry_after_failure_succeeds() {
        let source = Arc::new(InMemoryDataSource::new());
        source
            .seed_sample(&user(), &[DataCategory::MoodLog], 3)
            .await;
        source.fail_for(&user()).await;
        let processor = ExportProcessor::new(source.clone(), ProcessConfig::default(), false);

        let req = request();
        let id = req.export_id.clone();
        processor.start_export(req).await.unwrap();
        assert_eq!(wait_terminal(&processor, &id).await, OperationStatus::Failed);

        source.recover_for(&user()).await;
        processor.retry_export(&id).await.unwrap();
        assert_eq!(
            wait_terminal(&processor, &id).await,
            OperationStatus::Completed
        );
        assert_eq!(processor.attempts(&id).await, Some(2));
    }

    #[tokio::test]
    async fn test_cancel_marks_cancelled() {
        let (processor, _source) = seeded_processor().await;
        let req = request();
        let id = req.export_id.clone();

        processor.start_export(req).await.unwrap();
        // Cancellation may race job completion; either outcome is terminal
        let _ = processor.cancel_export(&id).await;
        let status = wait_terminal(&processor, &id).await;
        assert!(matches!(
            status,
            OperationStatus::Cancelled | OperationStatus::Completed
        ));
    }

    #[tokio::test]
    async fn test_retry_running_rejected() {
        let (processor, _source) = seeded_processor().await;
        let req = request();
        let id = req.export_id.clone();

        processor.start_export(req).await.unwrap();
        // A running (or completed) job is not retryable
        let result = processor.retry_export(&id).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dry_run_discards_payload() {
        let source = Arc::new(InMemoryDataSource::new());
        source
            .seed_sample(&user(), &[DataCategory::MoodLog], 3)
            .await;
        let processor = ExportProcessor::new(source, ProcessConfig::default(), true);

        let req = request();
        let id = req.export_id.clone();
        processor.start_export(req).await.unwrap();
        wait_terminal(&processor, &id).await;

        let result = processor.take_result(&id).await.unwrap();
        assert_eq!(result.record_count, 3);
        assert!(result.payload.is_empty());
        assert_eq!(result.file_size, 0);
    }

    #[tokio::test]
    async fn test_remove_operation() {
        let (processor, _source) = seeded_processor().await;
        let req = request();
        let id = req.export_id.clone();

        processor.start_export(req).await.unwrap();
        wait_terminal(&processor, &id).await;
        processor.remove_operation(&id).await;

        assert!(processor.status(&id).await.is_none());
    }
}
