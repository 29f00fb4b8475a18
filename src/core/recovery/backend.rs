//! Processor-backed recovery
//!
//! The export processor serves as the recovery backend: remediation steps
//! verify the source, confirm retryability, and flag the next run's scope or
//! format. None of them restart the job; the coordinator owns the single
//! restart that follows a successful recovery.

use crate::core::process::ExportProcessor;
use crate::core::recovery::traits::RecoveryBackend;
use crate::domain::ids::ExportId;
use crate::domain::Result;
use async_trait::async_trait;

#[async_trait]
impl RecoveryBackend for ExportProcessor {
    async fn validate_data(&self, export_id: &ExportId) -> Result<bool> {
        self.verify_source(export_id).await
    }

    async fn prepare_retry(&self, export_id: &ExportId) -> Result<bool> {
        Ok(self.is_retryable(export_id).await)
    }

    async fn reduce_scope(&self, export_id: &ExportId) -> Result<bool> {
        if !self.is_retryable(export_id).await {
            return Ok(false);
        }
        Ok(self.set_reduced_scope(export_id).await)
    }

    async fn apply_fallback_format(&self, export_id: &ExportId) -> Result<bool> {
        if !self.is_retryable(export_id).await {
            return Ok(false);
        }
        Ok(self
            .set_fallback_format(export_id, crate::domain::request::ExportFormat::Summary)
            .await)
    }
}
