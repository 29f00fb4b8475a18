//! Engine wiring
//!
//! Builds the full service graph from a configuration: snapshot store,
//! data source, the four services, the coordinator, and the maintenance
//! scheduler. Dependencies are passed explicitly at construction; nothing
//! is a global.

use crate::adapters::source::ClinicalDataSource;
use crate::adapters::storage::{FileSnapshotStore, SnapshotStore};
use crate::config::BeingConfig;
use crate::core::consent::ConsentManager;
use crate::core::history::HistoryManager;
use crate::core::integration::ExportCoordinator;
use crate::core::maintenance::MaintenanceScheduler;
use crate::core::process::ExportProcessor;
use crate::core::recovery::{RecoveryManager, RuleBasedSafetyValidator, SafetyValidator};
use crate::domain::Result;
use std::sync::Arc;

/// The wired export engine
///
/// # Example
///
/// ```no_run
/// use being_export::adapters::source::InMemoryDataSource;
/// use being_export::config::BeingConfig;
/// use being_export::engine::ExportEngine;
/// use std::sync::Arc;
///
/// # async fn example() -> being_export::domain::Result<()> {
/// let config = BeingConfig::default();
/// let engine = ExportEngine::new(config, Arc::new(InMemoryDataSource::new()))?;
/// engine.load_state().await?;
/// engine.scheduler.start();
/// # Ok(())
/// # }
/// ```
pub struct ExportEngine {
    /// Effective configuration
    pub config: Arc<BeingConfig>,

    /// Consent and validation service
    pub consent: Arc<ConsentManager>,

    /// Job execution service
    pub processor: ExportProcessor,

    /// Durable history service
    pub history: Arc<HistoryManager>,

    /// Error classification and recovery service
    pub recovery: Arc<RecoveryManager>,

    /// Workflow orchestrator
    pub coordinator: ExportCoordinator,

    /// Background maintenance
    pub scheduler: MaintenanceScheduler,
}

impl ExportEngine {
    /// Wire an engine over a data source, with file-backed snapshots under
    /// the configured state directory
    pub fn new(config: BeingConfig, source: Arc<dyn ClinicalDataSource>) -> Result<Self> {
        let store: Arc<dyn SnapshotStore> =
            Arc::new(FileSnapshotStore::new(&config.storage.state_dir)?);
        Ok(Self::with_store(config, source, store))
    }

    /// Wire an engine over explicit source and snapshot-store backends
    pub fn with_store(
        config: BeingConfig,
        source: Arc<dyn ClinicalDataSource>,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        let config = Arc::new(config);

        let consent = Arc::new(ConsentManager::new(
            store.clone(),
            config.consent.clone(),
            config.privacy.clone(),
        ));
        let processor = ExportProcessor::new(
            source,
            config.process.clone(),
            config.application.dry_run,
        );
        let history = Arc::new(HistoryManager::new(store, config.retention.clone()));
        let validator: Arc<dyn SafetyValidator> = Arc::new(RuleBasedSafetyValidator::new());
        let recovery = Arc::new(RecoveryManager::new(
            Arc::new(processor.clone()),
            validator.clone(),
            config.recovery.clone(),
        ));
        let coordinator = ExportCoordinator::new(
            consent.clone(),
            processor.clone(),
            history.clone(),
            recovery.clone(),
            validator,
            config.clone(),
        );
        let scheduler = MaintenanceScheduler::new(
            config.maintenance.clone(),
            recovery.clone(),
            history.clone(),
            coordinator.clone(),
        );

        Self {
            config,
            consent,
            processor,
            history,
            recovery,
            coordinator,
            scheduler,
        }
    }

    /// Load persisted consent and history state
    pub async fn load_state(&self) -> Result<()> {
        self.consent.load().await?;
        self.history.load().await?;
        Ok(())
    }

    /// Stop background work and persist the stores
    pub async fn shutdown(&self) -> Result<()> {
        self.scheduler.stop().await;
        self.coordinator.sync_all_stores().await?;
        tracing::info!("Engine shut down");
        Ok(())
    }
}
