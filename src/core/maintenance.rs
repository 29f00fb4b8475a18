//! Background maintenance scheduler
//!
//! Owns every periodic task the engine runs: error-rate threshold checks,
//! retention cleanup sweeps, error-pattern re-analysis, and store syncs with
//! consistency checks. Nothing starts as an import side effect; the
//! scheduler is constructed, started, and stopped by the application's
//! lifecycle, so tests and restarts never accumulate duplicate timers.

use crate::config::MaintenanceConfig;
use crate::core::history::HistoryManager;
use crate::core::integration::ExportCoordinator;
use crate::core::recovery::{analyze_error_patterns, RecoveryManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Lifecycle-managed background maintenance
pub struct MaintenanceScheduler {
    config: MaintenanceConfig,
    recovery: Arc<RecoveryManager>,
    history: Arc<HistoryManager>,
    coordinator: ExportCoordinator,
    shutdown_tx: watch::Sender<bool>,
    handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl MaintenanceScheduler {
    /// Create a scheduler; nothing runs until [`start`](Self::start)
    pub fn new(
        config: MaintenanceConfig,
        recovery: Arc<RecoveryManager>,
        history: Arc<HistoryManager>,
        coordinator: ExportCoordinator,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            recovery,
            history,
            coordinator,
            shutdown_tx,
            handles: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Spawn the maintenance tasks
    ///
    /// Idempotent only in the sense that calling it twice spawns a second
    /// set of tasks; callers own the start/stop pairing.
    pub fn start(&self) {
        if !self.config.enabled {
            tracing::info!("Maintenance scheduler disabled by configuration");
            return;
        }

        let mut handles = self.handles.lock().expect("scheduler handle lock");

        // Error-rate threshold check
        {
            let recovery = self.recovery.clone();
            let mut shutdown = self.shutdown_tx.subscribe();
            let period = Duration::from_secs(self.config.threshold_check_interval_secs);
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.tick().await; // immediate first tick
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            recovery.check_error_rate_threshold().await;
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            }));
        }

        // Retention and stale-error cleanup
        {
            let recovery = self.recovery.clone();
            let history = self.history.clone();
            let mut shutdown = self.shutdown_tx.subscribe();
            let period = Duration::from_secs(self.config.cleanup_interval_secs);
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            let purged = history.purge_expired_exports().await.len();
                            let removed = history.perform_scheduled_cleanup().await;
                            let expired_shares = history.expire_lapsed_shares().await;
                            let stale_errors = recovery.cleanup_stale_errors().await;
                            tracing::debug!(
                                purged,
                                removed,
                                expired_shares,
                                stale_errors,
                                "Cleanup sweep finished"
                            );
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            }));
        }

        // Error-pattern re-analysis
        {
            let recovery = self.recovery.clone();
            let mut shutdown = self.shutdown_tx.subscribe();
            let period = Duration::from_secs(self.config.pattern_interval_secs);
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            let records = recovery.all_error_records().await;
                            let report = analyze_error_patterns(&records);
                            if !report.recommendations.is_empty() {
                                tracing::info!(
                                    patterns = report.patterns.len(),
                                    recommendations = report.recommendations.len(),
                                    "Error pattern analysis refreshed"
                                );
                            }
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            }));
        }

        // Store sync + consistency check
        {
            let coordinator = self.coordinator.clone();
            let mut shutdown = self.shutdown_tx.subscribe();
            let period = Duration::from_secs(self.config.sync_interval_secs);
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if let Err(e) = coordinator.sync_all_stores().await {
                                tracing::warn!(error = %e, "Store sync failed");
                            }
                            coordinator.validate_cross_store_consistency().await;
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            }));
        }

        tracing::info!(tasks = handles.len(), "Maintenance scheduler started");
    }

    /// Signal all tasks to stop and wait for them to finish
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.handles.lock().expect("scheduler handle lock");
            guard.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
        tracing::info!("Maintenance scheduler stopped");
    }

    /// Number of currently owned task handles
    pub fn task_count(&self) -> usize {
        self.handles.lock().expect("scheduler handle lock").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::source::InMemoryDataSource;
    use crate::adapters::storage::MemorySnapshotStore;
    use crate::config::BeingConfig;
    use crate::core::consent::ConsentManager;
    use crate::core::process::ExportProcessor;
    use crate::core::recovery::RuleBasedSafetyValidator;

    fn build_scheduler(config: MaintenanceConfig) -> MaintenanceScheduler {
        let being_config = Arc::new(BeingConfig::default());
        let store = Arc::new(MemorySnapshotStore::new());
        let consent = Arc::new(ConsentManager::new(
            store.clone(),
            being_config.consent.clone(),
            being_config.privacy.clone(),
        ));
        let processor = ExportProcessor::new(
            Arc::new(InMemoryDataSource::new()),
            being_config.process.clone(),
            false,
        );
        let history = Arc::new(HistoryManager::new(store, being_config.retention.clone()));
        let validator = Arc::new(RuleBasedSafetyValidator::new());
        let recovery = Arc::new(RecoveryManager::new(
            Arc::new(processor.clone()),
            validator.clone(),
            being_config.recovery.clone(),
        ));
        let coordinator = ExportCoordinator::new(
            consent,
            processor,
            history.clone(),
            recovery.clone(),
            validator,
            being_config,
        );
        MaintenanceScheduler::new(config, recovery, history, coordinator)
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let scheduler = build_scheduler(MaintenanceConfig {
            enabled: true,
            threshold_check_interval_secs: 3600,
            cleanup_interval_secs: 3600,
            pattern_interval_secs: 3600,
            sync_interval_secs: 3600,
        });

        scheduler.start();
        assert_eq!(scheduler.task_count(), 4);

        scheduler.stop().await;
        assert_eq!(scheduler.task_count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_scheduler_spawns_nothing() {
        let scheduler = build_scheduler(MaintenanceConfig {
            enabled: false,
            ..MaintenanceConfig::default()
        });

        scheduler.start();
        assert_eq!(scheduler.task_count(), 0);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_stop_without_start_is_harmless() {
        let scheduler = build_scheduler(MaintenanceConfig::default());
        scheduler.stop().await;
        assert_eq!(scheduler.task_count(), 0);
    }
}
