//! Backend lifecycle and composition root.
//!
//! [`LifecycleManager`] owns the backend, builds the cache and the
//! [`AnalysisCoordinator`] from the injected collaborators, and drives the
//! state machine in [`LifecycleState`].
//!
//! Lifecycle calls never return errors. Backend failures are logged and show
//! up as state (`Uninitialized` after a failed start) or in
//! [`HealthStatus`]; misuse such as a second `initialize` is a logged no-op.

mod state;

pub use state::LifecycleState;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::{AnalysisCache, CacheConfig};
use crate::coordinator::AnalysisCoordinator;
use crate::telemetry;
use crate::traits::{AnalyzerBackend, AnalyzerRegistry, ProjectFileEnumerator, SettingsProvider};
use crate::types::{ConfigurationSummary, ERROR_STATUS, HealthStatus, NOT_RUNNING_STATUS};

/// Owns the backend and drives its lifecycle.
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use augur::{Config, LifecycleManager, StaticAnalyzerRegistry};
/// # use augur::backend::HttpBackend;
/// # async fn example() -> augur::Result<()> {
/// let config = Config::load_or_default(None)?;
/// let manager = LifecycleManager::new(
///     Arc::new(HttpBackend::from_config(&config.backend)?),
///     Arc::new(StaticAnalyzerRegistry::with_defaults()),
///     Arc::new(config),
/// );
/// manager.initialize().await;
/// let health = manager.health_check().await;
/// println!("backend: {}", health.backend_status);
/// manager.dispose().await;
/// # Ok(())
/// # }
/// ```
pub struct LifecycleManager {
    backend: Arc<dyn AnalyzerBackend>,
    registry: Arc<dyn AnalyzerRegistry>,
    settings: Arc<dyn SettingsProvider>,
    coordinator: AnalysisCoordinator,
    state: RwLock<LifecycleState>,
    /// Serializes transitions so concurrent start/stop calls cannot interleave.
    transition: tokio::sync::Mutex<()>,
    disposed: AtomicBool,
}

impl LifecycleManager {
    /// Wire the backend, registry and settings together. The cache is sized
    /// from `settings`.
    pub fn new(
        backend: Arc<dyn AnalyzerBackend>,
        registry: Arc<dyn AnalyzerRegistry>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        let cache = Arc::new(AnalysisCache::new(CacheConfig::from_settings(
            settings.as_ref(),
        )));
        let coordinator = AnalysisCoordinator::new(
            Arc::clone(&backend),
            Arc::clone(&registry),
            Arc::clone(&settings),
            cache,
        );
        Self {
            backend,
            registry,
            settings,
            coordinator,
            state: RwLock::new(LifecycleState::Uninitialized),
            transition: tokio::sync::Mutex::new(()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Attach the enumerator used for whole-project sweeps.
    pub fn with_enumerator(mut self, enumerator: Arc<dyn ProjectFileEnumerator>) -> Self {
        self.coordinator = self.coordinator.with_enumerator(enumerator);
        self
    }

    pub fn coordinator(&self) -> &AnalysisCoordinator {
        &self.coordinator
    }

    pub fn cache(&self) -> &Arc<AnalysisCache> {
        self.coordinator.cache()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// First-time setup. Starts the backend when auto-start is enabled,
    /// otherwise parks in [`LifecycleState::Idle`].
    ///
    /// Returns the resulting state. Only valid from `Uninitialized`.
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub async fn initialize(&self) -> LifecycleState {
        if self.refuse_if_disposed("initialize") {
            return self.state();
        }
        let _transition = self.transition.lock().await;

        let current = self.state();
        if current != LifecycleState::Uninitialized {
            warn!(state = %current, "initialize called twice, ignoring");
            return current;
        }
        if !self.settings.auto_start() {
            info!("auto-start disabled, backend not started");
            self.set_state(LifecycleState::Idle);
            return LifecycleState::Idle;
        }
        self.start_locked().await
    }

    /// Start the backend. Valid from `Uninitialized`, `Idle` or `Stopped`.
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub async fn start(&self) -> LifecycleState {
        if self.refuse_if_disposed("start") {
            return self.state();
        }
        let _transition = self.transition.lock().await;
        self.start_locked().await
    }

    async fn start_locked(&self) -> LifecycleState {
        let current = self.state();
        if !current.can_start() {
            warn!(state = %current, "start ignored");
            return current;
        }

        self.set_state(LifecycleState::Initializing);
        match self.backend.start().await {
            Ok(init) => {
                self.set_state(LifecycleState::Ready);
                info!(
                    version = init.version.as_deref().unwrap_or("unknown"),
                    capabilities = ?init.capabilities,
                    "backend started"
                );
                match self.backend.health_check().await {
                    Ok(health) => info!(
                        status = %health.status,
                        version = health.version.as_deref().unwrap_or("unknown"),
                        "backend health"
                    ),
                    Err(e) => warn!(error = %e, "backend started but health check failed"),
                }
            }
            Err(e) => {
                error!(error = %e, "backend failed to start");
                self.set_state(LifecycleState::Uninitialized);
            }
        }
        self.state()
    }

    /// Stop the backend. Cancels running jobs and clears the results index;
    /// the cache survives.
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub async fn stop(&self) -> LifecycleState {
        if self.refuse_if_disposed("stop") {
            return self.state();
        }
        let _transition = self.transition.lock().await;
        self.stop_locked().await
    }

    async fn stop_locked(&self) -> LifecycleState {
        let current = self.state();
        if current != LifecycleState::Ready {
            warn!(state = %current, "stop ignored, backend not running");
            return current;
        }

        self.set_state(LifecycleState::Stopping);
        self.coordinator.shutdown_jobs().await;
        self.coordinator.clear_results();
        if let Err(e) = self.backend.stop().await {
            warn!(error = %e, "backend stop reported an error");
        }
        self.set_state(LifecycleState::Stopped);
        info!("backend stopped");
        LifecycleState::Stopped
    }

    /// Stop, wait the configured restart delay, start.
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub async fn restart(&self) -> LifecycleState {
        if self.refuse_if_disposed("restart") {
            return self.state();
        }
        self.stop().await;
        tokio::time::sleep(self.settings.restart_delay()).await;
        self.start().await
    }

    /// Consolidated health report. Never fails.
    ///
    /// The backend is only queried while `Ready`; otherwise its status is
    /// reported as `"not_running"`.
    pub async fn health_check(&self) -> HealthStatus {
        let state = self.state();
        let analysis_count = self.coordinator.results().len();
        let cache_entry_count = self.cache().len();

        let mut status = HealthStatus {
            state,
            backend_status: NOT_RUNNING_STATUS.to_string(),
            backend_version: None,
            analysis_count,
            cache_entry_count,
            overall_healthy: false,
            error: None,
        };
        if state != LifecycleState::Ready {
            return status;
        }

        match self.backend.health_check().await {
            Ok(health) => {
                status.overall_healthy = health.is_healthy();
                status.backend_status = health.status;
                status.backend_version = health.version;
            }
            Err(e) => {
                debug!(error = %e, "backend health check failed");
                status.backend_status = ERROR_STATUS.to_string();
                status.error = Some(e.to_string());
            }
        }
        status
    }

    /// Snapshot of the effective configuration, for display.
    pub fn configuration_summary(&self) -> ConfigurationSummary {
        let cache = self.cache().config();
        ConfigurationSummary {
            version: crate::PKG_VERSION.to_string(),
            backend: self.backend.name().to_string(),
            backend_endpoint: self.backend.endpoint(),
            project_root: self
                .settings
                .project_root()
                .map(|p| p.display().to_string()),
            provider: self.settings.provider(),
            model: self.settings.model(),
            analyzer_count: self.registry.analyzer_count(),
            enabled_analyzer_count: self
                .registry
                .enabled_analyzers()
                .iter()
                .filter(|d| self.settings.is_analyzer_enabled(&d.id))
                .count(),
            cache_enabled: cache.enabled,
            cache_ttl_secs: cache.ttl.as_secs(),
            cache_max_entries: cache.max_entries,
            eviction_policy: cache.policy.name().to_string(),
            auto_start: self.settings.auto_start(),
        }
    }

    /// Tear everything down. Safe to call more than once; only the first
    /// call does anything, and later lifecycle calls become no-ops.
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            debug!("already disposed");
            return;
        }
        let _transition = self.transition.lock().await;

        self.coordinator.shutdown_jobs().await;
        self.coordinator.clear_results();
        self.cache().clear();
        if self.state() == LifecycleState::Ready {
            if let Err(e) = self.backend.stop().await {
                warn!(error = %e, "backend stop reported an error during dispose");
            }
            self.set_state(LifecycleState::Stopped);
        }
        info!("disposed");
    }

    fn refuse_if_disposed(&self, operation: &str) -> bool {
        let disposed = self.is_disposed();
        if disposed {
            warn!(operation, "lifecycle call after dispose, ignoring");
        }
        disposed
    }

    fn set_state(&self, next: LifecycleState) {
        let previous = std::mem::replace(&mut *self.state.write(), next);
        debug!(from = %previous, to = %next, "lifecycle transition");
        metrics::counter!(telemetry::LIFECYCLE_TRANSITIONS_TOTAL, "state" => next.as_str())
            .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startable_states() {
        assert!(LifecycleState::Uninitialized.can_start());
        assert!(LifecycleState::Idle.can_start());
        assert!(LifecycleState::Stopped.can_start());
        assert!(!LifecycleState::Ready.can_start());
        assert!(!LifecycleState::Initializing.can_start());
        assert!(!LifecycleState::Stopping.can_start());
    }

    #[test]
    fn state_serializes_snake_case() {
        let json = serde_json::to_string(&LifecycleState::Uninitialized).unwrap();
        assert_eq!(json, "\"uninitialized\"");
    }
}
