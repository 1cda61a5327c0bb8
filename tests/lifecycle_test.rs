//! Tests for the lifecycle state machine and health reporting.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use augur::config::Config;
use augur::{
    AnalyzeOptions, AnalyzerBackend, AnalyzerOutput, AugurError, BackendHealth, FileHandle,
    InitResult, LifecycleManager, LifecycleState, ProjectFileEnumerator, Result, SourceFile,
    StaticAnalyzerRegistry,
};

// ============================================================================
// Mock backend
// ============================================================================

#[derive(Default)]
struct MockBackend {
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    health_calls: AtomicUsize,
    fail_start: AtomicBool,
    fail_health: AtomicBool,
    degraded: AtomicBool,
    /// Each analysis takes 200ms.
    slow: AtomicBool,
}

impl MockBackend {
    fn starts(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    fn stops(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalyzerBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn endpoint(&self) -> Option<String> {
        Some("mock://wizards".to_string())
    }

    async fn run_analyzer(
        &self,
        analyzer_id: &str,
        _code: &str,
        _file_path: &str,
        _options: &AnalyzeOptions,
    ) -> Result<AnalyzerOutput> {
        if self.slow.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Ok(AnalyzerOutput::new(
            serde_json::json!({ "analyzer": analyzer_id }),
        ))
    }

    async fn health_check(&self) -> Result<BackendHealth> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_health.load(Ordering::SeqCst) {
            return Err(AugurError::BackendUnavailable("connection refused".into()));
        }
        if self.degraded.load(Ordering::SeqCst) {
            return Ok(BackendHealth {
                status: "degraded".to_string(),
                version: Some("1.0.0".to_string()),
            });
        }
        Ok(BackendHealth::healthy("1.0.0"))
    }

    async fn start(&self) -> Result<InitResult> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(AugurError::BackendUnavailable("port in use".into()));
        }
        Ok(InitResult {
            version: Some("1.0.0".to_string()),
            capabilities: vec!["security".to_string()],
        })
    }

    async fn stop(&self) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Serves `count` small python files from memory.
struct MemoryEnumerator {
    count: usize,
}

#[async_trait]
impl ProjectFileEnumerator for MemoryEnumerator {
    async fn list_source_files(&self) -> Result<Vec<FileHandle>> {
        Ok((1..=self.count)
            .map(|i| FileHandle::new(PathBuf::from(format!("src/f{i}.py")), "python"))
            .collect())
    }

    async fn read_source(&self, handle: &FileHandle) -> Result<SourceFile> {
        let path = handle.path.to_string_lossy().into_owned();
        let content = format!("# {path}");
        Ok(SourceFile::new(path, "python", content))
    }
}

fn slow_manager(files: usize) -> (Arc<MockBackend>, LifecycleManager) {
    let backend = Arc::new(MockBackend::default());
    backend.slow.store(true, Ordering::SeqCst);
    let manager =
        manager(backend.clone()).with_enumerator(Arc::new(MemoryEnumerator { count: files }));
    (backend, manager)
}

fn manager_with(backend: Arc<MockBackend>, config: Config) -> LifecycleManager {
    LifecycleManager::new(
        backend,
        Arc::new(StaticAnalyzerRegistry::with_defaults()),
        Arc::new(config),
    )
}

fn manager(backend: Arc<MockBackend>) -> LifecycleManager {
    manager_with(backend, Config::default())
}

fn manual_start_config() -> Config {
    let mut config = Config::default();
    config.lifecycle.auto_start = false;
    config
}

async fn analyze_something(manager: &LifecycleManager) {
    manager
        .coordinator()
        .analyze_with_analyzer(
            &SourceFile::new("a.py", "python", "x = 1"),
            "security",
            &AnalyzeOptions::default(),
        )
        .await
        .unwrap();
}

// ============================================================================
// Initialize / start
// ============================================================================

#[tokio::test]
async fn initialize_with_auto_start_reaches_ready() {
    let backend = Arc::new(MockBackend::default());
    let manager = manager(backend.clone());
    assert_eq!(manager.state(), LifecycleState::Uninitialized);

    assert_eq!(manager.initialize().await, LifecycleState::Ready);
    assert!(manager.is_ready());
    assert_eq!(backend.starts(), 1);
    // Post-start health check.
    assert_eq!(backend.health_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_initialize_is_a_noop() {
    let backend = Arc::new(MockBackend::default());
    let manager = manager(backend.clone());

    manager.initialize().await;
    assert_eq!(manager.initialize().await, LifecycleState::Ready);
    assert_eq!(backend.starts(), 1);
}

#[tokio::test]
async fn initialize_without_auto_start_stays_idle() {
    let backend = Arc::new(MockBackend::default());
    let manager = manager_with(backend.clone(), manual_start_config());

    assert_eq!(manager.initialize().await, LifecycleState::Idle);
    assert_eq!(backend.starts(), 0);

    let health = manager.health_check().await;
    assert!(!health.overall_healthy);
    assert_eq!(health.backend_status, "not_running");

    assert_eq!(manager.start().await, LifecycleState::Ready);
    assert_eq!(backend.starts(), 1);
}

#[tokio::test]
async fn failed_start_returns_to_uninitialized() {
    let backend = Arc::new(MockBackend::default());
    backend.fail_start.store(true, Ordering::SeqCst);
    let manager = manager(backend.clone());

    assert_eq!(manager.initialize().await, LifecycleState::Uninitialized);
    let health = manager.health_check().await;
    assert_eq!(health.state, LifecycleState::Uninitialized);
    assert!(!health.overall_healthy);

    // A later start can succeed.
    backend.fail_start.store(false, Ordering::SeqCst);
    assert_eq!(manager.start().await, LifecycleState::Ready);
}

#[tokio::test]
async fn start_while_ready_is_a_noop() {
    let backend = Arc::new(MockBackend::default());
    let manager = manager(backend.clone());
    manager.initialize().await;

    assert_eq!(manager.start().await, LifecycleState::Ready);
    assert_eq!(backend.starts(), 1);
}

// ============================================================================
// Stop / restart
// ============================================================================

#[tokio::test]
async fn stop_clears_results_but_keeps_cache() {
    let backend = Arc::new(MockBackend::default());
    let manager = manager(backend.clone());
    manager.initialize().await;
    analyze_something(&manager).await;
    assert_eq!(manager.coordinator().all_results().len(), 1);

    assert_eq!(manager.stop().await, LifecycleState::Stopped);
    assert_eq!(backend.stops(), 1);
    assert!(manager.coordinator().all_results().is_empty());
    assert_eq!(manager.cache().len(), 1);

    // Stopping again does nothing.
    manager.stop().await;
    assert_eq!(backend.stops(), 1);
}

#[tokio::test]
async fn stopped_backend_can_start_again() {
    let backend = Arc::new(MockBackend::default());
    let manager = manager(backend.clone());
    manager.initialize().await;
    manager.stop().await;

    assert_eq!(manager.start().await, LifecycleState::Ready);
    assert_eq!(backend.starts(), 2);
}

#[tokio::test(start_paused = true)]
async fn restart_stops_then_starts() {
    let backend = Arc::new(MockBackend::default());
    let manager = manager(backend.clone());
    manager.initialize().await;

    assert_eq!(manager.restart().await, LifecycleState::Ready);
    assert_eq!(backend.stops(), 1);
    assert_eq!(backend.starts(), 2);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_reports_backend_status_when_ready() {
    let backend = Arc::new(MockBackend::default());
    let manager = manager(backend.clone());
    manager.initialize().await;
    analyze_something(&manager).await;

    let health = manager.health_check().await;
    assert!(health.overall_healthy);
    assert_eq!(health.state, LifecycleState::Ready);
    assert_eq!(health.backend_status, "healthy");
    assert_eq!(health.backend_version.as_deref(), Some("1.0.0"));
    assert_eq!(health.analysis_count, 1);
    assert_eq!(health.cache_entry_count, 1);
    assert!(health.error.is_none());
}

#[tokio::test]
async fn health_check_failure_is_reported_not_raised() {
    let backend = Arc::new(MockBackend::default());
    let manager = manager(backend.clone());
    manager.initialize().await;
    backend.fail_health.store(true, Ordering::SeqCst);

    let health = manager.health_check().await;
    assert!(!health.overall_healthy);
    assert_eq!(health.backend_status, "error");
    assert!(health.error.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn degraded_backend_is_not_healthy() {
    let backend = Arc::new(MockBackend::default());
    let manager = manager(backend.clone());
    manager.initialize().await;
    backend.degraded.store(true, Ordering::SeqCst);

    let health = manager.health_check().await;
    assert!(!health.overall_healthy);
    assert_eq!(health.backend_status, "degraded");
}

#[tokio::test]
async fn health_does_not_query_stopped_backend() {
    let backend = Arc::new(MockBackend::default());
    let manager = manager(backend.clone());
    manager.initialize().await;
    manager.stop().await;
    let checks = backend.health_calls.load(Ordering::SeqCst);

    let health = manager.health_check().await;
    assert_eq!(health.backend_status, "not_running");
    assert_eq!(backend.health_calls.load(Ordering::SeqCst), checks);
}

// ============================================================================
// Configuration summary
// ============================================================================

#[tokio::test]
async fn configuration_summary_reflects_settings() {
    let mut config = manual_start_config();
    config.cache.max_entries = 42;
    config.backend.provider = Some("anthropic".to_string());
    config.analyzers.enabled = Some(vec!["security".to_string(), "testing".to_string()]);
    let manager = manager_with(Arc::new(MockBackend::default()), config);

    let summary = manager.configuration_summary();
    assert_eq!(summary.version, augur::PKG_VERSION);
    assert_eq!(summary.backend, "mock");
    assert_eq!(summary.backend_endpoint.as_deref(), Some("mock://wizards"));
    assert_eq!(summary.provider.as_deref(), Some("anthropic"));
    assert_eq!(summary.analyzer_count, 6);
    assert_eq!(summary.enabled_analyzer_count, 2);
    assert_eq!(summary.cache_max_entries, 42);
    assert_eq!(summary.cache_ttl_secs, 3600);
    assert_eq!(summary.eviction_policy, "lru");
    assert!(!summary.auto_start);
}

// ============================================================================
// Dispose
// ============================================================================

#[tokio::test]
async fn dispose_is_idempotent() {
    let backend = Arc::new(MockBackend::default());
    let manager = manager(backend.clone());
    manager.initialize().await;
    analyze_something(&manager).await;

    manager.dispose().await;
    manager.dispose().await;

    assert!(manager.is_disposed());
    assert_eq!(backend.stops(), 1);
    assert_eq!(manager.state(), LifecycleState::Stopped);
    assert!(manager.cache().is_empty());
    assert!(manager.coordinator().all_results().is_empty());
}

#[tokio::test]
async fn lifecycle_calls_after_dispose_are_ignored() {
    let backend = Arc::new(MockBackend::default());
    let manager = manager(backend.clone());
    manager.dispose().await;

    assert_eq!(manager.initialize().await, LifecycleState::Uninitialized);
    assert_eq!(manager.start().await, LifecycleState::Uninitialized);
    assert_eq!(backend.starts(), 0);
    assert_eq!(backend.stops(), 0);
}

// ============================================================================
// Teardown with work in flight
// ============================================================================

#[tokio::test]
async fn stop_waits_for_in_flight_sweep() {
    let (_backend, manager) = slow_manager(5);
    manager.initialize().await;

    let job = manager.coordinator().analyze_project(|_| {});
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(manager.stop().await, LifecycleState::Stopped);
    assert!(manager.coordinator().running_jobs().is_empty());

    let report = job.wait().await.unwrap();
    assert!(report.is_cancelled());
    assert_eq!(report.files_analyzed, 1);
    // The file that was in flight finished, but its results were not kept.
    assert!(manager.coordinator().all_results().is_empty());
    assert!(manager.cache().is_empty());
}

#[tokio::test]
async fn dispose_waits_for_in_flight_sweep() {
    let (_backend, manager) = slow_manager(5);
    manager.initialize().await;

    let job = manager.coordinator().analyze_project(|_| {});
    tokio::time::sleep(Duration::from_millis(50)).await;

    manager.dispose().await;
    assert!(manager.coordinator().running_jobs().is_empty());
    assert!(manager.coordinator().all_results().is_empty());
    assert!(manager.cache().is_empty());

    let report = job.wait().await.unwrap();
    assert!(report.is_cancelled());
    assert!(manager.coordinator().all_results().is_empty());
    assert!(manager.cache().is_empty());
    assert_eq!(manager.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn direct_analysis_in_flight_at_dispose_is_not_stored() {
    let (_backend, manager) = slow_manager(0);
    manager.initialize().await;

    let coordinator = manager.coordinator().clone();
    let call = tokio::spawn(async move {
        coordinator
            .analyze_with_analyzer(
                &SourceFile::new("a.py", "python", "x = 1"),
                "security",
                &AnalyzeOptions::default(),
            )
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    manager.dispose().await;

    // The caller still gets its answer.
    assert!(call.await.unwrap().is_ok());
    assert!(manager.coordinator().all_results().is_empty());
    assert!(manager.cache().is_empty());
}

#[tokio::test]
async fn sweeps_run_again_after_restart() {
    let (_backend, manager) = slow_manager(1);
    manager.initialize().await;
    manager.stop().await;
    manager.start().await;

    let report = manager
        .coordinator()
        .analyze_project(|_| {})
        .wait()
        .await
        .unwrap();
    assert!(!report.is_cancelled());
    assert_eq!(report.files_analyzed, 1);
    assert_eq!(manager.coordinator().results_for_file("src/f1.py").len(), 6);
}
