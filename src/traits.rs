//! Collaborator traits consumed by the coordinator and lifecycle manager.
//!
//! Everything outside the cache/coordination core is reached through one of
//! these narrow interfaces:
//!
//! - [`AnalyzerBackend`] - executes analyzers; owned by the
//!   [`LifecycleManager`](crate::LifecycleManager), invoked by the
//!   [`AnalysisCoordinator`](crate::AnalysisCoordinator)
//! - [`AnalyzerRegistry`] - read-only analyzer lookup
//! - [`SettingsProvider`] - read-only settings
//! - [`ProjectFileEnumerator`] - lists project sources for whole-project sweeps
//!
//! Implementations shipped with the crate: [`HttpBackend`](crate::backend::HttpBackend),
//! [`StaticAnalyzerRegistry`](crate::StaticAnalyzerRegistry),
//! [`Config`](crate::Config) and [`WorkspaceEnumerator`](crate::WorkspaceEnumerator).

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::EvictionPolicy;
use crate::types::{
    AnalysisContext, AnalyzeOptions, AnalyzerDescriptor, AnalyzerOutput, BackendHealth,
    CombinedOutput, FileHandle, InitResult, SourceFile,
};
use crate::{AugurError, Result};

// ============================================================================
// Analyzer backend
// ============================================================================

/// The external process or service that actually runs analyzers.
///
/// No timeouts are imposed by the coordinator: a call that never returns
/// hangs its task. Implementations that talk over a network should bound
/// their own calls.
#[async_trait]
pub trait AnalyzerBackend: Send + Sync {
    /// Backend name for logging/display.
    fn name(&self) -> &str;

    /// Where the backend lives (URL, socket path, ...), if meaningful.
    fn endpoint(&self) -> Option<String> {
        None
    }

    /// Run one analyzer over `code`.
    async fn run_analyzer(
        &self,
        analyzer_id: &str,
        code: &str,
        file_path: &str,
        options: &AnalyzeOptions,
    ) -> Result<AnalyzerOutput>;

    /// Run several analyzers collaboratively over `code`.
    async fn run_multi_analyzer(
        &self,
        _analyzer_ids: &[String],
        _code: &str,
        _file_path: &str,
        _scenario: &str,
        _context: &AnalysisContext,
    ) -> Result<CombinedOutput> {
        Err(AugurError::NotImplemented("run_multi_analyzer"))
    }

    /// Query the backend's own health endpoint.
    async fn health_check(&self) -> Result<BackendHealth>;

    /// Bring the backend up (or connect to it).
    async fn start(&self) -> Result<InitResult>;

    /// Release the backend connection.
    async fn stop(&self) -> Result<()>;
}

// ============================================================================
// Analyzer registry
// ============================================================================

/// Read-only lookup of known analyzers.
///
/// Enabling or disabling analyzers happens outside this crate.
pub trait AnalyzerRegistry: Send + Sync {
    /// Analyzers that understand `language`, enabled or not.
    fn analyzers_for_language(&self, language: &str) -> Vec<AnalyzerDescriptor>;

    /// All enabled analyzers.
    fn enabled_analyzers(&self) -> Vec<AnalyzerDescriptor>;

    /// Total number of registered analyzers.
    fn analyzer_count(&self) -> usize;
}

// ============================================================================
// Settings
// ============================================================================

/// Read-only settings. This crate never writes settings back.
pub trait SettingsProvider: Send + Sync {
    fn cache_ttl(&self) -> Duration;

    fn cache_max_entries(&self) -> usize;

    fn cache_enabled(&self) -> bool;

    fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy::default()
    }

    /// Whether [`LifecycleManager::initialize`](crate::LifecycleManager::initialize)
    /// should start the backend.
    fn auto_start(&self) -> bool;

    /// Explicit allow-list of analyzer ids. `None` = no restriction beyond
    /// the registry's own enabled flags.
    fn enabled_analyzers(&self) -> Option<BTreeSet<String>> {
        None
    }

    fn is_analyzer_enabled(&self, analyzer_id: &str) -> bool {
        self.enabled_analyzers()
            .is_none_or(|enabled| enabled.contains(analyzer_id))
    }

    /// Pause between stop and start during a restart.
    fn restart_delay(&self) -> Duration {
        Duration::from_secs(1)
    }

    // Display-only values surfaced in the configuration summary.

    fn provider(&self) -> Option<String> {
        None
    }

    fn model(&self) -> Option<String> {
        None
    }

    fn project_root(&self) -> Option<PathBuf> {
        None
    }
}

// ============================================================================
// Project file enumeration
// ============================================================================

/// Lists the source files of the current project. Which files count (build
/// artifacts, vendored dependencies, ...) is the implementation's decision.
#[async_trait]
pub trait ProjectFileEnumerator: Send + Sync {
    async fn list_source_files(&self) -> Result<Vec<FileHandle>>;

    /// Load the current text of a file.
    ///
    /// Default implementation reads from disk.
    async fn read_source(&self, handle: &FileHandle) -> Result<SourceFile> {
        let content = tokio::fs::read_to_string(&handle.path).await?;
        Ok(SourceFile::new(
            handle.path.to_string_lossy(),
            handle.language.clone(),
            content,
        ))
    }
}
