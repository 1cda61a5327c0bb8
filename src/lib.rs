//! Augur - Analysis cache and coordination engine for code-analysis wizards
//!
//! This crate sits between an IDE integration and an analysis backend (a
//! service running pluggable "wizards": security, performance, testing, ...).
//! It provides:
//!
//! - [`ResultCache`]: bounded, TTL-based, content-addressed result cache with
//!   a configurable eviction policy
//! - [`AnalysisCoordinator`]: cache-first dispatch, concurrent per-file
//!   fan-out with per-analyzer failure isolation, and cancellable
//!   whole-project sweeps
//! - [`LifecycleManager`]: backend start/stop/restart, consolidated health
//!   and the composition root that wires everything together
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use augur::{Config, LifecycleManager, SourceFile, StaticAnalyzerRegistry, WorkspaceEnumerator};
//! use augur::backend::HttpBackend;
//!
//! #[tokio::main]
//! async fn main() -> augur::Result<()> {
//!     let config = Config::load_or_default(None)?;
//!     let enumerator = WorkspaceEnumerator::from_config(&config.project)?;
//!     let manager = LifecycleManager::new(
//!         Arc::new(HttpBackend::from_config(&config.backend)?),
//!         Arc::new(StaticAnalyzerRegistry::from_config(&config.analyzers)),
//!         Arc::new(config),
//!     )
//!     .with_enumerator(Arc::new(enumerator));
//!
//!     manager.initialize().await;
//!
//!     let file = SourceFile::new("src/app.py", "python", "def f(x): return eval(x)");
//!     let outcome = manager
//!         .coordinator()
//!         .analyze_with_all_applicable(&file, &file.language)
//!         .await;
//!     println!("{} of {} analyzers succeeded", outcome.succeeded(), outcome.attempted());
//!
//!     manager.dispose().await;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod workspace;

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export main types at crate root
pub use cache::{
    AnalysisCache, CacheConfig, CacheKey, CacheStatistics, EvictionPolicy, ResultCache,
};
pub use config::Config;
pub use coordinator::{
    AnalysisCoordinator, PROJECT_JOB_KEY, ProjectJob, ProjectProgress, ProjectReport,
    ResultsIndex, SweepStatus,
};
pub use error::{AugurError, Result};
pub use lifecycle::{LifecycleManager, LifecycleState};
pub use registry::StaticAnalyzerRegistry;
pub use traits::{AnalyzerBackend, AnalyzerRegistry, ProjectFileEnumerator, SettingsProvider};
pub use workspace::WorkspaceEnumerator;

// Re-export all types
pub use types::{
    AnalysisContext, AnalysisResult, AnalysisStatistics, AnalyzeOptions, AnalyzerDescriptor,
    AnalyzerFailure, AnalyzerOutput, BackendHealth, BatchOutcome, CachedAnalysis, CombinedOutput,
    CombinedResult, ConfigurationSummary, FileHandle, Finding, HealthStatus, InitResult, Severity,
    SourceFile,
};
