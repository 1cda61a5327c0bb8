//! Analysis coordination.
//!
//! [`AnalysisCoordinator`] is the single entry point for running analyzers:
//!
//! - consults the [`AnalysisCache`] before calling the backend and stores
//!   what the backend returns
//! - fans a file out to every applicable analyzer concurrently, isolating
//!   failures (including panics) per analyzer
//! - runs cancellable whole-project sweeps in the background
//! - keeps a [`ResultsIndex`] of the latest result per `(file, analyzer)`
//!
//! The coordinator is cheap to clone; clones share the same cache, index
//! and job table.

mod index;
mod job;

pub use index::ResultsIndex;
pub use job::{PROJECT_JOB_KEY, ProjectJob, ProjectProgress, ProjectReport, SweepStatus};

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use parking_lot::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use self::job::JobRegistry;
use crate::cache::{AnalysisCache, CacheKey, analyzer_set};
use crate::telemetry;
use crate::traits::{AnalyzerBackend, AnalyzerRegistry, ProjectFileEnumerator, SettingsProvider};
use crate::types::{
    AnalysisContext, AnalysisResult, AnalysisStatistics, AnalyzeOptions, AnalyzerDescriptor,
    AnalyzerFailure, BatchOutcome, CachedAnalysis, CombinedResult, SourceFile,
};
use crate::{AugurError, Result};

/// Analyzer label used in metrics for joint reviews.
const MULTI_ANALYZER_LABEL: &str = "multi";

/// Runs analyzers through the cache and tracks their results.
#[derive(Clone)]
pub struct AnalysisCoordinator {
    backend: Arc<dyn AnalyzerBackend>,
    registry: Arc<dyn AnalyzerRegistry>,
    settings: Arc<dyn SettingsProvider>,
    enumerator: Option<Arc<dyn ProjectFileEnumerator>>,
    cache: Arc<AnalysisCache>,
    results: Arc<ResultsIndex>,
    jobs: Arc<JobRegistry>,
    /// Bumped by [`shutdown_jobs`](Self::shutdown_jobs). Backend calls that
    /// started under an older session do not write to the cache or index.
    session: Arc<RwLock<u64>>,
}

impl AnalysisCoordinator {
    pub fn new(
        backend: Arc<dyn AnalyzerBackend>,
        registry: Arc<dyn AnalyzerRegistry>,
        settings: Arc<dyn SettingsProvider>,
        cache: Arc<AnalysisCache>,
    ) -> Self {
        Self {
            backend,
            registry,
            settings,
            enumerator: None,
            cache,
            results: Arc::new(ResultsIndex::new()),
            jobs: Arc::new(JobRegistry::default()),
            session: Arc::new(RwLock::new(0)),
        }
    }

    /// Attach the workspace source enumerator used by [`analyze_project`](Self::analyze_project).
    pub fn with_enumerator(mut self, enumerator: Arc<dyn ProjectFileEnumerator>) -> Self {
        self.enumerator = Some(enumerator);
        self
    }

    pub fn cache(&self) -> &Arc<AnalysisCache> {
        &self.cache
    }

    pub fn results(&self) -> &Arc<ResultsIndex> {
        &self.results
    }

    // =========================================================================
    // Single file
    // =========================================================================

    /// Run one analyzer over one file, using the cache.
    ///
    /// A cache hit returns without contacting the backend. Backend errors are
    /// returned as-is and nothing is cached or recorded for them.
    #[instrument(skip(self, file, options), fields(file = %file.path, analyzer = analyzer_id))]
    pub async fn analyze_with_analyzer(
        &self,
        file: &SourceFile,
        analyzer_id: &str,
        options: &AnalyzeOptions,
    ) -> Result<AnalysisResult> {
        let key = CacheKey::for_file(file, analyzer_id);
        if let Some(CachedAnalysis::Single(hit)) = self.cache.get(key.as_str()) {
            debug!("cache hit");
            self.results.record(hit.clone());
            return Ok(hit);
        }

        let session = *self.session.read();
        let start = Instant::now();
        let outcome = self
            .backend
            .run_analyzer(analyzer_id, &file.content, &file.path, options)
            .await;
        record_analysis(analyzer_id, start, outcome.is_ok());
        let output = outcome?;

        let result = AnalysisResult::from_output(&file.path, analyzer_id, output);
        self.store_if_current(session, || {
            self.cache.put(key, CachedAnalysis::Single(result.clone()));
            self.results.record(result.clone());
        });
        Ok(result)
    }

    /// Run several analyzers collaboratively over one file as one backend call.
    ///
    /// The set of ids is sorted and de-duplicated before use, so `[a, b]` and
    /// `[b, a]` share a cache entry. Per-analyzer sub-results are recorded in
    /// the results index.
    #[instrument(skip(self, file, analyzer_ids, context), fields(file = %file.path))]
    pub async fn multi_analyzer_review(
        &self,
        file: &SourceFile,
        analyzer_ids: &[String],
        scenario: &str,
        context: &AnalysisContext,
    ) -> Result<CombinedResult> {
        let ids = analyzer_set(analyzer_ids);
        if ids.is_empty() {
            return Err(AugurError::Configuration(
                "multi-analyzer review needs at least one analyzer".into(),
            ));
        }

        let key = CacheKey::joint_for_file(file, &ids, scenario);
        if let Some(CachedAnalysis::Combined(hit)) = self.cache.get(key.as_str()) {
            debug!("cache hit");
            for result in &hit.results {
                self.results.record(result.clone());
            }
            return Ok(hit);
        }

        let session = *self.session.read();
        let start = Instant::now();
        let outcome = self
            .backend
            .run_multi_analyzer(&ids, &file.content, &file.path, scenario, context)
            .await;
        record_analysis(MULTI_ANALYZER_LABEL, start, outcome.is_ok());
        let output = outcome?;

        let results: Vec<AnalysisResult> = output
            .analyzers
            .into_iter()
            .map(|(id, out)| AnalysisResult::from_output(&file.path, id, out))
            .collect();
        let combined = CombinedResult {
            file_path: file.path.clone(),
            analyzer_ids: ids,
            scenario: scenario.to_string(),
            payload: output.payload,
            results,
            timestamp: std::time::SystemTime::now(),
        };

        self.store_if_current(session, || {
            self.cache.put(key, CachedAnalysis::Combined(combined.clone()));
            for result in &combined.results {
                self.results.record(result.clone());
            }
        });
        Ok(combined)
    }

    /// Analyzers that would run for `language`: registry-enabled, allowed by
    /// settings, de-duplicated by id.
    pub fn applicable_analyzers(&self, language: &str) -> Vec<AnalyzerDescriptor> {
        let mut seen = std::collections::HashSet::new();
        self.registry
            .analyzers_for_language(language)
            .into_iter()
            .filter(|d| d.enabled && self.settings.is_analyzer_enabled(&d.id))
            .filter(|d| seen.insert(d.id.clone()))
            .collect()
    }

    /// Run every applicable analyzer over one file concurrently.
    ///
    /// Never fails as a whole: each analyzer that errors or panics is reported
    /// in [`BatchOutcome::failures`] while its siblings run to completion.
    /// Results arrive in completion order.
    #[instrument(skip(self, file), fields(file = %file.path))]
    pub async fn analyze_with_all_applicable(
        &self,
        file: &SourceFile,
        language: &str,
    ) -> BatchOutcome {
        let analyzers = self.applicable_analyzers(language);
        let mut outcome = BatchOutcome::default();
        if analyzers.is_empty() {
            debug!(language, "no applicable analyzers");
            return outcome;
        }

        let file = Arc::new(file.clone());
        let mut tasks = JoinSet::new();
        for descriptor in analyzers {
            let coordinator = self.clone();
            let file = Arc::clone(&file);
            tasks.spawn(async move {
                let options = AnalyzeOptions::default();
                let run = coordinator.analyze_with_analyzer(&file, &descriptor.id, &options);
                let result = AssertUnwindSafe(run).catch_unwind().await;
                (descriptor.id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (analyzer_id, reason) = match joined {
                Ok((_, Ok(Ok(result)))) => {
                    outcome.results.push(result);
                    continue;
                }
                Ok((id, Ok(Err(e)))) => (id, e.to_string()),
                Ok((id, Err(panic))) => (id, panic_message(panic.as_ref())),
                // Tasks are never aborted; this only happens on runtime shutdown.
                Err(e) => ("unknown".to_string(), e.to_string()),
            };
            warn!(file = %file.path, analyzer = %analyzer_id, error = %reason, "analyzer failed");
            outcome.failures.push(AnalyzerFailure {
                file_path: file.path.clone(),
                analyzer_id,
                reason,
            });
        }

        debug!(
            succeeded = outcome.succeeded(),
            attempted = outcome.attempted(),
            "batch complete"
        );
        outcome
    }

    // =========================================================================
    // Whole project
    // =========================================================================

    /// Start a background sweep over every project source file under
    /// [`PROJECT_JOB_KEY`].
    pub fn analyze_project<F>(&self, progress: F) -> ProjectJob
    where
        F: Fn(ProjectProgress) + Send + Sync + 'static,
    {
        self.analyze_project_as(PROJECT_JOB_KEY, progress)
    }

    /// Start a background sweep under a caller-chosen job key.
    ///
    /// A job already running under `key` is cancelled first. `progress` is
    /// invoked after each file; cancellation is checked before each file, so
    /// an in-flight file always finishes and its results are kept.
    pub fn analyze_project_as<F>(&self, key: &str, progress: F) -> ProjectJob
    where
        F: Fn(ProjectProgress) + Send + Sync + 'static,
    {
        let (guard, token) = self.jobs.register(key);
        let coordinator = self.clone();
        let job_token = token.clone();
        let job_key = key.to_string();
        let handle = self.jobs.spawn(async move {
            let _guard = guard;
            coordinator.run_sweep(&job_key, &job_token, &progress).await
        });
        ProjectJob::new(key.to_string(), token, handle)
    }

    async fn run_sweep(
        &self,
        key: &str,
        token: &CancellationToken,
        progress: &(dyn Fn(ProjectProgress) + Send + Sync),
    ) -> Result<ProjectReport> {
        let enumerator = self.enumerator.as_ref().ok_or_else(|| {
            AugurError::NoWorkspace("no project file enumerator configured".into())
        })?;
        let files = enumerator.list_source_files().await?;
        let total = files.len();
        info!(job = key, total, "project analysis started");

        let mut report = ProjectReport::new(total);
        for (index, handle) in files.iter().enumerate() {
            if token.is_cancelled() {
                report.status = SweepStatus::Cancelled;
                info!(
                    job = key,
                    analyzed = report.files_analyzed,
                    total,
                    "project analysis cancelled"
                );
                return Ok(report);
            }

            match enumerator.read_source(handle).await {
                Ok(file) => {
                    let outcome = self
                        .analyze_with_all_applicable(&file, &handle.language)
                        .await;
                    report.absorb(outcome);
                }
                Err(e) => {
                    let path = handle.path.display().to_string();
                    warn!(file = %path, error = %e, "skipping unreadable file");
                    report.unreadable.push((path, e.to_string()));
                }
            }
            report.files_analyzed += 1;
            metrics::counter!(telemetry::PROJECT_FILES_TOTAL).increment(1);

            progress(ProjectProgress {
                file_name: handle.file_name(),
                index,
                total,
            });
        }

        info!(
            job = key,
            files = report.files_analyzed,
            results = report.results,
            failures = report.failures.len(),
            "project analysis complete"
        );
        Ok(report)
    }

    /// Cancel the job registered under `key`. Unknown keys are a no-op.
    pub fn cancel_analysis(&self, key: &str) -> bool {
        let cancelled = self.jobs.cancel(key);
        if cancelled {
            info!(job = key, "cancellation requested");
        }
        cancelled
    }

    /// Cancel every running job.
    pub fn cancel_all(&self) {
        self.jobs.cancel_all();
    }

    /// End the current session: cancel every job and wait for their tasks
    /// to finish.
    ///
    /// Analyses still in flight when this is called, sweeps or direct calls,
    /// return their result to the caller but no longer write to the cache or
    /// the results index. Once this returns, clearing either store is final.
    pub async fn shutdown_jobs(&self) {
        *self.session.write() += 1;
        self.jobs.drain().await;
        debug!("jobs drained");
    }

    /// Run `store` unless the session changed since `session` was read.
    /// The session cannot advance while `store` runs.
    fn store_if_current(&self, session: u64, store: impl FnOnce()) {
        let current = self.session.read();
        if *current == session {
            store();
        } else {
            debug!("session ended during analysis, result not stored");
        }
    }

    /// Keys of jobs still running.
    pub fn running_jobs(&self) -> Vec<String> {
        self.jobs.running()
    }

    // =========================================================================
    // Results index
    // =========================================================================

    pub fn get_result(&self, file_path: &str, analyzer_id: &str) -> Option<AnalysisResult> {
        self.results.get(file_path, analyzer_id)
    }

    pub fn results_for_file(&self, file_path: &str) -> Vec<AnalysisResult> {
        self.results.for_file(file_path)
    }

    pub fn all_results(&self) -> Vec<AnalysisResult> {
        self.results.all()
    }

    /// Empty the results index. The cache is left untouched.
    pub fn clear_results(&self) {
        self.results.clear();
    }

    pub fn clear_results_for_file(&self, file_path: &str) -> usize {
        self.results.clear_file(file_path)
    }

    /// Drop every cache entry for a file, forcing the next analysis to hit
    /// the backend. Returns the number of cache entries removed.
    pub fn invalidate_file(&self, file_path: &str) -> usize {
        let removed = self
            .cache
            .invalidate_prefix(&CacheKey::file_prefix(file_path));
        debug!(file = file_path, removed, "cache invalidated for file");
        removed
    }

    pub fn statistics(&self) -> AnalysisStatistics {
        self.results.statistics()
    }
}

fn record_analysis(analyzer_id: &str, start: Instant, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::ANALYSES_TOTAL,
        "analyzer" => analyzer_id.to_string(),
        "status" => status)
    .increment(1);
    metrics::histogram!(telemetry::ANALYSIS_DURATION_SECONDS,
        "analyzer" => analyzer_id.to_string())
    .record(start.elapsed().as_secs_f64());
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("analyzer panicked: {detail}")
}
