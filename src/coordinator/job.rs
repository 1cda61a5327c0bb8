//! Cancellable background jobs (whole-project sweeps).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

use crate::Result;
use crate::types::{AnalyzerFailure, BatchOutcome};

/// Key under which whole-project sweeps are registered by default.
pub const PROJECT_JOB_KEY: &str = "project-analysis";

/// Progress report emitted after each file of a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectProgress {
    /// Name of the file that was just analyzed.
    pub file_name: String,
    /// Zero-based position of that file in the sweep.
    pub index: usize,
    pub total: usize,
}

impl ProjectProgress {
    /// Fraction of the sweep completed, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.index + 1) as f64 / self.total as f64
        }
    }
}

/// How a sweep ended. Cancellation is a normal ending, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepStatus {
    Completed,
    Cancelled,
}

/// Summary of a whole-project sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectReport {
    pub status: SweepStatus,
    pub files_total: usize,
    pub files_analyzed: usize,
    pub results: usize,
    pub failures: Vec<AnalyzerFailure>,
    /// Files that could not be read, with the reason.
    pub unreadable: Vec<(String, String)>,
}

impl ProjectReport {
    pub(crate) fn new(files_total: usize) -> Self {
        Self {
            status: SweepStatus::Completed,
            files_total,
            files_analyzed: 0,
            results: 0,
            failures: Vec::new(),
            unreadable: Vec::new(),
        }
    }

    pub(crate) fn absorb(&mut self, outcome: BatchOutcome) {
        self.results += outcome.results.len();
        self.failures.extend(outcome.failures);
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SweepStatus::Cancelled
    }
}

/// Handle to a running sweep.
///
/// Dropping the handle does not stop the job; call [`cancel`](Self::cancel)
/// or [`AnalysisCoordinator::cancel_analysis`](crate::AnalysisCoordinator::cancel_analysis).
pub struct ProjectJob {
    key: String,
    token: CancellationToken,
    handle: JoinHandle<Result<ProjectReport>>,
}

impl ProjectJob {
    pub(crate) fn new(
        key: String,
        token: CancellationToken,
        handle: JoinHandle<Result<ProjectReport>>,
    ) -> Self {
        Self { key, token, handle }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Request cancellation. Takes effect before the next file.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the sweep to end.
    ///
    /// Errors only when the sweep could not run at all (e.g. no workspace)
    /// or its task panicked.
    pub async fn wait(self) -> Result<ProjectReport> {
        self.handle.await?
    }
}

/// Named cancellation tokens for running jobs, plus the tasks running them.
#[derive(Default)]
pub(crate) struct JobRegistry {
    jobs: Mutex<HashMap<String, (u64, CancellationToken)>>,
    next_id: AtomicU64,
    tasks: TaskTracker,
}

impl JobRegistry {
    /// Register a job under `key`, cancelling any job already running there.
    pub(crate) fn register(self: &Arc<Self>, key: &str) -> (JobGuard, CancellationToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = self
            .jobs
            .lock()
            .insert(key.to_string(), (id, token.clone()));
        if let Some((_, previous)) = previous {
            debug!(key, "superseding running job");
            previous.cancel();
        }
        let guard = JobGuard {
            registry: Arc::clone(self),
            key: key.to_string(),
            id,
        };
        (guard, token)
    }

    /// Cancel the job under `key`. Returns false if none is running.
    pub(crate) fn cancel(&self, key: &str) -> bool {
        match self.jobs.lock().get(key) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn cancel_all(&self) {
        for (_, token) in self.jobs.lock().values() {
            token.cancel();
        }
    }

    /// Spawn a job's task so that [`drain`](Self::drain) can wait for it.
    pub(crate) fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tasks.spawn(task)
    }

    /// Cancel every job and wait until all of their tasks have ended.
    ///
    /// A job finishes the file it is working on before it observes the
    /// cancellation, so this returns once that file is done.
    pub(crate) async fn drain(&self) {
        self.cancel_all();
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    pub(crate) fn running(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.jobs.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn finish(&self, key: &str, id: u64) {
        let mut jobs = self.jobs.lock();
        if jobs.get(key).is_some_and(|(current, _)| *current == id) {
            jobs.remove(key);
        }
    }
}

/// Removes a job's registration when the job's task ends, however it ends.
pub(crate) struct JobGuard {
    registry: Arc<JobRegistry>,
    key: String,
    id: u64,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.registry.finish(&self.key, self.id);
    }
}
