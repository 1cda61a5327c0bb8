//! Telemetry metric name constants.
//!
//! Centralised metric names for augur operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `augur_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `analyzer` - analyzer id (e.g. "security", "performance")
//! - `status` - outcome: "ok" or "error"
//! - `state` - lifecycle state entered (e.g. "ready", "stopped")

/// Total cache hits.
pub const CACHE_HITS_TOTAL: &str = "augur_cache_hits_total";

/// Total cache misses (absent or expired).
pub const CACHE_MISSES_TOTAL: &str = "augur_cache_misses_total";

/// Total entries evicted to stay within capacity.
///
/// Labels: `policy` ("lru" | "access_pattern").
pub const CACHE_EVICTIONS_TOTAL: &str = "augur_cache_evictions_total";

/// Total backend analyses dispatched (cache hits are not counted).
///
/// Labels: `analyzer`, `status` ("ok" | "error").
pub const ANALYSES_TOTAL: &str = "augur_analyses_total";

/// Backend analysis duration in seconds.
///
/// Labels: `analyzer`.
pub const ANALYSIS_DURATION_SECONDS: &str = "augur_analysis_duration_seconds";

/// Total files visited by project sweeps.
pub const PROJECT_FILES_TOTAL: &str = "augur_project_files_total";

/// Total lifecycle state transitions.
///
/// Labels: `state`.
pub const LIFECYCLE_TRANSITIONS_TOTAL: &str = "augur_lifecycle_transitions_total";
