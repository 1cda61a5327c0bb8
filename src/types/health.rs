//! Backend health and configuration snapshot types

use serde::{Deserialize, Serialize};

use crate::lifecycle::LifecycleState;

/// Status string a backend reports when it is fully operational.
pub const HEALTHY_STATUS: &str = "healthy";

/// Status reported when the backend health check itself failed.
pub const ERROR_STATUS: &str = "error";

/// Status reported when the manager is not `Ready` and the backend was not checked.
pub const NOT_RUNNING_STATUS: &str = "not_running";

/// What a backend reports from its own health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHealth {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl BackendHealth {
    pub fn healthy(version: impl Into<String>) -> Self {
        Self {
            status: HEALTHY_STATUS.to_string(),
            version: Some(version.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HEALTHY_STATUS
    }
}

/// Returned by a backend once it accepts connections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitResult {
    #[serde(default)]
    pub version: Option<String>,
    /// Analyzer ids (or feature names) the backend advertises.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Consolidated health report. Built on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub state: LifecycleState,
    pub backend_status: String,
    pub backend_version: Option<String>,
    pub analysis_count: usize,
    pub cache_entry_count: usize,
    pub overall_healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Read-only snapshot of effective configuration, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationSummary {
    pub version: String,
    pub backend: String,
    pub backend_endpoint: Option<String>,
    pub project_root: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub analyzer_count: usize,
    pub enabled_analyzer_count: usize,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub eviction_policy: String,
    pub auto_start: bool,
}
