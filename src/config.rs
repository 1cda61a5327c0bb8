//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.augur/config.toml` (user)
//! 3. `/etc/augur/config.toml` (system)
//!
//! Every key is optional; missing sections fall back to defaults.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::EvictionPolicy;
use crate::traits::SettingsProvider;
use crate::types::AnalyzerDescriptor;
use crate::{AugurError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub lifecycle: LifecycleSettings,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub analyzers: AnalyzerSettings,
    #[serde(default)]
    pub project: ProjectConfig,
}

/// Which eviction policy to use, as spelled in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionKind {
    #[default]
    Lru,
    AccessPattern,
}

/// `[cache]`
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Entry lifetime in seconds (default: 3600).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Capacity ceiling (default: 1000).
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default)]
    pub eviction: EvictionKind,
    /// Protection window for `access_pattern` eviction (default: 60).
    #[serde(default = "default_protect_window_secs")]
    pub protect_window_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
            eviction: EvictionKind::default(),
            protect_window_secs: default_protect_window_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_max_entries() -> usize {
    1000
}

fn default_protect_window_secs() -> u64 {
    60
}

/// `[lifecycle]`
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleSettings {
    /// Start the backend during `initialize` (default: true).
    #[serde(default = "default_true")]
    pub auto_start: bool,
    /// Pause between stop and start on restart (default: 1000).
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            auto_start: true,
            restart_delay_ms: default_restart_delay_ms(),
        }
    }
}

fn default_restart_delay_ms() -> u64 {
    1000
}

/// `[backend]`
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the wizards service (default: http://localhost:8000).
    #[serde(default = "default_backend_url")]
    pub url: String,
    /// Per-request timeout in seconds (default: 120).
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
    /// LLM provider the service is configured with. Display only.
    #[serde(default)]
    pub provider: Option<String>,
    /// Model the service is configured with. Display only.
    #[serde(default)]
    pub model: Option<String>,
    /// Per-analyzer action path under `/api/v1/wizards/`, e.g.
    /// `security = "security/scan-snippet"`. Unlisted analyzers use
    /// `{id}/analyze`.
    #[serde(default)]
    pub routes: BTreeMap<String, String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_backend_timeout(),
            provider: None,
            model: None,
            routes: BTreeMap::new(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_backend_timeout() -> u64 {
    120
}

/// `[analyzers]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzerSettings {
    /// Allow-list of analyzer ids. Absent = every registered analyzer.
    #[serde(default)]
    pub enabled: Option<Vec<String>>,
    /// Additional analyzers, as `[[analyzers.custom]]` tables.
    #[serde(default)]
    pub custom: Vec<AnalyzerDescriptor>,
}

/// `[project]`
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Project root for sweeps. Absent = current directory.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Files larger than this are skipped by sweeps (default: 1 MiB).
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: None,
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    1024 * 1024
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.augur/config.toml`
    /// 3. `/etc/augur/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?.ok_or_else(|| {
            AugurError::Configuration(
                "No config file found. Create ~/.augur/config.toml or /etc/augur/config.toml"
                    .to_string(),
            )
        })?;
        Self::load_from_file(&path)
    }

    /// Like [`load`](Self::load), but falls back to defaults when no config
    /// file exists. An explicit path that does not exist is still an error.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| AugurError::Configuration(format!("Failed to parse config: {e}")))
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AugurError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            AugurError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(AugurError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".augur").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/augur/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

impl SettingsProvider for Config {
    fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    fn cache_max_entries(&self) -> usize {
        self.cache.max_entries
    }

    fn cache_enabled(&self) -> bool {
        self.cache.enabled
    }

    fn eviction_policy(&self) -> EvictionPolicy {
        match self.cache.eviction {
            EvictionKind::Lru => EvictionPolicy::LeastRecentlyAccessed,
            EvictionKind::AccessPattern => EvictionPolicy::AccessPattern {
                protect_window: Duration::from_secs(self.cache.protect_window_secs),
            },
        }
    }

    fn auto_start(&self) -> bool {
        self.lifecycle.auto_start
    }

    fn enabled_analyzers(&self) -> Option<BTreeSet<String>> {
        self.analyzers
            .enabled
            .as_ref()
            .map(|ids| ids.iter().cloned().collect())
    }

    fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.lifecycle.restart_delay_ms)
    }

    fn provider(&self) -> Option<String> {
        self.backend.provider.clone()
    }

    fn model(&self) -> Option<String> {
        self.backend.model.clone()
    }

    fn project_root(&self) -> Option<PathBuf> {
        self.project.root.clone()
    }
}
