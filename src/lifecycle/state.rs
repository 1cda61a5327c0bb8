//! Lifecycle states.

use std::fmt;

use serde::Serialize;

/// Where the [`LifecycleManager`](super::LifecycleManager) is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Constructed, never initialized (or a start attempt failed).
    #[default]
    Uninitialized,
    /// Backend start in progress.
    Initializing,
    /// Initialized with auto-start disabled; the backend has not been touched.
    Idle,
    /// Backend started; analyses can run.
    Ready,
    /// Stop in progress.
    Stopping,
    /// Backend stopped; `start` may bring it back.
    Stopped,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Idle => "idle",
            LifecycleState::Ready => "ready",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        }
    }

    /// States from which `start` may proceed.
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            LifecycleState::Uninitialized | LifecycleState::Idle | LifecycleState::Stopped
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
