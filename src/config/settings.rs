//! Configuration types mapping to `fleet.yaml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::planner::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_PAUSE};

/// Default wait for any convergence, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 1200;

/// Root configuration of the orchestrator. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Membership store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Convergence timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Retry of infra applies on state-lock contention.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Membership store settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the local store file.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Convergence timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Readiness wait after deploying an application.
    #[serde(default = "default_timeout")]
    pub deploy_secs: u64,
    /// Wait after adding or removing a unit.
    #[serde(default = "default_timeout")]
    pub unit_secs: u64,
    /// Wait after refreshing applications.
    #[serde(default = "default_timeout")]
    pub upgrade_secs: u64,
}

/// Retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total apply attempts.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Pause between attempts.
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,
}

const fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

const fn default_pause_secs() -> u64 {
    DEFAULT_PAUSE.as_secs()
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            deploy_secs: DEFAULT_TIMEOUT_SECS,
            unit_secs: DEFAULT_TIMEOUT_SECS,
            upgrade_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            pause_secs: default_pause_secs(),
        }
    }
}

impl StoreConfig {
    /// Configured store path, or `<data dir>/fleet/cluster.json`.
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("fleet")
                .join("cluster.json")
        })
    }
}

impl TimeoutConfig {
    /// Deploy readiness timeout.
    #[must_use]
    pub const fn deploy(&self) -> Duration {
        Duration::from_secs(self.deploy_secs)
    }

    /// Unit convergence timeout.
    #[must_use]
    pub const fn unit(&self) -> Duration {
        Duration::from_secs(self.unit_secs)
    }

    /// Upgrade convergence timeout.
    #[must_use]
    pub const fn upgrade(&self) -> Duration {
        Duration::from_secs(self.upgrade_secs)
    }
}

impl RetryConfig {
    /// State-lock retry policy for infra applies.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::state_lock(self.max_attempts, Duration::from_secs(self.pause_secs))
    }
}
