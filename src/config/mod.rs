//! Configuration
//!
//! Layered configuration for tier roots, index policy, bundle limits, action
//! classification, execution limits, and logging. Sources are merged by
//! `merge::service::MergeService`; `ConfigLoader` is the public entry point.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;
pub mod tiers;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;
pub use tiers::TiersConfig;

use crate::bundle::BundleLimits;
use crate::execution::ActionPolicy;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StratumConfig {
    /// Tier root directories
    #[serde(default)]
    pub tiers: TiersConfig,

    /// Rebuild throttle and cache policy
    #[serde(default)]
    pub index: IndexConfig,

    /// Bundle size and naming limits
    #[serde(default)]
    pub limits: BundleLimits,

    /// Action classification used by restriction checks
    #[serde(default)]
    pub actions: ActionPolicy,

    /// Activation limits
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Index rebuild and cache policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Minimum time between non-forced rebuilds (milliseconds)
    #[serde(default = "default_min_rebuild_interval_ms")]
    pub min_rebuild_interval_ms: u64,

    /// Lifetime of a cached full bundle (seconds)
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_min_rebuild_interval_ms() -> u64 {
    2000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl IndexConfig {
    pub fn min_rebuild_interval(&self) -> Duration {
        Duration::from_millis(self.min_rebuild_interval_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            min_rebuild_interval_ms: default_min_rebuild_interval_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Execution-unit limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Maximum number of simultaneously active (nested) skills per unit
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    8
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}
