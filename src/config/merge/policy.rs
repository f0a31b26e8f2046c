//! Merge policy: built-in defaults every load starts from.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Builder seeded with scalar defaults; later sources override them key by key.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("index.min_rebuild_interval_ms", 2000_i64)?
        .set_default("index.cache_ttl_secs", 300_i64)?
        .set_default("execution.max_depth", 8_i64)?
        .set_default("limits.max_body_lines", 500_i64)
}
