//! Core types shared across the resolver, index, and execution layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage tier a bundle was discovered in.
///
/// Declared highest precedence first; `rank()` gives the numeric value used in
/// the `(rank, priority)` winner comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    Enterprise,
    Personal,
    Project,
    Plugin,
}

impl StorageTier {
    /// All tiers in enumeration order (highest precedence first).
    pub const ALL: [StorageTier; 4] = [
        StorageTier::Enterprise,
        StorageTier::Personal,
        StorageTier::Project,
        StorageTier::Plugin,
    ];

    pub fn rank(self) -> u8 {
        match self {
            StorageTier::Enterprise => 4,
            StorageTier::Personal => 3,
            StorageTier::Project => 2,
            StorageTier::Plugin => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StorageTier::Enterprise => "enterprise",
            StorageTier::Personal => "personal",
            StorageTier::Project => "project",
            StorageTier::Plugin => "plugin",
        }
    }
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enterprise" => Ok(StorageTier::Enterprise),
            "personal" | "user" => Ok(StorageTier::Personal),
            "project" => Ok(StorageTier::Project),
            "plugin" => Ok(StorageTier::Plugin),
            other => Err(format!(
                "unknown tier '{}' (expected enterprise, personal, project, or plugin)",
                other
            )),
        }
    }
}

/// Winner ordering key: tier rank first, then declared priority.
pub type Precedence = (u8, i32);
