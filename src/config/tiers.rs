//! Tier root configuration and resolution to concrete directories.

use super::xdg;
use crate::storage::TierRoots;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default enterprise (system-wide) skills root.
pub const DEFAULT_ENTERPRISE_ROOT: &str = "/etc/stratum/skills";

/// Project skills live under this directory of the workspace.
pub const PROJECT_SKILLS_DIR: &str = ".stratum/skills";

/// Per-tier root overrides. `None` means "use the default location".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiersConfig {
    #[serde(default)]
    pub enterprise: Option<Vec<PathBuf>>,

    #[serde(default)]
    pub personal: Option<Vec<PathBuf>>,

    /// Relative entries resolve against the workspace root
    #[serde(default)]
    pub project: Option<Vec<PathBuf>>,

    /// Plugin-provided roots; there are none by default
    #[serde(default)]
    pub plugin: Vec<PathBuf>,
}

impl TiersConfig {
    /// Resolve configured and default roots for `workspace_root`.
    ///
    /// An undeterminable personal root (no `HOME`) leaves the tier empty.
    pub fn resolve(&self, workspace_root: &Path) -> TierRoots {
        let enterprise = self
            .enterprise
            .clone()
            .unwrap_or_else(|| vec![PathBuf::from(DEFAULT_ENTERPRISE_ROOT)]);

        let personal = match &self.personal {
            Some(roots) => roots.clone(),
            None => match xdg::personal_skills_dir() {
                Ok(dir) => vec![dir],
                Err(e) => {
                    tracing::debug!("Personal tier disabled: {}", e);
                    Vec::new()
                }
            },
        };

        let project = match &self.project {
            Some(roots) => roots
                .iter()
                .map(|p| anchor(workspace_root, p))
                .collect(),
            None => vec![workspace_root.join(PROJECT_SKILLS_DIR)],
        };

        let plugin = self
            .plugin
            .iter()
            .map(|p| anchor(workspace_root, p))
            .collect();

        TierRoots {
            enterprise,
            personal,
            project,
            plugin,
        }
    }
}

fn anchor(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}
