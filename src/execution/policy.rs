//! Action classification and target-path extraction.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

/// How action ids and parameters are interpreted by restriction checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPolicy {
    /// Actions that load file content into the caller's context
    #[serde(default = "default_read_actions")]
    pub read_actions: Vec<String>,

    /// Actions that run a target rather than read it
    #[serde(default = "default_execute_actions")]
    pub execute_actions: Vec<String>,

    /// Parameter keys that may name a target path
    #[serde(default = "default_path_parameters")]
    pub path_parameters: Vec<String>,
}

fn default_read_actions() -> Vec<String> {
    ["Read", "read_file", "view", "cat", "open"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_execute_actions() -> Vec<String> {
    ["Bash", "execute", "run_script", "shell"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_path_parameters() -> Vec<String> {
    ["path", "file_path", "file", "target", "script"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self {
            read_actions: default_read_actions(),
            execute_actions: default_execute_actions(),
            path_parameters: default_path_parameters(),
        }
    }
}

impl ActionPolicy {
    /// Content-read action. An id listed as both read and execute counts as execute.
    pub fn is_read(&self, action_id: &str) -> bool {
        !self.is_execute(action_id) && contains_ignore_case(&self.read_actions, action_id)
    }

    pub fn is_execute(&self, action_id: &str) -> bool {
        contains_ignore_case(&self.execute_actions, action_id)
    }

    /// Action id used when the gateway loads a resource on the caller's behalf.
    pub fn resource_read_action(&self) -> &str {
        self.read_actions
            .first()
            .map(String::as_str)
            .unwrap_or("Read")
    }

    /// String values of the configured path parameters (arrays of strings included).
    pub fn target_paths<'a>(&self, parameters: &'a Value) -> Vec<&'a str> {
        let Some(object) = parameters.as_object() else {
            return Vec::new();
        };
        let mut targets = Vec::new();
        for key in &self.path_parameters {
            match object.get(key) {
                Some(Value::String(s)) => targets.push(s.as_str()),
                Some(Value::Array(items)) => {
                    targets.extend(items.iter().filter_map(Value::as_str));
                }
                _ => {}
            }
        }
        targets
    }
}

fn contains_ignore_case(list: &[String], action_id: &str) -> bool {
    list.iter().any(|a| a.eq_ignore_ascii_case(action_id))
}

/// Resolve `.` and `..` without touching the filesystem.
///
/// Leading `..` components of a relative path are kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// `target` as a path on disk: relative targets are taken as bundle-relative.
pub fn anchor_target(base: &Path, target: &str) -> Option<PathBuf> {
    let target = Path::new(target.trim());
    if target.as_os_str().is_empty() {
        None
    } else if target.is_absolute() {
        Some(target.to_path_buf())
    } else {
        Some(base.join(target))
    }
}

/// Bundle-relative form of `target`, if it points inside `base`.
///
/// Compared lexically first, then by canonical path when both exist. This
/// names the path the caller wrote; symlinks inside the bundle are not
/// resolved, so callers guarding content must also compare canonical paths.
pub fn relative_to_base(base: &Path, canonical_base: Option<&Path>, target: &str) -> Option<PathBuf> {
    let joined = anchor_target(base, target)?;
    let normalized = normalize_lexically(&joined);
    if let Ok(rel) = normalized.strip_prefix(normalize_lexically(base)) {
        return Some(rel.to_path_buf());
    }

    let canonical_base = canonical_base?;
    let canonical = dunce::canonicalize(&joined).ok()?;
    canonical
        .strip_prefix(canonical_base)
        .ok()
        .map(Path::to_path_buf)
}
