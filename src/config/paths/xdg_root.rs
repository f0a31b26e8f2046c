//! XDG Base Directory utilities for personal skill and config locations.

use crate::error::ApiError;
use std::path::PathBuf;

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
/// Follows XDG Base Directory Specification
pub fn config_home() -> Result<PathBuf, ApiError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }

    let home = std::env::var("HOME").map_err(|_| {
        ApiError::ConfigError(
            "Could not determine XDG config home directory (HOME not set)".to_string(),
        )
    })?;

    Ok(PathBuf::from(home).join(".config"))
}

/// Personal skills directory: `$XDG_CONFIG_HOME/stratum/skills/`
///
/// Not created here; a missing personal tier simply does not participate.
pub fn personal_skills_dir() -> Result<PathBuf, ApiError> {
    Ok(config_home()?.join("stratum").join("skills"))
}
