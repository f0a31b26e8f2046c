//! Logging
//!
//! Structured logging through `tracing`. Library code only emits events;
//! the binary (or an embedding host) installs the subscriber. Audit records
//! from execution units go to the `stratum::audit` target and get their own
//! level so they stay visible when everything else is quiet.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt as layer_fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tracing_subscriber::{EnvFilter, Registry};

/// Target used by [`crate::execution::TracingAuditSink`].
pub const AUDIT_TARGET: &str = "stratum::audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!(
                "invalid log format '{}' (expected text or json)",
                other
            )),
        }
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogOutput {
    #[serde(rename = "stdout")]
    Stdout,
    #[default]
    #[serde(rename = "stderr")]
    Stderr,
    #[serde(rename = "file")]
    File,
    #[serde(rename = "file+stderr")]
    FileAndStderr,
    /// stdout and stderr
    #[serde(rename = "both")]
    Both,
}

impl LogOutput {
    pub fn writes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::FileAndStderr)
    }

    fn writer(self, file: Option<Arc<File>>) -> BoxMakeWriter {
        match (self, file) {
            (LogOutput::File, Some(file)) => BoxMakeWriter::new(file),
            (LogOutput::FileAndStderr, Some(file)) => BoxMakeWriter::new(file.and(std::io::stderr)),
            (LogOutput::Stdout, _) => BoxMakeWriter::new(std::io::stdout),
            (LogOutput::Both, _) => BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)),
            _ => BoxMakeWriter::new(std::io::stderr),
        }
    }
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            "file+stderr" => Ok(LogOutput::FileAndStderr),
            "both" => Ok(LogOutput::Both),
            other => Err(format!(
                "invalid log output '{}' (expected stdout, stderr, file, file+stderr, or both)",
                other
            )),
        }
    }
}

impl fmt::Display for LogOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogOutput::Stdout => "stdout",
            LogOutput::Stderr => "stderr",
            LogOutput::File => "file",
            LogOutput::FileAndStderr => "file+stderr",
            LogOutput::Both => "both",
        };
        f.write_str(s)
    }
}

/// `[logging]` section of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Base level: trace, debug, info, warn, error, off
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Log file when `output` includes a file; `None` uses the state directory
    pub file: Option<PathBuf>,
    /// ANSI colors for text output on a terminal stream
    pub color: bool,
    /// Level for activation, deactivation, and denial records
    pub audit_level: String,
    /// Per-module levels, e.g. `"stratum::index" = "debug"`
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "warn".to_string(),
            format: LogFormat::Text,
            output: LogOutput::Stderr,
            file: None,
            color: true,
            audit_level: "info".to_string(),
            modules: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Apply `STRATUM_LOG_FORMAT`, `STRATUM_LOG_OUTPUT`, and `STRATUM_LOG_FILE`.
    pub fn with_env_overrides(mut self) -> Result<Self, ApiError> {
        if let Ok(format) = std::env::var("STRATUM_LOG_FORMAT") {
            self.format = format.parse().map_err(ApiError::ConfigError)?;
        }
        if let Ok(output) = std::env::var("STRATUM_LOG_OUTPUT") {
            self.output = output.parse().map_err(ApiError::ConfigError)?;
        }
        if let Ok(file) = std::env::var("STRATUM_LOG_FILE") {
            if !file.is_empty() {
                self.file = Some(PathBuf::from(file));
            }
        }
        Ok(self)
    }

    /// Filter directives in the order they are added: base level, audit
    /// target, configured modules, then `STRATUM_LOG_MODULES` entries.
    pub fn directives(&self, env_modules: Option<&str>) -> Vec<String> {
        let mut directives = vec![self.level.clone()];
        if self.level != "off" {
            directives.push(format!("{}={}", AUDIT_TARGET, self.audit_level));
        }
        for (module, level) in &self.modules {
            directives.push(format!("{}={}", module, level));
        }
        if let Some(spec) = env_modules {
            for pair in spec.split(',') {
                if let Some((module, level)) = pair.split_once('=') {
                    let (module, level) = (module.trim(), level.trim());
                    if !module.is_empty() && !level.is_empty() {
                        directives.push(format!("{}={}", module, level));
                    }
                }
            }
        }
        directives
    }

    fn env_filter(&self) -> Result<EnvFilter, ApiError> {
        if let Ok(filter) = EnvFilter::try_from_env("STRATUM_LOG") {
            return Ok(filter);
        }
        let env_modules = std::env::var("STRATUM_LOG_MODULES").ok();
        let mut directives = self.directives(env_modules.as_deref()).into_iter();
        let mut filter = EnvFilter::new(directives.next().unwrap_or_default());
        for directive in directives {
            let parsed = directive.parse::<Directive>().map_err(|e| {
                ApiError::ConfigError(format!("Invalid log directive '{}': {}", directive, e))
            })?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }
}

/// Resolve the log file: explicit path, then `STRATUM_LOG_FILE`, then the
/// platform state directory.
pub fn resolve_log_file_path(explicit: Option<PathBuf>) -> Result<PathBuf, ApiError> {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os("STRATUM_LOG_FILE").filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let dirs = directories::ProjectDirs::from("", "stratum", "stratum").ok_or_else(|| {
        ApiError::ConfigError("Could not determine platform state directory for log file".into())
    })?;
    let state = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
    Ok(state.join("stratum.log"))
}

fn open_log_file(path: &Path) -> Result<File, ApiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ApiError::ConfigError(format!("Failed to create log directory: {}", e)))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            ApiError::ConfigError(format!("Failed to open log file {}: {}", path.display(), e))
        })
}

/// Install the global subscriber. Environment variables override `config`.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ApiError> {
    let install_err = |e: tracing_subscriber::util::TryInitError| {
        ApiError::ConfigError(format!("Failed to install logger: {}", e))
    };
    if !config.enabled {
        return Registry::default()
            .with(EnvFilter::new("off"))
            .try_init()
            .map_err(install_err);
    }

    let config = config.clone().with_env_overrides()?;
    let filter = config.env_filter()?;
    let file = if config.output.writes_file() {
        let path = resolve_log_file_path(config.file.clone())?;
        Some(Arc::new(open_log_file(&path)?))
    } else {
        None
    };
    let writer = config.output.writer(file);
    let subscriber = Registry::default().with(filter);

    let installed = match config.format {
        LogFormat::Json => subscriber
            .with(
                layer_fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Text => subscriber
            .with(
                layer_fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(config.color && !config.output.writes_file())
                    .with_writer(writer),
            )
            .try_init(),
    };
    installed.map_err(install_err)
}
