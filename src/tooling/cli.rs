//! CLI Tooling
//!
//! Command-line interface over the capability index and bundle writer.
//! Every command is a pure function of the workspace, configuration, and
//! tier contents, so `CliContext::execute` is testable without a process.

use crate::bundle::{self, BundleDraft, BundleWriter};
use crate::config::{ConfigLoader, StratumConfig};
use crate::error::{ApiError, IndexError};
use crate::gateway::{build_index, suggest};
use crate::index::CapabilityIndex;
use crate::logging::{LogFormat, LogOutput};
use crate::tooling::format::{
    format_roots_text, format_skill_list_text, format_skill_text, format_stats_text,
    format_validation_text, RootRow, ValidationReport,
};
use crate::types::StorageTier;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Stratum CLI - layered skill discovery, validation, and authoring
#[derive(Parser)]
#[command(name = "stratum")]
#[command(about = "Discover, validate, and author layered skill bundles")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level to stderr)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<LogOutput>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List discoverable skills (names and descriptions only)
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show a skill's full content
    Show {
        /// Skill name
        name: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Validate one bundle directory, or every bundle in all tiers
    Validate {
        /// Bundle directory; omit to validate all tiers
        path: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Force an index rebuild and report statistics
    Rebuild {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show resolved tier root directories
    Roots {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Create a new skill bundle in a tier's first root
    New {
        /// Skill name
        name: String,
        /// What the skill does and when it applies
        #[arg(long)]
        description: String,
        /// Target tier (enterprise, personal, project, plugin)
        #[arg(long, default_value = "project")]
        tier: StorageTier,
        /// Allowed tools, comma separated
        #[arg(long, value_delimiter = ',')]
        allowed_tools: Vec<String>,
        /// Declared priority within the tier
        #[arg(long)]
        priority: Option<i32>,
        /// Body text (defaults to a stub heading)
        #[arg(long)]
        body: Option<String>,
        /// Validate only; do not write anything
        #[arg(long)]
        dry_run: bool,
    },
}

/// CLI context for executing commands
pub struct CliContext {
    workspace_root: PathBuf,
    config: StratumConfig,
    index: CapabilityIndex,
}

impl CliContext {
    /// Create a new CLI context, loading configuration for `workspace_root`.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Ok(Self::with_config(workspace_root, config))
    }

    /// Create a context from an already loaded configuration.
    pub fn with_config(workspace_root: PathBuf, config: StratumConfig) -> Self {
        let index = build_index(&config, &workspace_root);
        Self {
            workspace_root,
            config,
            index,
        }
    }

    pub fn config(&self) -> &StratumConfig {
        &self.config
    }

    pub fn index(&self) -> &CapabilityIndex {
        &self.index
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::List { format } => self.handle_list(format),
            Commands::Show { name, format } => self.handle_show(name, format),
            Commands::Validate { path, format } => self.handle_validate(path.as_deref(), format),
            Commands::Rebuild { format } => self.handle_rebuild(format),
            Commands::Roots { format } => self.handle_roots(format),
            Commands::New {
                name,
                description,
                tier,
                allowed_tools,
                priority,
                body,
                dry_run,
            } => {
                let draft = BundleDraft {
                    name: name.clone(),
                    description: description.clone(),
                    body: body
                        .clone()
                        .unwrap_or_else(|| format!("# {}\n\nDescribe the procedure here.\n", name)),
                    allowed_tools: if allowed_tools.is_empty() {
                        None
                    } else {
                        Some(allowed_tools.clone())
                    },
                    priority: *priority,
                };
                self.handle_new(*tier, &draft, *dry_run)
            }
        }
    }

    fn handle_list(&self, format: &str) -> Result<String, ApiError> {
        self.index.rebuild(false);
        let entries = self.index.list_discoverable();
        match parse_format(format)? {
            OutputFormat::Json => to_json(&entries),
            OutputFormat::Text => Ok(format_skill_list_text(&entries)),
        }
    }

    fn handle_show(&self, name: &str, format: &str) -> Result<String, ApiError> {
        let format = parse_format(format)?;
        self.index.rebuild(false);
        let bundle = match self.index.get_full(name) {
            Ok(bundle) => bundle,
            Err(IndexError::NotFound { name }) => {
                let entries = self.index.list_discoverable();
                let suggestion = suggest::suggest(&name, entries.iter().map(|e| e.name.as_str()));
                return Err(ApiError::SkillNotFound { name, suggestion });
            }
            Err(err) => return Err(err.into()),
        };
        match format {
            OutputFormat::Json => to_json(&*bundle),
            OutputFormat::Text => Ok(format_skill_text(&bundle)),
        }
    }

    fn handle_validate(&self, path: Option<&Path>, format: &str) -> Result<String, ApiError> {
        let format = parse_format(format)?;
        let limits = self.index.limits();
        let mut report = ValidationReport::default();

        match path {
            Some(dir) => {
                let dir = if dir.is_absolute() {
                    dir.to_path_buf()
                } else {
                    self.workspace_root.join(dir)
                };
                report.checked = 1;
                match bundle::parse_full(&dir, StorageTier::Project, 0, limits) {
                    Ok(_) => report.valid.push(dir),
                    Err(err) => report.failures.push(err),
                }
            }
            None => {
                self.index.rebuild(true);
                report.failures = self.index.diagnostics();
                for entry in self.index.list_discoverable() {
                    match bundle::parse_full(
                        &entry.location,
                        entry.source_tier,
                        entry.source_priority,
                        limits,
                    ) {
                        Ok(_) => report.valid.push(entry.location),
                        Err(err) => report.failures.push(err),
                    }
                }
                report.checked = report.valid.len() + report.failures.len();
            }
        }

        match format {
            OutputFormat::Json => to_json(&report),
            OutputFormat::Text => Ok(format_validation_text(&report)),
        }
    }

    fn handle_rebuild(&self, format: &str) -> Result<String, ApiError> {
        let format = parse_format(format)?;
        self.index.rebuild(true);
        let stats = self.index.stats();
        match format {
            OutputFormat::Json => to_json(&stats),
            OutputFormat::Text => Ok(format_stats_text(&stats)),
        }
    }

    fn handle_roots(&self, format: &str) -> Result<String, ApiError> {
        let format = parse_format(format)?;
        let roots = self.index.resolver().roots();
        let rows: Vec<RootRow> = StorageTier::ALL
            .into_iter()
            .flat_map(|tier| {
                roots.for_tier(tier).iter().map(move |path| RootRow {
                    tier,
                    path: path.clone(),
                    exists: path.is_dir(),
                })
            })
            .collect();
        match format {
            OutputFormat::Json => to_json(&rows),
            OutputFormat::Text => Ok(format_roots_text(&rows)),
        }
    }

    fn handle_new(
        &self,
        tier: StorageTier,
        draft: &BundleDraft,
        dry_run: bool,
    ) -> Result<String, ApiError> {
        let writer = BundleWriter::new(self.index.resolver(), self.index.limits());
        if dry_run {
            let manifest = writer.check(tier, draft)?;
            return Ok(format!(
                "Valid. Would write {} ({} tier)",
                manifest.display(),
                tier
            ));
        }
        let dir = writer.create(tier, draft)?;
        self.index.rebuild(true);
        Ok(format!("Created skill bundle at {} ({} tier)", dir.display(), tier))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_format(format: &str) -> Result<OutputFormat, ApiError> {
    match format {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => Err(ApiError::ConfigError(format!(
            "Invalid format: {} (must be 'text' or 'json')",
            other
        ))),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::ConfigError(format!("Failed to serialize output: {}", e)))
}
