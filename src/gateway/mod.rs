//! Progressive Disclosure Gateway
//!
//! The boundary the calling agent talks to. Discovery returns names and
//! descriptions only; the body and restrictions come back from `invoke`,
//! which also activates the skill in the caller's execution unit. Resource
//! files are read on demand through `read_resource`, which goes through the
//! unit's action check like any other read.

pub mod suggest;

use crate::bundle::{BundleLimits, IndexEntry, ResourcePaths};
use crate::config::StratumConfig;
use crate::error::{ApiError, IndexError};
use crate::execution::stack::bundle_relative;
use crate::execution::{
    ActionCheck, ActionPolicy, AuditSink, DenyReason, ExecutionUnit, TracingAuditSink,
};
use crate::index::{CapabilityIndex, IndexSettings};
use crate::storage::StorageResolver;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What the caller receives when a skill is activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub bundle_name: String,
    pub base_path: PathBuf,
    pub body: String,
    pub restrictions: Option<Vec<String>>,
    pub resources: ResourcePaths,
    /// Activation depth within the unit
    pub depth: usize,
}

/// Result of `invoke`. Not-found is an ordinary outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvokeOutcome {
    Activated(Invocation),
    NotFound {
        name: String,
        suggestion: Option<String>,
    },
}

/// Result of `read_resource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResourceRead {
    Content { path: PathBuf, content: String },
    Denied { reason: DenyReason },
}

/// Entry point for agent logic.
pub struct DisclosureGateway {
    index: Arc<CapabilityIndex>,
    policy: Arc<ActionPolicy>,
    audit: Arc<dyn AuditSink>,
    max_depth: usize,
}

impl DisclosureGateway {
    pub fn new(
        index: Arc<CapabilityIndex>,
        policy: ActionPolicy,
        audit: Arc<dyn AuditSink>,
        max_depth: usize,
    ) -> Self {
        Self {
            index,
            policy: Arc::new(policy),
            audit,
            max_depth,
        }
    }

    /// Build resolver, index, and gateway from configuration and run the
    /// initial scan. Audit records go to `tracing`.
    pub fn from_config(config: &StratumConfig, workspace_root: &Path) -> Self {
        let index = Arc::new(build_index(config, workspace_root));
        index.rebuild(true);
        Self::new(
            index,
            config.actions.clone(),
            Arc::new(TracingAuditSink),
            config.execution.max_depth,
        )
    }

    pub fn index(&self) -> &Arc<CapabilityIndex> {
        &self.index
    }

    pub fn policy(&self) -> &ActionPolicy {
        &self.policy
    }

    /// Open a new execution unit with its own activation stack.
    pub fn open_unit(&self) -> ExecutionUnit {
        ExecutionUnit::new(self.policy.clone(), self.audit.clone(), self.max_depth)
    }

    /// Throttled rescan of the storage tiers.
    pub fn refresh(&self) -> usize {
        self.index.rebuild(false)
    }

    /// Stage-1 metadata for every available skill.
    pub fn discover(&self) -> Vec<IndexEntry> {
        self.index.list_discoverable()
    }

    /// Load `name` and activate it in `unit`.
    pub fn invoke(&self, name: &str, unit: &ExecutionUnit) -> Result<InvokeOutcome, ApiError> {
        let bundle = match self.index.get_full(name) {
            Ok(bundle) => bundle,
            Err(IndexError::NotFound { name }) => {
                let entries = self.index.list_discoverable();
                let suggestion =
                    suggest::suggest(&name, entries.iter().map(|e| e.name.as_str()));
                tracing::debug!(skill = %name, ?suggestion, "Skill not found");
                return Ok(InvokeOutcome::NotFound { name, suggestion });
            }
            Err(IndexError::Load(err)) => return Err(err.into()),
        };

        let handle = unit.activate(&bundle)?;
        Ok(InvokeOutcome::Activated(Invocation {
            bundle_name: bundle.name.clone(),
            base_path: bundle.base_path.clone(),
            body: bundle.body.clone(),
            restrictions: bundle.declared_restrictions.clone(),
            resources: bundle.resources.clone(),
            depth: handle.depth,
        }))
    }

    /// Deactivate `name` in `unit` before the unit itself ends.
    pub fn conclude(&self, name: &str, unit: &ExecutionUnit) -> Result<(), ApiError> {
        let name = crate::bundle::normalize_name(name);
        if unit.frame(&name).is_none() {
            return Err(ApiError::NotActive(name));
        }
        unit.deactivate(&name)?;
        Ok(())
    }

    /// Stage 3: load a reference or asset file of a skill active in `unit`.
    pub fn read_resource(
        &self,
        name: &str,
        relative_path: &str,
        unit: &ExecutionUnit,
    ) -> Result<ResourceRead, ApiError> {
        let name = crate::bundle::normalize_name(name);
        let frame = unit
            .frame(&name)
            .ok_or_else(|| ApiError::NotActive(name.clone()))?;
        let relative = bundle_relative(&frame.base_path, relative_path)
            .ok_or_else(|| ApiError::InvalidResourcePath(relative_path.to_string()))?;
        let absolute = frame.base_path.join(&relative);
        let resolved = dunce::canonicalize(&absolute).map_err(|e| {
            ApiError::Io(format!(
                "Failed to read resource {}: {}",
                absolute.display(),
                e
            ))
        })?;
        let escapes = dunce::canonicalize(&frame.base_path)
            .map_or(true, |base| !resolved.starts_with(base));
        if escapes {
            tracing::warn!(
                skill = %name,
                path = %relative_path,
                resolved = %resolved.display(),
                "Resource resolves outside the bundle"
            );
            return Err(ApiError::InvalidResourcePath(relative_path.to_string()));
        }

        let key = self
            .policy
            .path_parameters
            .first()
            .cloned()
            .unwrap_or_else(|| "path".to_string());
        let mut parameters = Map::new();
        parameters.insert(key, Value::String(absolute.to_string_lossy().into_owned()));
        let action = self.policy.resource_read_action();
        if let ActionCheck::Deny(reason) = unit.check_action(action, &Value::Object(parameters)) {
            return Ok(ResourceRead::Denied { reason });
        }

        let content = std::fs::read_to_string(&resolved).map_err(|e| {
            ApiError::Io(format!(
                "Failed to read resource {}: {}",
                resolved.display(),
                e
            ))
        })?;
        Ok(ResourceRead::Content {
            path: relative,
            content,
        })
    }
}

/// Resolver plus index for `workspace_root`, not yet scanned.
pub fn build_index(config: &StratumConfig, workspace_root: &Path) -> CapabilityIndex {
    let resolver = StorageResolver::new(config.tiers.resolve(workspace_root));
    let limits: BundleLimits = config.limits.clone();
    CapabilityIndex::new(resolver, limits, IndexSettings::from(&config.index))
}
