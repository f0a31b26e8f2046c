//! Per-unit activation stack and the single action choke point.

use super::audit::{AuditKind, AuditRecord, AuditSink};
use super::policy::{self, ActionPolicy};
use super::{ActionCheck, DenyReason, UnitId};
use crate::bundle::{restriction_tool_id, CapabilityBundle};
use crate::error::StackError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One active skill within an execution unit.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationFrame {
    pub bundle_name: String,
    /// Allow-set frozen at activation; `None` means unrestricted
    pub resolved_restrictions: Option<Vec<String>>,
    pub base_path: PathBuf,
    pub activated_at: DateTime<Utc>,
    #[serde(skip)]
    script_paths: Vec<PathBuf>,
    #[serde(skip)]
    canonical_base: Option<PathBuf>,
    /// `(resolved path, bundle-relative path)` for scripts that exist on disk
    #[serde(skip)]
    canonical_scripts: Vec<(PathBuf, PathBuf)>,
}

impl ActivationFrame {
    fn from_bundle(bundle: &CapabilityBundle) -> Self {
        Self {
            bundle_name: bundle.name.clone(),
            resolved_restrictions: bundle.declared_restrictions.clone(),
            base_path: bundle.base_path.clone(),
            activated_at: Utc::now(),
            script_paths: bundle
                .resources
                .scripts
                .iter()
                .map(|p| policy::normalize_lexically(p))
                .collect(),
            canonical_base: dunce::canonicalize(&bundle.base_path).ok(),
            canonical_scripts: bundle
                .resources
                .scripts
                .iter()
                .filter_map(|p| {
                    let resolved = dunce::canonicalize(bundle.base_path.join(p)).ok()?;
                    Some((resolved, p.clone()))
                })
                .collect(),
        }
    }

    /// Whether the frozen allow-set admits `action_id`.
    pub fn allows(&self, action_id: &str) -> bool {
        match &self.resolved_restrictions {
            None => true,
            Some(allowed) => allowed
                .iter()
                .any(|token| restriction_tool_id(token) == action_id),
        }
    }

    /// Script of this bundle that `target` points at, if any.
    ///
    /// Matches the path as written, then the resolved path, so a link to a
    /// script (or a link to a directory holding one) is still a script.
    pub fn script_target(&self, target: &str) -> Option<PathBuf> {
        let lexical =
            policy::relative_to_base(&self.base_path, self.canonical_base.as_deref(), target)
                .map(|relative| policy::normalize_lexically(&relative));
        if let Some(relative) = lexical {
            if let Some(script) = self.script_paths.iter().find(|s| **s == relative) {
                return Some(script.clone());
            }
        }

        let resolved = dunce::canonicalize(policy::anchor_target(&self.base_path, target)?).ok()?;
        self.canonical_scripts
            .iter()
            .find(|(script, _)| *script == resolved)
            .map(|(_, relative)| relative.clone())
    }

    pub fn script_paths(&self) -> &[PathBuf] {
        &self.script_paths
    }
}

/// Proof of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationHandle {
    pub unit: UnitId,
    pub name: String,
    /// Stack depth after the push (1 for the outermost skill)
    pub depth: usize,
    pub activated_at: DateTime<Utc>,
}

/// Active skills of one execution unit, innermost last.
pub struct ExecutionContextStack {
    unit: UnitId,
    frames: Vec<ActivationFrame>,
    policy: Arc<ActionPolicy>,
    audit: Arc<dyn AuditSink>,
    max_depth: usize,
}

impl std::fmt::Debug for ExecutionContextStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContextStack")
            .field("unit", &self.unit)
            .field("frames", &self.frames)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl ExecutionContextStack {
    pub fn new(
        unit: UnitId,
        policy: Arc<ActionPolicy>,
        audit: Arc<dyn AuditSink>,
        max_depth: usize,
    ) -> Self {
        Self {
            unit,
            frames: Vec::new(),
            policy,
            audit,
            max_depth,
        }
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_idle(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn innermost(&self) -> Option<&ActivationFrame> {
        self.frames.last()
    }

    pub fn frames(&self) -> &[ActivationFrame] {
        &self.frames
    }

    pub fn frame(&self, name: &str) -> Option<&ActivationFrame> {
        self.frames.iter().find(|f| f.bundle_name == name)
    }

    /// Push a frame for `bundle`.
    pub fn activate(&mut self, bundle: &CapabilityBundle) -> Result<ActivationHandle, StackError> {
        if self.frame(&bundle.name).is_some() {
            return Err(StackError::AlreadyActive {
                name: bundle.name.clone(),
                unit: self.unit.to_string(),
            });
        }
        if self.frames.len() >= self.max_depth {
            return Err(StackError::DepthExceeded {
                max: self.max_depth,
            });
        }

        let frame = ActivationFrame::from_bundle(bundle);
        let handle = ActivationHandle {
            unit: self.unit,
            name: frame.bundle_name.clone(),
            depth: self.frames.len() + 1,
            activated_at: frame.activated_at,
        };
        self.audit.record(
            AuditRecord::new(AuditKind::Activated, self.unit, &frame.bundle_name)
                .with_restrictions(frame.resolved_restrictions.clone())
                .with_detail(format!("depth {}", handle.depth)),
        );
        self.frames.push(frame);
        Ok(handle)
    }

    /// Pop the innermost frame, which must be `name`.
    pub fn deactivate(&mut self, name: &str) -> Result<(), StackError> {
        let innermost = self.frames.last().map(|f| f.bundle_name.clone());
        if innermost.as_deref() != Some(name) {
            return Err(StackError::StackDiscipline {
                requested: name.to_string(),
                innermost,
            });
        }
        if let Some(frame) = self.frames.pop() {
            self.audit.record(
                AuditRecord::new(AuditKind::Deactivated, self.unit, frame.bundle_name)
                    .with_restrictions(frame.resolved_restrictions),
            );
        }
        Ok(())
    }

    /// Decide whether `action_id` with `parameters` may run.
    ///
    /// The allow-set comes from the innermost frame. Script reads are checked
    /// against every active frame, independent of the allow-set.
    pub fn check_action(&self, action_id: &str, parameters: &Value) -> ActionCheck {
        let Some(innermost) = self.frames.last() else {
            return ActionCheck::Allow;
        };

        if !innermost.allows(action_id) {
            return self.deny(DenyReason::RestrictionViolation {
                skill: innermost.bundle_name.clone(),
                action: action_id.to_string(),
                allowed: innermost.resolved_restrictions.clone().unwrap_or_default(),
            });
        }

        if self.policy.is_read(action_id) {
            for target in self.policy.target_paths(parameters) {
                for frame in self.frames.iter().rev() {
                    if let Some(script) = frame.script_target(target) {
                        return self.deny(DenyReason::ScriptReadViolation {
                            skill: frame.bundle_name.clone(),
                            action: action_id.to_string(),
                            path: script,
                        });
                    }
                }
            }
        }

        ActionCheck::Allow
    }

    /// Pop every frame unconditionally, innermost first. Returns the count.
    pub fn unwind(&mut self, reason: &str) -> usize {
        let count = self.frames.len();
        while let Some(frame) = self.frames.pop() {
            self.audit.record(
                AuditRecord::new(AuditKind::Unwound, self.unit, frame.bundle_name)
                    .with_restrictions(frame.resolved_restrictions)
                    .with_detail(reason),
            );
        }
        count
    }

    fn deny(&self, reason: DenyReason) -> ActionCheck {
        self.audit.record(
            AuditRecord::new(AuditKind::Denied, self.unit, reason.skill())
                .with_detail(reason.message()),
        );
        ActionCheck::Deny(reason)
    }
}

/// Normalized bundle-relative path helper shared with the gateway.
pub(crate) fn bundle_relative(base: &Path, target: &str) -> Option<PathBuf> {
    let canonical = dunce::canonicalize(base).ok();
    policy::relative_to_base(base, canonical.as_deref(), target)
        .map(|p| policy::normalize_lexically(&p))
        .filter(|p| !p.starts_with(".."))
}
