//! Execution control
//!
//! Each execution unit (one task or request) owns exactly one
//! `ExecutionContextStack`. Every action the unit attempts while a skill is
//! active goes through `check_action`, which answers with an `ActionCheck`
//! value. Denials are results, never errors.

pub mod audit;
pub mod policy;
pub mod stack;
pub mod unit;

pub use audit::{AuditKind, AuditRecord, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use policy::ActionPolicy;
pub use stack::{ActivationFrame, ActivationHandle, ExecutionContextStack};
pub use unit::{ExecutionUnit, UnitOutcome};

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique execution unit identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UnitId(u64);

static NEXT_UNIT_ID: AtomicU64 = AtomicU64::new(1);

impl UnitId {
    pub fn next() -> Self {
        UnitId(NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}

/// An action the dispatch layer is about to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub action: String,
    pub parameters: Value,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, parameters: Value) -> Self {
        Self {
            action: action.into(),
            parameters,
        }
    }
}

/// Why an action was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenyReason {
    /// The action is not in the innermost skill's allow-set
    RestrictionViolation {
        skill: String,
        action: String,
        allowed: Vec<String>,
    },
    /// A read action targeted a script shipped by an active skill
    ScriptReadViolation {
        skill: String,
        action: String,
        path: PathBuf,
    },
}

impl DenyReason {
    pub fn skill(&self) -> &str {
        match self {
            DenyReason::RestrictionViolation { skill, .. }
            | DenyReason::ScriptReadViolation { skill, .. } => skill,
        }
    }

    /// Corrective message suitable for showing to the calling agent.
    pub fn message(&self) -> String {
        match self {
            DenyReason::RestrictionViolation {
                skill,
                action,
                allowed,
            } => format!(
                "'{}' is not allowed while skill '{}' is active (allowed: {})",
                action,
                skill,
                if allowed.is_empty() {
                    "none".to_string()
                } else {
                    allowed.join(", ")
                }
            ),
            DenyReason::ScriptReadViolation {
                skill,
                action,
                path,
            } => format!(
                "'{}' cannot read script {} of skill '{}'; execute it instead",
                action,
                path.display(),
                skill
            ),
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Outcome of `check_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCheck {
    Allow,
    Deny(DenyReason),
}

impl ActionCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ActionCheck::Allow)
    }

    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            ActionCheck::Allow => None,
            ActionCheck::Deny(reason) => Some(reason),
        }
    }
}
