//! Execution units: the owner of one activation stack.
//!
//! Completion is guaranteed. `complete` runs the unwind and the registered
//! callbacks; if the unit is dropped first (early return, panic, or a
//! cancelled async task), `Drop` does the same.

use super::audit::AuditSink;
use super::policy::ActionPolicy;
use super::stack::{ActivationFrame, ActivationHandle, ExecutionContextStack};
use super::{ActionCheck, ActionRequest, UnitId};
use crate::bundle::CapabilityBundle;
use crate::error::StackError;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// How an execution unit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitOutcome::Succeeded => "succeeded",
            UnitOutcome::Failed => "failed",
            UnitOutcome::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

type CompletionCallback = Box<dyn FnOnce(UnitId, UnitOutcome) + Send>;

/// One task or request lifetime.
pub struct ExecutionUnit {
    id: UnitId,
    stack: Mutex<ExecutionContextStack>,
    callbacks: Mutex<Vec<CompletionCallback>>,
    outcome: Mutex<Option<UnitOutcome>>,
}

impl fmt::Debug for ExecutionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionUnit")
            .field("id", &self.id)
            .field("depth", &self.depth())
            .field("outcome", &*self.outcome.lock())
            .finish()
    }
}

impl ExecutionUnit {
    pub fn new(policy: Arc<ActionPolicy>, audit: Arc<dyn AuditSink>, max_depth: usize) -> Self {
        let id = UnitId::next();
        tracing::debug!(unit = %id, "Execution unit opened");
        Self {
            id,
            stack: Mutex::new(ExecutionContextStack::new(id, policy, audit, max_depth)),
            callbacks: Mutex::new(Vec::new()),
            outcome: Mutex::new(None),
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Register a callback fired once when the unit completes, after the unwind.
    pub fn on_completion<F>(&self, callback: F)
    where
        F: FnOnce(UnitId, UnitOutcome) + Send + 'static,
    {
        self.callbacks.lock().push(Box::new(callback));
    }

    pub fn activate(&self, bundle: &CapabilityBundle) -> Result<ActivationHandle, StackError> {
        self.stack.lock().activate(bundle)
    }

    pub fn deactivate(&self, name: &str) -> Result<(), StackError> {
        self.stack.lock().deactivate(name)
    }

    pub fn check_action(&self, action_id: &str, parameters: &Value) -> ActionCheck {
        self.stack.lock().check_action(action_id, parameters)
    }

    pub fn check(&self, request: &ActionRequest) -> ActionCheck {
        self.check_action(&request.action, &request.parameters)
    }

    pub fn depth(&self) -> usize {
        self.stack.lock().depth()
    }

    /// Names of active skills, outermost first.
    pub fn active_skills(&self) -> Vec<String> {
        self.stack
            .lock()
            .frames()
            .iter()
            .map(|f| f.bundle_name.clone())
            .collect()
    }

    pub fn frame(&self, name: &str) -> Option<ActivationFrame> {
        self.stack.lock().frame(name).cloned()
    }

    /// `Some` once the unit has completed.
    pub fn outcome(&self) -> Option<UnitOutcome> {
        *self.outcome.lock()
    }

    /// Finish the unit: unwind every frame, then fire callbacks.
    ///
    /// Only the first call has an effect. Returns the number of frames unwound.
    pub fn complete(&self, outcome: UnitOutcome) -> usize {
        {
            let mut slot = self.outcome.lock();
            if slot.is_some() {
                return 0;
            }
            *slot = Some(outcome);
        }

        let unwound = self.stack.lock().unwind(&format!("unit {}", outcome));
        let callbacks = std::mem::take(&mut *self.callbacks.lock());
        for callback in callbacks {
            callback(self.id, outcome);
        }
        tracing::debug!(unit = %self.id, %outcome, unwound, "Execution unit completed");
        unwound
    }

    /// Run `work` inside the unit and complete it according to the result.
    pub fn run<T, E, F>(self, work: F) -> Result<T, E>
    where
        F: FnOnce(&ExecutionUnit) -> Result<T, E>,
    {
        let result = work(&self);
        let outcome = if result.is_ok() {
            UnitOutcome::Succeeded
        } else {
            UnitOutcome::Failed
        };
        self.complete(outcome);
        result
    }
}

impl Drop for ExecutionUnit {
    fn drop(&mut self) {
        if self.outcome.get_mut().is_none() {
            let outcome = if std::thread::panicking() {
                UnitOutcome::Failed
            } else {
                UnitOutcome::Cancelled
            };
            self.complete(outcome);
        }
    }
}
