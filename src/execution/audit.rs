//! Audit records for activations, deactivations, unwinds, and denials.
//!
//! The engine only emits records. Persisting or querying them belongs to
//! whatever `AuditSink` the host installs.

use super::UnitId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Activated,
    Deactivated,
    /// Frame removed by execution-unit completion rather than explicit deactivation
    Unwound,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub kind: AuditKind,
    pub unit: UnitId,
    pub skill: String,
    pub restrictions: Option<Vec<String>>,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(kind: AuditKind, unit: UnitId, skill: impl Into<String>) -> Self {
        Self {
            kind,
            unit,
            skill: skill.into(),
            restrictions: None,
            detail: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_restrictions(mut self, restrictions: Option<Vec<String>>) -> Self {
        self.restrictions = restrictions;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Receiver for audit records.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Emits records as `tracing` events on the `stratum::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: AuditRecord) {
        let restrictions = record
            .restrictions
            .as_ref()
            .map(|r| r.join(","))
            .unwrap_or_else(|| "*".to_string());
        let detail = record.detail.as_deref().unwrap_or("");
        match record.kind {
            AuditKind::Denied => tracing::warn!(
                target: "stratum::audit",
                kind = ?record.kind,
                unit = %record.unit,
                skill = %record.skill,
                restrictions = %restrictions,
                timestamp = %record.timestamp.to_rfc3339(),
                "{}",
                detail
            ),
            _ => tracing::info!(
                target: "stratum::audit",
                kind = ?record.kind,
                unit = %record.unit,
                skill = %record.skill,
                restrictions = %restrictions,
                timestamp = %record.timestamp.to_rfc3339(),
                "{}",
                detail
            ),
        }
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn kinds(&self) -> Vec<AuditKind> {
        self.records.lock().iter().map(|r| r.kind).collect()
    }

    pub fn take(&self) -> Vec<AuditRecord> {
        std::mem::take(&mut *self.records.lock())
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: AuditRecord) {
        self.records.lock().push(record);
    }
}
