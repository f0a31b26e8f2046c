//! Capability bundles
//!
//! A bundle is a directory holding a `SKILL.md` manifest plus optional
//! `references/`, `scripts/`, and `assets/` content. Bundles are immutable
//! once parsed; a newer parse supersedes an older one, it never mutates it.

pub mod manifest;
pub mod parser;
pub mod validation;
pub mod writer;

use crate::types::{Precedence, StorageTier};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub use manifest::{restriction_tool_id, ManifestHeader, MANIFEST_FILE};
pub use parser::{classify_resource, parse_full, parse_metadata_only};
pub use validation::{normalize_name, BundleLimits};
pub use writer::{BundleDraft, BundleWriter};

/// Kind of file shipped inside a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Documentation the caller may load into its context on demand
    Reference,
    /// Executable the caller may run but never read
    Script,
    /// Static files (templates, images, data)
    Asset,
}

/// Bundle-relative resource paths, partitioned by kind and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourcePaths {
    pub references: Vec<PathBuf>,
    pub scripts: Vec<PathBuf>,
    pub assets: Vec<PathBuf>,
}

impl ResourcePaths {
    pub fn push(&mut self, kind: ResourceKind, path: PathBuf) {
        match kind {
            ResourceKind::Reference => self.references.push(path),
            ResourceKind::Script => self.scripts.push(path),
            ResourceKind::Asset => self.assets.push(path),
        }
    }

    /// Kind of a bundle-relative path, if the bundle ships it.
    pub fn kind_of(&self, path: &Path) -> Option<ResourceKind> {
        if self.scripts.iter().any(|p| p == path) {
            Some(ResourceKind::Script)
        } else if self.references.iter().any(|p| p == path) {
            Some(ResourceKind::Reference)
        } else if self.assets.iter().any(|p| p == path) {
            Some(ResourceKind::Asset)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.references.len() + self.scripts.len() + self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sort(&mut self) {
        self.references.sort();
        self.scripts.sort();
        self.assets.sort();
    }
}

/// Fully loaded bundle (Stage 2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityBundle {
    pub name: String,
    pub description: String,
    pub body: String,
    /// Allowed action ids in declaration order; `None` means unrestricted
    pub declared_restrictions: Option<Vec<String>>,
    pub resources: ResourcePaths,
    pub source_tier: StorageTier,
    pub source_priority: i32,
    /// Bundle directory; relative resource paths resolve against it
    pub base_path: PathBuf,
}

impl CapabilityBundle {
    pub fn precedence(&self) -> Precedence {
        (self.source_tier.rank(), self.source_priority)
    }
}

/// Discovery metadata for one bundle (Stage 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub name: String,
    pub description: String,
    pub source_tier: StorageTier,
    pub source_priority: i32,
    /// Bundle directory
    pub location: PathBuf,
}

impl IndexEntry {
    pub fn precedence(&self) -> Precedence {
        (self.source_tier.rank(), self.source_priority)
    }
}
