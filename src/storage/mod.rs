//! Storage Layer Resolver
//!
//! Enumerates candidate bundle directories across the four storage tiers,
//! tier-major and highest precedence first. Enumeration is lazy and read-only;
//! every call walks the filesystem again.

use crate::bundle::MANIFEST_FILE;
use crate::types::StorageTier;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A discovered bundle directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleLocation {
    pub tier: StorageTier,
    /// Tier root the bundle was found under
    pub root: PathBuf,
    /// Bundle directory
    pub dir: PathBuf,
    /// `SKILL.md` inside `dir`
    pub manifest: PathBuf,
}

/// Resolved root directories per tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TierRoots {
    pub enterprise: Vec<PathBuf>,
    pub personal: Vec<PathBuf>,
    pub project: Vec<PathBuf>,
    pub plugin: Vec<PathBuf>,
}

impl TierRoots {
    pub fn for_tier(&self, tier: StorageTier) -> &[PathBuf] {
        match tier {
            StorageTier::Enterprise => &self.enterprise,
            StorageTier::Personal => &self.personal,
            StorageTier::Project => &self.project,
            StorageTier::Plugin => &self.plugin,
        }
    }
}

/// Walks configured tier roots for bundle directories.
#[derive(Debug, Clone)]
pub struct StorageResolver {
    roots: TierRoots,
}

impl StorageResolver {
    pub fn new(roots: TierRoots) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &TierRoots {
        &self.roots
    }

    /// Root new bundles of `tier` should be written to.
    pub fn write_root(&self, tier: StorageTier) -> Option<&Path> {
        self.roots.for_tier(tier).first().map(PathBuf::as_path)
    }

    /// Lazily enumerate `(tier, bundle)` locations.
    ///
    /// Enterprise roots are fully enumerated before Personal, and so on. Within
    /// a root, bundles come in file-name order. Missing or unreadable roots are
    /// skipped, as are directories without a manifest.
    pub fn enumerate(&self) -> impl Iterator<Item = BundleLocation> + '_ {
        StorageTier::ALL
            .into_iter()
            .flat_map(move |tier| {
                self.roots
                    .for_tier(tier)
                    .iter()
                    .map(move |root| (tier, root))
            })
            .flat_map(|(tier, root)| scan_root(tier, root))
    }
}

fn scan_root(tier: StorageTier, root: &Path) -> impl Iterator<Item = BundleLocation> {
    let root_buf = root.to_path_buf();
    if !root.is_dir() {
        tracing::debug!(tier = %tier, root = %root.display(), "Tier root not present, skipping");
    }

    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(tier = %tier, "Skipping unreadable tier entry: {}", e);
                    return None;
                }
            };
            if !entry.file_type().is_dir() {
                return None;
            }
            let hidden = entry
                .file_name()
                .to_str()
                .map(|s| s.starts_with('.'))
                .unwrap_or(true);
            if hidden {
                return None;
            }
            let dir = entry.into_path();
            let manifest = dir.join(MANIFEST_FILE);
            if !manifest.is_file() {
                tracing::debug!(
                    dir = %dir.display(),
                    "Directory has no {}, not a bundle",
                    MANIFEST_FILE
                );
                return None;
            }
            Some(BundleLocation {
                tier,
                root: root_buf.clone(),
                dir,
                manifest,
            })
        })
}
