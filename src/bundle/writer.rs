//! Bundle authoring: validate a draft and write it into a tier root.
//!
//! Drafts go through the same parser the index uses, so a bundle that the
//! writer accepts is a bundle the index will accept.

use super::manifest::{AllowedTools, ManifestHeader, MANIFEST_FILE};
use super::parser::parse_manifest_text;
use super::validation::{normalize_name, BundleLimits};
use crate::error::ApiError;
use crate::storage::StorageResolver;
use crate::types::StorageTier;
use std::path::{Path, PathBuf};

/// Content for a new bundle.
#[derive(Debug, Clone, Default)]
pub struct BundleDraft {
    pub name: String,
    pub description: String,
    pub body: String,
    pub allowed_tools: Option<Vec<String>>,
    pub priority: Option<i32>,
}

impl BundleDraft {
    /// Render the draft as `SKILL.md` text.
    pub fn render(&self) -> Result<String, ApiError> {
        let header = ManifestHeader {
            name: normalize_name(&self.name),
            description: self.description.trim().to_string(),
            allowed_tools: self.allowed_tools.clone().map(AllowedTools::List),
            priority: self.priority,
        };
        let yaml = serde_yaml::to_string(&header)
            .map_err(|e| ApiError::ConfigError(format!("Failed to serialize header: {}", e)))?;
        let mut text = String::with_capacity(yaml.len() + self.body.len() + 8);
        text.push_str("---\n");
        text.push_str(&yaml);
        if !yaml.ends_with('\n') {
            text.push('\n');
        }
        text.push_str("---\n");
        text.push_str(&self.body);
        if !self.body.ends_with('\n') {
            text.push('\n');
        }
        Ok(text)
    }
}

/// Writes validated bundles into the resolver's tier roots.
pub struct BundleWriter<'a> {
    resolver: &'a StorageResolver,
    limits: &'a BundleLimits,
}

impl<'a> BundleWriter<'a> {
    pub fn new(resolver: &'a StorageResolver, limits: &'a BundleLimits) -> Self {
        Self { resolver, limits }
    }

    /// Validate without writing. Returns the manifest path the bundle would get.
    pub fn check(&self, tier: StorageTier, draft: &BundleDraft) -> Result<PathBuf, ApiError> {
        let manifest_path = self.target_dir(tier, draft)?.join(MANIFEST_FILE);
        let text = draft.render()?;
        parse_manifest_text(&text, &manifest_path, self.limits)?;
        Ok(manifest_path)
    }

    /// Validate and write the bundle. Never overwrites an existing bundle.
    pub fn create(&self, tier: StorageTier, draft: &BundleDraft) -> Result<PathBuf, ApiError> {
        let manifest_path = self.check(tier, draft)?;
        let bundle_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| ApiError::Io("bundle path has no parent".to_string()))?;

        if bundle_dir.exists() {
            return Err(ApiError::BundleExists(bundle_dir));
        }
        std::fs::create_dir_all(&bundle_dir).map_err(|e| {
            ApiError::Io(format!(
                "Failed to create bundle directory {}: {}",
                bundle_dir.display(),
                e
            ))
        })?;
        std::fs::write(&manifest_path, draft.render()?).map_err(|e| {
            ApiError::Io(format!(
                "Failed to write manifest {}: {}",
                manifest_path.display(),
                e
            ))
        })?;

        tracing::info!(
            tier = %tier,
            path = %bundle_dir.display(),
            "Created skill bundle"
        );
        Ok(bundle_dir)
    }

    fn target_dir(&self, tier: StorageTier, draft: &BundleDraft) -> Result<PathBuf, ApiError> {
        let root = self.resolver.write_root(tier).ok_or_else(|| {
            ApiError::ConfigError(format!("No root directory configured for tier {}", tier))
        })?;
        Ok(root.join(normalize_name(&draft.name)))
    }
}
