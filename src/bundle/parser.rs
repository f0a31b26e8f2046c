//! Bundle parsing in two stages.
//!
//! `parse_metadata_only` reads the header block and nothing else, so index
//! rebuilds cost the same no matter how long bundle bodies are.
//! `parse_full` reads the body and walks the resource subdirectories.

use super::manifest::{self, ManifestHeader, MANIFEST_FILE};
use super::validation::{self, BundleLimits};
use super::{CapabilityBundle, IndexEntry, ResourceKind, ResourcePaths};
use crate::error::{ParseError, ParseErrorKind};
use crate::storage::BundleLocation;
use crate::types::StorageTier;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Depth limit when walking a bundle's resource tree.
const MAX_RESOURCE_DEPTH: usize = 8;

const SCRIPT_EXTENSIONS: &[&str] = &[
    "sh", "bash", "zsh", "fish", "py", "js", "mjs", "cjs", "ts", "rb", "pl", "ps1", "php", "lua",
];
const REFERENCE_EXTENSIONS: &[&str] = &["md", "markdown", "txt", "rst", "adoc"];
const SCRIPT_DIRS: &[&str] = &["scripts", "script", "bin"];

/// Parse only the header of a discovered bundle into its index entry.
pub fn parse_metadata_only(
    location: &BundleLocation,
    limits: &BundleLimits,
) -> Result<IndexEntry, ParseError> {
    let header_text = manifest::read_header(&location.manifest, limits.max_header_lines)?;
    let header = validated_header(&header_text, &location.manifest, limits)?;

    Ok(IndexEntry {
        source_priority: header.priority(),
        name: header.name,
        description: header.description.trim().to_string(),
        source_tier: location.tier,
        location: location.dir.clone(),
    })
}

/// Parse a bundle directory completely: header, body, and resource listing.
pub fn parse_full(
    bundle_dir: &Path,
    tier: StorageTier,
    priority: i32,
    limits: &BundleLimits,
) -> Result<CapabilityBundle, ParseError> {
    let manifest_path = bundle_dir.join(MANIFEST_FILE);
    let text = std::fs::read_to_string(&manifest_path).map_err(|e| {
        let kind = if e.kind() == std::io::ErrorKind::NotFound {
            ParseErrorKind::MissingManifest
        } else {
            ParseErrorKind::Io
        };
        ParseError::new(kind, &manifest_path, format!("failed to read manifest: {}", e))
    })?;

    let (header, body) = parse_manifest_text(&text, &manifest_path, limits)?;
    let resources = collect_resources(bundle_dir)?;

    Ok(CapabilityBundle {
        declared_restrictions: header.restrictions(),
        name: header.name,
        description: header.description.trim().to_string(),
        body,
        resources,
        source_tier: tier,
        source_priority: priority,
        base_path: bundle_dir.to_path_buf(),
    })
}

/// Split, parse, and validate complete manifest text.
///
/// Shared by `parse_full` and the bundle writer so both apply identical rules.
pub fn parse_manifest_text(
    text: &str,
    manifest_path: &Path,
    limits: &BundleLimits,
) -> Result<(ManifestHeader, String), ParseError> {
    let (header_text, body) =
        manifest::split_manifest(text, manifest_path, limits.max_header_lines)?;
    let header = validated_header(&header_text, manifest_path, limits)?;
    validation::validate_body(&body, manifest_path, limits)?;
    Ok((header, body))
}

fn validated_header(
    header_text: &str,
    manifest_path: &Path,
    limits: &BundleLimits,
) -> Result<ManifestHeader, ParseError> {
    let mut header = manifest::parse_header(header_text, manifest_path)?;
    header.name = validation::normalize_name(&header.name);
    validation::validate_name(&header.name, manifest_path, limits)?;
    validation::validate_description(&header.description, manifest_path, limits)?;
    Ok(header)
}

/// Classify a bundle-relative file by directory convention, then extension.
///
/// Executable files are always scripts, wherever they live.
pub fn classify_resource(relative: &Path, executable: bool) -> ResourceKind {
    if executable {
        return ResourceKind::Script;
    }

    let top = relative
        .components()
        .next()
        .and_then(|c| c.as_os_str().to_str())
        .unwrap_or_default();
    let nested = relative.components().count() > 1;
    if nested {
        match top {
            t if SCRIPT_DIRS.contains(&t) => return ResourceKind::Script,
            "references" | "reference" | "docs" => return ResourceKind::Reference,
            "assets" | "templates" => return ResourceKind::Asset,
            _ => {}
        }
    }

    let ext = relative
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if SCRIPT_EXTENSIONS.contains(&ext.as_str()) {
        ResourceKind::Script
    } else if REFERENCE_EXTENSIONS.contains(&ext.as_str()) {
        ResourceKind::Reference
    } else {
        ResourceKind::Asset
    }
}

/// Walk the bundle and classify every file.
///
/// Symlinks are not followed into directories, but a link to a file is
/// listed under its own path, and becomes a script when its target is one.
/// Hidden entries are skipped except inside script directories.
fn collect_resources(bundle_dir: &Path) -> Result<ResourcePaths, ParseError> {
    let mut resources = ResourcePaths::default();
    let canonical_dir = dunce::canonicalize(bundle_dir).ok();

    let walker = WalkDir::new(bundle_dir)
        .min_depth(1)
        .max_depth(MAX_RESOURCE_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e) || in_script_dir(bundle_dir, e.path()));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(
                    "Skipping unreadable entry in bundle {}: {}",
                    bundle_dir.display(),
                    e
                );
                continue;
            }
        };
        if !is_file(&entry) {
            continue;
        }
        let relative = match entry.path().strip_prefix(bundle_dir) {
            Ok(r) => r.to_path_buf(),
            Err(_) => continue,
        };
        if relative.as_os_str() == MANIFEST_FILE {
            continue;
        }
        let kind = resource_kind(canonical_dir.as_deref(), &entry, &relative);
        resources.push(kind, relative);
    }

    resources.sort();
    Ok(resources)
}

fn resource_kind(canonical_dir: Option<&Path>, entry: &DirEntry, relative: &Path) -> ResourceKind {
    let own = classify_resource(relative, is_executable(entry.path()));
    if own == ResourceKind::Script || !entry.path_is_symlink() {
        return own;
    }
    let target = canonical_dir.and_then(|base| {
        let resolved = dunce::canonicalize(entry.path()).ok()?;
        resolved.strip_prefix(base).ok().map(Path::to_path_buf)
    });
    match target {
        Some(target) if classify_resource(&target, false) == ResourceKind::Script => {
            ResourceKind::Script
        }
        _ => own,
    }
}

/// Regular file, or a symlink that resolves to one.
fn is_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        || (entry.path_is_symlink()
            && std::fs::metadata(entry.path())
                .map(|m| m.is_file())
                .unwrap_or(false))
}

fn in_script_dir(bundle_dir: &Path, path: &Path) -> bool {
    path.strip_prefix(bundle_dir)
        .ok()
        .filter(|rel| rel.components().count() > 1)
        .and_then(|rel| rel.components().next())
        .and_then(|c| c.as_os_str().to_str())
        .map_or(false, |top| SCRIPT_DIRS.contains(&top))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

/// Executable bit of the file, following symlinks.
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}
