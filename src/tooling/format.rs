//! Format skill listings, bundles, validation reports, index stats, and roots as text.

use crate::bundle::{CapabilityBundle, IndexEntry};
use crate::error::ParseError;
use crate::index::IndexStats;
use crate::types::StorageTier;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Outcome of validating one or more bundles.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub checked: usize,
    pub valid: Vec<PathBuf>,
    pub failures: Vec<ParseError>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One resolved tier root.
#[derive(Debug, Clone, Serialize)]
pub struct RootRow {
    pub tier: StorageTier,
    pub path: PathBuf,
    pub exists: bool,
}

pub fn format_skill_list_text(entries: &[IndexEntry]) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Skills"));
    if entries.is_empty() {
        out.push_str("  No skills found.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Tier", "Priority", "Description"]);
    for entry in entries {
        table.add_row(vec![
            entry.name.clone(),
            entry.source_tier.to_string(),
            entry.source_priority.to_string(),
            entry.description.clone(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_skill_text(bundle: &CapabilityBundle) -> String {
    let mut out = format!("{}\n\n", format_section_heading(&bundle.name));
    out.push_str(&format!("  Description: {}\n", bundle.description));
    out.push_str(&format!(
        "  Source: {} (priority {})\n",
        bundle.source_tier, bundle.source_priority
    ));
    out.push_str(&format!("  Path: {}\n", bundle.base_path.display()));
    let restrictions = match &bundle.declared_restrictions {
        Some(list) if list.is_empty() => "none allowed".to_string(),
        Some(list) => list.join(", "),
        None => "unrestricted".to_string(),
    };
    out.push_str(&format!("  Allowed tools: {}\n\n", restrictions));

    if !bundle.resources.is_empty() {
        out.push_str(&format!("{}\n\n", format_section_heading("Resources")));
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Kind", "Path"]);
        let rows = bundle
            .resources
            .references
            .iter()
            .map(|p| ("reference", p))
            .chain(bundle.resources.scripts.iter().map(|p| ("script", p)))
            .chain(bundle.resources.assets.iter().map(|p| ("asset", p)));
        for (kind, path) in rows {
            table.add_row(vec![kind.to_string(), path.display().to_string()]);
        }
        out.push_str(&format!("{}\n\n", table));
    }

    out.push_str(&format!("{}\n\n", format_section_heading("Instructions")));
    out.push_str(bundle.body.trim_end());
    out.push('\n');
    out
}

pub fn format_validation_text(report: &ValidationReport) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Validation"));
    out.push_str(&format!(
        "  Checked: {}  Valid: {}  Invalid: {}\n\n",
        report.checked,
        report.valid.len(),
        report.failures.len()
    ));
    if report.failures.is_empty() {
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Location", "Kind", "Field", "Message"]);
    for failure in &report.failures {
        table.add_row(vec![
            failure.location.display().to_string(),
            failure.kind.to_string(),
            failure.field.clone().unwrap_or_else(|| "-".to_string()),
            failure.message.clone(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_stats_text(stats: &IndexStats) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Capability index"));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Metric", "Value"]);
    let rows: [(&str, u64); 7] = [
        ("Generation", stats.generation),
        ("Skills", stats.entries as u64),
        ("Rebuilds", stats.rebuilds),
        ("Skipped bundles", stats.skipped),
        ("Name conflicts", stats.conflicts),
        ("Cached bundles", stats.cached as u64),
        ("Full parses", stats.full_parses),
    ];
    for (label, value) in rows {
        table.add_row(vec![label.to_string(), value.to_string()]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_roots_text(rows: &[RootRow]) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Tier roots"));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Tier", "Path", "Present"]);
    for row in rows {
        table.add_row(vec![
            row.tier.to_string(),
            row.path.display().to_string(),
            if row.exists { "yes" } else { "no" }.to_string(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}
