use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use stratum::bundle::BundleLimits;
use stratum::execution::{ActionPolicy, MemoryAuditSink};
use stratum::gateway::DisclosureGateway;
use stratum::index::{CapabilityIndex, IndexSettings};
use stratum::storage::{StorageResolver, TierRoots};
use tempfile::TempDir;

/// Four tier roots inside one temp directory.
pub struct TierFixture {
    pub temp: TempDir,
}

impl TierFixture {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self, tier: &str) -> PathBuf {
        self.temp.path().join(tier)
    }

    pub fn roots(&self) -> TierRoots {
        TierRoots {
            enterprise: vec![self.root("enterprise")],
            personal: vec![self.root("personal")],
            project: vec![self.root("project")],
            plugin: vec![self.root("plugin-a"), self.root("plugin-b")],
        }
    }

    pub fn index(&self) -> CapabilityIndex {
        self.index_with(IndexSettings {
            min_rebuild_interval: Duration::ZERO,
            cache_ttl: Duration::from_secs(300),
        })
    }

    pub fn index_with(&self, settings: IndexSettings) -> CapabilityIndex {
        CapabilityIndex::new(
            StorageResolver::new(self.roots()),
            BundleLimits::default(),
            settings,
        )
    }

    /// Gateway over a freshly rebuilt index, auditing into the returned sink.
    pub fn gateway(&self) -> (DisclosureGateway, Arc<MemoryAuditSink>) {
        let index = self.index();
        index.rebuild(true);
        let sink = Arc::new(MemoryAuditSink::new());
        let gateway =
            DisclosureGateway::new(Arc::new(index), ActionPolicy::default(), sink.clone(), 8);
        (gateway, sink)
    }
}

pub struct SkillSpec<'a> {
    pub name: &'a str,
    pub priority: Option<i32>,
    pub allowed_tools: Option<&'a str>,
    pub body: &'a str,
}

impl<'a> SkillSpec<'a> {
    pub fn named(name: &'a str) -> Self {
        Self {
            name,
            priority: None,
            allowed_tools: None,
            body: "# Instructions\n",
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn allowed_tools(mut self, tools: &'a str) -> Self {
        self.allowed_tools = Some(tools);
        self
    }

    pub fn body(mut self, body: &'a str) -> Self {
        self.body = body;
        self
    }
}

pub fn manifest_text(spec: &SkillSpec<'_>) -> String {
    let mut text = format!(
        "---\nname: {}\ndescription: Handles {} work. Use when the {} procedure is requested.\n",
        spec.name, spec.name, spec.name
    );
    if let Some(priority) = spec.priority {
        text.push_str(&format!("priority: {}\n", priority));
    }
    if let Some(tools) = spec.allowed_tools {
        text.push_str(&format!("allowed-tools: {}\n", tools));
    }
    text.push_str("---\n");
    text.push_str(spec.body);
    text
}

/// Write a bundle directory named after the skill under `root`.
pub fn write_skill(root: &Path, spec: SkillSpec<'_>) -> PathBuf {
    let dir = root.join(spec.name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("SKILL.md"), manifest_text(&spec)).unwrap();
    dir
}

pub fn write_file(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}
