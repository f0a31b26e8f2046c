use std::fs;
use std::path::{Path, PathBuf};

use stratum::config::{StratumConfig, TiersConfig};
use stratum::tooling::cli::CliContext;
use tempfile::TempDir;

/// Workspace with isolated tier roots; nothing outside the temp dir is scanned.
pub struct CliFixture {
    pub temp: TempDir,
}

impl CliFixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("workspace")).unwrap();
        Self { temp }
    }

    pub fn workspace(&self) -> PathBuf {
        self.temp.path().join("workspace")
    }

    pub fn personal_root(&self) -> PathBuf {
        self.temp.path().join("personal")
    }

    pub fn project_root(&self) -> PathBuf {
        self.workspace().join(".stratum").join("skills")
    }

    pub fn config(&self) -> StratumConfig {
        StratumConfig {
            tiers: TiersConfig {
                enterprise: Some(vec![]),
                personal: Some(vec![self.personal_root()]),
                project: None,
                plugin: vec![],
            },
            ..StratumConfig::default()
        }
    }

    pub fn context(&self) -> CliContext {
        CliContext::with_config(self.workspace(), self.config())
    }
}

pub fn write_skill(root: &Path, name: &str, body: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("SKILL.md"),
        format!(
            "---\nname: {}\ndescription: Covers {} chores. Use when {} is mentioned.\nallowed-tools: Read Grep\n---\n{}",
            name, name, name, body
        ),
    )
    .unwrap();
    dir
}
