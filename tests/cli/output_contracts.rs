use std::fs;

use stratum::error::ApiError;
use stratum::tooling::cli::{CliContext, Commands};

use crate::cli::support::{write_skill, CliFixture};

#[test]
fn list_json_contract_has_stage_one_fields_only() {
    let fx = CliFixture::new();
    write_skill(&fx.project_root(), "deploy", "# Deploy\n");
    write_skill(&fx.personal_root(), "review", "# Review\n");

    let output = fx
        .context()
        .execute(&Commands::List {
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    let entries = parsed.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["name"], "deploy");
    assert_eq!(entries[0]["source_tier"], "project");
    assert_eq!(entries[1]["name"], "review");
    assert_eq!(entries[1]["source_tier"], "personal");
    for entry in entries {
        assert!(entry.get("description").and_then(|v| v.as_str()).is_some());
        assert!(entry.get("source_priority").and_then(|v| v.as_i64()).is_some());
        assert!(entry.get("location").and_then(|v| v.as_str()).is_some());
        assert!(entry.get("body").is_none());
    }
}

#[test]
fn list_text_renders_table() {
    let fx = CliFixture::new();
    write_skill(&fx.project_root(), "deploy", "# Deploy\n");
    let output = fx
        .context()
        .execute(&Commands::List {
            format: "text".to_string(),
        })
        .unwrap();
    assert!(output.contains("Skills"));
    assert!(output.contains("deploy"));
    assert!(output.contains("project"));
}

#[test]
fn show_json_contract_includes_body_and_restrictions() {
    let fx = CliFixture::new();
    let dir = write_skill(&fx.project_root(), "deploy", "# Deploy\nRun it.\n");
    fs::create_dir_all(dir.join("scripts")).unwrap();
    fs::write(dir.join("scripts").join("ship.py"), "print('ship')\n").unwrap();

    let output = fx
        .context()
        .execute(&Commands::Show {
            name: "deploy".to_string(),
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["name"], "deploy");
    assert_eq!(parsed["body"], "# Deploy\nRun it.\n");
    assert_eq!(
        parsed["declared_restrictions"],
        serde_json::json!(["Read", "Grep"])
    );
    assert_eq!(parsed["resources"]["scripts"], serde_json::json!(["scripts/ship.py"]));
}

#[test]
fn show_unknown_skill_suggests_close_name() {
    let fx = CliFixture::new();
    write_skill(&fx.project_root(), "deploy", "# Deploy\n");
    let err = fx
        .context()
        .execute(&Commands::Show {
            name: "deplyo".to_string(),
            format: "text".to_string(),
        })
        .unwrap_err();
    match err {
        ApiError::SkillNotFound { name, suggestion } => {
            assert_eq!(name, "deplyo");
            assert_eq!(suggestion.as_deref(), Some("deploy"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn validate_json_reports_structured_failures() {
    let fx = CliFixture::new();
    write_skill(&fx.project_root(), "good", "# Good\n");
    let bad = fx.project_root().join("bad");
    fs::create_dir_all(&bad).unwrap();
    fs::write(
        bad.join("SKILL.md"),
        "---\nname: Bad_Name\ndescription: Does bad things. Use when testing.\n---\n",
    )
    .unwrap();
    write_skill(&fx.project_root(), "long", &"line\n".repeat(501));

    let output = fx
        .context()
        .execute(&Commands::Validate {
            path: None,
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["checked"], 3);
    assert_eq!(parsed["valid"].as_array().unwrap().len(), 1);
    let failures = parsed["failures"].as_array().unwrap();
    let kinds: Vec<&str> = failures.iter().map(|f| f["kind"].as_str().unwrap()).collect();
    assert!(kinds.contains(&"name_format"));
    assert!(kinds.contains(&"size_limit"));
    let name_failure = failures
        .iter()
        .find(|f| f["kind"] == "name_format")
        .unwrap();
    assert_eq!(name_failure["field"], "name");
    assert!(name_failure["location"].as_str().unwrap().ends_with("SKILL.md"));
}

#[test]
fn validate_single_path_is_relative_to_workspace() {
    let fx = CliFixture::new();
    write_skill(&fx.project_root(), "good", "# Good\n");
    let output = fx
        .context()
        .execute(&Commands::Validate {
            path: Some(".stratum/skills/good".into()),
            format: "text".to_string(),
        })
        .unwrap();
    assert!(output.contains("Valid: 1"));
    assert!(output.contains("Invalid: 0"));
}

#[test]
fn rebuild_and_roots_json_contracts() {
    let fx = CliFixture::new();
    write_skill(&fx.project_root(), "deploy", "# Deploy\n");
    let cli = fx.context();

    let output = cli
        .execute(&Commands::Rebuild {
            format: "json".to_string(),
        })
        .unwrap();
    let stats: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(stats["entries"], 1);
    assert_eq!(stats["generation"], 1);
    for key in ["rebuilds", "throttled", "skipped", "conflicts", "cache_hits", "full_parses"] {
        assert!(stats.get(key).and_then(|v| v.as_u64()).is_some(), "missing {key}");
    }

    let output = cli
        .execute(&Commands::Roots {
            format: "json".to_string(),
        })
        .unwrap();
    let roots: serde_json::Value = serde_json::from_str(&output).unwrap();
    let roots = roots.as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["tier"], "personal");
    assert_eq!(roots[0]["exists"], false);
    assert_eq!(roots[1]["tier"], "project");
    assert_eq!(roots[1]["exists"], true);
}

#[test]
fn invalid_format_is_rejected() {
    let fx = CliFixture::new();
    let err = fx
        .context()
        .execute(&Commands::List {
            format: "yaml".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::ConfigError(_)));
}

#[test]
fn config_file_tiers_are_honored() {
    let fx = CliFixture::new();
    let custom = fx.temp.path().join("custom-skills");
    write_skill(&custom, "custom", "# Custom\n");
    let config_path = fx.temp.path().join("stratum.toml");
    fs::write(
        &config_path,
        format!(
            "[tiers]\nenterprise = []\npersonal = []\nproject = [{:?}]\n",
            custom.to_string_lossy()
        ),
    )
    .unwrap();

    let cli = CliContext::new(fx.workspace(), Some(config_path)).unwrap();
    let output = cli
        .execute(&Commands::List {
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed[0]["name"], "custom");
}
