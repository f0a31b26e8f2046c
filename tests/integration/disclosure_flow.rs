use std::fs;

use serde_json::json;
use stratum::error::{ApiError, IndexError, ParseErrorKind};
use stratum::execution::{ActionCheck, AuditKind, DenyReason};
use stratum::gateway::{InvokeOutcome, ResourceRead};

use crate::integration::support::{write_file, write_skill, SkillSpec, TierFixture};

#[test]
fn restriction_enforcement_allows_members_only() {
    let fx = TierFixture::new();
    write_skill(&fx.root("project"), SkillSpec::named("ab").allowed_tools("A, B"));
    let (gateway, _sink) = fx.gateway();
    let unit = gateway.open_unit();

    gateway.invoke("ab", &unit).unwrap();
    assert_eq!(unit.check_action("A", &json!({})), ActionCheck::Allow);
    assert_eq!(unit.check_action("B", &json!({})), ActionCheck::Allow);
    match unit.check_action("C", &json!({})) {
        ActionCheck::Deny(DenyReason::RestrictionViolation { skill, action, .. }) => {
            assert_eq!(skill, "ab");
            assert_eq!(action, "C");
        }
        other => panic!("expected restriction violation, got {other:?}"),
    }
}

#[test]
fn script_resources_can_run_but_not_be_read() {
    let fx = TierFixture::new();
    let dir = write_skill(&fx.root("project"), SkillSpec::named("pdf-forms"));
    write_file(&dir, "scripts/x", "#!/bin/sh\necho fill\n");
    write_file(&dir, "references/forms.md", "# Forms\n");
    let (gateway, sink) = fx.gateway();
    let unit = gateway.open_unit();

    let InvokeOutcome::Activated(invocation) = gateway.invoke("pdf-forms", &unit).unwrap() else {
        panic!("expected activation");
    };
    assert!(invocation
        .resources
        .scripts
        .contains(&std::path::PathBuf::from("scripts/x")));

    let read = unit.check_action("Read", &json!({ "file_path": "scripts/x" }));
    assert!(matches!(
        read,
        ActionCheck::Deny(DenyReason::ScriptReadViolation { .. })
    ));
    let absolute = dir.join("scripts").join("x");
    let read_abs = unit.check_action("Read", &json!({ "path": absolute.to_string_lossy() }));
    assert!(!read_abs.is_allowed());

    let run = unit.check_action("Bash", &json!({ "script": "scripts/x" }));
    assert_eq!(run, ActionCheck::Allow);

    let doc = gateway
        .read_resource("pdf-forms", "references/forms.md", &unit)
        .unwrap();
    assert!(matches!(doc, ResourceRead::Content { ref content, .. } if content == "# Forms\n"));

    assert_eq!(
        sink.kinds()
            .iter()
            .filter(|k| **k == AuditKind::Denied)
            .count(),
        2
    );
}

#[test]
fn extra_header_field_is_rejected_and_clean_header_passes() {
    let fx = TierFixture::new();
    let extra = fx.root("project").join("hooked");
    fs::create_dir_all(&extra).unwrap();
    fs::write(
        extra.join("SKILL.md"),
        "---\nname: hooked\ndescription: Runs hooks. Use when hooks are needed.\non-activate: ./evil.sh\n---\nbody\n",
    )
    .unwrap();
    write_skill(&fx.root("project"), SkillSpec::named("clean"));

    let (gateway, _sink) = fx.gateway();
    let names: Vec<String> = gateway.discover().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["clean"]);

    let diagnostics = gateway.index().diagnostics();
    assert_eq!(diagnostics[0].kind, ParseErrorKind::UnknownField);
    assert_eq!(diagnostics[0].field.as_deref(), Some("on-activate"));
}

#[test]
fn discovery_never_reads_bodies() {
    let fx = TierFixture::new();
    let big_body = "step\n".repeat(499);
    write_skill(&fx.root("project"), SkillSpec::named("big").body(&big_body));

    let garbage = fx.root("project").join("binary-body");
    fs::create_dir_all(&garbage).unwrap();
    let mut bytes = crate::integration::support::manifest_text(&SkillSpec::named("binary-body"))
        .into_bytes();
    bytes.extend_from_slice(&[0xff, 0xfe, 0x00, 0x80, b'\n']);
    fs::write(garbage.join("SKILL.md"), bytes).unwrap();

    let (gateway, _sink) = fx.gateway();
    let names: Vec<String> = gateway.discover().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["big", "binary-body"]);
    assert_eq!(gateway.index().stats().full_parses, 0);

    match gateway.index().get_full("binary-body") {
        Err(IndexError::Load(err)) => assert_eq!(err.kind, ParseErrorKind::Io),
        other => panic!("expected load failure, got {other:?}"),
    }
    assert_eq!(gateway.index().get_full("big").unwrap().body, big_body);
}

#[test]
fn full_loads_are_cached_across_units() {
    let fx = TierFixture::new();
    write_skill(&fx.root("personal"), SkillSpec::named("deploy"));
    let (gateway, _sink) = fx.gateway();

    for _ in 0..3 {
        let unit = gateway.open_unit();
        gateway.invoke("deploy", &unit).unwrap();
        gateway.conclude("deploy", &unit).unwrap();
    }
    let stats = gateway.index().stats();
    assert_eq!(stats.full_parses, 1);
    assert_eq!(stats.cache_hits, 2);
}

#[test]
fn not_found_is_a_result_with_suggestion() {
    let fx = TierFixture::new();
    write_skill(&fx.root("project"), SkillSpec::named("deploy-staging"));
    let (gateway, _sink) = fx.gateway();
    let unit = gateway.open_unit();

    match gateway.invoke("staging", &unit).unwrap() {
        InvokeOutcome::NotFound { name, suggestion } => {
            assert_eq!(name, "staging");
            assert_eq!(suggestion.as_deref(), Some("deploy-staging"));
        }
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn nested_activation_requires_lifo_conclusion() {
    let fx = TierFixture::new();
    write_skill(&fx.root("project"), SkillSpec::named("outer").allowed_tools("Read"));
    write_skill(&fx.root("project"), SkillSpec::named("inner").allowed_tools("Grep"));
    let (gateway, _sink) = fx.gateway();
    let unit = gateway.open_unit();

    gateway.invoke("outer", &unit).unwrap();
    gateway.invoke("inner", &unit).unwrap();
    assert!(unit.check_action("Grep", &json!({})).is_allowed());
    assert!(!unit.check_action("Read", &json!({})).is_allowed());

    let err = gateway.conclude("outer", &unit).unwrap_err();
    assert!(matches!(err, ApiError::Stack(_)));
    gateway.conclude("inner", &unit).unwrap();
    assert!(unit.check_action("Read", &json!({})).is_allowed());
    gateway.conclude("outer", &unit).unwrap();
    assert!(unit.check_action("Write", &json!({})).is_allowed());
}
