use std::fs;

use stratum::error::{IndexError, ParseErrorKind};
use stratum::index::CacheTarget;
use stratum::types::StorageTier;

use crate::integration::support::{write_skill, SkillSpec, TierFixture};

#[test]
fn deploy_defined_in_three_tiers_resolves_to_enterprise() {
    let fx = TierFixture::new();
    write_skill(
        &fx.root("plugin-a"),
        SkillSpec::named("deploy").priority(1).body("plugin deploy steps\n"),
    );
    write_skill(
        &fx.root("project"),
        SkillSpec::named("deploy").priority(1).body("project deploy steps\n"),
    );
    write_skill(
        &fx.root("enterprise"),
        SkillSpec::named("deploy").priority(10).body("enterprise deploy steps\n"),
    );

    let index = fx.index();
    assert_eq!(index.rebuild(true), 1);

    let bundle = index.get_full("deploy").unwrap();
    assert_eq!(bundle.body, "enterprise deploy steps\n");
    assert_eq!(bundle.source_tier, StorageTier::Enterprise);
    assert_eq!(bundle.source_priority, 10);
    assert_eq!(index.stats().conflicts, 2);
}

#[test]
fn winner_is_stable_across_repeated_rebuilds() {
    let fx = TierFixture::new();
    write_skill(&fx.root("plugin-a"), SkillSpec::named("lint").priority(2));
    write_skill(&fx.root("plugin-b"), SkillSpec::named("lint").priority(2));
    write_skill(&fx.root("personal"), SkillSpec::named("review"));
    write_skill(&fx.root("project"), SkillSpec::named("review").priority(99));

    let index = fx.index();
    let mut seen = Vec::new();
    for _ in 0..5 {
        index.rebuild(true);
        seen.push(index.list_discoverable());
    }
    assert!(seen.windows(2).all(|w| w[0] == w[1]));

    let lint = index.get_entry("lint").unwrap();
    assert_eq!(lint.location, fx.root("plugin-a").join("lint"));
    let review = index.get_entry("review").unwrap();
    assert_eq!(review.source_tier, StorageTier::Personal);
}

#[test]
fn lower_tier_takes_over_when_winner_disappears() {
    let fx = TierFixture::new();
    let enterprise = write_skill(
        &fx.root("enterprise"),
        SkillSpec::named("deploy").body("enterprise\n"),
    );
    write_skill(&fx.root("project"), SkillSpec::named("deploy").body("project\n"));

    let index = fx.index();
    index.rebuild(true);
    assert_eq!(index.get_full("deploy").unwrap().body, "enterprise\n");

    fs::remove_dir_all(enterprise).unwrap();
    index.rebuild(true);
    assert_eq!(index.get_full("deploy").unwrap().body, "project\n");
}

#[test]
fn removed_bundle_leaves_the_index() {
    let fx = TierFixture::new();
    let dir = write_skill(&fx.root("personal"), SkillSpec::named("notes"));
    let index = fx.index();
    index.rebuild(true);
    index.get_full("notes").unwrap();

    fs::remove_dir_all(dir).unwrap();
    assert_eq!(index.rebuild(true), 0);
    assert!(matches!(
        index.get_full("notes"),
        Err(IndexError::NotFound { .. })
    ));
    assert_eq!(index.stats().cached, 0);
}

#[test]
fn invalid_winner_candidate_does_not_shadow_valid_lower_tier() {
    let fx = TierFixture::new();
    let broken = fx.root("enterprise").join("deploy");
    fs::create_dir_all(&broken).unwrap();
    fs::write(
        broken.join("SKILL.md"),
        "---\nname: deploy\ndescription: Ships things. Use when releasing.\nmodel: fast\n---\n",
    )
    .unwrap();
    write_skill(&fx.root("project"), SkillSpec::named("deploy").body("project\n"));

    let index = fx.index();
    assert_eq!(index.rebuild(true), 1);
    assert_eq!(
        index.get_entry("deploy").unwrap().source_tier,
        StorageTier::Project
    );
    let diagnostics = index.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, ParseErrorKind::UnknownField);
    assert_eq!(diagnostics[0].location, broken.join("SKILL.md"));
}

#[test]
fn explicit_invalidation_forces_reparse() {
    let fx = TierFixture::new();
    write_skill(&fx.root("project"), SkillSpec::named("a"));
    write_skill(&fx.root("project"), SkillSpec::named("b"));
    let index = fx.index();
    index.rebuild(true);

    index.get_full("a").unwrap();
    index.get_full("b").unwrap();
    index.get_full("a").unwrap();
    assert_eq!(index.stats().full_parses, 2);

    assert_eq!(index.invalidate(CacheTarget::All), 2);
    index.get_full("a").unwrap();
    assert_eq!(index.stats().full_parses, 3);
}
