use std::path::PathBuf;
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;
use stratum::bundle::{CapabilityBundle, ResourcePaths};
use stratum::error::StackError;
use stratum::execution::{ActionPolicy, ExecutionUnit, MemoryAuditSink, UnitOutcome};
use stratum::types::StorageTier;

use crate::integration::support::{write_skill, SkillSpec, TierFixture};

fn restricted(name: &str) -> CapabilityBundle {
    CapabilityBundle {
        name: name.to_string(),
        description: "d".to_string(),
        body: "b".to_string(),
        declared_restrictions: Some(vec![format!("{}-tool", name)]),
        resources: ResourcePaths::default(),
        source_tier: StorageTier::Project,
        source_priority: 0,
        base_path: PathBuf::from("/skills").join(name),
    }
}

fn new_unit() -> ExecutionUnit {
    ExecutionUnit::new(
        Arc::new(ActionPolicy::default()),
        Arc::new(MemoryAuditSink::new()),
        16,
    )
}

proptest! {
    #[test]
    fn lifo_deactivation_always_succeeds(depth in 1usize..10) {
        let unit = new_unit();
        let names: Vec<String> = (0..depth).map(|i| format!("s{}", i)).collect();
        for name in &names {
            unit.activate(&restricted(name)).unwrap();
        }
        for name in names.iter().rev() {
            prop_assert!(unit.deactivate(name).is_ok());
        }
        prop_assert_eq!(unit.depth(), 0);
    }

    #[test]
    fn non_innermost_deactivation_always_fails(depth in 2usize..10, pick in 0usize..8) {
        let unit = new_unit();
        let names: Vec<String> = (0..depth).map(|i| format!("s{}", i)).collect();
        for name in &names {
            unit.activate(&restricted(name)).unwrap();
        }
        let target = &names[pick % (depth - 1)];
        let err = unit.deactivate(target).unwrap_err();
        prop_assert_eq!(
            err,
            StackError::StackDiscipline {
                requested: target.clone(),
                innermost: names.last().cloned(),
            }
        );
        prop_assert_eq!(unit.depth(), depth);
        prop_assert_eq!(unit.active_skills(), names);
    }

    #[test]
    fn innermost_frame_governs_allow_set(depth in 1usize..6) {
        let unit = new_unit();
        for i in 0..depth {
            unit.activate(&restricted(&format!("s{}", i))).unwrap();
        }
        let innermost_tool = format!("s{}-tool", depth - 1);
        let no_args = json!({});
        prop_assert!(unit.check_action(&innermost_tool, &no_args).is_allowed());
        if depth > 1 {
            prop_assert!(!unit.check_action("s0-tool", &no_args).is_allowed());
        }
    }
}

#[test]
fn failing_unit_leaves_no_restriction_behind() {
    let fx = TierFixture::new();
    write_skill(&fx.root("project"), SkillSpec::named("locked").allowed_tools("Read"));
    let (gateway, sink) = fx.gateway();

    let failed: Result<(), String> = gateway.open_unit().run(|unit| {
        gateway.invoke("locked", unit).map_err(|e| e.to_string())?;
        assert!(!unit.check_action("Write", &json!({})).is_allowed());
        Err("task crashed mid-execution".to_string())
    });
    assert!(failed.is_err());

    let fresh = gateway.open_unit();
    assert!(fresh.check_action("Write", &json!({})).is_allowed());
    assert!(fresh.check_action("Anything", &json!({"path": "/etc/passwd"})).is_allowed());
    assert_eq!(
        sink.kinds().last(),
        Some(&stratum::execution::AuditKind::Unwound)
    );
}

#[test]
fn panicking_unit_unwinds_through_drop() {
    let fx = TierFixture::new();
    write_skill(&fx.root("project"), SkillSpec::named("locked").allowed_tools("Read"));
    let (gateway, _sink) = fx.gateway();
    let gateway = Arc::new(gateway);

    let outcome = Arc::new(parking_lot::Mutex::new(None));
    let worker = {
        let gateway = gateway.clone();
        let outcome = outcome.clone();
        std::thread::spawn(move || {
            let unit = gateway.open_unit();
            unit.on_completion(move |_, o| *outcome.lock() = Some(o));
            gateway.invoke("locked", &unit).unwrap();
            panic!("simulated failure inside the unit");
        })
    };
    assert!(worker.join().is_err());
    assert_eq!(*outcome.lock(), Some(UnitOutcome::Failed));

    let fresh = gateway.open_unit();
    assert!(fresh.check_action("Write", &json!({})).is_allowed());
}

#[test]
fn concurrent_units_do_not_share_restrictions() {
    let fx = TierFixture::new();
    write_skill(&fx.root("project"), SkillSpec::named("locked").allowed_tools("Read"));
    let (gateway, _sink) = fx.gateway();
    let gateway = Arc::new(gateway);

    let barrier = Arc::new(std::sync::Barrier::new(2));
    let restricted_worker = {
        let gateway = gateway.clone();
        let barrier = barrier.clone();
        std::thread::spawn(move || {
            let unit = gateway.open_unit();
            gateway.invoke("locked", &unit).unwrap();
            barrier.wait();
            let denied = !unit.check_action("Write", &json!({})).is_allowed();
            barrier.wait();
            unit.complete(UnitOutcome::Succeeded);
            denied
        })
    };
    let free_worker = {
        let gateway = gateway.clone();
        let barrier = barrier.clone();
        std::thread::spawn(move || {
            let unit = gateway.open_unit();
            barrier.wait();
            let allowed = unit.check_action("Write", &json!({})).is_allowed();
            barrier.wait();
            allowed
        })
    };

    assert!(restricted_worker.join().unwrap());
    assert!(free_worker.join().unwrap());
}
