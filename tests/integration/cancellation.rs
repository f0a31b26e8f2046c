use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use stratum::execution::UnitOutcome;

use crate::integration::support::{write_skill, SkillSpec, TierFixture};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn aborted_task_unwinds_its_unit() {
    let fx = TierFixture::new();
    write_skill(&fx.root("project"), SkillSpec::named("locked").allowed_tools("Read"));
    let (gateway, sink) = fx.gateway();
    let gateway = Arc::new(gateway);

    let outcome = Arc::new(parking_lot::Mutex::new(None));
    let (activated_tx, activated_rx) = std::sync::mpsc::channel();

    let task = {
        let gateway = gateway.clone();
        let outcome = outcome.clone();
        tokio::spawn(async move {
            let unit = gateway.open_unit();
            unit.on_completion(move |_, o| *outcome.lock() = Some(o));
            gateway.invoke("locked", &unit).unwrap();
            activated_tx.send(()).unwrap();
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unit.complete(UnitOutcome::Succeeded);
        })
    };

    tokio::task::spawn_blocking(move || activated_rx.recv().unwrap())
        .await
        .unwrap();
    task.abort();
    let joined = task.await;
    assert!(joined.unwrap_err().is_cancelled());

    assert_eq!(*outcome.lock(), Some(UnitOutcome::Cancelled));
    assert_eq!(
        sink.kinds().last(),
        Some(&stratum::execution::AuditKind::Unwound)
    );
    let fresh = gateway.open_unit();
    assert!(fresh.check_action("Write", &json!({})).is_allowed());
}

#[tokio::test]
async fn units_in_sibling_tasks_are_isolated() {
    let fx = TierFixture::new();
    write_skill(&fx.root("project"), SkillSpec::named("locked").allowed_tools("Read"));
    let (gateway, _sink) = fx.gateway();
    let gateway = Arc::new(gateway);

    let restricted = {
        let gateway = gateway.clone();
        tokio::spawn(async move {
            let unit = gateway.open_unit();
            gateway.invoke("locked", &unit).unwrap();
            tokio::task::yield_now().await;
            unit.check_action("Write", &json!({})).is_allowed()
        })
    };
    let free = {
        let gateway = gateway.clone();
        tokio::spawn(async move {
            let unit = gateway.open_unit();
            tokio::task::yield_now().await;
            unit.check_action("Write", &json!({})).is_allowed()
        })
    };

    assert!(!restricted.await.unwrap());
    assert!(free.await.unwrap());
}
