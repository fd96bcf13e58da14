//! End-to-end lifecycle scenarios against the in-memory orchestrator

use couchmesh::cluster::{ClusterDescriptor, CreatePhase, LifecycleController, ReplicationRequest};
use couchmesh::common::{ClusterDefaults, Error, LifecycleConfig};
use couchmesh::orchestrator::memory::{running_instance, Call, InMemoryOrchestrator, Step};
use couchmesh::orchestrator::{Instance, InstancePhase, Orchestrator};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn fast_config() -> LifecycleConfig {
    LifecycleConfig {
        poll_interval_ms: 1,
        settle_delay_ms: 0,
        ..Default::default()
    }
}

fn demo_descriptor(replicas: u32) -> ClusterDescriptor {
    let defaults = ClusterDefaults {
        replicas,
        ..Default::default()
    };
    ClusterDescriptor::new("demo", "orders", &defaults).unwrap()
}

fn demo_listing() -> Vec<Instance> {
    (1..=3)
        .map(|i| running_instance("demo", &format!("couchdb-{}", i), &format!("10.0.0.{}", i)))
        .collect()
}

fn trigger_payloads(orch: &InMemoryOrchestrator) -> Vec<(String, ReplicationRequest)> {
    orch.exec_calls()
        .into_iter()
        .filter(|(_, command)| command.iter().any(|arg| arg.ends_with("/_replicate")))
        .map(|(instance, command)| {
            let body = command
                .iter()
                .position(|arg| arg == "-d")
                .map(|i| command[i + 1].clone())
                .unwrap();
            (instance, serde_json::from_str(&body).unwrap())
        })
        .collect()
}

#[tokio::test]
async fn demo_cluster_gets_six_replication_edges() {
    let orch = Arc::new(InMemoryOrchestrator::new());
    orch.push_listing(demo_listing());
    let controller = LifecycleController::new(orch.clone(), &fast_config());

    let report = assert_ok!(controller.create(&demo_descriptor(3)).await);
    assert_eq!(report.phase, CreatePhase::MeshConfigured);
    assert_eq!(report.edges, 6);

    let triggers = trigger_payloads(&orch);
    assert_eq!(triggers.len(), 6);

    let mut seen = Vec::new();
    for (source, request) in &triggers {
        assert!(request.continuous);
        assert_eq!(request.source, "orders");
        assert!(
            ["10.0.0.1", "10.0.0.2", "10.0.0.3"]
                .iter()
                .any(|addr| request.target == format!("http://{}:5984/orders", addr)),
            "unexpected target {}",
            request.target
        );
        seen.push((source.clone(), request.target.clone()));
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 6, "every ordered pair exactly once");
}

#[tokio::test]
async fn readiness_waits_for_all_replicas() {
    let orch = Arc::new(InMemoryOrchestrator::new());
    let mut partial = demo_listing();
    partial.pop();
    orch.push_listing(partial.clone());
    orch.push_listing(partial);
    orch.push_listing(demo_listing());
    let controller = LifecycleController::new(orch.clone(), &fast_config());

    assert_ok!(controller.create(&demo_descriptor(3)).await);

    let listings = orch
        .calls()
        .iter()
        .filter(|c| c.step() == Step::ListInstances)
        .count();
    assert_eq!(listings, 3);

    // later listing shows exactly N running instances
    let observed = orch.list_instances("demo").await.unwrap();
    assert_eq!(observed.len(), 3);
    assert!(observed.iter().all(Instance::is_running));
}

#[tokio::test]
async fn non_running_instance_blocks_readiness() {
    let orch = Arc::new(InMemoryOrchestrator::new());
    let mut starting = demo_listing();
    starting[0].phase = InstancePhase::Pending;
    orch.push_listing(starting);
    let controller = LifecycleController::new(orch.clone(), &fast_config());

    assert_ok!(controller.create(&demo_descriptor(3)).await);
    let listings = orch
        .calls()
        .iter()
        .filter(|c| c.step() == Step::ListInstances)
        .count();
    assert_eq!(listings, 2);
}

#[tokio::test]
async fn failed_trigger_aborts_remaining_pairs() {
    let orch = Arc::new(InMemoryOrchestrator::new());
    orch.push_listing(demo_listing());
    // 3 bootstrap commands, then fail the 4th of 6 triggers
    orch.fail_exec(3 + 3);
    let controller = LifecycleController::new(orch.clone(), &fast_config());

    let err = assert_err!(controller.create(&demo_descriptor(3)).await);
    assert!(matches!(err, Error::Exec { .. }));

    let triggers = trigger_payloads(&orch);
    assert_eq!(triggers.len(), 4, "nothing attempted after the failing pair");
    assert_eq!(triggers[3].0, "couchdb-2");
    assert_eq!(triggers[3].1.target, "http://10.0.0.3:5984/orders");
    // partial mesh is left in place
    assert!(orch.has_namespace("demo"));
}

#[tokio::test]
async fn each_failing_step_halts_the_pipeline() {
    let cases = [
        (Step::CreateNamespace, 1),
        (Step::CreateService, 2),
        (Step::CreateWorkload, 3),
        (Step::ListInstances, 4),
    ];

    for (step, expected_calls) in cases {
        let orch = Arc::new(InMemoryOrchestrator::new());
        orch.fail_step(step);
        let controller = LifecycleController::new(orch.clone(), &fast_config());

        assert_err!(controller.create(&demo_descriptor(3)).await);
        let calls = orch.calls();
        assert_eq!(calls.len(), expected_calls, "failing {:?}", step);
        assert_eq!(calls.last().map(Call::step), Some(step));
    }
}

#[tokio::test]
async fn delete_only_removes_namespace() {
    let orch = Arc::new(InMemoryOrchestrator::new());
    let controller = LifecycleController::new(orch.clone(), &fast_config());
    orch.create_namespace("demo").await.unwrap();
    let before = orch.calls().len();

    assert_ok!(controller.delete("demo").await);
    assert_eq!(&orch.calls()[before..], &[Call::DeleteNamespace("demo".into())]);
}

#[tokio::test]
async fn single_replica_cluster_has_no_edges() {
    let orch = Arc::new(InMemoryOrchestrator::new());
    let controller = LifecycleController::new(orch.clone(), &fast_config());

    let report = assert_ok!(controller.create(&demo_descriptor(1)).await);
    assert_eq!(report.edges, 0);
    assert!(trigger_payloads(&orch).is_empty());
}

#[tokio::test]
async fn clusters_are_independent() {
    let orch = Arc::new(InMemoryOrchestrator::new());
    let controller = Arc::new(LifecycleController::new(orch.clone(), &fast_config()));
    let defaults = ClusterDefaults::default();

    let alpha = ClusterDescriptor::for_create("alpha", &defaults).unwrap();
    let beta = ClusterDescriptor::for_create("beta", &defaults).unwrap();
    let (a, b) = tokio::join!(controller.create(&alpha), controller.create(&beta));
    assert_eq!(assert_ok!(a).edges, 6);
    assert_eq!(assert_ok!(b).edges, 6);

    assert_ok!(controller.delete("alpha").await);
    assert!(!orch.has_namespace("alpha"));
    assert!(orch.has_namespace("beta"));
}
