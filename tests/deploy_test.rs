/*!
 * End-to-end runs against in-memory backends
 */

mod common;

use armada::deploy::{self, RunMode, RunRequest};
use armada::error::{ArmadaError, EXIT_FATAL, EXIT_PARTIAL, EXIT_SUCCESS};
use armada::logging::init_test_logging;
use armada::ArmadaConfig;
use armada_core_topology::{NetworkTopology, StateFile};
use armada_sentinel::Verdict;
use common::{node_conf, notary_conf, write_group, FakeBuilder, World};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tempfile::tempdir;

fn config() -> ArmadaConfig {
    ArmadaConfig {
        directory_url: Some("http://directory.test:8080".to_string()),
        ..Default::default()
    }
}

fn request(workdir: &Path, mode: RunMode) -> RunRequest {
    RunRequest {
        network_name: "acme".to_string(),
        workdir: workdir.to_path_buf(),
        mode,
        config: config(),
    }
}

fn fresh(counts: &[(&str, u32)]) -> RunMode {
    RunMode::Fresh {
        replica_counts: counts
            .iter()
            .map(|(group, count)| (group.to_string(), *count))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn maintain(add: &[&str]) -> RunMode {
    RunMode::Maintain {
        add: add.iter().map(|g| g.to_string()).collect(),
    }
}

fn names(topology: &NetworkTopology, group: &str) -> Vec<String> {
    let mut names: Vec<String> = topology
        .group_instances(group)
        .iter()
        .map(|r| r.instance_name.clone())
        .collect();
    names.sort();
    names
}

fn acme_workdir(workdir: &Path) {
    write_group(workdir, "Alice", &node_conf("Alice Corp", 10006));
    write_group(workdir, "bob", &node_conf("Bob Plc", 10008));
    write_group(workdir, "notary", &notary_conf("Notary Service"));
}

async fn provision_acme(world: &World, workdir: &Path) {
    let outcome = deploy::run(request(workdir, fresh(&[("alice", 2)])), |_, _| {
        Ok(world.backends())
    })
    .await
    .unwrap();
    assert_eq!(outcome.exit_code, EXIT_SUCCESS, "{:?}", outcome.lines);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fresh_provisioning_persists_topology() {
    init_test_logging();
    let dir = tempdir().unwrap();
    acme_workdir(dir.path());
    let world = World::new();

    let outcome = deploy::run(request(dir.path(), fresh(&[("alice", 2)])), |topology, directory| {
        assert_eq!(topology.network_name(), "acme");
        assert_eq!(directory, "http://directory.test:8080");
        Ok(world.backends())
    })
    .await
    .unwrap();

    assert_eq!(outcome.exit_code, EXIT_SUCCESS, "{:?}", outcome.lines);
    let topology = &outcome.topology;
    assert!(topology.is_initialized());
    assert_eq!(names(topology, "alice"), vec!["alice0", "alice1"]);
    assert_eq!(names(topology, "bob"), vec!["bob0"]);
    assert_eq!(names(topology, "notary"), vec!["notary0"]);
    assert_eq!(topology.node_image("alice"), Some("registry.test/node-alice:acme"));
    assert_eq!(topology.notary_image("notary"), Some("registry.test/notary:acme"));
    assert_eq!(topology.directory_address(), Some("http://directory.test:8080"));

    let alice0 = &topology.group_instances("alice")[0];
    assert_eq!(alice0.service_port, 10006);
    assert_eq!(alice0.credentials.as_ref().unwrap().username, "user1");

    let persisted = StateFile::in_workdir(dir.path()).load("acme").unwrap().unwrap();
    assert_eq!(&persisted, topology);
    assert!(world.cloud.is_up("notary0"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fresh_run_replaces_previous_state() {
    let dir = tempdir().unwrap();
    acme_workdir(dir.path());
    let world = World::new();
    provision_acme(&world, dir.path()).await;

    let outcome = deploy::run(request(dir.path(), fresh(&[])), |_, _| Ok(world.backends()))
        .await
        .unwrap();

    assert_eq!(names(&outcome.topology, "alice"), vec!["alice0"]);
    let persisted = StateFile::in_workdir(dir.path()).load("acme").unwrap().unwrap();
    assert_eq!(names(&persisted, "alice"), vec!["alice0"]);
}

#[tokio::test]
async fn test_fresh_requires_directory_url() {
    let dir = tempdir().unwrap();
    acme_workdir(dir.path());
    let world = World::new();
    let mut req = request(dir.path(), fresh(&[]));
    req.config.directory_url = None;

    let err = deploy::run(req, |_, _| Ok(world.backends())).await.unwrap_err();
    assert!(matches!(err, ArmadaError::Config(_)));
}

#[tokio::test]
async fn test_fresh_without_groups_is_discovery_error() {
    let dir = tempdir().unwrap();
    let world = World::new();

    let err = deploy::run(request(dir.path(), fresh(&[])), |_, _| Ok(world.backends()))
        .await
        .unwrap_err();
    assert!(matches!(err, ArmadaError::Discovery(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_broken_definition_is_partial() {
    let dir = tempdir().unwrap();
    acme_workdir(dir.path());
    write_group(dir.path(), "carol", "p2pAddress=\"localhost:10002\"\n");
    let world = World::new();

    let outcome = deploy::run(request(dir.path(), fresh(&[])), |_, _| Ok(world.backends()))
        .await
        .unwrap();

    assert_eq!(outcome.exit_code, EXIT_PARTIAL);
    assert!(outcome.topology.is_initialized());
    assert!(names(&outcome.topology, "carol").is_empty());
    assert!(outcome.lines.iter().any(|l| l.starts_with("[discovery]")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_partial_network_is_reconciled_but_stays_uninitialized() {
    let dir = tempdir().unwrap();
    acme_workdir(dir.path());
    let world = World::with_builder(FakeBuilder {
        fail_groups: HashSet::from(["bob".to_string()]),
    });

    let outcome = deploy::run(request(dir.path(), fresh(&[])), |_, _| Ok(world.backends()))
        .await
        .unwrap();
    assert_eq!(outcome.exit_code, EXIT_PARTIAL);
    assert!(!outcome.topology.is_initialized());
    assert_eq!(names(&outcome.topology, "alice"), vec!["alice0"]);

    world.cloud.kill("alice0");
    let healed = deploy::run(request(dir.path(), maintain(&[])), |_, _| Ok(world.backends()))
        .await
        .unwrap();
    assert_eq!(healed.exit_code, EXIT_PARTIAL);
    assert_eq!(healed.reconcile.as_ref().unwrap().repaired, vec!["alice0"]);
    assert!(world.cloud.is_up("alice0"));
    assert!(!healed.topology.is_initialized());
    let persisted = StateFile::in_workdir(dir.path()).load("acme").unwrap().unwrap();
    assert!(!persisted.is_initialized());
    assert_eq!(names(&persisted, "alice"), vec!["alice0"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fresh_with_directory_down_is_fatal_but_persists() {
    let dir = tempdir().unwrap();
    write_group(dir.path(), "alice", &node_conf("Alice Corp", 10006));
    let world = World::new();
    world.directory.set_available(false);

    let err = deploy::run(request(dir.path(), fresh(&[])), |_, _| Ok(world.backends()))
        .await
        .unwrap_err();

    assert!(matches!(err, ArmadaError::NetworkUnhealthy(_)));
    assert_eq!(err.exit_code(), EXIT_FATAL);
    let persisted = StateFile::in_workdir(dir.path()).load("acme").unwrap().unwrap();
    assert_eq!(names(&persisted, "alice"), vec!["alice0"]);
    assert!(persisted.is_initialized());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_notary_add_is_partial() {
    let dir = tempdir().unwrap();
    acme_workdir(dir.path());
    let world = World::new();
    provision_acme(&world, dir.path()).await;

    let outcome = deploy::run(request(dir.path(), maintain(&["notary"])), |_, _| {
        Ok(world.backends())
    })
    .await
    .unwrap();
    assert_eq!(outcome.exit_code, EXIT_PARTIAL);
    assert_eq!(names(&outcome.topology, "notary"), vec!["notary0"]);
    assert!(!world.cloud.is_up("notary1"));
}

#[tokio::test]
async fn test_maintain_requires_state() {
    let dir = tempdir().unwrap();
    let world = World::new();

    let err = deploy::run(request(dir.path(), maintain(&["alice"])), |_, _| {
        Ok(world.backends())
    })
    .await
    .unwrap_err();
    assert!(matches!(err, ArmadaError::InvalidArgs(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_maintain_repairs_drift_and_adds_replicas() {
    init_test_logging();
    let dir = tempdir().unwrap();
    acme_workdir(dir.path());
    let world = World::new();
    provision_acme(&world, dir.path()).await;

    world.cloud.kill("alice1");
    world.cloud.kill("notary0");

    let outcome = deploy::run(request(dir.path(), maintain(&["Bob", "alice"])), |_, _| {
        Ok(world.backends())
    })
    .await
    .unwrap();

    assert_eq!(outcome.exit_code, EXIT_SUCCESS, "{:?}", outcome.lines);
    let health = outcome.reconcile.as_ref().unwrap();
    assert_eq!(health.verdict(), Verdict::Repaired);
    assert_eq!(health.repaired, vec!["alice1", "notary0"]);
    assert!(world.cloud.is_up("alice1"));
    assert!(world.cloud.is_up("notary0"));
    assert_eq!(world.cloud.launch_count("alice1"), 2);

    assert_eq!(names(&outcome.topology, "alice"), vec!["alice0", "alice1", "alice2"]);
    assert_eq!(names(&outcome.topology, "bob"), vec!["bob0", "bob1"]);
    let persisted = StateFile::in_workdir(dir.path()).load("acme").unwrap().unwrap();
    assert_eq!(names(&persisted, "bob"), vec!["bob0", "bob1"]);

    let second = deploy::run(request(dir.path(), maintain(&[])), |_, _| Ok(world.backends()))
        .await
        .unwrap();
    assert_eq!(second.reconcile.unwrap().verdict(), Verdict::Healthy);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_add_is_partial_and_healed_next_pass() {
    let dir = tempdir().unwrap();
    acme_workdir(dir.path());
    let world = World::new();
    provision_acme(&world, dir.path()).await;
    world.cloud.fail_instances.lock().unwrap().insert("bob1".to_string());

    let outcome = deploy::run(request(dir.path(), maintain(&["bob"])), |_, _| {
        Ok(world.backends())
    })
    .await
    .unwrap();
    assert_eq!(outcome.exit_code, EXIT_PARTIAL);
    assert_eq!(names(&outcome.topology, "bob"), vec!["bob0", "bob1"]);

    world.cloud.fail_instances.lock().unwrap().clear();
    let healed = deploy::run(request(dir.path(), maintain(&[])), |_, _| Ok(world.backends()))
        .await
        .unwrap();
    assert_eq!(healed.exit_code, EXIT_SUCCESS);
    assert_eq!(healed.reconcile.unwrap().repaired, vec!["bob1"]);
    assert!(world.cloud.is_up("bob1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unknown_group_add_is_partial() {
    let dir = tempdir().unwrap();
    acme_workdir(dir.path());
    let world = World::new();
    provision_acme(&world, dir.path()).await;

    let outcome = deploy::run(request(dir.path(), maintain(&["carol"])), |_, _| {
        Ok(world.backends())
    })
    .await
    .unwrap();
    assert_eq!(outcome.exit_code, EXIT_PARTIAL);
    assert!(outcome.lines.iter().any(|l| l.contains("carol")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_directory_down_is_fatal_and_repairs_nothing() {
    let dir = tempdir().unwrap();
    acme_workdir(dir.path());
    let world = World::new();
    provision_acme(&world, dir.path()).await;

    world.cloud.kill("bob0");
    world.directory.set_available(false);

    let err = deploy::run(request(dir.path(), maintain(&["alice"])), |_, _| {
        Ok(world.backends())
    })
    .await
    .unwrap_err();

    assert!(matches!(err, ArmadaError::NetworkUnhealthy(_)));
    assert_eq!(err.exit_code(), EXIT_FATAL);
    assert!(!world.cloud.is_up("bob0"));
    let persisted = StateFile::in_workdir(dir.path()).load("acme").unwrap().unwrap();
    assert_eq!(names(&persisted, "alice"), vec!["alice0", "alice1"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_directory_override_applies_to_maintain() {
    let dir = tempdir().unwrap();
    acme_workdir(dir.path());
    let world = World::new();
    provision_acme(&world, dir.path()).await;

    let mut req = request(dir.path(), maintain(&[]));
    req.config.directory_url = Some("http://directory2.test:8080".to_string());
    let outcome = deploy::run(req, |_, directory| {
        assert_eq!(directory, "http://directory2.test:8080");
        Ok(world.backends())
    })
    .await
    .unwrap();

    assert_eq!(
        outcome.topology.directory_address(),
        Some("http://directory2.test:8080")
    );
}
