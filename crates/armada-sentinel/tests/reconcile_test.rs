//! Reconciliation passes against in-memory collaborators

use armada_core_interface::{
    CapabilityError, DirectoryProbe, InstanceProvisioner, LaunchSpec, Result, ENV_DIRECTORY,
};
use armada_core_topology::{GroupKind, InstanceRecord, NetworkTopology, PeerIdentity, TopologyStore};
use armada_sentinel::{ReconcilePolicy, Reconciler, Verdict};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct FakeProvisioner {
    running: Mutex<HashSet<String>>,
    probe_errors: HashSet<String>,
    fail_instances: HashSet<String>,
    launched: Mutex<Vec<LaunchSpec>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeProvisioner {
    fn with_running(names: &[&str]) -> Self {
        Self {
            running: Mutex::new(names.iter().map(|n| n.to_string()).collect()),
            ..Default::default()
        }
    }

    fn launched_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .launched
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.instance_name.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl InstanceProvisioner for FakeProvisioner {
    async fn instantiate(&self, spec: &LaunchSpec) -> Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.launched.lock().unwrap().push(spec.clone());
        if self.fail_instances.contains(&spec.instance_name) {
            return Err(CapabilityError::Instantiate {
                instance: spec.instance_name.clone(),
                reason: "capacity unavailable".to_string(),
            });
        }
        self.running
            .lock()
            .unwrap()
            .insert(spec.instance_name.clone());
        Ok(self.expected_address(&spec.instance_name))
    }

    async fn is_running(&self, instance_name: &str) -> Result<bool> {
        if self.probe_errors.contains(instance_name) {
            return Err(CapabilityError::Probe(format!("{} not found", instance_name)));
        }
        Ok(self.running.lock().unwrap().contains(instance_name))
    }

    fn expected_address(&self, instance_name: &str) -> String {
        format!("{}-acme.test", instance_name)
    }
}

struct FakeProbe {
    available: bool,
    called: AtomicBool,
}

impl FakeProbe {
    fn new(available: bool) -> Self {
        Self {
            available,
            called: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl DirectoryProbe for FakeProbe {
    async fn is_available(&self, _timeout: Duration) -> bool {
        self.called.store(true, Ordering::SeqCst);
        self.available
    }
}

fn record(group: &str, ordinal: u32) -> InstanceRecord {
    let identity = PeerIdentity::new(format!("{} Corp", group)).with_common_name(group);
    let instance_name = InstanceRecord::instance_name_for(group, ordinal);
    InstanceRecord {
        group_name: group.to_string(),
        kind: GroupKind::Node,
        group_identity: identity.clone(),
        instance_identity: identity.with_ordinal(ordinal),
        reachable_address: format!("{}-acme.test", instance_name),
        instance_name,
        local_artifact_id: format!("sha256:{}", group),
        remote_artifact_ref: format!("registry.test/node-{}:acme", group),
        service_port: 10003,
        credentials: None,
    }
}

fn topology(records: &[(&str, u32)]) -> NetworkTopology {
    let store = TopologyStore::new(NetworkTopology::new("acme", "westeurope"));
    for (group, ordinal) in records {
        store.register_instance(group, record(group, *ordinal));
    }
    store.mark_initialized();
    store.into_inner()
}

fn reconciler(
    provisioner: Arc<FakeProvisioner>,
    probe: Arc<FakeProbe>,
    policy: ReconcilePolicy,
) -> Reconciler {
    Reconciler::new(provisioner, probe, "http://directory.test:8080", policy).unwrap()
}

#[tokio::test]
async fn test_repairs_exactly_the_drifted_set() {
    let provisioner = Arc::new(FakeProvisioner::with_running(&["alice0", "bob0"]));
    let probe = Arc::new(FakeProbe::new(true));
    let reconciler = reconciler(provisioner.clone(), probe, ReconcilePolicy::default());

    let network = topology(&[("alice", 0), ("alice", 1), ("bob", 0)]);
    let report = reconciler.check(&network).await;

    assert!(report.directory_available);
    assert_eq!(report.live, 2);
    assert_eq!(report.missing, 1);
    assert_eq!(report.repaired, vec!["alice1"]);
    assert_eq!(report.verdict(), Verdict::Repaired);
    assert_eq!(provisioner.launched_names(), vec!["alice1"]);

    assert_eq!(report.groups["alice"].live, vec!["alice0"]);
    assert_eq!(report.groups["alice"].missing, vec!["alice1"]);
    assert_eq!(report.groups["bob"].live, vec!["bob0"]);

    // Recreated from the stored record, under the same name.
    let spec = provisioner.launched.lock().unwrap()[0].clone();
    assert_eq!(spec.remote_artifact_ref, "registry.test/node-alice:acme");
    assert_eq!(spec.env[ENV_DIRECTORY], "http://directory.test:8080");
}

#[tokio::test]
async fn test_second_pass_is_clean() {
    let provisioner = Arc::new(FakeProvisioner::with_running(&["alice0"]));
    let probe = Arc::new(FakeProbe::new(true));
    let reconciler = reconciler(provisioner.clone(), probe, ReconcilePolicy::default());
    let network = topology(&[("alice", 0), ("alice", 1)]);

    let first = reconciler.check(&network).await;
    assert_eq!(first.repairs_succeeded, 1);

    let second = reconciler.check(&network).await;
    assert_eq!(second.verdict(), Verdict::Healthy);
    assert_eq!(second.repairs_attempted, 0);
    assert_eq!(provisioner.launched_names(), vec!["alice1"]);
}

#[tokio::test]
async fn test_gate_down_skips_everything() {
    let provisioner = Arc::new(FakeProvisioner::default());
    let probe = Arc::new(FakeProbe::new(false));
    let reconciler = reconciler(provisioner.clone(), probe.clone(), ReconcilePolicy::default());

    let report = reconciler.check(&topology(&[("alice", 0), ("bob", 0)])).await;

    assert!(probe.called.load(Ordering::SeqCst));
    assert!(!report.directory_available);
    assert_eq!(report.verdict(), Verdict::Unreachable);
    assert_eq!(report.repairs_attempted, 0);
    assert_eq!(report.total_instances(), 0);
    assert!(provisioner.launched_names().is_empty());
}

#[tokio::test]
async fn test_probe_error_counts_as_missing() {
    let provisioner = Arc::new(FakeProvisioner {
        probe_errors: HashSet::from(["bob0".to_string()]),
        ..FakeProvisioner::with_running(&["alice0"])
    });
    let probe = Arc::new(FakeProbe::new(true));
    let reconciler = reconciler(provisioner.clone(), probe, ReconcilePolicy::default());

    let report = reconciler.check(&topology(&[("alice", 0), ("bob", 0)])).await;

    assert_eq!(report.missing, 1);
    assert_eq!(report.probe_errors, 1);
    assert_eq!(report.repaired, vec!["bob0"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_repair_failure_does_not_abort_siblings() {
    let provisioner = Arc::new(FakeProvisioner {
        fail_instances: HashSet::from(["alice1".to_string()]),
        ..Default::default()
    });
    let probe = Arc::new(FakeProbe::new(true));
    let reconciler = reconciler(provisioner.clone(), probe, ReconcilePolicy::default());

    let report = reconciler
        .check(&topology(&[("alice", 0), ("alice", 1), ("bob", 0)]))
        .await;

    assert_eq!(report.repairs_attempted, 3);
    assert_eq!(report.repairs_succeeded, 2);
    assert_eq!(report.repairs_failed, 1);
    assert_eq!(report.repaired, vec!["alice0", "bob0"]);
    assert_eq!(report.failures[0].instance, "alice1");
    assert!(report.failures[0].reason.contains("capacity unavailable"));
    assert_eq!(report.verdict(), Verdict::Degraded);
    assert!(!report.is_healthy());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_repairs_are_bounded_but_never_skipped() {
    let provisioner = Arc::new(FakeProvisioner {
        delay: Duration::from_millis(30),
        ..Default::default()
    });
    let probe = Arc::new(FakeProbe::new(true));
    let policy = ReconcilePolicy {
        max_parallel_repairs: 2,
        ..Default::default()
    };
    let reconciler = reconciler(provisioner.clone(), probe, policy);

    let records: Vec<(&str, u32)> = (0..6).map(|i| ("alice", i)).collect();
    let report = reconciler.check(&topology(&records)).await;

    assert_eq!(report.repairs_succeeded, 6);
    assert!(provisioner.max_in_flight.load(Ordering::SeqCst) <= 2);
    assert_eq!(provisioner.launched_names().len(), 6);
}

#[tokio::test]
async fn test_empty_topology_is_healthy() {
    let provisioner = Arc::new(FakeProvisioner::default());
    let probe = Arc::new(FakeProbe::new(true));
    let reconciler = reconciler(provisioner, probe, ReconcilePolicy::default());

    let report = reconciler
        .check(&NetworkTopology::new("acme", "westeurope"))
        .await;
    assert_eq!(report.verdict(), Verdict::Healthy);
    assert_eq!(report.health_ratio(), 1.0);
}

#[test]
fn test_invalid_policy_is_rejected() {
    let policy = ReconcilePolicy {
        max_parallel_repairs: 0,
        ..Default::default()
    };
    let result = Reconciler::new(
        Arc::new(FakeProvisioner::default()),
        Arc::new(FakeProbe::new(true)),
        "http://directory.test:8080",
        policy,
    );
    assert!(result.is_err());
}
