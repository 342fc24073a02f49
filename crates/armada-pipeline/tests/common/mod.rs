//! In-memory collaborators for pipeline tests
#![allow(dead_code)]

use armada_core_interface::{
    ArtifactBuilder, ArtifactPublisher, CapabilityError, GroupDefinition, InstanceProvisioner,
    LaunchSpec, Result,
};
use armada_core_topology::PeerIdentity;
use armada_pipeline::DeployContext;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ordered log of completed calls shared by all fakes
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Default)]
pub struct FakeBuilder {
    pub fail_groups: HashSet<String>,
}

#[async_trait]
impl ArtifactBuilder for FakeBuilder {
    async fn build(&self, group: &GroupDefinition) -> Result<String> {
        if self.fail_groups.contains(&group.name) {
            return Err(CapabilityError::Build {
                group: group.name.clone(),
                reason: "docker build exited with status 1".to_string(),
            });
        }
        Ok(format!("sha256:{}", group.name))
    }
}

pub struct FakePublisher {
    pub events: EventLog,
    /// Delay applied to notary publishes (logical names without `node-`)
    pub notary_delay: Duration,
}

#[async_trait]
impl ArtifactPublisher for FakePublisher {
    async fn publish(
        &self,
        _local_id: &str,
        logical_name: &str,
        network_name: &str,
    ) -> Result<String> {
        if !logical_name.starts_with("node-") {
            tokio::time::sleep(self.notary_delay).await;
        }
        self.events
            .lock()
            .unwrap()
            .push(format!("publish:{}", logical_name));
        Ok(format!("registry.test/{}:{}", logical_name, network_name))
    }
}

pub struct FakeProvisioner {
    pub events: EventLog,
    pub fail_instances: HashSet<String>,
    pub launched: Mutex<Vec<LaunchSpec>>,
    pub running: Mutex<HashSet<String>>,
}

impl FakeProvisioner {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            fail_instances: HashSet::new(),
            launched: Mutex::new(Vec::new()),
            running: Mutex::new(HashSet::new()),
        }
    }

    pub fn failing(mut self, instance: &str) -> Self {
        self.fail_instances.insert(instance.to_string());
        self
    }

    pub fn spec_for(&self, instance: &str) -> Option<LaunchSpec> {
        self.launched
            .lock()
            .unwrap()
            .iter()
            .find(|spec| spec.instance_name == instance)
            .cloned()
    }
}

#[async_trait]
impl InstanceProvisioner for FakeProvisioner {
    async fn instantiate(&self, spec: &LaunchSpec) -> Result<String> {
        self.events
            .lock()
            .unwrap()
            .push(format!("instantiate:{}", spec.instance_name));
        self.launched.lock().unwrap().push(spec.clone());

        if self.fail_instances.contains(&spec.instance_name) {
            return Err(CapabilityError::Instantiate {
                instance: spec.instance_name.clone(),
                reason: "quota exceeded".to_string(),
            });
        }
        self.running
            .lock()
            .unwrap()
            .insert(spec.instance_name.clone());
        Ok(self.expected_address(&spec.instance_name))
    }

    async fn is_running(&self, instance_name: &str) -> Result<bool> {
        Ok(self.running.lock().unwrap().contains(instance_name))
    }

    fn expected_address(&self, instance_name: &str) -> String {
        format!("{}-acme.westeurope.test", instance_name)
    }
}

pub struct Fakes {
    pub events: EventLog,
    pub provisioner: Arc<FakeProvisioner>,
    pub ctx: DeployContext,
}

pub fn fakes(builder: FakeBuilder, provisioner: FakeProvisioner, notary_delay: Duration) -> Fakes {
    let events = provisioner.events.clone();
    let provisioner = Arc::new(provisioner);
    let publisher = FakePublisher {
        events: events.clone(),
        notary_delay,
    };
    let ctx = DeployContext::new(
        "acme",
        "http://directory.test:8080",
        Arc::new(builder),
        Arc::new(publisher),
        provisioner.clone(),
    );
    Fakes {
        events,
        provisioner,
        ctx,
    }
}

pub fn node(name: &str) -> GroupDefinition {
    let identity = PeerIdentity::new(format!("{} Corp", name))
        .with_common_name(name)
        .with_locality("London")
        .with_country("GB");
    GroupDefinition::node(name, format!("/nodes/{}", name), identity)
}

pub fn notary(name: &str) -> GroupDefinition {
    let identity = PeerIdentity::new("Notary Service")
        .with_locality("Zurich")
        .with_country("CH");
    GroupDefinition::notary(name, format!("/nodes/{}", name), identity)
}
