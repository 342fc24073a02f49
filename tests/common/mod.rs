//! Shared fixtures for armada integration tests
#![allow(dead_code)]

use armada::deploy::Backends;
use armada_core_interface::{
    ArtifactBuilder, ArtifactPublisher, CapabilityError, DirectoryProbe, GroupDefinition,
    InstanceProvisioner, LaunchSpec, Result,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Write `{workdir}/{name}/node.conf` and a Dockerfile next to it
pub fn write_group(workdir: &Path, name: &str, node_conf: &str) {
    let dir = workdir.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("node.conf"), node_conf).unwrap();
    std::fs::write(dir.join("Dockerfile"), "FROM corda/corda-zulu-4.0:latest\n").unwrap();
}

pub fn node_conf(organisation: &str, rpc_port: u16) -> String {
    format!(
        r#"myLegalName="O={},L=London,C=GB"
p2pAddress="localhost:10002"
rpcSettings {{
    address="localhost:{}"
    adminAddress="localhost:10043"
}}
rpcUsers=[
    {{
        user=user1
        password=test
        permissions=[ ALL ]
    }}
]
"#,
        organisation, rpc_port
    )
}

pub fn notary_conf(organisation: &str) -> String {
    format!(
        r#"myLegalName="O={},L=Zurich,C=CH"
notary {{
    validating=false
}}
p2pAddress="localhost:10002"
rpcAddress="localhost:10003"
"#,
        organisation
    )
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

pub struct FakePublisher;

#[async_trait]
impl ArtifactPublisher for FakePublisher {
    async fn publish(&self, _local_id: &str, logical_name: &str, network: &str) -> Result<String> {
        Ok(format!("registry.test/{}:{}", logical_name, network))
    }
}

/// Cloud double whose "running" set survives across runs
#[derive(Default)]
pub struct FakeCloud {
    pub running: Mutex<HashSet<String>>,
    pub launched: Mutex<Vec<LaunchSpec>>,
    pub fail_instances: Mutex<HashSet<String>>,
}

impl FakeCloud {
    pub fn kill(&self, instance: &str) {
        self.running.lock().unwrap().remove(instance);
    }

    pub fn is_up(&self, instance: &str) -> bool {
        self.running.lock().unwrap().contains(instance)
    }

    pub fn launch_count(&self, instance: &str) -> usize {
        self.launched
            .lock()
            .unwrap()
            .iter()
            .filter(|spec| spec.instance_name == instance)
            .count()
    }
}

#[async_trait]
impl InstanceProvisioner for FakeCloud {
    async fn instantiate(&self, spec: &LaunchSpec) -> Result<String> {
        self.launched.lock().unwrap().push(spec.clone());
        if self.fail_instances.lock().unwrap().contains(&spec.instance_name) {
            return Err(CapabilityError::Instantiate {
                instance: spec.instance_name.clone(),
                reason: "quota exceeded".to_string(),
            });
        }
        self.running.lock().unwrap().insert(spec.instance_name.clone());
        Ok(self.expected_address(&spec.instance_name))
    }

    async fn is_running(&self, instance_name: &str) -> Result<bool> {
        Ok(self.is_up(instance_name))
    }

    fn expected_address(&self, instance_name: &str) -> String {
        format!("{}-acme.westeurope.test", instance_name)
    }
}

pub struct FakeDirectory {
    pub available: AtomicBool,
}

impl FakeDirectory {
    pub fn up() -> Self {
        Self {
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl DirectoryProbe for FakeDirectory {
    async fn is_available(&self, _timeout: Duration) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

/// One fake world shared by successive runs
pub struct World {
    pub builder: Arc<FakeBuilder>,
    pub cloud: Arc<FakeCloud>,
    pub directory: Arc<FakeDirectory>,
}

impl World {
    pub fn new() -> Self {
        Self::with_builder(FakeBuilder::default())
    }

    pub fn with_builder(builder: FakeBuilder) -> Self {
        Self {
            builder: Arc::new(builder),
            cloud: Arc::new(FakeCloud::default()),
            directory: Arc::new(FakeDirectory::up()),
        }
    }

    pub fn backends(&self) -> Backends {
        Backends {
            builder: self.builder.clone(),
            publisher: Arc::new(FakePublisher),
            provisioner: self.cloud.clone(),
            probe: self.directory.clone(),
        }
    }
}
