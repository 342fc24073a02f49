//! Azure Container Instances provisioner
//!
//! Each instance becomes one container group named `{instance}-{network}`,
//! which is also its DNS label. Groups restart on failure, so a crashed
//! process comes back without the reconciler; a deleted group does not.

use super::{args, run_checked};
use crate::system::CommandRunner;
use armada_core_interface::{CapabilityError, InstanceProvisioner, LaunchSpec};
use armada_core_topology::Credentials;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Instance state reported for a healthy container group
const RUNNING_STATE: &str = "Running";

/// Markers `az` prints when a container group does not exist
const NOT_FOUND_MARKERS: [&str; 2] = ["ResourceNotFound", "was not found"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainerGroup {
    ip_address: Option<IpAddress>,
}

#[derive(Debug, Deserialize)]
struct IpAddress {
    fqdn: Option<String>,
}

/// Provisions instances through the `az` CLI
#[derive(Clone)]
pub struct AzureContainerProvisioner {
    runner: Arc<dyn CommandRunner>,
    program: String,
    resource_group: String,
    network_name: String,
    region: String,
    registry: Option<String>,
    registry_credentials: Option<Credentials>,
    cpu: f64,
    memory_gb: f64,
}

impl AzureContainerProvisioner {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        program: impl Into<String>,
        resource_group: impl Into<String>,
        network_name: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            resource_group: resource_group.into(),
            network_name: network_name.into(),
            region: region.into(),
            registry: None,
            registry_credentials: None,
            cpu: 1.0,
            memory_gb: 2.0,
        }
    }

    /// Private registry the images are pulled from
    pub fn with_registry(mut self, login_server: impl Into<String>) -> Self {
        self.registry = Some(login_server.into());
        self
    }

    /// Pull credentials for the private registry, passed through to `az`
    pub fn with_registry_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.registry_credentials = credentials;
        self
    }

    pub fn with_resources(mut self, cpu: f64, memory_gb: f64) -> Self {
        self.cpu = cpu;
        self.memory_gb = memory_gb;
        self
    }

    /// Container group (and DNS label) of an instance
    pub fn container_group_name(&self, instance_name: &str) -> String {
        format!("{}-{}", instance_name, self.network_name).to_lowercase()
    }

    fn create_args(&self, spec: &LaunchSpec) -> Vec<String> {
        let group_name = self.container_group_name(&spec.instance_name);
        let mut create = args([
            "container",
            "create",
            "--resource-group",
            self.resource_group.as_str(),
            "--name",
            group_name.as_str(),
            "--image",
            spec.remote_artifact_ref.as_str(),
            "--location",
            self.region.as_str(),
            "--dns-name-label",
            group_name.as_str(),
            "--os-type",
            "Linux",
            "--restart-policy",
            "OnFailure",
        ]);

        create.push("--ports".to_string());
        create.extend(spec.ports.iter().map(u16::to_string));

        if !spec.env.is_empty() {
            create.push("--environment-variables".to_string());
            create.extend(spec.env.iter().map(|(k, v)| format!("{}={}", k, v)));
        }

        create.extend(args(["--cpu".to_string(), self.cpu.to_string()]));
        create.extend(args(["--memory".to_string(), self.memory_gb.to_string()]));

        if let Some(registry) = &self.registry {
            create.extend(args(["--registry-login-server", registry.as_str()]));
            if let Some(credentials) = &self.registry_credentials {
                create.extend(args([
                    "--registry-username",
                    credentials.username.as_str(),
                    "--registry-password",
                    credentials.password.as_str(),
                ]));
            }
        }
        create.extend(args(["--output", "json"]));
        create
    }
}

#[async_trait]
impl InstanceProvisioner for AzureContainerProvisioner {
    async fn instantiate(&self, spec: &LaunchSpec) -> Result<String, CapabilityError> {
        info!(
            "Creating container group for {} from {} with ports {:?}",
            spec.instance_name, spec.remote_artifact_ref, spec.ports
        );

        let output = run_checked(
            self.runner.as_ref(),
            &self.program,
            self.create_args(spec),
            |reason| CapabilityError::Instantiate {
                instance: spec.instance_name.clone(),
                reason,
            },
        )
        .await?;

        let fqdn = serde_json::from_str::<ContainerGroup>(&output.stdout)
            .ok()
            .and_then(|group| group.ip_address)
            .and_then(|ip| ip.fqdn)
            .filter(|fqdn| !fqdn.is_empty());

        Ok(match fqdn {
            Some(fqdn) => fqdn,
            None => {
                debug!("No fqdn reported for {}, using expected address", spec.instance_name);
                self.expected_address(&spec.instance_name)
            }
        })
    }

    async fn is_running(&self, instance_name: &str) -> Result<bool, CapabilityError> {
        let group_name = self.container_group_name(instance_name);
        let show = args([
            "container",
            "show",
            "--resource-group",
            self.resource_group.as_str(),
            "--name",
            group_name.as_str(),
            "--query",
            "instanceView.state",
            "--output",
            "tsv",
        ]);

        let output = self.runner.run(&self.program, &show).await?;
        if output.is_success() {
            return Ok(output.stdout.trim() == RUNNING_STATE);
        }
        if NOT_FOUND_MARKERS.iter().any(|marker| output.stderr.contains(marker)) {
            return Ok(false);
        }
        Err(CapabilityError::Probe(format!(
            "state of {}: {}",
            group_name,
            output.failure_reason()
        )))
    }

    fn expected_address(&self, instance_name: &str) -> String {
        format!(
            "{}.{}.azurecontainer.io",
            self.container_group_name(instance_name),
            self.region
        )
    }
}
