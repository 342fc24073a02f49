//! Collaborators shared by every pipeline task

use armada_core_interface::{ArtifactBuilder, ArtifactPublisher, InstanceProvisioner};
use std::fmt;
use std::sync::Arc;

/// Everything a deployment pass needs from the outside world
///
/// Built once by the caller and shared by reference count; there are no
/// global singletons.
#[derive(Clone)]
pub struct DeployContext {
    pub network_name: String,
    /// Base URL injected into every instance as its directory service
    pub directory_address: String,
    pub builder: Arc<dyn ArtifactBuilder>,
    pub publisher: Arc<dyn ArtifactPublisher>,
    pub provisioner: Arc<dyn InstanceProvisioner>,
}

impl DeployContext {
    pub fn new(
        network_name: impl Into<String>,
        directory_address: impl Into<String>,
        builder: Arc<dyn ArtifactBuilder>,
        publisher: Arc<dyn ArtifactPublisher>,
        provisioner: Arc<dyn InstanceProvisioner>,
    ) -> Self {
        Self {
            network_name: network_name.into(),
            directory_address: directory_address.into(),
            builder,
            publisher,
            provisioner,
        }
    }
}

impl fmt::Debug for DeployContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployContext")
            .field("network_name", &self.network_name)
            .field("directory_address", &self.directory_address)
            .finish_non_exhaustive()
    }
}
