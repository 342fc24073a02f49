//! Medic: recreates missing instances
//!
//! A repair replays the original launch: same artifact reference, same name,
//! same ports and environment. No new ordinal is ever minted here.

use armada_core_interface::{InstanceProvisioner, LaunchSpec, Result};
use armada_core_topology::InstanceRecord;
use std::sync::Arc;
use tracing::info;

/// Executes repair operations
pub struct Medic {
    provisioner: Arc<dyn InstanceProvisioner>,

    /// Directory address injected into recreated instances
    directory_address: String,
}

impl Medic {
    pub fn new(
        provisioner: Arc<dyn InstanceProvisioner>,
        directory_address: impl Into<String>,
    ) -> Self {
        Self {
            provisioner,
            directory_address: directory_address.into(),
        }
    }

    /// Recreate `record` in place and return its reachable address
    pub async fn repair(&self, record: &InstanceRecord) -> Result<String> {
        info!(
            "🚑 Medic: Recreating instance {} of group '{}'",
            record.instance_name, record.group_name
        );
        info!("   Image: {}", record.remote_artifact_ref);

        let spec = LaunchSpec::for_instance(record, &self.directory_address);
        let address = self.provisioner.instantiate(&spec).await?;

        info!("   ✅ {} is back at {}", record.instance_name, address);
        Ok(address)
    }
}
