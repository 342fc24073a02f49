//! Launch specifications
//!
//! The ports and environment an instance is started with are a pure function
//! of its record and the directory address. Fresh provisioning and repair
//! both derive them here, so a repaired instance comes back exactly as it was
//! first created.

use armada_core_topology::{GroupKind, InstanceRecord};
use std::collections::BTreeMap;

/// Peer-to-peer port every instance listens on
pub const P2P_PORT: u16 = 10020;

/// SSH port exposed by node instances
pub const SSH_PORT: u16 = 12222;

pub const ENV_DIRECTORY: &str = "NETWORK_MAP";
pub const ENV_OUR_NAME: &str = "OUR_NAME";
pub const ENV_OUR_PORT: &str = "OUR_PORT";
pub const ENV_IDENTITY: &str = "X500";

/// Everything the provisioner needs to start one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub remote_artifact_ref: String,
    /// Ports to expose, in order
    pub ports: Vec<u16>,
    pub instance_name: String,
    pub env: BTreeMap<String, String>,
}

impl LaunchSpec {
    /// Launch parameters for a recorded instance
    pub fn for_instance(record: &InstanceRecord, directory_address: &str) -> Self {
        let mut env = BTreeMap::new();
        env.insert(ENV_DIRECTORY.to_string(), directory_address.to_string());
        env.insert(ENV_OUR_NAME.to_string(), record.reachable_address.clone());
        env.insert(ENV_OUR_PORT.to_string(), P2P_PORT.to_string());

        let ports = match record.kind {
            GroupKind::Node => {
                env.insert(
                    ENV_IDENTITY.to_string(),
                    record.instance_identity.to_string(),
                );
                vec![P2P_PORT, record.service_port, SSH_PORT]
            }
            GroupKind::Notary => vec![P2P_PORT],
        };

        Self {
            remote_artifact_ref: record.remote_artifact_ref.clone(),
            ports,
            instance_name: record.instance_name.clone(),
            env,
        }
    }
}
