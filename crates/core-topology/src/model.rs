//! Network topology data model
//!
//! `NetworkTopology` is the durable picture of one network: which image each
//! group was published as, and which instances were realized for each group.
//! Callers only ever hold owned snapshots of it; concurrent mutation goes
//! through [`crate::TopologyStore`].

use crate::identity::PeerIdentity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Whether a group is an ordinary node or a notary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    #[default]
    Node,
    Notary,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKind::Node => write!(f, "node"),
            GroupKind::Notary => write!(f, "notary"),
        }
    }
}

/// RPC credentials passed through to an instance
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One realized (or to-be-realized) replica of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub group_name: String,
    #[serde(default)]
    pub kind: GroupKind,
    pub group_identity: PeerIdentity,
    /// `{group_name}{ordinal}`
    pub instance_name: String,
    pub instance_identity: PeerIdentity,
    pub local_artifact_id: String,
    pub remote_artifact_ref: String,
    /// RPC port exposed by the instance
    pub service_port: u16,
    /// Address the instance is expected to be reachable at
    pub reachable_address: String,
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl InstanceRecord {
    /// Instance name for replica `ordinal` of `group`
    pub fn instance_name_for(group: &str, ordinal: u32) -> String {
        format!("{}{}", group, ordinal)
    }
}

/// Strip everything but ASCII letters and digits
///
/// Cloud resource names (resource groups, registries, storage accounts) are
/// far stricter than network names.
pub fn sanitize_resource_name(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Durable model of one provisioned network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTopology {
    network_name: String,
    region: String,
    resource_group: String,
    // Not read by armada; kept in the document for tooling that shares the
    // network's registry and storage accounts.
    registry_namespace: String,
    storage_namespace: String,
    #[serde(default)]
    directory_address: Option<String>,
    #[serde(default)]
    node_images: BTreeMap<String, String>,
    #[serde(default)]
    notary_images: BTreeMap<String, String>,
    #[serde(default)]
    instances: BTreeMap<String, Vec<InstanceRecord>>,
    #[serde(default)]
    initialized: bool,
}

impl NetworkTopology {
    /// Fresh, empty topology for a network
    pub fn new(network_name: impl Into<String>, region: impl Into<String>) -> Self {
        let network_name = network_name.into();
        let sanitized = sanitize_resource_name(&network_name);
        Self {
            resource_group: sanitized.clone(),
            registry_namespace: sanitized.clone(),
            storage_namespace: sanitized.to_ascii_lowercase(),
            network_name,
            region: region.into(),
            directory_address: None,
            node_images: BTreeMap::new(),
            notary_images: BTreeMap::new(),
            instances: BTreeMap::new(),
            initialized: false,
        }
    }

    pub fn with_directory_address(mut self, address: impl Into<String>) -> Self {
        self.directory_address = Some(address.into());
        self
    }

    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    /// Sanitized network name for the registry; only persisted
    pub fn registry_namespace(&self) -> &str {
        &self.registry_namespace
    }

    /// Lowercase sanitized network name for storage; only persisted
    pub fn storage_namespace(&self) -> &str {
        &self.storage_namespace
    }

    pub fn directory_address(&self) -> Option<&str> {
        self.directory_address.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn node_image(&self, group: &str) -> Option<&str> {
        self.node_images.get(group).map(String::as_str)
    }

    pub fn notary_image(&self, group: &str) -> Option<&str> {
        self.notary_images.get(group).map(String::as_str)
    }

    pub fn node_images(&self) -> impl Iterator<Item = (&str, &str)> {
        self.node_images.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn notary_images(&self) -> impl Iterator<Item = (&str, &str)> {
        self.notary_images.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Group names in stable order, including groups with no instances
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.instances.keys().map(String::as_str)
    }

    /// Instances recorded for a group; empty for unknown groups
    pub fn group_instances(&self, group: &str) -> &[InstanceRecord] {
        self.instances.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every recorded instance, grouped
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[InstanceRecord])> {
        self.instances
            .iter()
            .map(|(group, records)| (group.as_str(), records.as_slice()))
    }

    pub fn instance_count(&self) -> usize {
        self.instances.values().map(Vec::len).sum()
    }

    // Mutators are crate-private: shared mutation goes through TopologyStore.

    pub(crate) fn set_directory_address(&mut self, address: Option<String>) {
        self.directory_address = address;
    }

    pub(crate) fn node_images_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.node_images
    }

    pub(crate) fn notary_images_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.notary_images
    }

    pub(crate) fn group_entry(&mut self, group: &str) -> &mut Vec<InstanceRecord> {
        self.instances.entry(group.to_string()).or_default()
    }

    pub(crate) fn group_mut(&mut self, group: &str) -> Option<&mut Vec<InstanceRecord>> {
        self.instances.get_mut(group)
    }

    pub(crate) fn set_initialized(&mut self) {
        self.initialized = true;
    }
}
