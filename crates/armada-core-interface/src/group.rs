//! Group definitions handed to the engine by discovery

use armada_core_topology::{Credentials, GroupKind, PeerIdentity};
use std::path::PathBuf;

/// RPC port assumed when a definition does not name one
pub const DEFAULT_SERVICE_PORT: u16 = 10003;

/// One discovered group (a node organisation or a notary)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDefinition {
    /// Lowercased group name, the prefix of every instance name
    pub name: String,
    /// Directory the artifact is built from
    pub config_source: PathBuf,
    pub kind: GroupKind,
    /// Identity template shared by all replicas
    pub identity: PeerIdentity,
    pub service_port: u16,
    pub credentials: Option<Credentials>,
}

impl GroupDefinition {
    pub fn node(
        name: impl Into<String>,
        config_source: impl Into<PathBuf>,
        identity: PeerIdentity,
    ) -> Self {
        Self::new(name, config_source, GroupKind::Node, identity)
    }

    pub fn notary(
        name: impl Into<String>,
        config_source: impl Into<PathBuf>,
        identity: PeerIdentity,
    ) -> Self {
        Self::new(name, config_source, GroupKind::Notary, identity)
    }

    fn new(
        name: impl Into<String>,
        config_source: impl Into<PathBuf>,
        kind: GroupKind,
        identity: PeerIdentity,
    ) -> Self {
        Self {
            name: name.into().to_lowercase(),
            config_source: config_source.into(),
            kind,
            identity,
            service_port: DEFAULT_SERVICE_PORT,
            credentials: None,
        }
    }

    pub fn with_service_port(mut self, port: u16) -> Self {
        self.service_port = port;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn is_notary(&self) -> bool {
        self.kind == GroupKind::Notary
    }

    /// Registry name the group's image is published under
    ///
    /// Node images are prefixed with `node-` so they never collide with a
    /// notary of the same name.
    pub fn logical_image_name(&self) -> String {
        match self.kind {
            GroupKind::Node => format!("node-{}", self.name),
            GroupKind::Notary => self.name.clone(),
        }
    }
}
