//! Armada Core Interface: the external capabilities the engine drives
//!
//! Provisioning a network touches four outside systems. The engine never
//! talks to them directly; it calls these traits, which keeps the pipeline and
//! the reconciler testable with in-memory fakes:
//!
//! 1. [`ArtifactBuilder`]: turn a group definition into a local image
//! 2. [`ArtifactPublisher`]: push that image to a network-scoped registry path
//! 3. [`InstanceProvisioner`]: start remote instances and report liveness
//! 4. [`DirectoryProbe`]: health of the network directory service
//!
//! All calls are plain async functions that either return a value or fail
//! with a [`CapabilityError`]. Transport (HTTP, SDK, subprocess) is the
//! implementation's business.
//!
//! # Example
//!
//! ```rust,no_run
//! use armada_core_interface::{InstanceProvisioner, LaunchSpec};
//! use armada_core_topology::InstanceRecord;
//!
//! async fn restart<P: InstanceProvisioner>(
//!     provisioner: &P,
//!     record: &InstanceRecord,
//! ) -> armada_core_interface::Result<String> {
//!     if provisioner.is_running(&record.instance_name).await? {
//!         return Ok(record.reachable_address.clone());
//!     }
//!     let spec = LaunchSpec::for_instance(record, "http://directory:8080");
//!     provisioner.instantiate(&spec).await
//! }
//! ```

pub mod group;
pub mod launch;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use group::{GroupDefinition, DEFAULT_SERVICE_PORT};
pub use launch::{
    LaunchSpec, ENV_DIRECTORY, ENV_IDENTITY, ENV_OUR_NAME, ENV_OUR_PORT, P2P_PORT, SSH_PORT,
};

/// Failure of an external capability
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// The group has no usable definition (missing config or Dockerfile)
    #[error("No configuration found for group '{group}': {reason}")]
    NoConfig { group: String, reason: String },

    #[error("Build failed for group '{group}': {reason}")]
    Build { group: String, reason: String },

    #[error("Publish of {local_id} as '{logical_name}' failed: {reason}")]
    Publish {
        local_id: String,
        logical_name: String,
        reason: String,
    },

    #[error("Instantiation of '{instance}' failed: {reason}")]
    Instantiate { instance: String, reason: String },

    #[error("Probe failed: {0}")]
    Probe(String),

    /// An external command could not be run at all
    #[error("Command `{program}` failed: {reason}")]
    Command { program: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CapabilityError>;

/// Builds a deployable artifact for a group
#[async_trait]
pub trait ArtifactBuilder: Send + Sync + 'static {
    /// Build the group's image and return its local identifier
    ///
    /// # Errors
    ///
    /// `CapabilityError::NoConfig` when the definition is unusable,
    /// `CapabilityError::Build` when the toolchain fails. Both are fatal to
    /// this group only.
    async fn build(&self, group: &GroupDefinition) -> Result<String>;
}

/// Pushes local artifacts to the remote registry
#[async_trait]
pub trait ArtifactPublisher: Send + Sync + 'static {
    /// Publish `local_id` as `logical_name`, scoped by `network_name`
    ///
    /// Returns the remote reference instances are created from.
    async fn publish(
        &self,
        local_id: &str,
        logical_name: &str,
        network_name: &str,
    ) -> Result<String>;
}

/// Creates and inspects remote compute instances
///
/// Must be safe to call concurrently for distinct instance names. Calling
/// `instantiate` twice for the same name is left to the provider.
#[async_trait]
pub trait InstanceProvisioner: Send + Sync + 'static {
    /// Create (or detect) the instance and return its reachable address
    async fn instantiate(&self, spec: &LaunchSpec) -> Result<String>;

    /// Whether the named instance is currently running
    async fn is_running(&self, instance_name: &str) -> Result<bool>;

    /// Address an instance will have once created; pure, no remote call
    fn expected_address(&self, instance_name: &str) -> String;
}

/// Health check of the network directory service
#[async_trait]
pub trait DirectoryProbe: Send + Sync + 'static {
    /// `true` if the directory answered its health endpoint within `timeout`
    async fn is_available(&self, timeout: Duration) -> bool;
}
