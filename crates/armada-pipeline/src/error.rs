//! Error types for the provisioning pipeline

use armada_core_interface::CapabilityError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Build of group '{group}' failed: {source}")]
    Build {
        group: String,
        #[source]
        source: CapabilityError,
    },

    #[error("Publish of group '{group}' failed: {source}")]
    Publish {
        group: String,
        #[source]
        source: CapabilityError,
    },

    #[error("Instantiation of '{instance}' failed: {source}")]
    Instantiate {
        instance: String,
        #[source]
        source: CapabilityError,
    },

    #[error("Topology error: {0}")]
    Topology(#[from] armada_core_topology::Error),

    #[error("Group '{0}' has no recorded instances")]
    UnknownGroup(String),

    #[error("Group '{0}' is a notary and runs a single replica")]
    NotaryReplica(String),

    #[error("Task in stage '{stage}' panicked: {reason}")]
    TaskPanicked { stage: String, reason: String },

    /// Aggregate raised once every task of a pass has settled
    #[error("{failed} group(s) failed to provision; first failure: {first}")]
    GroupsFailed { failed: usize, first: String },
}

impl PipelineError {
    /// Group- or instance-level failures never abort sibling tasks
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            PipelineError::Build { .. }
                | PipelineError::Publish { .. }
                | PipelineError::Instantiate { .. }
        )
    }
}
