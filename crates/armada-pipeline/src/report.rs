//! Outcome of a provisioning pass
//!
//! Every unit of work settles into either a success or a [`StageFailure`];
//! nothing is dropped. The report keeps failures in the order they settled so
//! callers can surface the first one.

use crate::error::PipelineError;
use armada_core_topology::{GroupKind, NetworkTopology};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Pipeline stage a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Publish,
    /// Writing the published image into the topology
    Record,
    Instantiate,
    /// A task died before reporting a result
    Task,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Build => "build",
            Stage::Publish => "publish",
            Stage::Record => "record",
            Stage::Instantiate => "instantiate",
            Stage::Task => "task",
        };
        f.write_str(name)
    }
}

/// One failed unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: Stage,
    pub group: String,
    pub instance: Option<String>,
    pub message: String,
}

impl StageFailure {
    pub fn from_error(group: &str, instance: Option<&str>, error: &PipelineError) -> Self {
        let stage = match error {
            PipelineError::Build { .. } => Stage::Build,
            PipelineError::Publish { .. } => Stage::Publish,
            PipelineError::Instantiate { .. } => Stage::Instantiate,
            PipelineError::Topology(_)
            | PipelineError::UnknownGroup(_)
            | PipelineError::NotaryReplica(_) => Stage::Record,
            PipelineError::TaskPanicked { .. } | PipelineError::GroupsFailed { .. } => Stage::Task,
        };
        Self {
            stage,
            group: group.to_string(),
            instance: instance.map(str::to_string),
            message: error.to_string(),
        }
    }

    /// Failures that prevented a whole group from being deployed
    pub fn is_group_level(&self) -> bool {
        self.stage != Stage::Instantiate
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance {
            Some(instance) => write!(
                f,
                "[{}] {}/{}: {}",
                self.stage, self.group, instance, self.message
            ),
            None => write!(f, "[{}] {}: {}", self.stage, self.group, self.message),
        }
    }
}

/// What happened to one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    pub group: String,
    pub kind: GroupKind,
    /// Set once the image was published
    pub remote_artifact_ref: Option<String>,
    /// Instances that were started and registered
    pub instances: Vec<String>,
    pub failures: Vec<StageFailure>,
}

impl GroupOutcome {
    pub fn new(group: impl Into<String>, kind: GroupKind) -> Self {
        Self {
            group: group.into(),
            kind,
            remote_artifact_ref: None,
            instances: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn fail(&mut self, instance: Option<&str>, error: &PipelineError) {
        let failure = StageFailure::from_error(&self.group, instance, error);
        self.failures.push(failure);
    }

    /// Published and every planned replica came up
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_instances(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().filter_map(|f| f.instance.as_deref())
    }
}

/// Aggregated result of [`crate::ProvisioningPipeline::provision`]
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    /// Topology after the pass, including `initialized`
    pub topology: NetworkTopology,
    pub groups: BTreeMap<String, GroupOutcome>,
    /// Every failure in settle order
    pub failures: Vec<StageFailure>,
    pub duration: Duration,
}

impl ProvisionReport {
    pub fn group(&self, name: &str) -> Option<&GroupOutcome> {
        self.groups.get(name)
    }

    /// First group-level failure, falling back to the first instance failure
    pub fn first_failure(&self) -> Option<&StageFailure> {
        self.failures
            .iter()
            .find(|f| f.is_group_level())
            .or_else(|| self.failures.first())
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn groups_failed(&self) -> usize {
        self.groups.values().filter(|g| !g.succeeded()).count()
    }

    pub fn instances_started(&self) -> usize {
        self.groups.values().map(|g| g.instances.len()).sum()
    }

    pub fn instances_failed(&self) -> usize {
        self.failures.iter().filter(|f| f.instance.is_some()).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Groups: {} ok, {} failed | Instances: {} started, {} failed | initialized: {} | took {:.1}s",
            self.groups.len() - self.groups_failed(),
            self.groups_failed(),
            self.instances_started(),
            self.instances_failed(),
            self.topology.is_initialized(),
            self.duration.as_secs_f64()
        )
    }

    /// The topology if nothing failed, otherwise an aggregate error
    pub fn into_result(self) -> Result<NetworkTopology, PipelineError> {
        match self.first_failure() {
            None => Ok(self.topology),
            Some(first) => Err(PipelineError::GroupsFailed {
                failed: self.groups_failed().max(1),
                first: first.to_string(),
            }),
        }
    }
}
