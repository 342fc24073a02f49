//! Armada Pipeline: concurrent build, publish and instantiate
//!
//! Turns a set of discovered group definitions into running instances and a
//! populated [`armada_core_topology::TopologyStore`].
//!
//! ```rust,no_run
//! use armada_pipeline::{DeployContext, ProvisioningPipeline};
//! use armada_core_topology::{NetworkTopology, TopologyStore};
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! # async fn example(ctx: DeployContext, groups: Vec<armada_core_interface::GroupDefinition>) {
//! let store = Arc::new(TopologyStore::new(NetworkTopology::new("acme", "westeurope")));
//! let pipeline = ProvisioningPipeline::new(ctx, store);
//!
//! let report = pipeline.provision(groups, Vec::new(), &BTreeMap::new()).await;
//! println!("{}", report.summary());
//! # }
//! ```

pub mod context;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod replica;
pub mod report;
pub mod task_group;

pub use context::DeployContext;
pub use error::{PipelineError, Result};
pub use gate::{publication_gate, GateOpener, PublicationGate};
pub use pipeline::{ProvisioningPipeline, DEFAULT_REPLICAS};
pub use replica::PublishedArtifact;
pub use report::{GroupOutcome, ProvisionReport, Stage, StageFailure};
pub use task_group::TaskGroup;
