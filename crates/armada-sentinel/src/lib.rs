//! Armada Sentinel: drift detection and repair
//!
//! Re-running armada against an existing network performs one reconciliation
//! pass over the persisted topology:
//!
//! ```text
//! ┌─────────────┐
//! │  Gate       │──> Directory service answers /ping?
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │  Observe    │──> is_running() for every recorded instance
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │  Diff       │──> Live or missing, per group
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │  Repair     │──> Medic recreates each missing instance in place
//! └─────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use armada_sentinel::{ReconcilePolicy, Reconciler};
//! use armada_core_interface::{DirectoryProbe, InstanceProvisioner};
//! use armada_core_topology::NetworkTopology;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     provisioner: Arc<dyn InstanceProvisioner>,
//! #     probe: Arc<dyn DirectoryProbe>,
//! #     topology: NetworkTopology,
//! # ) -> Result<(), armada_sentinel::SentinelError> {
//! let reconciler = Reconciler::new(
//!     provisioner,
//!     probe,
//!     "http://directory:8080",
//!     ReconcilePolicy::default(),
//! )?;
//!
//! let report = reconciler.check(&topology).await;
//! println!("{} ({})", report.summary(), report.verdict());
//! # Ok(())
//! # }
//! ```

pub mod medic;
pub mod metrics;
pub mod policy;
pub mod reconciler;

pub use medic::Medic;
pub use metrics::{GroupHealth, RepairFailure, RepairReport, RepairReportBuilder, Verdict};
pub use policy::ReconcilePolicy;
pub use reconciler::{Reconciler, SentinelError};
