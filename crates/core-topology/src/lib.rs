//! Armada Core Topology: the durable model of a provisioned network
//!
//! A network is a set of named groups (ordinary nodes and notaries). Each
//! group is published once as a remote image and realized as one or more
//! running instances. This crate holds that model:
//!
//! - [`NetworkTopology`]: serializable snapshot of one network
//! - [`InstanceRecord`]: one replica of a group, flat and immutable
//! - [`PeerIdentity`]: distinguished names, with per-replica ordinals
//! - [`TopologyStore`]: thread-safe owner used by concurrent provisioning tasks
//! - [`StateFile`]: JSON persistence keyed by network name
//!
//! # Example
//!
//! ```no_run
//! use armada_core_topology::{NetworkTopology, StateFile, TopologyStore};
//! use std::path::Path;
//!
//! # fn main() -> armada_core_topology::Result<()> {
//! let state = StateFile::in_workdir(Path::new("."));
//! let store = TopologyStore::new(state.load_or_new("acme", "westeurope")?);
//!
//! // ... provisioning tasks register instances concurrently ...
//!
//! state.persist(&store.snapshot())?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod identity;
pub mod model;
pub mod state_file;
pub mod store;

pub use error::{Error, Result};
pub use identity::PeerIdentity;
pub use model::{sanitize_resource_name, Credentials, GroupKind, InstanceRecord, NetworkTopology};
pub use state_file::{StateFile, STATE_DIR_NAME};
pub use store::TopologyStore;
