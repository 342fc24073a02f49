/*!
 * Armada - ledger network provisioning and reconciliation
 *
 * Stands up a permissioned ledger network on cloud container instances and
 * keeps it running:
 * - Discovery of node and notary groups from `node.conf` directories
 * - Concurrent build, publish and instantiate of every group
 * - Notary publication gating node instantiation
 * - Post-hoc replica adds with stable ordinals
 * - Drift detection and repair against the persisted topology
 * - Atomic JSON state per network
 */

pub mod backend;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod system;

// Re-export commonly used types
pub use config::{ArmadaConfig, LogLevel};
pub use deploy::{run, Backends, RunMode, RunOutcome, RunRequest};
pub use discovery::{discover_groups, DiscoveredGroups, DiscoveryError};
pub use error::{ArmadaError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
