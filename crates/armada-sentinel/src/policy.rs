//! Reconciliation policy
//!
//! Limits and timeouts for a single reconciliation pass.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconciler operational policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilePolicy {
    /// How long the directory service gets to answer its health check
    ///
    /// This is the only timeout in the engine; every other call runs to
    /// completion.
    ///
    /// **Default:** 5000 ms
    pub gate_timeout_ms: u64,

    /// Maximum number of concurrent liveness queries
    ///
    /// **Default:** 32
    pub max_parallel_probes: usize,

    /// Maximum number of concurrent instance recreations
    ///
    /// Repairs beyond this limit wait for a free slot; none are skipped.
    ///
    /// **Default:** 10
    pub max_parallel_repairs: usize,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            gate_timeout_ms: 5000,
            max_parallel_probes: 32,
            max_parallel_repairs: 10,
        }
    }
}

impl ReconcilePolicy {
    /// Default policy with a custom gate timeout
    pub fn with_gate_timeout(timeout: Duration) -> Self {
        Self {
            gate_timeout_ms: timeout.as_millis() as u64,
            ..Default::default()
        }
    }

    pub fn gate_timeout(&self) -> Duration {
        Duration::from_millis(self.gate_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.gate_timeout_ms == 0 {
            return Err("gate_timeout_ms must be greater than 0".to_string());
        }

        if self.max_parallel_probes == 0 {
            return Err("max_parallel_probes must be at least 1".to_string());
        }

        if self.max_parallel_repairs == 0 {
            return Err("max_parallel_repairs must be at least 1".to_string());
        }

        Ok(())
    }
}
