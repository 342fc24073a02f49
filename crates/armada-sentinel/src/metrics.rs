//! Reconciliation reports
//!
//! Tracks what a single reconciliation pass observed and repaired.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Overall health after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Every recorded instance was already running
    Healthy,
    /// Drift was found and every missing instance was recreated
    Repaired,
    /// At least one missing instance could not be recreated
    Degraded,
    /// The directory service did not answer; nothing was checked
    Unreachable,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verdict::Healthy => "healthy",
            Verdict::Repaired => "repaired",
            Verdict::Degraded => "degraded",
            Verdict::Unreachable => "unreachable",
        };
        f.write_str(name)
    }
}

/// Live and missing instances of one group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHealth {
    pub live: Vec<String>,
    pub missing: Vec<String>,
}

/// A repair that did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairFailure {
    pub instance: String,
    pub reason: String,
}

/// Statistics from a single reconciliation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepairReport {
    /// Whether the directory service answered its health check
    pub directory_available: bool,

    /// Instances found running
    pub live: usize,

    /// Instances found absent (including probe errors)
    pub missing: usize,

    /// Liveness queries that errored and were counted as missing
    pub probe_errors: usize,

    pub repairs_attempted: usize,
    pub repairs_succeeded: usize,
    pub repairs_failed: usize,

    /// Instances recreated during this pass
    pub repaired: Vec<String>,

    pub failures: Vec<RepairFailure>,

    /// Per-group partition of the recorded instances
    pub groups: BTreeMap<String, GroupHealth>,

    pub duration: Option<Duration>,
}

impl RepairReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_instances(&self) -> usize {
        self.live + self.missing
    }

    /// Share of recorded instances found running (0.0 - 1.0)
    pub fn health_ratio(&self) -> f64 {
        let total = self.total_instances();
        if total == 0 {
            1.0
        } else {
            self.live as f64 / total as f64
        }
    }

    /// Share of attempted repairs that succeeded (0.0 - 1.0)
    pub fn repair_success_rate(&self) -> f64 {
        if self.repairs_attempted == 0 {
            1.0
        } else {
            self.repairs_succeeded as f64 / self.repairs_attempted as f64
        }
    }

    pub fn verdict(&self) -> Verdict {
        if !self.directory_available {
            Verdict::Unreachable
        } else if self.repairs_failed > 0 {
            Verdict::Degraded
        } else if self.missing > 0 {
            Verdict::Repaired
        } else {
            Verdict::Healthy
        }
    }

    /// Every recorded instance is running after this pass
    pub fn is_healthy(&self) -> bool {
        matches!(self.verdict(), Verdict::Healthy | Verdict::Repaired)
    }

    pub fn summary(&self) -> String {
        if !self.directory_available {
            return "Reconcile: directory service unreachable | 0 repairs".to_string();
        }
        format!(
            "Reconcile: {} total | {} live ({:.1}%) | {} missing ({} probe errors) | Repairs: {}/{} ({:.1}%)",
            self.total_instances(),
            self.live,
            self.health_ratio() * 100.0,
            self.missing,
            self.probe_errors,
            self.repairs_succeeded,
            self.repairs_attempted,
            self.repair_success_rate() * 100.0
        )
    }
}

/// Accumulates a report while a pass runs
#[derive(Debug, Clone)]
pub struct RepairReportBuilder {
    report: RepairReport,
    start_time: Instant,
}

impl RepairReportBuilder {
    pub fn new() -> Self {
        Self {
            report: RepairReport {
                directory_available: true,
                ..RepairReport::new()
            },
            start_time: Instant::now(),
        }
    }

    pub fn record_gate_down(&mut self) {
        self.report.directory_available = false;
    }

    pub fn record_live(&mut self, group: &str, instance: &str) {
        self.report.live += 1;
        self.group(group).live.push(instance.to_string());
    }

    pub fn record_missing(&mut self, group: &str, instance: &str, probe_error: bool) {
        self.report.missing += 1;
        if probe_error {
            self.report.probe_errors += 1;
        }
        self.group(group).missing.push(instance.to_string());
    }

    pub fn record_repair_attempt(&mut self) {
        self.report.repairs_attempted += 1;
    }

    pub fn record_repair_success(&mut self, instance: &str) {
        self.report.repairs_succeeded += 1;
        self.report.repaired.push(instance.to_string());
    }

    pub fn record_repair_failure(&mut self, instance: &str, reason: impl Into<String>) {
        self.report.repairs_failed += 1;
        self.report.failures.push(RepairFailure {
            instance: instance.to_string(),
            reason: reason.into(),
        });
    }

    fn group(&mut self, group: &str) -> &mut GroupHealth {
        self.report.groups.entry(group.to_string()).or_default()
    }

    pub fn stats(&self) -> &RepairReport {
        &self.report
    }

    /// Finalize; instance lists are sorted for stable output
    pub fn finish(mut self) -> RepairReport {
        for health in self.report.groups.values_mut() {
            health.live.sort();
            health.missing.sort();
        }
        self.report.repaired.sort();
        self.report
            .failures
            .sort_by(|a, b| a.instance.cmp(&b.instance));
        self.report.duration = Some(self.start_time.elapsed());
        self.report
    }
}

impl Default for RepairReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
