//! Reconciler: one observe -> diff -> repair pass
//!
//! The reconciler never mints new instances. It compares the recorded
//! topology against what the provisioner reports as running and asks the
//! [`Medic`] to recreate whatever has gone missing, under its original name.
//! Passes only run when invoked; there is no background loop.

use crate::medic::Medic;
use crate::metrics::{RepairReport, RepairReportBuilder, Verdict};
use crate::policy::ReconcilePolicy;
use armada_core_interface::{DirectoryProbe, InstanceProvisioner};
use armada_core_topology::{InstanceRecord, NetworkTopology};
use armada_pipeline::TaskGroup;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("Invalid reconcile policy: {0}")]
    InvalidPolicy(String),
}

/// Drift detector and repairer for one network
pub struct Reconciler {
    provisioner: Arc<dyn InstanceProvisioner>,

    probe: Arc<dyn DirectoryProbe>,

    medic: Arc<Medic>,

    policy: ReconcilePolicy,

    /// Caps concurrent liveness queries
    probe_semaphore: Arc<Semaphore>,

    /// Caps concurrent recreations; excess repairs wait for a permit
    repair_semaphore: Arc<Semaphore>,
}

impl Reconciler {
    pub fn new(
        provisioner: Arc<dyn InstanceProvisioner>,
        probe: Arc<dyn DirectoryProbe>,
        directory_address: impl Into<String>,
        policy: ReconcilePolicy,
    ) -> Result<Self, SentinelError> {
        policy.validate().map_err(SentinelError::InvalidPolicy)?;

        let medic = Arc::new(Medic::new(provisioner.clone(), directory_address));

        Ok(Self {
            provisioner,
            probe,
            medic,
            probe_semaphore: Arc::new(Semaphore::new(policy.max_parallel_probes)),
            repair_semaphore: Arc::new(Semaphore::new(policy.max_parallel_repairs)),
            policy,
        })
    }

    pub fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    /// Run a single reconciliation pass over `topology`
    ///
    /// 1. Gate on the directory service; if it is down, report and stop.
    /// 2. Query liveness of every recorded instance concurrently.
    /// 3. Partition into live and missing; probe errors count as missing.
    /// 4. Recreate every missing instance, bounded by the repair semaphore.
    ///
    /// Gate failures and individual repair failures are report data, never
    /// errors.
    pub async fn check(&self, topology: &NetworkTopology) -> RepairReport {
        info!(
            "🔭 Reconciler: Checking network '{}' | Instances: {} | Max Parallel Repairs: {}",
            topology.network_name(),
            topology.instance_count(),
            self.policy.max_parallel_repairs
        );
        let mut builder = RepairReportBuilder::new();

        if !self.probe.is_available(self.policy.gate_timeout()).await {
            error!(
                "🚨 Directory service did not answer within {:?}; no repairs attempted",
                self.policy.gate_timeout()
            );
            builder.record_gate_down();
            let report = builder.finish();
            info!("📊 {}", report.summary());
            return report;
        }

        let missing = self.observe(topology, &mut builder).await;

        if !missing.is_empty() {
            warn!("⚠️  {} instance(s) missing, starting repairs", missing.len());
            self.repair_all(missing, &mut builder).await;
        }

        let report = builder.finish();
        info!("📊 {}", report.summary());
        match report.verdict() {
            Verdict::Healthy => info!("💚 Network Health: All instances running"),
            Verdict::Repaired => info!(
                "💛 Network Health: Repaired {} instance(s)",
                report.repairs_succeeded
            ),
            Verdict::Degraded => warn!(
                "🔴 Network Health: {} instance(s) could not be recreated",
                report.repairs_failed
            ),
            Verdict::Unreachable => {}
        }
        report
    }

    /// Query every recorded instance; returns the ones that are not running
    async fn observe(
        &self,
        topology: &NetworkTopology,
        builder: &mut RepairReportBuilder,
    ) -> Vec<InstanceRecord> {
        let mut probes = TaskGroup::new("liveness probe");
        for (_, records) in topology.groups() {
            for record in records.iter().cloned() {
                let provisioner = self.provisioner.clone();
                let semaphore = self.probe_semaphore.clone();
                probes.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    let running = provisioner.is_running(&record.instance_name).await;
                    (record, running)
                });
            }
        }

        let mut missing = Vec::new();
        for result in probes.join_all().await {
            match result {
                Ok((record, Ok(true))) => {
                    builder.record_live(&record.group_name, &record.instance_name);
                }
                Ok((record, Ok(false))) => {
                    warn!(
                        "⚠️  Missing: {} (group '{}')",
                        record.instance_name, record.group_name
                    );
                    builder.record_missing(&record.group_name, &record.instance_name, false);
                    missing.push(record);
                }
                Ok((record, Err(e))) => {
                    warn!(
                        "⚠️  Liveness query for {} failed ({}); treating as missing",
                        record.instance_name, e
                    );
                    builder.record_missing(&record.group_name, &record.instance_name, true);
                    missing.push(record);
                }
                Err(e) => error!("❌ Liveness probe task failed: {}", e),
            }
        }
        missing
    }

    async fn repair_all(&self, missing: Vec<InstanceRecord>, builder: &mut RepairReportBuilder) {
        let mut repairs = TaskGroup::new("repair");
        for record in missing {
            builder.record_repair_attempt();
            let medic = self.medic.clone();
            let semaphore = self.repair_semaphore.clone();
            repairs.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = medic.repair(&record).await;
                (record.instance_name, result)
            });
        }

        for result in repairs.join_all().await {
            match result {
                Ok((instance, Ok(_))) => builder.record_repair_success(&instance),
                Ok((instance, Err(e))) => {
                    error!("❌ Repair failed for {}: {}", instance, e);
                    builder.record_repair_failure(&instance, e.to_string());
                }
                Err(e) => {
                    error!("❌ Repair task failed: {}", e);
                    builder.record_repair_failure("repair task", e.to_string());
                }
            }
        }
    }
}
