//! The provisioning pipeline
//!
//! A pass runs two task groups side by side:
//!
//! - **Notaries:** build -> publish every notary, open the publication gate,
//!   then instantiate each notary's single replica.
//! - **Nodes:** build -> publish each node group, wait at the gate, then
//!   instantiate every replica of the group.
//!
//! Within a group the stages are sequential; across groups everything is
//! concurrent. A failing unit never cancels its siblings: the pass completes
//! once every unit has settled and the outcome is returned as a
//! [`ProvisionReport`].

use crate::context::DeployContext;
use crate::error::{PipelineError, Result};
use crate::gate::{publication_gate, GateOpener, PublicationGate};
use crate::replica::{self, PublishedArtifact};
use crate::report::{GroupOutcome, ProvisionReport, StageFailure};
use crate::task_group::TaskGroup;
use armada_core_interface::{GroupDefinition, LaunchSpec};
use armada_core_topology::{Error as TopologyError, GroupKind, InstanceRecord, TopologyStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Replicas started for a node group without an explicit count
pub const DEFAULT_REPLICAS: u32 = 1;

/// Groups and failures produced by one side of a pass
type Settled = (Vec<GroupOutcome>, Vec<StageFailure>);

/// Drives build, publish and instantiate for a whole network
#[derive(Debug, Clone)]
pub struct ProvisioningPipeline {
    ctx: Arc<DeployContext>,
    store: Arc<TopologyStore>,
}

impl ProvisioningPipeline {
    pub fn new(ctx: DeployContext, store: Arc<TopologyStore>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            store,
        }
    }

    pub fn store(&self) -> &Arc<TopologyStore> {
        &self.store
    }

    pub fn context(&self) -> &DeployContext {
        &self.ctx
    }

    /// Provision every group from scratch
    ///
    /// `replica_counts` overrides the number of replicas per node group
    /// (default [`DEFAULT_REPLICAS`]); notary groups always get one. The
    /// topology is marked initialized only if no group failed to build,
    /// publish or record its image.
    pub async fn provision(
        &self,
        groups: Vec<GroupDefinition>,
        notary_groups: Vec<GroupDefinition>,
        replica_counts: &BTreeMap<String, u32>,
    ) -> ProvisionReport {
        let started = Instant::now();
        info!(
            "🚀 Provisioning network '{}' | Node groups: {} | Notary groups: {}",
            self.ctx.network_name,
            groups.len(),
            notary_groups.len()
        );

        for group in groups.iter().chain(notary_groups.iter()) {
            self.store.ensure_group(&group.name);
        }

        let counts: BTreeMap<String, u32> = groups
            .iter()
            .map(|g| {
                let count = replica_counts
                    .get(&g.name)
                    .copied()
                    .unwrap_or(DEFAULT_REPLICAS);
                (g.name.clone(), count)
            })
            .collect();

        let (opener, gate) = publication_gate();
        let mut notaries: TaskGroup<Settled> = TaskGroup::new("notaries");
        notaries.spawn(run_notaries(
            self.ctx.clone(),
            self.store.clone(),
            notary_groups,
            opener,
        ));
        let mut nodes: TaskGroup<Settled> = TaskGroup::new("nodes");
        nodes.spawn(run_nodes(
            self.ctx.clone(),
            self.store.clone(),
            groups,
            counts,
            gate,
        ));
        let (notaries, nodes) = tokio::join!(notaries.join_all(), nodes.join_all());

        let mut outcomes = BTreeMap::new();
        let mut failures = Vec::new();
        merge_side("notaries", notaries, &mut outcomes, &mut failures);
        merge_side("nodes", nodes, &mut outcomes, &mut failures);

        if failures.iter().any(StageFailure::is_group_level) {
            warn!("Network '{}' left uninitialized", self.ctx.network_name);
        } else {
            self.store.mark_initialized();
        }

        let report = ProvisionReport {
            topology: self.store.snapshot(),
            groups: outcomes,
            failures,
            duration: started.elapsed(),
        };

        if report.is_complete() {
            info!("✅ {}", report.summary());
        } else {
            warn!("⚠️  {}", report.summary());
        }
        report
    }

    /// Add one replica to an existing node group
    ///
    /// The new ordinal is the group's current size. The record is reserved in
    /// the topology before the instance is started, so a failed start leaves a
    /// record the reconciler will recreate. Notary groups keep their single
    /// replica and are rejected with [`PipelineError::NotaryReplica`].
    pub async fn add_replica(&self, group: &str) -> Result<InstanceRecord> {
        let group = group.to_lowercase();
        let provisioner = self.ctx.provisioner.clone();
        let record = self
            .store
            .reserve_next_replica(&group, |template, ordinal| {
                replica::next_from_template(template, ordinal, provisioner.as_ref())
            })
            .map_err(|e| match e {
                TopologyError::UnknownGroup(g) => PipelineError::UnknownGroup(g),
                TopologyError::SingleReplicaGroup(g) => PipelineError::NotaryReplica(g),
                other => PipelineError::Topology(other),
            })?;

        info!(
            "➕ Adding replica {} to group '{}' ({})",
            record.instance_name, group, record.instance_identity
        );
        launch(&self.ctx, &record).await?;
        Ok(record)
    }

    /// Add one replica per entry, concurrently
    ///
    /// Entries may repeat a group; each gets its own ordinal.
    pub async fn add_replicas(&self, groups: &[String]) -> Vec<Result<InstanceRecord>> {
        let mut adds = TaskGroup::new("add replicas");
        for group in groups {
            let pipeline = self.clone();
            let group = group.clone();
            adds.spawn(async move { pipeline.add_replica(&group).await });
        }

        adds.join_all()
            .await
            .into_iter()
            .map(|settled| settled.and_then(|added| added))
            .collect()
    }
}

async fn run_notaries(
    ctx: Arc<DeployContext>,
    store: Arc<TopologyStore>,
    notaries: Vec<GroupDefinition>,
    opener: GateOpener,
) -> Settled {
    let mut publishes = TaskGroup::new("notary publish");
    for group in notaries {
        let ctx = ctx.clone();
        let store = store.clone();
        publishes.spawn(async move {
            let published = build_and_publish(&ctx, &store, &group).await;
            (group, published)
        });
    }

    let settled = publishes.join_all().await;
    opener.open();

    let mut outcomes = Vec::new();
    let mut orphaned = Vec::new();
    let mut instantiations = TaskGroup::new("notary instantiate");
    for result in settled {
        match result {
            Ok((group, Ok(artifact))) => {
                let ctx = ctx.clone();
                let store = store.clone();
                instantiations.spawn(async move {
                    instantiate_group(&ctx, &store, group, artifact, 1).await
                });
            }
            Ok((group, Err(e))) => outcomes.push(failed_group(&group, &e)),
            Err(e) => orphaned.push(StageFailure::from_error("notary publish", None, &e)),
        }
    }

    for result in instantiations.join_all().await {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => orphaned.push(StageFailure::from_error("notary instantiate", None, &e)),
        }
    }
    (outcomes, orphaned)
}

async fn run_nodes(
    ctx: Arc<DeployContext>,
    store: Arc<TopologyStore>,
    groups: Vec<GroupDefinition>,
    counts: BTreeMap<String, u32>,
    gate: PublicationGate,
) -> Settled {
    let mut nodes = TaskGroup::new("node groups");
    for group in groups {
        let ctx = ctx.clone();
        let store = store.clone();
        let mut gate = gate.clone();
        let count = counts.get(&group.name).copied().unwrap_or(DEFAULT_REPLICAS);
        nodes.spawn(async move {
            let artifact = match build_and_publish(&ctx, &store, &group).await {
                Ok(artifact) => artifact,
                Err(e) => return failed_group(&group, &e),
            };
            if !gate.is_open() {
                debug!("Group '{}' waiting for notary publication", group.name);
            }
            gate.wait().await;
            instantiate_group(&ctx, &store, group, artifact, count).await
        });
    }

    let mut outcomes = Vec::new();
    let mut orphaned = Vec::new();
    for result in nodes.join_all().await {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => orphaned.push(StageFailure::from_error("node groups", None, &e)),
        }
    }
    (outcomes, orphaned)
}

/// Build and publish one group, then record its image
async fn build_and_publish(
    ctx: &DeployContext,
    store: &TopologyStore,
    group: &GroupDefinition,
) -> Result<PublishedArtifact> {
    info!("🔨 Building {} group '{}'", group.kind, group.name);
    let local_id = ctx
        .builder
        .build(group)
        .await
        .map_err(|source| PipelineError::Build {
            group: group.name.clone(),
            source,
        })?;

    let logical_name = group.logical_image_name();
    let remote_ref = ctx
        .publisher
        .publish(&local_id, &logical_name, &ctx.network_name)
        .await
        .map_err(|source| PipelineError::Publish {
            group: group.name.clone(),
            source,
        })?;
    info!("📦 Published '{}' as {}", group.name, remote_ref);

    match group.kind {
        GroupKind::Node => store.record_node_image(&group.name, &remote_ref)?,
        GroupKind::Notary => store.record_notary_image(&group.name, &remote_ref)?,
    }

    Ok(PublishedArtifact {
        local_id,
        remote_ref,
    })
}

/// Start every planned replica of a published group and register the ones
/// that came up
async fn instantiate_group(
    ctx: &Arc<DeployContext>,
    store: &Arc<TopologyStore>,
    group: GroupDefinition,
    artifact: PublishedArtifact,
    count: u32,
) -> GroupOutcome {
    let mut outcome = GroupOutcome::new(&group.name, group.kind);
    outcome.remote_artifact_ref = Some(artifact.remote_ref.clone());

    let records = replica::plan_group(&group, &artifact, count, ctx.provisioner.as_ref());
    let mut replicas = TaskGroup::new(format!("instantiate {}", group.name));
    for record in records {
        let ctx = ctx.clone();
        let store = store.clone();
        replicas.spawn(async move {
            let name = record.instance_name.clone();
            let started = launch(&ctx, &record).await;
            if started.is_ok() {
                let group = record.group_name.clone();
                store.register_instance(&group, record);
            }
            (name, started)
        });
    }

    for result in replicas.join_all().await {
        match result {
            Ok((name, Ok(_))) => outcome.instances.push(name),
            Ok((name, Err(e))) => outcome.fail(Some(&name), &e),
            Err(e) => outcome.fail(None, &e),
        }
    }
    outcome.instances.sort();
    outcome
}

/// Instantiate one record through the provisioner
async fn launch(ctx: &DeployContext, record: &InstanceRecord) -> Result<String> {
    let spec = LaunchSpec::for_instance(record, &ctx.directory_address);
    match ctx.provisioner.instantiate(&spec).await {
        Ok(address) => {
            if address != record.reachable_address {
                debug!(
                    "Instance {} reported address {} (expected {})",
                    record.instance_name, address, record.reachable_address
                );
            }
            info!("✅ Instance {} started", record.instance_name);
            Ok(address)
        }
        Err(source) => {
            error!("❌ Instance {} failed to start: {}", record.instance_name, source);
            Err(PipelineError::Instantiate {
                instance: record.instance_name.clone(),
                source,
            })
        }
    }
}

/// Fold one side's settled task into the pass results
fn merge_side(
    side: &str,
    settled: Vec<Result<Settled>>,
    outcomes: &mut BTreeMap<String, GroupOutcome>,
    failures: &mut Vec<StageFailure>,
) {
    for result in settled {
        match result {
            Ok((groups, orphaned)) => {
                for outcome in groups {
                    failures.extend(outcome.failures.iter().cloned());
                    outcomes.insert(outcome.group.clone(), outcome);
                }
                failures.extend(orphaned);
            }
            Err(e) => failures.push(StageFailure::from_error(side, None, &e)),
        }
    }
}

fn failed_group(group: &GroupDefinition, error: &PipelineError) -> GroupOutcome {
    error!("❌ Group '{}' failed: {}", group.name, error);
    let mut outcome = GroupOutcome::new(&group.name, group.kind);
    outcome.fail(None, error);
    outcome
}
