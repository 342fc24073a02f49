/*!
 * Run orchestration
 *
 * Ties discovery, the topology state file, the provisioning pipeline and the
 * reconciler together for one invocation:
 *
 * - **Fresh** (`--new`): forget any persisted state, discover the groups,
 *   provision every one of them and persist the resulting topology.
 * - **Maintain**: load the persisted topology, heal it with one reconcile
 *   pass, add the requested replicas and persist again. A partially
 *   provisioned network is healed too but stays uninitialized.
 *
 * Backends are produced by a factory so the whole flow runs against fakes in
 * tests.
 */

use armada_core_interface::{ArtifactBuilder, ArtifactPublisher, DirectoryProbe, InstanceProvisioner};
use armada_core_topology::{NetworkTopology, StateFile, TopologyStore};
use armada_pipeline::{DeployContext, ProvisionReport, ProvisioningPipeline};
use armada_sentinel::{Reconciler, RepairReport, Verdict};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::backend::{
    AzureContainerProvisioner, DockerBuilder, HttpDirectoryProbe, RegistryPublisher,
};
use crate::config::ArmadaConfig;
use crate::discovery::{discover_groups, DiscoveredGroups};
use crate::error::{ArmadaError, Result, EXIT_PARTIAL, EXIT_SUCCESS};
use crate::system::TokioCommandRunner;

/// What one invocation does to the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Provision from scratch with per-group replica overrides
    Fresh { replica_counts: BTreeMap<String, u32> },
    /// Heal the persisted network, then add one replica per entry
    Maintain { add: Vec<String> },
}

/// The four external capabilities a run drives
#[derive(Clone)]
pub struct Backends {
    pub builder: Arc<dyn ArtifactBuilder>,
    pub publisher: Arc<dyn ArtifactPublisher>,
    pub provisioner: Arc<dyn InstanceProvisioner>,
    pub probe: Arc<dyn DirectoryProbe>,
}

impl Backends {
    /// Docker, Azure and HTTP backends for `topology`
    pub fn from_config(
        config: &ArmadaConfig,
        topology: &NetworkTopology,
        directory_address: &str,
    ) -> Result<Self> {
        let runner = Arc::new(TokioCommandRunner::new());

        let provisioner = AzureContainerProvisioner::new(
            runner.clone(),
            config.azure.program.clone(),
            topology.resource_group(),
            topology.network_name(),
            topology.region(),
        )
        .with_registry(config.registry.clone())
        .with_registry_credentials(config.azure.registry_credentials.clone())
        .with_resources(config.azure.cpu, config.azure.memory_gb);

        let probe = HttpDirectoryProbe::new(directory_address)
            .map_err(|e| ArmadaError::Config(e.to_string()))?;

        Ok(Self {
            builder: Arc::new(DockerBuilder::new(runner.clone(), config.docker.program.clone())),
            publisher: Arc::new(RegistryPublisher::new(
                runner,
                config.docker.program.clone(),
                config.registry.clone(),
            )),
            provisioner: Arc::new(provisioner),
            probe: Arc::new(probe),
        })
    }
}

/// Everything needed to run one invocation
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub network_name: String,
    /// Directory holding the group definitions and the `.armada` state
    pub workdir: PathBuf,
    pub mode: RunMode,
    pub config: ArmadaConfig,
}

/// Result of a run that got far enough to report
#[derive(Debug)]
pub struct RunOutcome {
    pub exit_code: i32,
    /// Human-readable summary, one line per entry
    pub lines: Vec<String>,
    pub topology: NetworkTopology,
    pub provision: Option<ProvisionReport>,
    pub reconcile: Option<RepairReport>,
}

/// Execute one invocation
///
/// `backends` is called once the network's topology and directory address are
/// known. Errors are returned only for fatal conditions; partial failures are
/// reflected in [`RunOutcome::exit_code`].
pub async fn run<F>(request: RunRequest, backends: F) -> Result<RunOutcome>
where
    F: FnOnce(&NetworkTopology, &str) -> Result<Backends>,
{
    let state = StateFile::in_workdir(&request.workdir);
    match request.mode.clone() {
        RunMode::Fresh { replica_counts } => {
            provision_fresh(&request, &state, &replica_counts, backends).await
        }
        RunMode::Maintain { add } => maintain(&request, &state, &add, backends).await,
    }
}

async fn provision_fresh<F>(
    request: &RunRequest,
    state: &StateFile,
    replica_counts: &BTreeMap<String, u32>,
    backends: F,
) -> Result<RunOutcome>
where
    F: FnOnce(&NetworkTopology, &str) -> Result<Backends>,
{
    let directory = request.config.directory_url.clone().ok_or_else(|| {
        ArmadaError::Config(
            "a directory service URL is required for --new (directory_url or --directory-url)"
                .to_string(),
        )
    })?;

    state.reset(&request.network_name)?;
    let discovered = discover_groups(&request.workdir)?;
    if discovered.is_empty() {
        return Err(ArmadaError::Discovery(format!(
            "no group definitions found under {}",
            request.workdir.display()
        )));
    }
    warn_unmatched_overrides(&discovered, replica_counts);

    let topology = NetworkTopology::new(&request.network_name, &request.config.region)
        .with_directory_address(&directory);
    let backends = backends(&topology, &directory)?;

    let store = Arc::new(TopologyStore::new(topology));
    let ctx = DeployContext::new(
        &request.network_name,
        &directory,
        backends.builder,
        backends.publisher,
        backends.provisioner,
    );
    let pipeline = ProvisioningPipeline::new(ctx, store);

    let DiscoveredGroups {
        nodes,
        notaries,
        errors,
    } = discovered;
    let report = pipeline.provision(nodes, notaries, replica_counts).await;
    let path = state.persist(&report.topology)?;

    if !backends
        .probe
        .is_available(request.config.reconcile.gate_timeout())
        .await
    {
        error!("Directory service at {} is unreachable after provisioning", directory);
        return Err(ArmadaError::NetworkUnhealthy(format!(
            "directory service at {} did not answer; state written to {}",
            directory,
            path.display()
        )));
    }

    let mut lines = vec![report.summary()];
    lines.extend(errors.iter().map(|e| format!("[discovery] {}", e)));
    lines.extend(report.failures.iter().map(ToString::to_string));
    lines.push(format!("State written to {}", path.display()));

    let exit_code = if report.is_complete() && errors.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_PARTIAL
    };

    Ok(RunOutcome {
        exit_code,
        lines,
        topology: report.topology.clone(),
        provision: Some(report),
        reconcile: None,
    })
}

async fn maintain<F>(
    request: &RunRequest,
    state: &StateFile,
    add: &[String],
    backends: F,
) -> Result<RunOutcome>
where
    F: FnOnce(&NetworkTopology, &str) -> Result<Backends>,
{
    let topology = state.load(&request.network_name)?.ok_or_else(|| {
        ArmadaError::InvalidArgs(format!(
            "no state for network '{}' under {}; create it with --new",
            request.network_name,
            state.dir().display()
        ))
    })?;
    let initialized = topology.is_initialized();
    if !initialized {
        warn!(
            "Network '{}' was only partially provisioned; reconciling the recorded instances",
            request.network_name
        );
    }

    let store = Arc::new(TopologyStore::new(topology));
    if let Some(url) = &request.config.directory_url {
        store.set_directory_address(Some(url.clone()));
    }
    let directory = store.directory_address().ok_or_else(|| {
        ArmadaError::Config(format!(
            "network '{}' has no directory service address; pass --directory-url",
            request.network_name
        ))
    })?;

    let snapshot = store.snapshot();
    let backends = backends(&snapshot, &directory)?;

    let reconciler = Reconciler::new(
        backends.provisioner.clone(),
        backends.probe.clone(),
        &directory,
        request.config.reconcile.clone(),
    )
    .map_err(|e| ArmadaError::Config(e.to_string()))?;

    let health = reconciler.check(&snapshot).await;
    if health.verdict() == Verdict::Unreachable {
        error!("Directory service at {} is unreachable", directory);
        return Err(ArmadaError::NetworkUnhealthy(format!(
            "directory service at {} did not answer",
            directory
        )));
    }

    let mut lines = vec![health.summary(), format!("Network health: {}", health.verdict())];
    if !initialized {
        lines.push(format!(
            "Network '{}' is not fully provisioned; run with --new to finish it",
            request.network_name
        ));
    }
    lines.extend(
        health
            .failures
            .iter()
            .map(|f| format!("[repair] {}: {}", f.instance, f.reason)),
    );

    let mut adds_failed = 0;
    if !add.is_empty() {
        let ctx = DeployContext::new(
            &request.network_name,
            &directory,
            backends.builder,
            backends.publisher,
            backends.provisioner,
        );
        let pipeline = ProvisioningPipeline::new(ctx, store.clone());
        for result in pipeline.add_replicas(add).await {
            match result {
                Ok(record) => {
                    info!("Added {} at {}", record.instance_name, record.reachable_address);
                    lines.push(format!(
                        "[add] {} -> {}",
                        record.instance_name, record.reachable_address
                    ));
                }
                Err(e) => {
                    warn!("Replica add failed: {}", e);
                    adds_failed += 1;
                    lines.push(format!("[add] failed: {}", e));
                }
            }
        }
    }

    let topology = store.snapshot();
    let path = state.persist(&topology)?;
    lines.push(format!("State written to {}", path.display()));

    let exit_code = if initialized && health.is_healthy() && adds_failed == 0 {
        EXIT_SUCCESS
    } else {
        EXIT_PARTIAL
    };

    Ok(RunOutcome {
        exit_code,
        lines,
        topology,
        provision: None,
        reconcile: Some(health),
    })
}

fn warn_unmatched_overrides(
    discovered: &DiscoveredGroups,
    replica_counts: &BTreeMap<String, u32>,
) {
    for group in replica_counts.keys() {
        if !discovered.nodes.iter().any(|g| &g.name == group) {
            warn!("Replica count given for '{}', which is not a discovered node group", group);
        }
    }
}
