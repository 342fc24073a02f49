//! Replica planning: ordinals, names, identities and expected addresses

use armada_core_interface::{GroupDefinition, InstanceProvisioner};
use armada_core_topology::{GroupKind, InstanceRecord};

/// Artifact references produced by a group's build and publish stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    pub local_id: String,
    pub remote_ref: String,
}

/// Records for ordinals `0..count` of a freshly built group
///
/// Ordinals are assigned here, before anything is dispatched, so the result
/// is deterministic regardless of instantiation order. Notary groups always
/// get exactly one replica.
pub fn plan_group(
    group: &GroupDefinition,
    artifact: &PublishedArtifact,
    count: u32,
    provisioner: &dyn InstanceProvisioner,
) -> Vec<InstanceRecord> {
    let count = match group.kind {
        GroupKind::Notary => 1,
        GroupKind::Node => count,
    };

    (0..count)
        .map(|ordinal| {
            let instance_name = InstanceRecord::instance_name_for(&group.name, ordinal);
            InstanceRecord {
                group_name: group.name.clone(),
                kind: group.kind,
                group_identity: group.identity.clone(),
                instance_identity: group.identity.with_ordinal(ordinal),
                reachable_address: provisioner.expected_address(&instance_name),
                instance_name,
                local_artifact_id: artifact.local_id.clone(),
                remote_artifact_ref: artifact.remote_ref.clone(),
                service_port: group.service_port,
                credentials: group.credentials.clone(),
            }
        })
        .collect()
}

/// Record for replica `ordinal`, cloned from an existing record of the group
pub fn next_from_template(
    template: &InstanceRecord,
    ordinal: u32,
    provisioner: &dyn InstanceProvisioner,
) -> InstanceRecord {
    let instance_name = InstanceRecord::instance_name_for(&template.group_name, ordinal);
    InstanceRecord {
        instance_identity: template.group_identity.with_ordinal(ordinal),
        reachable_address: provisioner.expected_address(&instance_name),
        instance_name,
        ..template.clone()
    }
}
