//! Concurrent topology store
//!
//! The provisioning pipeline and the replica adder mutate the topology from
//! many tasks at once. `TopologyStore` owns the topology behind a single
//! `RwLock` and exposes only the operations those tasks need. At the expected
//! scale (tens of groups, low hundreds of instances) one lock is plenty.

use crate::error::{Error, Result};
use crate::model::{GroupKind, InstanceRecord, NetworkTopology};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// Thread-safe owner of a [`NetworkTopology`]
#[derive(Debug)]
pub struct TopologyStore {
    inner: RwLock<NetworkTopology>,
}

impl TopologyStore {
    pub fn new(topology: NetworkTopology) -> Self {
        Self {
            inner: RwLock::new(topology),
        }
    }

    // Every mutation is a single insert, so a poisoned lock still guards a
    // consistent topology.
    fn read(&self) -> RwLockReadGuard<'_, NetworkTopology> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, NetworkTopology> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn network_name(&self) -> String {
        self.read().network_name().to_string()
    }

    pub fn directory_address(&self) -> Option<String> {
        self.read().directory_address().map(str::to_string)
    }

    pub fn set_directory_address(&self, address: Option<String>) {
        self.write().set_directory_address(address);
    }

    pub fn is_initialized(&self) -> bool {
        self.read().is_initialized()
    }

    /// Append an instance to a group
    ///
    /// Idempotent by instance name: returns `false` and leaves the group
    /// untouched if an instance with that name is already recorded.
    pub fn register_instance(&self, group: &str, record: InstanceRecord) -> bool {
        let mut topology = self.write();
        let records = topology.group_entry(group);
        if records
            .iter()
            .any(|existing| existing.instance_name == record.instance_name)
        {
            debug!(
                "Instance {} already registered in group {}",
                record.instance_name, group
            );
            return false;
        }
        debug!("Registering instance {} in group {}", record.instance_name, group);
        records.push(record);
        true
    }

    /// Snapshot of a group's instances; empty for unknown groups
    pub fn group_instances(&self, group: &str) -> Vec<InstanceRecord> {
        self.read().group_instances(group).to_vec()
    }

    /// Make sure a group appears in the topology even with zero instances
    pub fn ensure_group(&self, group: &str) {
        self.write().group_entry(group);
    }

    /// Record the published image of a node group (write-once)
    pub fn record_node_image(&self, group: &str, remote_ref: &str) -> Result<()> {
        let mut topology = self.write();
        Self::record_image(topology.node_images_mut(), group, remote_ref)
    }

    /// Record the published image of a notary group (write-once)
    pub fn record_notary_image(&self, group: &str, remote_ref: &str) -> Result<()> {
        let mut topology = self.write();
        Self::record_image(topology.notary_images_mut(), group, remote_ref)
    }

    fn record_image(
        images: &mut BTreeMap<String, String>,
        group: &str,
        remote_ref: &str,
    ) -> Result<()> {
        match images.get(group) {
            Some(existing) if existing == remote_ref => Ok(()),
            Some(existing) => {
                warn!(
                    "Refusing to overwrite image for group {} ({} -> {})",
                    group, existing, remote_ref
                );
                Err(Error::ImageAlreadyRecorded {
                    group: group.to_string(),
                    existing: existing.clone(),
                })
            }
            None => {
                images.insert(group.to_string(), remote_ref.to_string());
                Ok(())
            }
        }
    }

    /// Mint the next replica of an existing group and record it
    ///
    /// The ordinal is the group's current size, read and consumed under the
    /// write lock so concurrent callers always get distinct ordinals. `build`
    /// receives the group's first record as a template. Notary groups are
    /// refused with [`Error::SingleReplicaGroup`].
    pub fn reserve_next_replica<F>(&self, group: &str, build: F) -> Result<InstanceRecord>
    where
        F: FnOnce(&InstanceRecord, u32) -> InstanceRecord,
    {
        let mut topology = self.write();
        let records = topology
            .group_mut(group)
            .filter(|records| !records.is_empty())
            .ok_or_else(|| Error::UnknownGroup(group.to_string()))?;

        if records[0].kind == GroupKind::Notary {
            return Err(Error::SingleReplicaGroup(group.to_string()));
        }

        let ordinal = records.len() as u32;
        let record = build(&records[0], ordinal);
        records.push(record.clone());
        Ok(record)
    }

    pub fn mark_initialized(&self) {
        self.write().set_initialized();
    }

    /// Owned copy of the current topology
    pub fn snapshot(&self) -> NetworkTopology {
        self.read().clone()
    }

    pub fn into_inner(self) -> NetworkTopology {
        self.inner.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}
