//! On-disk persistence of network topologies
//!
//! One pretty-printed JSON document per network, stored as
//! `{state_dir}/{network}.json`. Writes go to a temporary file in the same
//! directory which is then renamed over the old state, so a crash mid-write
//! never leaves a truncated document behind.

use crate::error::{Error, Result};
use crate::model::NetworkTopology;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the state directory inside a working directory
pub const STATE_DIR_NAME: &str = ".armada";

/// Location of persisted topologies
#[derive(Debug, Clone)]
pub struct StateFile {
    dir: PathBuf,
}

impl StateFile {
    /// State stored directly in `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// State stored in the `.armada` directory of a working directory
    pub fn in_workdir(workdir: &Path) -> Self {
        Self::new(workdir.join(STATE_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `network_name`
    pub fn path_for(&self, network_name: &str) -> Result<PathBuf> {
        validate_network_name(network_name)?;
        Ok(self.dir.join(format!("{}.json", network_name)))
    }

    /// Load the persisted topology of a network, if any
    pub fn load(&self, network_name: &str) -> Result<Option<NetworkTopology>> {
        let path = self.path_for(network_name)?;
        if !path.exists() {
            debug!("No persisted state at {}", path.display());
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)?;
        let topology: NetworkTopology = serde_json::from_str(&contents)
            .map_err(|e| Error::corrupt(&path, e.to_string()))?;

        if topology.network_name() != network_name {
            return Err(Error::corrupt(
                &path,
                format!(
                    "describes network '{}', expected '{}'",
                    topology.network_name(),
                    network_name
                ),
            ));
        }

        info!(
            "Loaded network '{}' ({} instances, initialized: {})",
            network_name,
            topology.instance_count(),
            topology.is_initialized()
        );
        Ok(Some(topology))
    }

    /// Load the persisted topology, or start an empty one
    pub fn load_or_new(&self, network_name: &str, region: &str) -> Result<NetworkTopology> {
        Ok(self
            .load(network_name)?
            .unwrap_or_else(|| NetworkTopology::new(network_name, region)))
    }

    /// Atomically write a topology, returning the document path
    pub fn persist(&self, topology: &NetworkTopology) -> Result<PathBuf> {
        let path = self.path_for(topology.network_name())?;
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_string_pretty(topology)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| Error::Io(e.error))?;

        info!(
            "Persisted network '{}' to {}",
            topology.network_name(),
            path.display()
        );
        Ok(path)
    }

    /// Forget a network entirely (used when starting it over)
    pub fn reset(&self, network_name: &str) -> Result<()> {
        let path = self.path_for(network_name)?;
        if path.exists() {
            fs::remove_file(&path)?;
            info!("Removed persisted state {}", path.display());
        }
        Ok(())
    }
}

fn validate_network_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && name.chars().any(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidNetworkName(name.to_string()))
    }
}
