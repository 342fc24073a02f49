/*!
 * Group discovery
 *
 * Every directory below the working directory that holds a `node.conf` is one
 * group. The group name is the directory name, lowercased. A config with a
 * top-level `notary { ... }` block defines a notary; everything else is a
 * node. Only the handful of keys armada needs are read from the config:
 * `myLegalName`, the RPC address port and the first RPC user.
 */

use armada_core_interface::GroupDefinition;
use armada_core_topology::{Credentials, PeerIdentity, STATE_DIR_NAME};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{ArmadaError, Result};

/// File that marks a group directory
pub const NODE_CONFIG_FILE: &str = "node.conf";

/// A definition that could not be turned into a group; other groups proceed
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} has no myLegalName")]
    MissingIdentity { path: PathBuf },

    #[error("{path} has an invalid myLegalName: {reason}")]
    InvalidIdentity { path: PathBuf, reason: String },

    #[error("Group '{group}' is defined twice ({first} and {second})")]
    Duplicate {
        group: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Result of scanning a working directory
#[derive(Debug, Default)]
pub struct DiscoveredGroups {
    /// Node groups, sorted by name
    pub nodes: Vec<GroupDefinition>,
    /// Notary groups, sorted by name
    pub notaries: Vec<GroupDefinition>,
    pub errors: Vec<DiscoveryError>,
}

impl DiscoveredGroups {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.notaries.is_empty()
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .chain(self.notaries.iter())
            .map(|g| g.name.as_str())
    }
}

/// Scan `workdir` for group definitions
///
/// Fails only if the working directory itself cannot be walked; individual
/// broken definitions land in [`DiscoveredGroups::errors`].
pub fn discover_groups(workdir: &Path) -> Result<DiscoveredGroups> {
    if !workdir.is_dir() {
        return Err(ArmadaError::Discovery(format!(
            "{} is not a directory",
            workdir.display()
        )));
    }

    let mut found: BTreeMap<String, GroupDefinition> = BTreeMap::new();
    let mut errors = Vec::new();

    let walker = WalkDir::new(workdir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != STATE_DIR_NAME);

    for entry in walker {
        let entry = entry.map_err(|e| {
            ArmadaError::Discovery(format!("Failed to walk {}: {}", workdir.display(), e))
        })?;
        if !entry.file_type().is_file() || entry.file_name() != NODE_CONFIG_FILE {
            continue;
        }

        let config_path = entry.path();
        let Some(group_dir) = config_path.parent().filter(|dir| *dir != workdir) else {
            debug!("Ignoring {} at the top of the working directory", config_path.display());
            continue;
        };
        let name = group_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let contents = match std::fs::read_to_string(config_path) {
            Ok(contents) => contents,
            Err(source) => {
                warn!("Skipping {}: {}", config_path.display(), source);
                errors.push(DiscoveryError::Unreadable {
                    path: config_path.to_path_buf(),
                    source,
                });
                continue;
            }
        };

        match parse_node_config(&name, group_dir, config_path, &contents) {
            Ok(group) => {
                if let Some(existing) = found.get(&group.name) {
                    warn!("Duplicate group '{}' at {}", group.name, group_dir.display());
                    errors.push(DiscoveryError::Duplicate {
                        group: group.name.clone(),
                        first: existing.config_source.clone(),
                        second: group.config_source.clone(),
                    });
                    continue;
                }
                info!(
                    "🔎 Found {} '{}' ({})",
                    group.kind, group.name, group.identity
                );
                found.insert(group.name.clone(), group);
            }
            Err(e) => {
                warn!("Skipping {}: {}", config_path.display(), e);
                errors.push(e);
            }
        }
    }

    let (notaries, nodes): (Vec<_>, Vec<_>) =
        found.into_values().partition(GroupDefinition::is_notary);

    Ok(DiscoveredGroups {
        nodes,
        notaries,
        errors,
    })
}

/// Build a group definition from the text of a `node.conf`
pub fn parse_node_config(
    name: &str,
    group_dir: &Path,
    config_path: &Path,
    contents: &str,
) -> std::result::Result<GroupDefinition, DiscoveryError> {
    let legal_name = LEGAL_NAME
        .captures(contents)
        .and_then(|c| c.get(1))
        .ok_or_else(|| DiscoveryError::MissingIdentity {
            path: config_path.to_path_buf(),
        })?;
    let identity = PeerIdentity::parse(legal_name.as_str()).map_err(|e| {
        DiscoveryError::InvalidIdentity {
            path: config_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    let mut group = if NOTARY_BLOCK.is_match(contents) {
        GroupDefinition::notary(name, group_dir, identity)
    } else {
        GroupDefinition::node(name, group_dir, identity)
    };

    if let Some(port) = rpc_port(contents) {
        group = group.with_service_port(port);
    }
    if let Some(credentials) = rpc_credentials(contents) {
        group = group.with_credentials(credentials);
    }
    Ok(group)
}

static LEGAL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*myLegalName\s*[=:]\s*"([^"]+)""#).unwrap());
static NOTARY_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*notary\s*[=:]?\s*\{").unwrap());
static RPC_SETTINGS_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)rpcSettings\s*[=:]?\s*\{[^}]*?\baddress\s*[=:]\s*"?[^":\s]*:(\d+)"#).unwrap()
});
static RPC_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*rpcAddress\s*[=:]\s*"?[^":\s]*:(\d+)"#).unwrap());
static RPC_USERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)rpcUsers\s*[=:]\s*\[\s*\{([^}]*)\}").unwrap());
static RPC_USER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\buser(?:name)?\s*[=:]\s*"?([^"\s,}]+)"?"#).unwrap());
static RPC_PASSWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bpassword\s*[=:]\s*"?([^"\s,}]+)"?"#).unwrap());

/// RPC port from `rpcSettings.address`, falling back to `rpcAddress`
fn rpc_port(contents: &str) -> Option<u16> {
    RPC_SETTINGS_ADDRESS
        .captures(contents)
        .or_else(|| RPC_ADDRESS.captures(contents))
        .and_then(|c| c.get(1))
        .and_then(|port| port.as_str().parse().ok())
}

/// Credentials of the first `rpcUsers` entry
fn rpc_credentials(contents: &str) -> Option<Credentials> {
    let entry = RPC_USERS.captures(contents)?.get(1)?.as_str();
    let user = RPC_USER.captures(entry)?.get(1)?.as_str();
    let password = RPC_PASSWORD.captures(entry)?.get(1)?.as_str();
    Some(Credentials::new(user, password))
}
