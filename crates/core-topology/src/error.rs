//! Error types for topology operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for topology operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the topology store and its state file
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading or writing state
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The state file exists but does not describe the requested network
    #[error("Corrupt state file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Network names end up in file and resource names
    #[error("Invalid network name: {0:?}")]
    InvalidNetworkName(String),

    /// Peer identity string could not be parsed
    #[error("Invalid peer identity {input:?}: {reason}")]
    InvalidIdentity { input: String, reason: String },

    /// Remote image references are write-once per group
    #[error("Remote image for group '{group}' already recorded as {existing}")]
    ImageAlreadyRecorded { group: String, existing: String },

    /// Group has no recorded instances to act on
    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    /// Notary groups run exactly one replica
    #[error("Group '{0}' cannot take more replicas")]
    SingleReplicaGroup(String),
}

impl Error {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_identity(input: &str, reason: impl Into<String>) -> Self {
        Error::InvalidIdentity {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
