/*!
 * Error types for Armada
 */

use armada_pipeline::PipelineError;
use std::fmt;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArmadaError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Error, Debug)]
pub enum ArmadaError {
    /// Configuration file or settings are unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Command-line arguments contradict each other or the persisted state
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// Group definitions could not be discovered at all
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Persisted topology is unreadable, corrupt or inconsistent
    #[error("State error: {0}")]
    State(#[from] armada_core_topology::Error),

    #[error("Provisioning error: {0}")]
    Pipeline(#[from] PipelineError),

    /// The directory service is down; nothing can be checked or repaired
    #[error("Network unhealthy: {0}")]
    NetworkUnhealthy(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ArmadaError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ArmadaError::Pipeline(e) if e.is_local() => EXIT_PARTIAL,
            ArmadaError::Pipeline(PipelineError::GroupsFailed { .. }) => EXIT_PARTIAL,
            _ => EXIT_FATAL,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            ArmadaError::Config(_) => ErrorCategory::Configuration,
            ArmadaError::InvalidArgs(_) => ErrorCategory::Validation,
            ArmadaError::Discovery(_) => ErrorCategory::Discovery,
            ArmadaError::State(_) => ErrorCategory::State,
            ArmadaError::Pipeline(_) => ErrorCategory::Provisioning,
            ArmadaError::NetworkUnhealthy(_) => ErrorCategory::Network,
            ArmadaError::Io(_) => ErrorCategory::IoError,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    /// Argument and precondition checks
    Validation,
    Discovery,
    /// Persisted topology
    State,
    /// Build, publish and instantiate
    Provisioning,
    /// Directory service reachability
    Network,
    IoError,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Discovery => write!(f, "discovery"),
            ErrorCategory::State => write!(f, "state"),
            ErrorCategory::Provisioning => write!(f, "provisioning"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::IoError => write!(f, "io"),
        }
    }
}
