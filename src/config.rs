/*!
 * Configuration types for Armada
 */

use armada_core_topology::Credentials;
use armada_sentinel::ReconcilePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ArmadaError, Result};

/// Main configuration, loaded from TOML and overridden by CLI flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmadaConfig {
    /// Deployment location of new networks
    #[serde(default = "default_region")]
    pub region: String,

    /// Base URL of the network directory service
    #[serde(default)]
    pub directory_url: Option<String>,

    /// Registry login server images are pushed to
    #[serde(default = "default_registry")]
    pub registry: String,

    /// Logging level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub docker: DockerSettings,

    #[serde(default)]
    pub azure: AzureSettings,

    #[serde(default)]
    pub reconcile: ReconcilePolicy,
}

impl Default for ArmadaConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            directory_url: None,
            registry: default_registry(),
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
            docker: DockerSettings::default(),
            azure: AzureSettings::default(),
            reconcile: ReconcilePolicy::default(),
        }
    }
}

/// Local container toolchain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockerSettings {
    #[serde(default = "default_docker_program")]
    pub program: String,
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self {
            program: default_docker_program(),
        }
    }
}

/// Container instance sizing and CLI location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AzureSettings {
    #[serde(default = "default_az_program")]
    pub program: String,

    /// CPU cores per instance
    #[serde(default = "default_cpu")]
    pub cpu: f64,

    /// Memory per instance in GB
    #[serde(default = "default_memory_gb")]
    pub memory_gb: f64,

    /// Pull credentials for the registry, passed through as given
    #[serde(default)]
    pub registry_credentials: Option<Credentials>,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            program: default_az_program(),
            cpu: default_cpu(),
            memory_gb: default_memory_gb(),
            registry_credentials: None,
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// Default value functions for serde
fn default_region() -> String {
    "westeurope".to_string()
}

fn default_registry() -> String {
    "armada.azurecr.io".to_string()
}

fn default_docker_program() -> String {
    "docker".to_string()
}

fn default_az_program() -> String {
    "az".to_string()
}

fn default_cpu() -> f64 {
    1.0
}

fn default_memory_gb() -> f64 {
    2.0
}

impl ArmadaConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ArmadaError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents)
            .map_err(|e| ArmadaError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ArmadaError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(ArmadaError::Config("region must not be empty".to_string()));
        }

        if self.registry.trim().is_empty() || self.registry.contains("://") {
            return Err(ArmadaError::Config(format!(
                "registry must be a bare login server, got '{}'",
                self.registry
            )));
        }

        if let Some(url) = &self.directory_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ArmadaError::Config(format!(
                    "directory_url must be an http(s) URL, got '{}'",
                    url
                )));
            }
        }

        if self.azure.cpu <= 0.0 || self.azure.memory_gb <= 0.0 {
            return Err(ArmadaError::Config(
                "azure.cpu and azure.memory_gb must be positive".to_string(),
            ));
        }

        if let Some(credentials) = &self.azure.registry_credentials {
            if credentials.username.trim().is_empty() {
                return Err(ArmadaError::Config(
                    "azure.registry_credentials.username must not be empty".to_string(),
                ));
            }
        }

        self.reconcile.validate().map_err(ArmadaError::Config)
    }
}
