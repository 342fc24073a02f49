/*!
 * Command-line interface
 *
 * One invocation manages one network. `--new` provisions it from scratch out
 * of the group definitions in the nodes directory; without it the persisted
 * network is checked, repaired, and optionally grown with `--add-node`.
 */

use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::{ArmadaConfig, LogLevel};
use crate::deploy::RunMode;
use crate::error::{ArmadaError, Result};

#[derive(Debug, Parser)]
#[command(name = "armada")]
#[command(version, about = "Provision and heal ledger networks on cloud container instances", long_about = None)]
pub struct Cli {
    /// Name of the network to create or manage
    #[arg(long = "network-name", value_name = "NAME")]
    pub network_name: String,

    /// Start the network over: discover, build, publish and instantiate everything
    #[arg(long)]
    pub new: bool,

    /// Replicas for a node group on a fresh network, as GROUP:COUNT (repeatable)
    #[arg(
        short = 'N',
        long = "node",
        value_name = "GROUP:COUNT",
        value_parser = parse_replica_override
    )]
    pub nodes: Vec<(String, u32)>,

    /// Add one replica of GROUP to an existing network (repeatable)
    #[arg(short = 'a', long = "add-node", value_name = "GROUP")]
    pub add_nodes: Vec<String>,

    /// Directory holding one subdirectory per group
    #[arg(short = 'd', long = "nodes-dir", value_name = "DIR", default_value = ".")]
    pub nodes_dir: PathBuf,

    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Deployment region (overrides config)
    #[arg(long)]
    pub region: Option<String>,

    /// Base URL of the network directory service (overrides config and state)
    #[arg(long = "directory-url", value_name = "URL")]
    pub directory_url: Option<String>,

    /// Registry login server (overrides config)
    #[arg(long)]
    pub registry: Option<String>,

    /// Verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Log level
    #[arg(long = "log-level", value_enum)]
    pub log_level: Option<LogLevelArg>,

    /// Write JSON logs to this file instead of stdout
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

/// Parse `GROUP:COUNT`; the group name is lowercased
pub fn parse_replica_override(s: &str) -> std::result::Result<(String, u32), String> {
    let (group, count) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected GROUP:COUNT, got '{}'", s))?;

    let group = group.trim().to_lowercase();
    if group.is_empty() {
        return Err(format!("missing group name in '{}'", s));
    }

    let count: u32 = count
        .trim()
        .parse()
        .map_err(|_| format!("invalid replica count in '{}'", s))?;
    if count == 0 {
        return Err(format!("replica count must be at least 1 in '{}'", s));
    }

    Ok((group, count))
}

impl Cli {
    /// What this invocation should do
    pub fn run_mode(&self) -> Result<RunMode> {
        if self.new {
            if !self.add_nodes.is_empty() {
                return Err(ArmadaError::InvalidArgs(
                    "--add-node cannot be combined with --new; add replicas to a running network"
                        .to_string(),
                ));
            }
            let replica_counts: BTreeMap<String, u32> = self.nodes.iter().cloned().collect();
            return Ok(RunMode::Fresh { replica_counts });
        }

        if !self.nodes.is_empty() {
            return Err(ArmadaError::InvalidArgs(
                "--node only applies together with --new".to_string(),
            ));
        }
        Ok(RunMode::Maintain {
            add: self
                .add_nodes
                .iter()
                .map(|group| group.trim().to_lowercase())
                .collect(),
        })
    }

    /// Layer CLI overrides onto a loaded configuration
    pub fn apply_to(&self, config: &mut ArmadaConfig) {
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(url) = &self.directory_url {
            config.directory_url = Some(url.clone());
        }
        if let Some(registry) = &self.registry {
            config.registry = registry.clone();
        }
        if let Some(level) = self.log_level {
            config.log_level = level.into();
        }
        if self.log_file.is_some() {
            config.log_file = self.log_file.clone();
        }
        config.verbose |= self.verbose;
    }

    /// Configuration file (if any) with CLI overrides applied, validated
    pub fn load_config(&self) -> Result<ArmadaConfig> {
        let mut config = match &self.config {
            Some(path) => ArmadaConfig::from_file(path)?,
            None => ArmadaConfig::default(),
        };
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }
}
