//! Docker image build and registry push

use super::{args, run_checked};
use crate::system::CommandRunner;
use armada_core_interface::{ArtifactBuilder, ArtifactPublisher, CapabilityError, GroupDefinition};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// File every group directory must contain to be buildable
pub const DOCKERFILE: &str = "Dockerfile";

/// Builds group images with the local docker toolchain
#[derive(Clone)]
pub struct DockerBuilder {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl DockerBuilder {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }
}

#[async_trait]
impl ArtifactBuilder for DockerBuilder {
    async fn build(&self, group: &GroupDefinition) -> Result<String, CapabilityError> {
        let dir = &group.config_source;
        if !dir.join(DOCKERFILE).is_file() {
            return Err(CapabilityError::NoConfig {
                group: group.name.clone(),
                reason: format!("no {} in {}", DOCKERFILE, dir.display()),
            });
        }

        info!("🔨 Building image for {} from {}", group.name, dir.display());
        let output = run_checked(
            self.runner.as_ref(),
            &self.program,
            args(["build".to_string(), "-q".to_string(), dir.display().to_string()]),
            |reason| CapabilityError::Build {
                group: group.name.clone(),
                reason,
            },
        )
        .await?;

        let image_id = output
            .stdout
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .ok_or_else(|| CapabilityError::Build {
                group: group.name.clone(),
                reason: "docker printed no image id".to_string(),
            })?;
        Ok(image_id.to_string())
    }
}

/// Pushes built images to `{registry}/{logical}:{network}`
#[derive(Clone)]
pub struct RegistryPublisher {
    runner: Arc<dyn CommandRunner>,
    program: String,
    registry: String,
}

impl RegistryPublisher {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        program: impl Into<String>,
        registry: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            registry: registry.into(),
        }
    }

    /// Remote reference an image is published under; registry paths are lowercase
    pub fn remote_ref(&self, logical_name: &str, network_name: &str) -> String {
        format!("{}/{}:{}", self.registry, logical_name, network_name).to_lowercase()
    }
}

#[async_trait]
impl ArtifactPublisher for RegistryPublisher {
    async fn publish(
        &self,
        local_id: &str,
        logical_name: &str,
        network_name: &str,
    ) -> Result<String, CapabilityError> {
        let remote = self.remote_ref(logical_name, network_name);
        let publish_error = |reason| CapabilityError::Publish {
            local_id: local_id.to_string(),
            logical_name: logical_name.to_string(),
            reason,
        };

        run_checked(
            self.runner.as_ref(),
            &self.program,
            args(["tag", local_id, remote.as_str()]),
            publish_error,
        )
        .await?;

        info!("📦 Pushing {} to {}", local_id, remote);
        run_checked(
            self.runner.as_ref(),
            &self.program,
            args(["push", remote.as_str()]),
            publish_error,
        )
        .await?;

        Ok(remote)
    }
}
