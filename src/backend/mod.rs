//! Concrete capability backends
//!
//! Thin adapters from the capability traits of `armada-core-interface` to the
//! tools that do the real work:
//!
//! - [`DockerBuilder`]: `docker build` of a group directory
//! - [`RegistryPublisher`]: `docker tag` + `docker push` to the network registry
//! - [`AzureContainerProvisioner`]: `az container create/show`
//! - [`HttpDirectoryProbe`]: `GET {directory}/ping`
//!
//! The command-driven adapters take any [`CommandRunner`], so they run against
//! [`crate::system::TokioCommandRunner`] in production and a scripted runner
//! in tests.
//!
//! # Example
//!
//! ```no_run
//! use armada::backend::{DockerBuilder, RegistryPublisher};
//! use armada::system::TokioCommandRunner;
//! use std::sync::Arc;
//!
//! let runner = Arc::new(TokioCommandRunner::new());
//! let builder = DockerBuilder::new(runner.clone(), "docker");
//! let publisher = RegistryPublisher::new(runner, "docker", "armada.azurecr.io");
//! ```

mod azure;
mod directory;
mod docker;

pub use azure::AzureContainerProvisioner;
pub use directory::{HttpDirectoryProbe, PING_PATH};
pub use docker::{DockerBuilder, RegistryPublisher, DOCKERFILE};

use crate::system::{CommandOutput, CommandRunner};
use armada_core_interface::CapabilityError;

/// Run a command and turn a non-zero exit into an error built by `on_failure`
pub(crate) async fn run_checked<F>(
    runner: &dyn CommandRunner,
    program: &str,
    args: Vec<String>,
    on_failure: F,
) -> Result<CommandOutput, CapabilityError>
where
    F: FnOnce(String) -> CapabilityError,
{
    let output = runner.run(program, &args).await?;
    if output.is_success() {
        Ok(output)
    } else {
        Err(on_failure(output.failure_reason()))
    }
}

/// Owned argument list from string slices
pub(crate) fn args<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}
