//! External command execution
//!
//! Every cloud and container operation armada performs is a call to an
//! external CLI (`docker`, `az`). Backends run them through the
//! [`CommandRunner`] trait so they can be exercised without the tools
//! installed:
//! - `TokioCommandRunner`: spawns real processes
//! - `MockRunner`: scripted responses for unit tests (in tests module)

mod local;

pub use local::TokioCommandRunner;

#[cfg(test)]
pub mod mock;

#[cfg(test)]
pub use mock::MockRunner;

use armada_core_interface::CapabilityError;
use async_trait::async_trait;

/// Captured result of one finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` if the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    /// First non-empty line of stderr, falling back to the exit status
    pub fn failure_reason(&self) -> String {
        self.stderr
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| match self.status {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            })
    }
}

/// Command line for logs, with the value after any `--*password` flag masked
pub fn redacted_command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    let mut mask_next = false;
    for arg in args {
        line.push(' ');
        if mask_next {
            line.push_str("<redacted>");
        } else {
            line.push_str(arg);
        }
        mask_next = arg.starts_with("--") && arg.ends_with("password");
    }
    line
}

/// Runs external programs to completion
#[async_trait]
pub trait CommandRunner: Send + Sync + 'static {
    /// Run `program` with `args`, capturing its output
    ///
    /// Returns `Err` only if the process could not be started; a non-zero
    /// exit is reported through [`CommandOutput::status`].
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CapabilityError>;
}
