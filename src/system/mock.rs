//! Scripted command runner for testing
//!
//! Responses are matched by program name plus a leading slice of the
//! arguments, so a test can script `docker build` and `docker push` (or
//! `az container create` and `az container show`) independently. Unscripted
//! calls succeed with empty output. Every invocation is recorded.

use super::{CommandOutput, CommandRunner};
use armada_core_interface::CapabilityError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct Scripted {
    program: String,
    prefix: Vec<String>,
    output: CommandOutput,
}

#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    responses: Arc<Mutex<Vec<Scripted>>>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the output of `program prefix...`; later scripts win
    pub fn respond(&self, program: &str, prefix: &[&str], output: CommandOutput) {
        self.responses.lock().unwrap().push(Scripted {
            program: program.to_string(),
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            output,
        });
    }

    /// Every call so far, program first
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CapabilityError> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().cloned());
        self.calls.lock().unwrap().push(call);

        let responses = self.responses.lock().unwrap();
        let scripted = responses
            .iter()
            .rev()
            .find(|s| s.program == program && args.starts_with(&s.prefix));
        Ok(scripted
            .map(|s| s.output.clone())
            .unwrap_or_else(|| CommandOutput::success("")))
    }
}
