//! Task groups: the join barrier used at every stage boundary
//!
//! A `TaskGroup` dispatches independent units onto the runtime and completes
//! only once every unit has settled, success or failure. Failures are never
//! short-circuited: the caller always gets one result per spawned unit, in
//! completion order, and decides how to aggregate them.

use crate::error::PipelineError;
use std::future::Future;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// A set of concurrently running units belonging to one pipeline stage
pub struct TaskGroup<T> {
    stage: String,
    tasks: JoinSet<T>,
}

impl<T: Send + 'static> TaskGroup<T> {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            tasks: JoinSet::new(),
        }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Dispatch one unit
    pub fn spawn<F>(&mut self, unit: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.tasks.spawn(unit);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every unit to settle
    ///
    /// A panicking unit yields `PipelineError::TaskPanicked` in its slot; the
    /// remaining units keep running to completion.
    pub async fn join_all(mut self) -> Vec<Result<T, PipelineError>> {
        debug!("Stage '{}': waiting for {} task(s)", self.stage, self.tasks.len());
        let mut settled = Vec::with_capacity(self.tasks.len());

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(output) => settled.push(Ok(output)),
                Err(join_err) => {
                    error!("Stage '{}': task panicked: {}", self.stage, join_err);
                    settled.push(Err(PipelineError::TaskPanicked {
                        stage: self.stage.clone(),
                        reason: join_err.to_string(),
                    }));
                }
            }
        }

        debug!("Stage '{}': {} task(s) settled", self.stage, settled.len());
        settled
    }
}
