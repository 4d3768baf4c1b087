//! Drives a pipeline task to completion on behalf of a hosted execution environment.

use tokio::sync::mpsc;
use tracing::info;

use crate::config::DEFAULT_IDLE_TIMEOUT_SECS;
use crate::error::Result;
use crate::frames::Frame;
use crate::task::{PipelineTask, TaskExit};

/// Arguments a hosting environment passes to a bot entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerArgs {
    /// Seconds without pipeline activity before the task terminates.
    pub idle_timeout_secs: u64,
    /// Intercept SIGINT and shut the task down gracefully.
    pub handle_sigint: bool,
}

impl Default for RunnerArgs {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            handle_sigint: true,
        }
    }
}

/// Runs one task, optionally turning a process interrupt into a graceful cancellation.
pub struct PipelineRunner {
    handle_sigint: bool,
}

impl PipelineRunner {
    pub fn new(handle_sigint: bool) -> Self {
        Self { handle_sigint }
    }

    /// Drive `task` until it reaches a terminal condition.
    ///
    /// With SIGINT handling enabled, an interrupt cancels the task and we still wait
    /// for it to wind down, so pipeline resources are released before returning.
    pub async fn run(
        &self,
        task: PipelineTask,
        incoming: mpsc::Receiver<Frame>,
    ) -> Result<TaskExit> {
        if !self.handle_sigint {
            return task.run(incoming).await;
        }

        let handle = task.handle();
        let run = task.run(incoming);
        tokio::pin!(run);

        tokio::select! {
            exit = &mut run => return exit,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received; cancelling pipeline task");
                handle.cancel();
            }
        }
        run.await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::pipeline::Pipeline;
    use crate::task::TaskParams;

    #[tokio::test(start_paused = true)]
    async fn runner_without_sigint_reports_the_task_exit() -> anyhow::Result<()> {
        let task = PipelineTask::new(
            Pipeline::new(vec![]),
            TaskParams::default(),
            Duration::from_secs(1),
        );
        let (_tx, rx) = mpsc::channel(1);
        let exit = PipelineRunner::new(false).run(task, rx).await?;
        assert_eq!(exit, TaskExit::IdleTimeout);
        Ok(())
    }
}
