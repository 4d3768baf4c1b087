//! The two Lanturn bot variants.
//!
//! Each variant is configuration over the same machinery: a system instruction, a
//! transport-parameter map, a session config, and the canonical five-stage pipeline
//! (transport input → user aggregation → model session → transport output → assistant
//! aggregation). `voice` is the audio-only assistant; `vision` adds camera input for
//! the camera-equipped devices.

pub mod vision;
pub mod voice;

use std::sync::Arc;
use std::time::Duration;

use crate::context::{ContextAggregator, ConversationContext};
use crate::pipeline::Pipeline;
use crate::runner::RunnerArgs;
use crate::session::{LiveSession, SessionStage};
use crate::task::{PipelineTask, TaskParams};
use crate::transport::Transport;

/// Which bot to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum BotVariant {
    /// Audio-only assistant.
    Voice,
    /// Voice + camera assistant.
    Vision,
}

/// Assemble the five-stage pipeline and its task for one connection.
///
/// The conversation context is created here, seeded with the variant's greeting
/// directive, and lives exactly as long as the task.
pub(crate) fn assemble_task<T, S>(
    transport: &T,
    session: Arc<S>,
    greeting_directive: &str,
    args: &RunnerArgs,
) -> PipelineTask
where
    T: Transport + ?Sized,
    S: LiveSession + 'static,
{
    let context = ConversationContext::seeded(greeting_directive);
    let (user_aggregator, assistant_aggregator) = ContextAggregator::pair(context);

    let pipeline = Pipeline::new(vec![
        transport.input(),
        Box::new(user_aggregator),
        Box::new(SessionStage::new(session)),
        transport.output(),
        Box::new(assistant_aggregator),
    ]);

    PipelineTask::new(
        pipeline,
        TaskParams {
            enable_metrics: true,
            enable_usage_metrics: true,
        },
        Duration::from_secs(args.idle_timeout_secs),
    )
}
