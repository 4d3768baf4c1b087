//! Pipeline assembly: an ordered list of frame-processing stages.
//!
//! A bot pipeline is fixed at construction time. For any given frame the stages run in
//! strict declared order; a stage may emit zero, one, or several frames, and everything
//! it emits is fed to the next stage before the pipeline moves on. Nothing here
//! reorders frames.

use async_trait::async_trait;

use crate::error::Result;
use crate::frames::Frame;

/// One processing stage in a bot pipeline.
#[async_trait]
pub trait Stage: Send {
    /// Stage name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Process one frame, returning the frames to hand to the next stage.
    ///
    /// Returning an empty vec swallows the frame (e.g. media dropped while paused).
    async fn process(&mut self, frame: Frame) -> Result<Vec<Frame>>;
}

/// A fixed, ordered chain of stages.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Declared stage names, in processing order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Push one frame through every stage in order.
    ///
    /// The frames returned are whatever falls out of the final stage; for the canonical
    /// bot pipeline that is the assistant aggregator's pass-through, which the task
    /// discards.
    pub async fn process_frame(&mut self, frame: Frame) -> Result<Vec<Frame>> {
        let mut current = vec![frame];
        for stage in &mut self.stages {
            let mut next = Vec::new();
            for frame in current.drain(..) {
                next.extend(stage.process(frame).await?);
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }
        Ok(current)
    }
}
