//! The pipeline task: one cooperative execution per connection.
//!
//! A task owns the assembled pipeline and drives frames through it until one of its
//! terminal conditions: the incoming stream closes, the idle timer fires, or someone
//! cancels it. Cancellation wins over everything else; frames queued after cancellation
//! are never delivered.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::Result;
use crate::frames::Frame;
use crate::pipeline::Pipeline;

const CONTROL_QUEUE_CAPACITY: usize = 16;

/// Task-level toggles, mirroring what the hosted runner exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskParams {
    /// Emit frame counts and pipeline latency on termination.
    pub enable_metrics: bool,
    /// Emit the session's token usage on termination.
    pub enable_usage_metrics: bool,
}

/// How a task ended. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskExit {
    /// The incoming frame stream closed normally.
    Completed,
    /// Someone called [`TaskHandle::cancel`] (disconnect, interrupt).
    Cancelled,
    /// No frames flowed for the configured idle duration.
    IdleTimeout,
}

/// Cheap, cloneable control surface for a running task.
///
/// The connect handler queues frames through this; the disconnect handler cancels
/// through it.
#[derive(Clone)]
pub struct TaskHandle {
    frames_tx: mpsc::Sender<Frame>,
    cancel: CancellationToken,
}

impl TaskHandle {
    /// Enqueue one frame at the head of the pipeline.
    pub async fn queue_frame(&self, frame: Frame) -> Result<()> {
        // A send failure means the task already terminated; queueing after the end is
        // defined as a no-op, not an error.
        let _ = self.frames_tx.send(frame).await;
        Ok(())
    }

    /// Enqueue several frames in order.
    pub async fn queue_frames(&self, frames: Vec<Frame>) -> Result<()> {
        for frame in frames {
            self.queue_frame(frame).await?;
        }
        Ok(())
    }

    /// Cancel the task. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// A pipeline plus the machinery to drive it for one connection.
pub struct PipelineTask {
    pipeline: Pipeline,
    params: TaskParams,
    idle_timeout: Duration,
    frames_tx: mpsc::Sender<Frame>,
    frames_rx: mpsc::Receiver<Frame>,
    cancel: CancellationToken,
}

impl PipelineTask {
    pub fn new(pipeline: Pipeline, params: TaskParams, idle_timeout: Duration) -> Self {
        let (frames_tx, frames_rx) = mpsc::channel(CONTROL_QUEUE_CAPACITY);
        Self {
            pipeline,
            params,
            idle_timeout,
            frames_tx,
            frames_rx,
            cancel: CancellationToken::new(),
        }
    }

    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            frames_tx: self.frames_tx.clone(),
            cancel: self.cancel.clone(),
        }
    }

    pub fn params(&self) -> TaskParams {
        self.params
    }

    /// Drive the task to a terminal condition.
    ///
    /// `incoming` is the transport's frame stream; control frames queued through a
    /// [`TaskHandle`] are merged in. The idle timer restarts on every frame from
    /// either source.
    pub async fn run(mut self, mut incoming: mpsc::Receiver<Frame>) -> Result<TaskExit> {
        debug!(stages = ?self.pipeline.stage_names(), "pipeline task starting");

        let mut metrics = TaskMetrics::default();
        let exit = loop {
            let idle = tokio::time::sleep(self.idle_timeout);
            tokio::pin!(idle);

            let frame = tokio::select! {
                // Cancellation must win over frames already sitting in the queues.
                biased;
                _ = self.cancel.cancelled() => break TaskExit::Cancelled,
                maybe = incoming.recv() => match maybe {
                    Some(frame) => frame,
                    None => break TaskExit::Completed,
                },
                maybe = self.frames_rx.recv() => match maybe {
                    Some(frame) => frame,
                    // Unreachable while we hold frames_tx, but harmless.
                    None => break TaskExit::Completed,
                },
                _ = &mut idle => break TaskExit::IdleTimeout,
            };

            trace!(kind = frame.kind(), "processing frame");
            let started = Instant::now();
            self.pipeline.process_frame(frame).await?;
            metrics.record(started.elapsed());
        };

        if self.params.enable_metrics {
            info!(
                frames = metrics.frames,
                avg_latency_ms = metrics.avg().as_secs_f64() * 1000.0,
                max_latency_ms = metrics.max.as_secs_f64() * 1000.0,
                exit = ?exit,
                "pipeline task finished"
            );
        }
        Ok(exit)
    }
}

#[derive(Default)]
struct TaskMetrics {
    frames: u64,
    total: Duration,
    max: Duration,
}

impl TaskMetrics {
    fn record(&mut self, latency: Duration) {
        self.frames += 1;
        self.total += latency;
        self.max = self.max.max(latency);
    }

    fn avg(&self) -> Duration {
        if self.frames == 0 {
            Duration::ZERO
        } else {
            self.total / self.frames as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::pipeline::Stage;

    struct Counter {
        frames: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait]
    impl Stage for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        async fn process(&mut self, frame: Frame) -> Result<Vec<Frame>> {
            self.frames
                .fetch_add(1, std::sync::atomic::Ordering::AcqRel);
            Ok(vec![frame])
        }
    }

    fn counting_task(idle: Duration) -> (PipelineTask, std::sync::Arc<std::sync::atomic::AtomicUsize>) {
        let frames = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let pipeline = Pipeline::new(vec![Box::new(Counter {
            frames: std::sync::Arc::clone(&frames),
        })]);
        (
            PipelineTask::new(pipeline, TaskParams::default(), idle),
            frames,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_without_frames() -> anyhow::Result<()> {
        let (task, _frames) = counting_task(Duration::from_secs(5));
        let (_tx, rx) = mpsc::channel(1);
        let exit = task.run(rx).await?;
        assert_eq!(exit, TaskExit::IdleTimeout);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn frames_restart_the_idle_timer() -> anyhow::Result<()> {
        let (task, frames) = counting_task(Duration::from_secs(5));
        let handle = task.handle();
        let (_tx, rx) = mpsc::channel(1);
        let runner = tokio::spawn(task.run(rx));

        for _ in 0..3 {
            tokio::time::sleep(Duration::from_secs(4)).await;
            handle.queue_frame(Frame::Run).await?;
        }
        // 12 seconds in, still alive because each frame reset the 5s timer.
        tokio::time::sleep(Duration::from_secs(6)).await;

        let exit = runner.await??;
        assert_eq!(exit, TaskExit::IdleTimeout);
        assert_eq!(frames.load(std::sync::atomic::Ordering::Acquire), 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_beats_queued_frames() -> anyhow::Result<()> {
        let (task, frames) = counting_task(Duration::from_secs(60));
        let handle = task.handle();
        let (_tx, rx) = mpsc::channel(1);

        // Cancel first, then queue: the frame must never be processed.
        handle.cancel();
        handle.queue_frame(Frame::Run).await?;

        let exit = task.run(rx).await?;
        assert_eq!(exit, TaskExit::Cancelled);
        assert_eq!(frames.load(std::sync::atomic::Ordering::Acquire), 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn closed_incoming_stream_completes_the_task() -> anyhow::Result<()> {
        let (task, _frames) = counting_task(Duration::from_secs(60));
        let (tx, rx) = mpsc::channel::<Frame>(1);
        drop(tx);
        let exit = task.run(rx).await?;
        assert_eq!(exit, TaskExit::Completed);
        Ok(())
    }
}
