//! A scripted, in-process [`LiveSession`] implementation.
//!
//! Backs the `lanturn-bot` dry-run binary and the integration tests: it answers `Run`
//! with a canned greeting, echoes user text, and honors the input gate exactly the way
//! a real session client is expected to. No network, no model.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::Result;
use crate::frames::Frame;
use crate::session::{InputGate, LiveSession, LiveSessionConfig, Usage};

/// Greeting the scripted session speaks in response to `Run`.
pub const CANNED_GREETING: &str = "Hello! Lanturn here, ready when you are.";

/// Scripted session used by the dry-run harness and tests.
pub struct LocalSession {
    config: LiveSessionConfig,
    gate: InputGate,
    usage: Mutex<Usage>,
    runs_seen: AtomicUsize,
    audio_frames_seen: AtomicU64,
    image_frames_seen: AtomicU64,
    audio_unpauses: AtomicUsize,
    video_unpauses: AtomicUsize,
}

impl LocalSession {
    pub fn new(config: LiveSessionConfig) -> Self {
        let gate = InputGate::new(
            config.start_audio_input_paused,
            config.start_video_input_paused,
        );
        Self {
            config,
            gate,
            usage: Mutex::new(Usage::default()),
            runs_seen: AtomicUsize::new(0),
            audio_frames_seen: AtomicU64::new(0),
            image_frames_seen: AtomicU64::new(0),
            audio_unpauses: AtomicUsize::new(0),
            video_unpauses: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &LiveSessionConfig {
        &self.config
    }

    /// How many `Run` directives this session has handled.
    pub fn runs_seen(&self) -> usize {
        self.runs_seen.load(Ordering::Acquire)
    }

    /// Media frames that made it through the input gate.
    pub fn media_frames_seen(&self) -> (u64, u64) {
        (
            self.audio_frames_seen.load(Ordering::Acquire),
            self.image_frames_seen.load(Ordering::Acquire),
        )
    }

    /// How many times audio input has been unpaused.
    pub fn audio_unpause_count(&self) -> usize {
        self.audio_unpauses.load(Ordering::Acquire)
    }

    /// How many times video input has been unpaused.
    pub fn video_unpause_count(&self) -> usize {
        self.video_unpauses.load(Ordering::Acquire)
    }

    pub fn is_audio_input_paused(&self) -> bool {
        self.gate.audio_paused()
    }

    pub fn is_video_input_paused(&self) -> bool {
        self.gate.video_paused()
    }

    fn record_usage(&self, input_tokens: u64, output_tokens: u64) {
        let mut usage = self.usage.lock().unwrap_or_else(|e| e.into_inner());
        usage.input_tokens += input_tokens;
        usage.output_tokens += output_tokens;
    }

    fn respond(&self, text: String) -> Vec<Frame> {
        // Rough token accounting: one per whitespace-separated word.
        self.record_usage(0, text.split_whitespace().count() as u64);
        vec![Frame::OutputText { text, done: true }]
    }
}

#[async_trait]
impl LiveSession for LocalSession {
    async fn process(&self, frame: Frame) -> Result<Vec<Frame>> {
        if !self.gate.admits(&frame) {
            return Ok(vec![]);
        }

        match frame {
            Frame::Run => {
                self.runs_seen.fetch_add(1, Ordering::AcqRel);
                Ok(self.respond(CANNED_GREETING.to_string()))
            }
            Frame::InputText(text) => {
                self.record_usage(text.split_whitespace().count() as u64, 0);
                Ok(self.respond(format!("You said: {text}")))
            }
            Frame::InputAudio(_) => {
                // A real session streams this to the model; the script just counts it.
                self.audio_frames_seen.fetch_add(1, Ordering::AcqRel);
                Ok(vec![])
            }
            Frame::InputImage(_) => {
                self.image_frames_seen.fetch_add(1, Ordering::AcqRel);
                Ok(vec![])
            }
            // Output frames originate here; pass any stray ones through untouched.
            other @ (Frame::OutputAudio(_) | Frame::OutputText { .. }) => Ok(vec![other]),
        }
    }

    fn set_audio_input_paused(&self, paused: bool) {
        self.gate.set_audio_paused(paused);
        if !paused {
            self.audio_unpauses.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn set_video_input_paused(&self, paused: bool) {
        self.gate.set_video_paused(paused);
        if !paused {
            self.video_unpauses.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn usage(&self) -> Usage {
        *self.usage.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{AudioChunk, ImageFrame};
    use crate::session::Voice;

    fn config(start_paused: bool) -> LiveSessionConfig {
        LiveSessionConfig {
            api_key: "test-key".into(),
            system_instruction: "be brief".into(),
            voice: Voice::Puck,
            tools: vec![],
            start_audio_input_paused: start_paused,
            start_video_input_paused: start_paused,
        }
    }

    #[tokio::test]
    async fn run_produces_the_greeting() -> anyhow::Result<()> {
        let session = LocalSession::new(config(false));
        let out = session.process(Frame::Run).await?;
        assert_eq!(out, vec![Frame::OutputText {
            text: CANNED_GREETING.into(),
            done: true,
        }]);
        assert_eq!(session.runs_seen(), 1);
        assert!(session.usage().output_tokens > 0);
        Ok(())
    }

    #[tokio::test]
    async fn paused_media_is_dropped_until_unpaused() -> anyhow::Result<()> {
        let session = LocalSession::new(config(true));
        let audio = Frame::InputAudio(AudioChunk {
            samples: vec![0; 160],
            sample_rate: 16_000,
        });
        let image = Frame::InputImage(ImageFrame {
            jpeg: vec![0xff, 0xd8],
        });

        assert!(session.process(audio.clone()).await?.is_empty());
        assert!(session.process(image.clone()).await?.is_empty());
        assert_eq!(session.media_frames_seen(), (0, 0));

        session.set_audio_input_paused(false);
        session.set_video_input_paused(false);
        assert!(session.process(audio).await?.is_empty());
        assert!(session.process(image).await?.is_empty());
        assert_eq!(session.media_frames_seen(), (1, 1));
        assert_eq!(session.audio_unpause_count(), 1);
        assert_eq!(session.video_unpause_count(), 1);
        Ok(())
    }
}
