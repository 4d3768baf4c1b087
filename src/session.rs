//! The model-session seam.
//!
//! The hosted multimodal model (speech-to-text, reasoning, tool invocation,
//! text-to-speech) is an external collaborator. This module defines the contract the
//! bots program against: a configuration object built once per connection, a
//! [`LiveSession`] trait the real client implements, and the [`InputGate`] pause flags
//! shared by every implementation.

pub mod local;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::frames::Frame;
use crate::pipeline::Stage;
use crate::tools::ToolDeclaration;

/// The voice identities offered by the model service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Voice {
    Aoede,
    Charon,
    Fenrir,
    Kore,
    Puck,
}

impl Voice {
    /// The service's wire name for this voice.
    pub fn wire_name(self) -> &'static str {
        match self {
            Voice::Aoede => "Aoede",
            Voice::Charon => "Charon",
            Voice::Fenrir => "Fenrir",
            Voice::Kore => "Kore",
            Voice::Puck => "Puck",
        }
    }
}

/// Everything needed to open a model session, supplied once at session creation.
#[derive(Clone)]
pub struct LiveSessionConfig {
    /// Credential for the model service.
    pub api_key: String,

    /// Immutable persona and policy text.
    pub system_instruction: String,

    /// Which voice the session speaks with.
    pub voice: Voice,

    /// Capabilities the model may invoke.
    pub tools: Vec<ToolDeclaration>,

    /// Hold audio input until explicitly unpaused (lets the connection stabilize).
    pub start_audio_input_paused: bool,

    /// Hold video input until explicitly unpaused.
    pub start_video_input_paused: bool,
}

impl fmt::Debug for LiveSessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSessionConfig")
            .field("api_key", &"<redacted>")
            .field("system_instruction_len", &self.system_instruction.len())
            .field("voice", &self.voice)
            .field("tools", &self.tools)
            .field("start_audio_input_paused", &self.start_audio_input_paused)
            .field("start_video_input_paused", &self.start_video_input_paused)
            .finish()
    }
}

/// Token usage reported by the session, for usage metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A bidirectional streaming session with the hosted model, rendered as the middle
/// pipeline stage.
///
/// Implementations take `&self`; pause state and any streaming machinery live behind
/// interior mutability so the connect/disconnect handlers can share the session with
/// the pipeline.
#[async_trait]
pub trait LiveSession: Send + Sync {
    /// Feed one frame to the session, returning whatever the model streamed back.
    async fn process(&self, frame: Frame) -> Result<Vec<Frame>>;

    /// Pause or resume audio ingestion.
    fn set_audio_input_paused(&self, paused: bool);

    /// Pause or resume video ingestion.
    fn set_video_input_paused(&self, paused: bool);

    /// Cumulative token usage, when the implementation tracks it.
    fn usage(&self) -> Usage {
        Usage::default()
    }
}

/// Atomic pause flags for media ingestion.
///
/// Session implementations embed one of these and consult [`InputGate::admits`] before
/// forwarding media to the model.
pub struct InputGate {
    audio_paused: AtomicBool,
    video_paused: AtomicBool,
}

impl InputGate {
    pub fn new(audio_paused: bool, video_paused: bool) -> Self {
        Self {
            audio_paused: AtomicBool::new(audio_paused),
            video_paused: AtomicBool::new(video_paused),
        }
    }

    pub fn audio_paused(&self) -> bool {
        self.audio_paused.load(Ordering::Acquire)
    }

    pub fn video_paused(&self) -> bool {
        self.video_paused.load(Ordering::Acquire)
    }

    pub fn set_audio_paused(&self, paused: bool) {
        self.audio_paused.store(paused, Ordering::Release);
    }

    pub fn set_video_paused(&self, paused: bool) {
        self.video_paused.store(paused, Ordering::Release);
    }

    /// Whether a frame may pass the gate right now. Non-media frames always pass.
    pub fn admits(&self, frame: &Frame) -> bool {
        match frame {
            Frame::InputAudio(_) => !self.audio_paused(),
            Frame::InputImage(_) => !self.video_paused(),
            _ => true,
        }
    }
}

/// Adapter placing a shared [`LiveSession`] into the pipeline as its middle stage.
pub struct SessionStage<S> {
    session: Arc<S>,
}

impl<S: LiveSession> SessionStage<S> {
    pub fn new(session: Arc<S>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<S: LiveSession + 'static> Stage for SessionStage<S> {
    fn name(&self) -> &'static str {
        "model-session"
    }

    async fn process(&mut self, frame: Frame) -> Result<Vec<Frame>> {
        self.session.process(frame).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::AudioChunk;

    fn audio() -> Frame {
        Frame::InputAudio(AudioChunk {
            samples: vec![0; 160],
            sample_rate: 16_000,
        })
    }

    #[test]
    fn gate_blocks_paused_media_only() {
        let gate = InputGate::new(true, false);
        assert!(!gate.admits(&audio()));
        assert!(gate.admits(&Frame::InputImage(crate::frames::ImageFrame {
            jpeg: vec![0xff, 0xd8],
        })));
        assert!(gate.admits(&Frame::Run));
        assert!(gate.admits(&Frame::InputText("hi".into())));

        gate.set_audio_paused(false);
        assert!(gate.admits(&audio()));
    }

    #[test]
    fn voices_map_to_wire_names() {
        assert_eq!(Voice::Puck.wire_name(), "Puck");
        assert_eq!(Voice::Charon.wire_name(), "Charon");
    }

    #[test]
    fn config_debug_redacts_the_key() {
        let config = LiveSessionConfig {
            api_key: "super-secret".into(),
            system_instruction: "be brief".into(),
            voice: Voice::Kore,
            tools: vec![],
            start_audio_input_paused: false,
            start_video_input_paused: false,
        };
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
