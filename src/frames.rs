//! The frame vocabulary that flows through a bot pipeline.
//!
//! Frames travel through the five pipeline stages in strict declared order. Input
//! frames originate at the transport, output frames at the model session. `Run` is the
//! one control frame: queueing it asks the model to take a turn without waiting for
//! user input (used to kick off the opening greeting).

/// A single unit of work flowing through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Directive: have the model produce a turn now.
    Run,

    /// Audio captured from the client.
    InputAudio(AudioChunk),

    /// A camera frame captured from the client.
    InputImage(ImageFrame),

    /// Text attributed to the user (transcripts, typed input).
    InputText(String),

    /// Synthesized speech headed back to the client.
    OutputAudio(AudioChunk),

    /// Model response text. `done` marks the end of one assistant utterance.
    OutputText { text: String, done: bool },
}

impl Frame {
    /// Short name for logging and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Run => "run",
            Frame::InputAudio(_) => "input-audio",
            Frame::InputImage(_) => "input-image",
            Frame::InputText(_) => "input-text",
            Frame::OutputAudio(_) => "output-audio",
            Frame::OutputText { .. } => "output-text",
        }
    }
}

/// A chunk of interleaved PCM samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

/// A single encoded camera frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    pub jpeg: Vec<u8>,
}
