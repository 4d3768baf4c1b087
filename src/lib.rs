//! `lanturn`: realtime voice and vision assistant bots for ESP32-class devices.
//!
//! This crate provides:
//! - Two bot variants (audio-only and voice+vision) as configuration over one pipeline
//! - The canonical five-stage conversation pipeline and its per-connection task
//! - Trait seams for the external collaborators: transport medium, VAD tuning, and the
//!   hosted multimodal model session
//! - Connection lifecycle management (greeting kickoff, settle-delay unpause,
//!   cancellation on disconnect, idle timeout)
//!
//! The heavy lifting (WebRTC negotiation, voice activity detection, and the model
//! session itself) belongs to external collaborators reached through the seams in
//! `transport`, `vad`, and `session`.

// High-level bot variants (most consumers should start here).
pub mod bots;

// Crate-wide configuration and errors.
pub mod config;
pub mod error;

// Conversation data model.
pub mod context;
pub mod frames;
pub mod tools;

// Seams for external collaborators.
pub mod session;
pub mod transport;
pub mod vad;

// Pipeline assembly and execution.
pub mod lifecycle;
pub mod pipeline;
pub mod runner;
pub mod task;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

pub use config::Settings;
pub use error::{Error, Result};
pub use runner::{PipelineRunner, RunnerArgs};
pub use task::TaskExit;
