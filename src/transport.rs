//! The transport seam: parameter objects, kind selection, and the connection contract.
//!
//! The actual connection medium (WebRTC peer, telephony WebSocket bridge, managed room
//! service) is an external collaborator. What this crate owns is the parameter surface
//! the bots configure it with and the [`Transport`] trait the orchestration code
//! programs against.

pub mod local;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frames::Frame;
use crate::pipeline::Stage;
use crate::vad::VadParams;

/// The supported connection media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum TransportKind {
    /// Direct WebRTC peer connection (the ESP32 devices use this).
    Webrtc,

    /// A hosted room service the bot joins as a participant.
    ManagedRoom,

    /// Telephony bridged over a WebSocket media stream.
    TelephonyWebsocket,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Webrtc => "webrtc",
            TransportKind::ManagedRoom => "managed-room",
            TransportKind::TelephonyWebsocket => "telephony-websocket",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "webrtc" => Ok(TransportKind::Webrtc),
            "managed-room" => Ok(TransportKind::ManagedRoom),
            "telephony-websocket" => Ok(TransportKind::TelephonyWebsocket),
            other => Err(Error::UnsupportedTransport(other.to_string())),
        }
    }
}

/// Media enablement and VAD tuning for one transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportParams {
    pub audio_in_enabled: bool,
    pub audio_out_enabled: bool,
    pub video_in_enabled: bool,
    pub video_out_enabled: bool,
    pub vad: VadParams,
}

impl Default for TransportParams {
    fn default() -> Self {
        Self {
            audio_in_enabled: false,
            audio_out_enabled: false,
            video_in_enabled: false,
            video_out_enabled: false,
            vad: VadParams::default(),
        }
    }
}

/// Lazily evaluated map from transport kind to its parameters.
///
/// Builders are plain functions so that nothing transport-related is instantiated for
/// kinds that never get selected; only `select` invokes one.
#[derive(Default)]
pub struct TransportParamsMap {
    builders: HashMap<TransportKind, fn() -> TransportParams>,
}

impl TransportParamsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: TransportKind, builder: fn() -> TransportParams) -> Self {
        self.builders.insert(kind, builder);
        self
    }

    /// Build the parameters for `kind`, or fail if this bot variant doesn't support it.
    pub fn select(&self, kind: TransportKind) -> Result<TransportParams> {
        let builder = self
            .builders
            .get(&kind)
            .ok_or_else(|| Error::UnsupportedTransport(kind.to_string()))?;
        Ok(builder())
    }

    /// The kinds this map supports, in no particular order.
    pub fn kinds(&self) -> Vec<TransportKind> {
        self.builders.keys().copied().collect()
    }
}

/// A connected peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub id: Uuid,
}

impl ClientInfo {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered connection-event handler.
///
/// Handlers are invoked in registration order by the transport's own event loop, at
/// most once per connect/disconnect, never concurrently for one connection.
pub type EventHandler = Box<dyn Fn(ClientInfo) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// The connection-medium contract the orchestration code programs against.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The parameters this transport was constructed with.
    fn params(&self) -> &TransportParams;

    /// The pipeline stage that admits client frames into the pipeline.
    fn input(&self) -> Box<dyn Stage>;

    /// The pipeline stage that delivers output frames back to the client.
    fn output(&self) -> Box<dyn Stage>;

    /// Take the stream of frames arriving from the client. Yields `None` after the
    /// first call; one pipeline task owns the stream.
    fn take_incoming(&self) -> Option<mpsc::Receiver<Frame>>;

    /// Register a handler for the client-connected event.
    fn on_client_connected(&self, handler: EventHandler);

    /// Register a handler for the client-disconnected event.
    fn on_client_disconnected(&self, handler: EventHandler);

    /// Ask the client to start streaming camera frames at `framerate_fps`.
    async fn capture_client_camera(&self, client: &ClientInfo, framerate_fps: u32) -> Result<()>;
}
