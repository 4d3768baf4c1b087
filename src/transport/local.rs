//! An in-memory loopback transport.
//!
//! Frames travel over channels instead of a network medium; connect and disconnect are
//! driven explicitly through a [`LocalClient`] handle. This is the transport behind the
//! `lanturn-bot` dry-run binary and the integration tests: the bots wire against the
//! same [`Transport`] contract a real medium implements, and the client handle plays
//! the role of the device on the far side.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frames::Frame;
use crate::pipeline::Stage;
use crate::transport::{ClientInfo, EventHandler, Transport, TransportParams};

const FRAME_CHANNEL_CAPACITY: usize = 64;

struct Shared {
    params: TransportParams,
    connected_handlers: Mutex<Vec<EventHandler>>,
    disconnected_handlers: Mutex<Vec<EventHandler>>,
    incoming_rx: Mutex<Option<mpsc::Receiver<Frame>>>,
    outbound_tx: mpsc::Sender<Frame>,
    camera_requests: Mutex<Vec<(Uuid, u32)>>,
}

/// The bot-side half of the loopback pair.
pub struct LocalTransport {
    shared: Arc<Shared>,
}

/// The client-side half: simulates the remote device.
pub struct LocalClient {
    info: ClientInfo,
    frames_tx: mpsc::Sender<Frame>,
    outbound_rx: mpsc::Receiver<Frame>,
    shared: Arc<Shared>,
}

impl LocalTransport {
    /// Build a connected pair: the transport for the bot, the client for the test or
    /// dry-run driver.
    pub fn new(params: TransportParams) -> (Arc<Self>, LocalClient) {
        let (frames_tx, frames_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);

        let shared = Arc::new(Shared {
            params,
            connected_handlers: Mutex::new(Vec::new()),
            disconnected_handlers: Mutex::new(Vec::new()),
            incoming_rx: Mutex::new(Some(frames_rx)),
            outbound_tx,
            camera_requests: Mutex::new(Vec::new()),
        });

        let transport = Arc::new(Self {
            shared: Arc::clone(&shared),
        });
        let client = LocalClient {
            info: ClientInfo::new(),
            frames_tx,
            outbound_rx,
            shared,
        };
        (transport, client)
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn params(&self) -> &TransportParams {
        &self.shared.params
    }

    fn input(&self) -> Box<dyn Stage> {
        Box::new(InputStage {
            params: self.shared.params.clone(),
        })
    }

    fn output(&self) -> Box<dyn Stage> {
        Box::new(OutputStage {
            params: self.shared.params.clone(),
            outbound: self.shared.outbound_tx.clone(),
        })
    }

    fn take_incoming(&self) -> Option<mpsc::Receiver<Frame>> {
        self.shared
            .incoming_rx
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
    }

    fn on_client_connected(&self, handler: EventHandler) {
        if let Ok(mut handlers) = self.shared.connected_handlers.lock() {
            handlers.push(handler);
        }
    }

    fn on_client_disconnected(&self, handler: EventHandler) {
        if let Ok(mut handlers) = self.shared.disconnected_handlers.lock() {
            handlers.push(handler);
        }
    }

    async fn capture_client_camera(&self, client: &ClientInfo, framerate_fps: u32) -> Result<()> {
        if !self.shared.params.video_in_enabled {
            return Err(Error::Transport(
                "camera capture requested on a transport without video input".into(),
            ));
        }
        if let Ok(mut requests) = self.shared.camera_requests.lock() {
            requests.push((client.id, framerate_fps));
        }
        Ok(())
    }
}

impl LocalClient {
    pub fn info(&self) -> &ClientInfo {
        &self.info
    }

    /// Fire the connected event: handlers run in registration order, each awaited to
    /// completion before the next.
    pub async fn connect(&self) -> Result<()> {
        fire_handlers(&self.shared.connected_handlers, &self.info).await
    }

    /// Fire the disconnected event.
    pub async fn disconnect(&self) -> Result<()> {
        fire_handlers(&self.shared.disconnected_handlers, &self.info).await
    }

    /// Send a frame from the client into the pipeline.
    pub async fn send(&self, frame: Frame) -> Result<()> {
        self.frames_tx
            .send(frame)
            .await
            .map_err(|_| Error::Transport("pipeline no longer accepting frames".into()))
    }

    /// Receive the next frame delivered to the client, if the pipeline is still alive.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.outbound_rx.recv().await
    }

    /// Camera-capture requests the bot has issued, as `(client id, fps)` pairs.
    pub fn camera_requests(&self) -> Vec<(Uuid, u32)> {
        self.shared
            .camera_requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

/// Invoke handlers without holding the registration lock across awaits.
async fn fire_handlers(
    handlers: &Mutex<Vec<EventHandler>>,
    client: &ClientInfo,
) -> Result<()> {
    let taken = match handlers.lock() {
        Ok(mut guard) => std::mem::take(&mut *guard),
        Err(_) => return Err(Error::msg("event handler registry poisoned")),
    };

    let mut result = Ok(());
    for handler in &taken {
        result = handler(client.clone()).await;
        if result.is_err() {
            break;
        }
    }

    if let Ok(mut guard) = handlers.lock() {
        let mut taken = taken;
        taken.extend(std::mem::take(&mut *guard));
        *guard = taken;
    }
    result
}

/// Stage 1: admit client frames, honoring the media enablement flags.
struct InputStage {
    params: TransportParams,
}

#[async_trait]
impl Stage for InputStage {
    fn name(&self) -> &'static str {
        "transport-input"
    }

    async fn process(&mut self, frame: Frame) -> Result<Vec<Frame>> {
        let admitted = match &frame {
            Frame::InputAudio(_) => self.params.audio_in_enabled,
            Frame::InputImage(_) => self.params.video_in_enabled,
            _ => true,
        };
        Ok(if admitted { vec![frame] } else { vec![] })
    }
}

/// Stage 4: deliver output frames to the client, passing them along for the
/// assistant aggregator behind us.
struct OutputStage {
    params: TransportParams,
    outbound: mpsc::Sender<Frame>,
}

#[async_trait]
impl Stage for OutputStage {
    fn name(&self) -> &'static str {
        "transport-output"
    }

    async fn process(&mut self, frame: Frame) -> Result<Vec<Frame>> {
        let deliver = match &frame {
            Frame::OutputAudio(_) => self.params.audio_out_enabled,
            Frame::OutputText { .. } => true,
            _ => false,
        };
        if deliver && self.outbound.send(frame.clone()).await.is_err() {
            // The client side went away mid-delivery; the disconnect handler will
            // cancel the task, so don't fail the whole pipeline from here.
            warn!("client output channel closed; dropping frame");
        }
        Ok(vec![frame])
    }
}
