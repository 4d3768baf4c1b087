//! The voice + vision Lanturn assistant, for the camera-equipped devices.
//!
//! WebRTC only. On connect it starts camera capture from the client, kicks off the
//! greeting, and holds media input paused for a settle delay before opening the gates;
//! the embedded client's audio path is not reliable in the first moments after the
//! peer connection comes up.

use std::sync::{Arc, Weak};

use tokio::sync::Mutex;
use tracing::info;

use crate::bots::assemble_task;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::frames::Frame;
use crate::lifecycle::{ConnectionLifecycle, ConnectionPhase};
use crate::runner::{PipelineRunner, RunnerArgs};
use crate::session::{LiveSession, LiveSessionConfig, Voice};
use crate::transport::{Transport, TransportKind, TransportParams, TransportParamsMap};
use crate::vad::VadParams;

/// Camera sampling rate requested from the client: the remote model ingests
/// multimodal video at one frame per second, so capturing faster is wasted bandwidth.
pub const CAMERA_FRAMERATE_FPS: u32 = 1;

/// Persona and policy for the vision assistant.
pub const SYSTEM_INSTRUCTION: &str = "\
You are Lanturn, a helpful AI assistant with VISION running on an E.S.P.32 device with \
a camera.

THE GOLDEN RULE: BREVITY AND IMPACT. Your primary directive is to be brief and \
impactful. All responses must be under 50 words. Prioritize the most critical \
information to help the user, usually the first 1-3 action steps. If a topic requires \
more detail, first give the brief overview and offer more only if asked.

CORE DIRECTIVES:
Safety first: for any electrical or dangerous repair query, open with a safety warning \
(e.g. \"First, for safety, make sure you unplug the appliance.\"). If the task is high \
risk, advise consulting a professional.
Structured DIY guidance: give DIY steps as a numbered list, at most 3-4 steps per \
response.
Concise summaries: report search results in one clear sentence.
Maintain flow: avoid closing boilerplate like \"Do you have any more questions?\".
Pronunciation: pronounce numbers naturally (\"two-hundred-fifty\", not \"two five \
zero\").

You can SEE what the camera is showing you through the video stream at one frame per \
second. When the user asks about what you see, describe it clearly and helpfully. You \
can also hear and respond to voice input.

Your output will be converted to audio, so don't include special characters in your \
answers. Respond to what the user said in a creative, helpful, and engaging way, and \
keep responses concise since you're running on a small device.";

/// Directive seeded into the context so the first model turn is a greeting.
pub const GREETING_DIRECTIVE: &str = "Greet the user and introduce yourself as \
Lanturn, an AI with vision running on their camera device.";

/// Transport parameters for the vision bot's single supported kind.
///
/// Video input comes from the client camera; video output stays disabled so the server
/// never has to encode a return video track for the embedded device.
pub fn transport_params() -> TransportParamsMap {
    TransportParamsMap::new().with(TransportKind::Webrtc, || TransportParams {
        audio_in_enabled: true,
        audio_out_enabled: true,
        video_in_enabled: true,
        video_out_enabled: false,
        vad: VadParams::default(),
    })
}

/// Session configuration for the vision bot.
///
/// Media input starts paused; the connect handler unpauses it after the settle delay.
pub fn session_config(settings: &Settings) -> LiveSessionConfig {
    LiveSessionConfig {
        api_key: settings.api_key.clone(),
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        voice: Voice::Puck,
        tools: vec![],
        start_audio_input_paused: true,
        start_video_input_paused: true,
    }
}

/// Run the vision bot over `transport` with `session` until the connection ends.
///
/// `settings.settle_delay` controls how long media input stays paused after connect.
pub async fn run_bot<T, S>(
    transport: Arc<T>,
    session: Arc<S>,
    settings: &Settings,
    args: &RunnerArgs,
) -> Result<crate::task::TaskExit>
where
    T: Transport + 'static,
    S: LiveSession + 'static,
{
    info!("starting Lanturn vision bot");

    let task = assemble_task(transport.as_ref(), Arc::clone(&session), GREETING_DIRECTIVE, args);
    let params = task.params();
    let handle = task.handle();
    let lifecycle = Arc::new(Mutex::new(ConnectionLifecycle::new()));
    let settle_delay = settings.settle_delay;

    transport.on_client_connected({
        let handle = handle.clone();
        let session = Arc::clone(&session);
        let lifecycle = Arc::clone(&lifecycle);
        // The transport owns this handler; hold it weakly to avoid a reference cycle.
        let transport: Weak<T> = Arc::downgrade(&transport);
        Box::new(move |client| {
            let handle = handle.clone();
            let session = Arc::clone(&session);
            let lifecycle = Arc::clone(&lifecycle);
            let transport = transport.clone();
            Box::pin(async move {
                info!(client = %client.id, "client connected");
                {
                    let mut lc = lifecycle.lock().await;
                    lc.advance(ConnectionPhase::Connected)?;
                    lc.advance(ConnectionPhase::Paused)?;
                }

                if let Some(transport) = transport.upgrade() {
                    transport
                        .capture_client_camera(&client, CAMERA_FRAMERATE_FPS)
                        .await?;
                }

                // Kick off the conversation.
                handle.queue_frame(Frame::Run).await?;

                // Give the connection time to stabilize before unpausing.
                tokio::time::sleep(settle_delay).await;

                {
                    let mut lc = lifecycle.lock().await;
                    if lc.phase() == ConnectionPhase::Terminated {
                        // Client went away during the settle delay.
                        return Ok(());
                    }
                    lc.advance(ConnectionPhase::Active)?;
                }

                info!("unpausing audio and video input");
                session.set_audio_input_paused(false);
                session.set_video_input_paused(false);
                Ok(())
            })
        })
    });

    transport.on_client_disconnected({
        let handle = handle.clone();
        let lifecycle = Arc::clone(&lifecycle);
        Box::new(move |client| {
            let handle = handle.clone();
            let lifecycle = Arc::clone(&lifecycle);
            Box::pin(async move {
                info!(client = %client.id, "client disconnected");
                lifecycle.lock().await.terminate();
                handle.cancel();
                Ok(())
            })
        })
    });

    let incoming = transport
        .take_incoming()
        .ok_or_else(|| Error::Transport("transport frame stream already taken".into()))?;

    let runner = PipelineRunner::new(args.handle_sigint);
    let exit = runner.run(task, incoming).await?;
    lifecycle.lock().await.terminate();

    if params.enable_usage_metrics {
        let usage = session.usage();
        info!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "session usage"
        );
    }
    Ok(exit)
}
