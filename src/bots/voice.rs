//! The audio-only Lanturn assistant.
//!
//! Supports all three transport kinds. Declares the web-search capability so the model
//! can answer questions about weather, local businesses, and current repair guidance.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::bots::assemble_task;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::frames::Frame;
use crate::lifecycle::{ConnectionLifecycle, ConnectionPhase};
use crate::runner::{PipelineRunner, RunnerArgs};
use crate::session::{LiveSession, LiveSessionConfig, Voice};
use crate::tools::ToolDeclaration;
use crate::transport::{Transport, TransportKind, TransportParams, TransportParamsMap};
use crate::vad::VadParams;

/// Persona and policy for the voice assistant. Supplied once at session creation.
pub const SYSTEM_INSTRUCTION: &str = "\
You are Lanturn, a helpful AI assistant running on an E.S.P.32 device.

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
Tool usage: use web search for information you don't know, including current weather, \
local business information, and up-to-date repair guides or part recommendations.
Concise summaries: report search results in one clear sentence.
Maintain flow: avoid closing boilerplate like \"Do you have any more questions?\".
Pronunciation: pronounce numbers naturally (\"two-hundred-fifty\", not \"two five \
zero\").

Your output will be converted to audio, so don't include special characters in your \
answers. Respond to what the user said in a creative, helpful, and engaging way, and \
keep responses concise since you're running on a small device.";

/// Directive seeded into the context so the first model turn is a greeting.
pub const GREETING_DIRECTIVE: &str = "Start by greeting the user warmly, introducing \
yourself. Be friendly and engaging to set a positive tone for the interaction.";

/// Transport parameters for every kind the voice bot supports.
///
/// All three media carry audio both ways; the VAD threshold stays at its default so
/// transport-side endpointing lines up with the model's own.
pub fn transport_params() -> TransportParamsMap {
    fn audio_only() -> TransportParams {
        TransportParams {
            audio_in_enabled: true,
            audio_out_enabled: true,
            video_in_enabled: false,
            video_out_enabled: false,
            vad: VadParams::default(),
        }
    }

    TransportParamsMap::new()
        .with(TransportKind::Webrtc, audio_only)
        .with(TransportKind::ManagedRoom, audio_only)
        .with(TransportKind::TelephonyWebsocket, audio_only)
}

/// Session configuration for the voice bot.
pub fn session_config(settings: &Settings) -> LiveSessionConfig {
    LiveSessionConfig {
        api_key: settings.api_key.clone(),
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        voice: Voice::Charon,
        tools: vec![ToolDeclaration::web_search()],
        start_audio_input_paused: false,
        start_video_input_paused: false,
    }
}

/// Run the voice bot over `transport` with `session` until the connection ends.
///
/// This is the stable async entry point a hosting environment calls with its own
/// transport and session client; the dry-run binary calls it with the loopback pair.
pub async fn run_bot<T, S>(
    transport: Arc<T>,
    session: Arc<S>,
    args: &RunnerArgs,
) -> Result<crate::task::TaskExit>
where
    T: Transport + 'static,
    S: LiveSession + 'static,
{
    info!("starting Lanturn voice bot");

    let task = assemble_task(transport.as_ref(), Arc::clone(&session), GREETING_DIRECTIVE, args);
    let params = task.params();
    let handle = task.handle();
    let lifecycle = Arc::new(Mutex::new(ConnectionLifecycle::new()));

    transport.on_client_connected({
        let handle = handle.clone();
        let lifecycle = Arc::clone(&lifecycle);
        Box::new(move |client| {
            let handle = handle.clone();
            let lifecycle = Arc::clone(&lifecycle);
            Box::pin(async move {
                info!(client = %client.id, "client connected");
                {
                    let mut lc = lifecycle.lock().await;
                    lc.advance(ConnectionPhase::Connected)?;
                    lc.advance(ConnectionPhase::Active)?;
                }
                // Kick off the conversation.
                handle.queue_frame(Frame::Run).await
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
