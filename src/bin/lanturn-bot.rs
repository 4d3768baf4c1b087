//! Local dry-run harness for the Lanturn bots.
//!
//! Wires the chosen bot variant over the in-memory loopback transport with the
//! scripted session, simulates a short client visit (connect, one utterance,
//! disconnect), and reports how the pipeline task ended. Useful for checking
//! configuration, transport parameters, and pipeline wiring without a device or an
//! API quota.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use lanturn::bots::{self, BotVariant};
use lanturn::config::Settings;
use lanturn::frames::Frame;
use lanturn::runner::RunnerArgs;
use lanturn::session::local::LocalSession;
use lanturn::task::TaskExit;
use lanturn::transport::local::{LocalClient, LocalTransport};
use lanturn::transport::TransportKind;

#[derive(Parser, Debug)]
#[command(name = "lanturn-bot")]
#[command(about = "Dry-run a Lanturn bot over a loopback transport")]
struct Params {
    /// Which bot variant to run.
    #[arg(short = 'b', long = "bot", value_enum, default_value_t = BotVariant::Voice)]
    bot: BotVariant,

    /// Transport kind to select parameters for.
    #[arg(short = 't', long = "transport", value_enum, default_value_t = TransportKind::Webrtc)]
    transport: TransportKind,

    /// Idle timeout override (seconds).
    #[arg(long = "idle-timeout-secs")]
    idle_timeout_secs: Option<u64>,

    /// Settle delay override for the vision bot (seconds).
    #[arg(long = "settle-secs")]
    settle_secs: Option<u64>,

    /// Don't intercept SIGINT for graceful shutdown.
    #[arg(long = "no-sigint", default_value_t = false)]
    no_sigint: bool,
}

#[tokio::main]
async fn main() {
    lanturn::logging::init();

    if let Err(err) = run().await {
        error!(error = ?err, "lanturn-bot failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let params = Params::parse();

    // Credential check happens here, before any transport exists.
    let mut settings = Settings::from_env()?;
    if let Some(secs) = params.settle_secs {
        settings.settle_delay = Duration::from_secs(secs);
    }

    let args = RunnerArgs {
        idle_timeout_secs: params
            .idle_timeout_secs
            .unwrap_or(settings.idle_timeout.as_secs()),
        handle_sigint: !params.no_sigint,
    };

    let exit = match params.bot {
        BotVariant::Voice => {
            let transport_params = bots::voice::transport_params().select(params.transport)?;
            let (transport, client) = LocalTransport::new(transport_params);
            let session = Arc::new(LocalSession::new(bots::voice::session_config(&settings)));
            let visit = tokio::spawn(simulate_visit(client, settings.settle_delay));
            let exit = bots::voice::run_bot(transport, Arc::clone(&session), &args).await?;
            visit.await??;
            exit
        }
        BotVariant::Vision => {
            let transport_params = bots::vision::transport_params().select(params.transport)?;
            let (transport, client) = LocalTransport::new(transport_params);
            let session = Arc::new(LocalSession::new(bots::vision::session_config(&settings)));
            let visit = tokio::spawn(simulate_visit(client, settings.settle_delay));
            let exit = bots::vision::run_bot(transport, Arc::clone(&session), &settings, &args).await?;
            visit.await??;
            exit
        }
    };

    info!(exit = ?exit, "dry run complete");
    if exit != TaskExit::Cancelled {
        info!("expected a disconnect-driven cancellation; check the wiring above");
    }
    Ok(())
}

/// Play the part of the device: connect, say one thing, listen briefly, hang up.
async fn simulate_visit(mut client: LocalClient, settle_delay: Duration) -> Result<()> {
    // Give run_bot a beat to register its event handlers before the client shows up.
    tokio::time::sleep(Duration::from_millis(200)).await;
    client.connect().await?;

    client
        .send(Frame::InputText("What's the weather like?".into()))
        .await?;

    // Drain whatever the bot says until it goes quiet for a moment.
    let quiet = settle_delay + Duration::from_secs(1);
    while let Ok(Some(frame)) = tokio::time::timeout(quiet, client.recv()).await {
        if let Frame::OutputText { text, .. } = frame {
            info!(%text, "bot said");
        }
    }

    let camera_requests = client.camera_requests();
    if !camera_requests.is_empty() {
        info!(?camera_requests, "camera capture was requested");
    }

    client.disconnect().await?;
    Ok(())
}
