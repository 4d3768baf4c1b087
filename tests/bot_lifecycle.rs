//! End-to-end lifecycle tests: both bots wired over the loopback transport with the
//! scripted session, driven by simulated connect/disconnect events under a paused
//! clock.

use std::sync::Arc;
use std::time::Duration;

use lanturn::bots;
use lanturn::config::Settings;
use lanturn::frames::Frame;
use lanturn::runner::RunnerArgs;
use lanturn::session::local::{CANNED_GREETING, LocalSession};
use lanturn::task::TaskExit;
use lanturn::transport::TransportKind;
use lanturn::transport::local::LocalTransport;

fn settings() -> Settings {
    Settings::with_api_key("test-key")
}

fn args(idle_timeout_secs: u64) -> RunnerArgs {
    RunnerArgs {
        idle_timeout_secs,
        handle_sigint: false,
    }
}

/// Let spawned tasks make progress without moving the clock.
async fn breathe() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn voice_connect_queues_exactly_one_run_directive() -> anyhow::Result<()> {
    let settings = settings();
    let params = bots::voice::transport_params().select(TransportKind::Webrtc)?;
    let (transport, mut client) = LocalTransport::new(params);
    let session = Arc::new(LocalSession::new(bots::voice::session_config(&settings)));

    let bot = tokio::spawn({
        let session = Arc::clone(&session);
        let args = args(600);
        async move { bots::voice::run_bot(transport, session, &args).await }
    });
    breathe().await;

    client.connect().await?;
    breathe().await;

    assert_eq!(session.runs_seen(), 1);
    assert_eq!(
        client.recv().await,
        Some(Frame::OutputText {
            text: CANNED_GREETING.into(),
            done: true,
        })
    );

    client.disconnect().await?;
    let exit = bot.await??;
    assert_eq!(exit, TaskExit::Cancelled);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn voice_disconnect_cancels_exactly_once_even_when_repeated() -> anyhow::Result<()> {
    let settings = settings();
    let params = bots::voice::transport_params().select(TransportKind::ManagedRoom)?;
    let (transport, client) = LocalTransport::new(params);
    let session = Arc::new(LocalSession::new(bots::voice::session_config(&settings)));

    let bot = tokio::spawn({
        let session = Arc::clone(&session);
        let args = args(600);
        async move { bots::voice::run_bot(transport, session, &args).await }
    });
    breathe().await;

    client.connect().await?;
    breathe().await;

    // A flaky client may report the disconnect more than once; cancellation is
    // idempotent and the task still ends exactly once, as cancelled.
    client.disconnect().await?;
    client.disconnect().await?;

    let exit = bot.await??;
    assert_eq!(exit, TaskExit::Cancelled);
    assert_eq!(session.runs_seen(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn voice_idle_timeout_terminates_without_a_disconnect() -> anyhow::Result<()> {
    let settings = settings();
    let params = bots::voice::transport_params().select(TransportKind::Webrtc)?;
    let (transport, client) = LocalTransport::new(params);
    let session = Arc::new(LocalSession::new(bots::voice::session_config(&settings)));

    let bot = tokio::spawn({
        let session = Arc::clone(&session);
        let args = args(5);
        async move { bots::voice::run_bot(transport, session, &args).await }
    });
    breathe().await;

    client.connect().await?;

    // No disconnect ever arrives; the idle timer is the only terminal condition left.
    let exit = bot.await??;
    assert_eq!(exit, TaskExit::IdleTimeout);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn vision_connect_requests_camera_capture_at_one_fps() -> anyhow::Result<()> {
    let settings = settings();
    let params = bots::vision::transport_params().select(TransportKind::Webrtc)?;
    let (transport, client) = LocalTransport::new(params);
    let session = Arc::new(LocalSession::new(bots::vision::session_config(&settings)));

    let bot = tokio::spawn({
        let session = Arc::clone(&session);
        let settings = settings.clone();
        let args = args(600);
        async move { bots::vision::run_bot(transport, session, &settings, &args).await }
    });
    breathe().await;

    let client = Arc::new(client);
    let connected = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.connect().await }
    });
    connected.await??;
    breathe().await;

    assert_eq!(client.camera_requests(), vec![(client.info().id, 1)]);
    assert_eq!(session.runs_seen(), 1);

    client.disconnect().await?;
    let exit = bot.await??;
    assert_eq!(exit, TaskExit::Cancelled);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn vision_input_stays_paused_for_the_settle_delay() -> anyhow::Result<()> {
    let settings = settings(); // settle delay: 3s default
    let params = bots::vision::transport_params().select(TransportKind::Webrtc)?;
    let (transport, client) = LocalTransport::new(params);
    let session = Arc::new(LocalSession::new(bots::vision::session_config(&settings)));

    assert!(session.is_audio_input_paused());
    assert!(session.is_video_input_paused());

    let bot = tokio::spawn({
        let session = Arc::clone(&session);
        let settings = settings.clone();
        let args = args(600);
        async move { bots::vision::run_bot(transport, session, &settings, &args).await }
    });
    breathe().await;

    let client = Arc::new(client);
    let connected = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.connect().await }
    });
    breathe().await;

    // Two seconds in: still inside the settle delay, still paused.
    tokio::time::advance(Duration::from_secs(2)).await;
    breathe().await;
    assert!(session.is_audio_input_paused());
    assert!(session.is_video_input_paused());
    assert_eq!(session.audio_unpause_count(), 0);

    // Past the three-second settle delay: unpaused, exactly once each.
    tokio::time::advance(Duration::from_millis(1100)).await;
    breathe().await;
    assert!(!session.is_audio_input_paused());
    assert!(!session.is_video_input_paused());
    assert_eq!(session.audio_unpause_count(), 1);
    assert_eq!(session.video_unpause_count(), 1);

    connected.await??;
    client.disconnect().await?;
    let exit = bot.await??;
    assert_eq!(exit, TaskExit::Cancelled);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn voice_conversation_records_both_sides_of_a_turn() -> anyhow::Result<()> {
    let settings = settings();
    let params = bots::voice::transport_params().select(TransportKind::Webrtc)?;
    let (transport, mut client) = LocalTransport::new(params);
    let session = Arc::new(LocalSession::new(bots::voice::session_config(&settings)));

    let bot = tokio::spawn({
        let session = Arc::clone(&session);
        let args = args(600);
        async move { bots::voice::run_bot(transport, session, &args).await }
    });
    breathe().await;

    client.connect().await?;
    breathe().await;
    assert!(client.recv().await.is_some()); // greeting

    client
        .send(Frame::InputText("How do I fix a leaky faucet?".into()))
        .await?;
    breathe().await;

    assert_eq!(
        client.recv().await,
        Some(Frame::OutputText {
            text: "You said: How do I fix a leaky faucet?".into(),
            done: true,
        })
    );

    client.disconnect().await?;
    let exit = bot.await??;
    assert_eq!(exit, TaskExit::Cancelled);
    Ok(())
}
