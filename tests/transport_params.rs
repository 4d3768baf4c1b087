use lanturn::bots;
use lanturn::error::Error;
use lanturn::transport::TransportKind;

#[test]
fn voice_bot_enables_audio_both_ways_on_every_kind() -> anyhow::Result<()> {
    let map = bots::voice::transport_params();

    let mut kinds = map.kinds();
    kinds.sort_by_key(|k| k.as_str());
    assert_eq!(kinds, vec![
        TransportKind::ManagedRoom,
        TransportKind::TelephonyWebsocket,
        TransportKind::Webrtc,
    ]);

    for kind in kinds {
        let params = map.select(kind)?;
        assert!(params.audio_in_enabled, "{kind}: audio in");
        assert!(params.audio_out_enabled, "{kind}: audio out");
        assert!(!params.video_in_enabled, "{kind}: no video in");
        assert!(!params.video_out_enabled, "{kind}: no video out");
        assert_eq!(params.vad.stop_secs, 0.5, "{kind}: vad threshold");
    }
    Ok(())
}

#[test]
fn vision_bot_supports_webrtc_with_camera_input_only() -> anyhow::Result<()> {
    let map = bots::vision::transport_params();
    assert_eq!(map.kinds(), vec![TransportKind::Webrtc]);

    let params = map.select(TransportKind::Webrtc)?;
    assert!(params.audio_in_enabled);
    assert!(params.audio_out_enabled);
    assert!(params.video_in_enabled);
    assert!(!params.video_out_enabled);
    assert_eq!(params.vad.stop_secs, 0.5);
    Ok(())
}

#[test]
fn vision_bot_rejects_other_transport_kinds() {
    let map = bots::vision::transport_params();
    for kind in [TransportKind::ManagedRoom, TransportKind::TelephonyWebsocket] {
        assert!(matches!(
            map.select(kind),
            Err(Error::UnsupportedTransport(_))
        ));
    }
}
