//! End-to-end call between two session managers in one process
//!
//! Both participants share one in-memory signaling store; media runs
//! over real engine connections on loopback host candidates.

use flexcall_webrtc::audio::SoftwareAudioDevice;
use flexcall_webrtc::media::{
    CameraDevice, CaptureFormat, StaticCameraEnumerator, SyntheticCapturer,
};
use flexcall_webrtc::{
    CallConfig, CallPeerConnectionFactory, CallSessionManager, CallSessionState,
    MemorySignalingStore, SignalingClient, SignalingStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

const CONVERSATION: &str = "conv-loopback";

fn test_config() -> CallConfig {
    CallConfig {
        ice_servers: Vec::new(),
        include_loopback: true,
        ..Default::default()
    }
}

fn front_camera() -> StaticCameraEnumerator {
    StaticCameraEnumerator::new(vec![CameraDevice {
        name: "front".to_string(),
        front_facing: true,
        formats: vec![CaptureFormat { width: 480, height: 360, framerate: 30 }],
    }])
}

async fn participant(
    store: &Arc<MemorySignalingStore>,
    peer_id: &str,
) -> anyhow::Result<CallSessionManager> {
    let config = test_config();
    let factory = Arc::new(CallPeerConnectionFactory::new(&config)?);
    let signaling = Arc::new(SignalingClient::new(
        Arc::clone(store) as Arc<dyn SignalingStore>,
        peer_id,
    ));
    Ok(CallSessionManager::new(
        config,
        factory,
        signaling,
        Arc::new(front_camera()),
        Arc::new(SyntheticCapturer::new()),
        Arc::new(SoftwareAudioDevice::new()),
    )
    .await?)
}

#[tokio::test]
async fn test_call_reaches_active_and_connects() -> anyhow::Result<()> {
    let store = Arc::new(MemorySignalingStore::new());
    let alice = participant(&store, "alice").await?;
    let bob = participant(&store, "bob").await?;

    alice.open().await?;
    bob.open().await?;

    // The callee observes first; there is no replay on the log.
    bob.answer_call(CONVERSATION, "alice").await?;
    alice.start_call(CONVERSATION, "alice").await?;

    let mut alice_state = alice.session_state();
    let mut bob_state = bob.session_state();
    timeout(
        Duration::from_secs(20),
        alice_state.wait_for(|state| *state == CallSessionState::Active),
    )
    .await
    .expect("alice reaches Active")?;
    timeout(
        Duration::from_secs(20),
        bob_state.wait_for(|state| *state == CallSessionState::Active),
    )
    .await
    .expect("bob reaches Active")?;

    let mut alice_connection = alice.connection_state();
    let mut bob_connection = bob.connection_state();
    timeout(
        Duration::from_secs(30),
        alice_connection.wait_for(|state| *state == RTCPeerConnectionState::Connected),
    )
    .await
    .expect("alice connects")?;
    timeout(
        Duration::from_secs(30),
        bob_connection.wait_for(|state| *state == RTCPeerConnectionState::Connected),
    )
    .await
    .expect("bob connects")?;

    alice.disconnect().await;
    bob.disconnect().await;
    assert_eq!(alice.signaling().current_state(), CallSessionState::Offline);
    assert_eq!(bob.signaling().current_state(), CallSessionState::Offline);

    timeout(Duration::from_secs(2), async {
        loop {
            if store.is_empty(CONVERSATION).await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("ongoing-call record deleted after disconnect");
    Ok(())
}

#[tokio::test]
async fn test_start_call_requires_open_session() -> anyhow::Result<()> {
    let store = Arc::new(MemorySignalingStore::new());
    let alice = participant(&store, "alice").await?;

    let err = alice.start_call(CONVERSATION, "alice").await.unwrap_err();
    assert!(matches!(err, flexcall_webrtc::Error::SessionNotOpen));
    Ok(())
}

#[tokio::test]
async fn test_open_fails_hard_without_matching_resolution() -> anyhow::Result<()> {
    let store = Arc::new(MemorySignalingStore::new());
    let config = test_config();
    let factory = Arc::new(CallPeerConnectionFactory::new(&config)?);
    let signaling = Arc::new(SignalingClient::new(
        Arc::clone(&store) as Arc<dyn SignalingStore>,
        "alice",
    ));
    let low_res_camera = StaticCameraEnumerator::new(vec![CameraDevice {
        name: "front".to_string(),
        front_facing: true,
        formats: vec![
            CaptureFormat { width: 160, height: 120, framerate: 30 },
            CaptureFormat { width: 240, height: 160, framerate: 30 },
        ],
    }]);
    let manager = CallSessionManager::new(
        config,
        factory,
        signaling,
        Arc::new(low_res_camera),
        Arc::new(SyntheticCapturer::new()),
        Arc::new(SoftwareAudioDevice::new()),
    )
    .await?;

    let err = manager.open().await.unwrap_err();
    match err {
        flexcall_webrtc::Error::ResolutionUnavailable { supported } => {
            assert_eq!(supported, vec![160, 240]);
        }
        other => panic!("expected ResolutionUnavailable, got {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_second_call_attempt_is_rejected() -> anyhow::Result<()> {
    let store = Arc::new(MemorySignalingStore::new());
    let alice = participant(&store, "alice").await?;
    alice.open().await?;
    alice.start_call(CONVERSATION, "alice").await?;

    let err = alice.start_call("conv-other", "alice").await.unwrap_err();
    assert!(matches!(err, flexcall_webrtc::Error::CallInProgress(_)));

    alice.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_flip_camera_requires_open_session() -> anyhow::Result<()> {
    let store = Arc::new(MemorySignalingStore::new());
    let alice = participant(&store, "alice").await?;

    let err = alice.flip_camera().await.unwrap_err();
    assert!(matches!(err, flexcall_webrtc::Error::SessionNotOpen));
    Ok(())
}
