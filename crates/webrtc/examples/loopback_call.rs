//! Two call participants in one process
//!
//! Runs a complete call over an in-memory signaling store: offer/answer
//! exchange, ICE over loopback host candidates, synthetic video frames,
//! then teardown.
//!
//! ```bash
//! RUST_LOG=flexcall_webrtc=debug cargo run -p flexcall-webrtc --example loopback_call
//! ```

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
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

const CONVERSATION: &str = "conv-demo";

async fn participant(
    store: &Arc<MemorySignalingStore>,
    peer_id: &str,
) -> anyhow::Result<CallSessionManager> {
    let config = CallConfig {
        ice_servers: Vec::new(),
        include_loopback: true,
        ..Default::default()
    };
    let factory = Arc::new(CallPeerConnectionFactory::new(&config)?);
    let signaling = Arc::new(SignalingClient::new(
        Arc::clone(store) as Arc<dyn SignalingStore>,
        peer_id,
    ));
    let cameras = StaticCameraEnumerator::new(vec![CameraDevice {
        name: format!("{peer_id}-front"),
        front_facing: true,
        formats: vec![CaptureFormat { width: 480, height: 360, framerate: 30 }],
    }]);
    Ok(CallSessionManager::new(
        config,
        factory,
        signaling,
        Arc::new(cameras),
        Arc::new(SyntheticCapturer::new()),
        Arc::new(SoftwareAudioDevice::new()),
    )
    .await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = Arc::new(MemorySignalingStore::new());
    let alice = participant(&store, "alice").await?;
    let bob = participant(&store, "bob").await?;

    alice.open().await?;
    bob.open().await?;

    bob.answer_call(CONVERSATION, "alice").await?;
    alice.start_call(CONVERSATION, "alice").await?;

    let mut state = alice.session_state();
    timeout(
        Duration::from_secs(20),
        state.wait_for(|state| *state == CallSessionState::Active),
    )
    .await??;
    info!("Session is Active");

    let mut connection = bob.connection_state();
    timeout(
        Duration::from_secs(30),
        connection.wait_for(|state| *state == RTCPeerConnectionState::Connected),
    )
    .await??;
    info!("Peers connected; letting media flow briefly");

    let mut remote_tracks = bob.remote_tracks();
    if let Ok(Ok(track)) = timeout(Duration::from_secs(10), remote_tracks.recv()).await {
        info!("Bob received remote track: kind={}, id={}", track.kind(), track.id());
    }

    tokio::time::sleep(Duration::from_secs(2)).await;

    alice.disconnect().await;
    bob.disconnect().await;
    info!(
        "Call ended; alice state: {}, bob state: {}",
        alice.signaling().current_state(),
        bob.signaling().current_state()
    );
    Ok(())
}
