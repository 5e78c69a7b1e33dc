//! Pending-ICE buffering against real engine peer connections

use flexcall_webrtc::{CallConfig, CallPeerConnectionFactory, PeerCallbacks};
use std::sync::Arc;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::track::track_local::TrackLocal;

fn offline_config() -> CallConfig {
    // No STUN: host candidates are enough in-process and the tests stay
    // network-independent.
    CallConfig {
        ice_servers: Vec::new(),
        include_loopback: true,
        ..Default::default()
    }
}

fn candidate(port: u16) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: format!("candidate:1 1 UDP 2130706431 127.0.0.1 {port} typ host"),
        sdp_mid: Some("0".to_string()),
        sdp_mline_index: Some(0),
        username_fragment: None,
    }
}

/// An offer with media sections, produced by a second real connection
async fn remote_offer(
    factory: &CallPeerConnectionFactory,
) -> webrtc::peer_connection::sdp::session_description::RTCSessionDescription {
    let offerer = factory
        .make_peer_connection(PeerCallbacks::default())
        .await
        .unwrap();
    offerer
        .add_track(factory.make_audio_track() as Arc<dyn TrackLocal + Send + Sync>)
        .await
        .unwrap();
    offerer
        .add_track(factory.make_video_track() as Arc<dyn TrackLocal + Send + Sync>)
        .await
        .unwrap();
    offerer.create_offer().await.unwrap()
}

#[tokio::test]
async fn test_candidates_queue_until_remote_description() {
    let factory = CallPeerConnectionFactory::new(&offline_config()).unwrap();
    let peer = factory
        .make_peer_connection(PeerCallbacks::default())
        .await
        .unwrap();

    let first = peer.add_ice_candidate(candidate(50000)).await.unwrap_err();
    assert!(first.is_postponed());
    let second = peer.add_ice_candidate(candidate(50001)).await.unwrap_err();
    assert!(second.is_postponed());
    assert_eq!(peer.pending_candidates().await, 2);

    let offer = remote_offer(&factory).await;
    peer.set_remote_description(offer).await.unwrap();

    // Both queued candidates were applied and the queue is empty.
    assert_eq!(peer.pending_candidates().await, 0);

    peer.close().await.unwrap();
}

#[tokio::test]
async fn test_candidate_applies_synchronously_with_remote_description() {
    let factory = CallPeerConnectionFactory::new(&offline_config()).unwrap();
    let peer = factory
        .make_peer_connection(PeerCallbacks::default())
        .await
        .unwrap();

    let offer = remote_offer(&factory).await;
    peer.set_remote_description(offer).await.unwrap();
    assert!(peer.has_remote_description().await);

    peer.add_ice_candidate(candidate(50002)).await.unwrap();
    assert_eq!(peer.pending_candidates().await, 0);

    peer.close().await.unwrap();
}

#[tokio::test]
async fn test_local_description_is_null_result_before_negotiation() {
    let factory = CallPeerConnectionFactory::new(&offline_config()).unwrap();
    let peer = factory
        .make_peer_connection(PeerCallbacks::default())
        .await
        .unwrap();

    let err = peer.local_description().await.unwrap_err();
    assert!(matches!(err, flexcall_webrtc::Error::NullResult(_)));

    peer.close().await.unwrap();
}

#[tokio::test]
async fn test_offer_answer_negotiation_between_wrappers() {
    let factory = CallPeerConnectionFactory::new(&offline_config()).unwrap();
    let caller = factory
        .make_peer_connection(PeerCallbacks::default())
        .await
        .unwrap();
    let callee = factory
        .make_peer_connection(PeerCallbacks::default())
        .await
        .unwrap();

    caller
        .add_track(factory.make_audio_track() as Arc<dyn TrackLocal + Send + Sync>)
        .await
        .unwrap();

    let offer = caller.create_offer().await.unwrap();
    caller.set_local_description(offer.clone()).await.unwrap();
    callee.set_remote_description(offer).await.unwrap();

    let answer = callee.create_answer().await.unwrap();
    callee.set_local_description(answer.clone()).await.unwrap();
    caller.set_remote_description(answer).await.unwrap();

    assert!(caller.has_remote_description().await);
    assert!(callee.has_remote_description().await);
    assert!(caller.local_description().await.is_ok());

    caller.close().await.unwrap();
    callee.close().await.unwrap();
}
