//! Engine API construction and peer/track creation

use crate::config::CallConfig;
use crate::peer::connection::{CallPeerConnection, PeerCallbacks};
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Media stream id shared by the local tracks of one call
const LOCAL_STREAM_ID: &str = "flexcall";

/// Builds the engine API once and produces wired peer connections and
/// local media tracks
///
/// The API carries the codec and interceptor configuration; every
/// connection made here shares it, along with the ICE servers from the
/// call config.
pub struct CallPeerConnectionFactory {
    api: API,
    rtc_config: RTCConfiguration,
}

impl CallPeerConnectionFactory {
    pub fn new(config: &CallConfig) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| Error::CallbackFailure(format!("Failed to register codecs: {e}")))?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(|e| Error::CallbackFailure(format!("Failed to register interceptors: {e}")))?;

        let mut setting_engine = SettingEngine::default();
        setting_engine.set_include_loopback_candidate(config.include_loopback);

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .with_setting_engine(setting_engine)
            .build();

        let ice_servers = if config.ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: config.ice_servers.clone(),
                ..Default::default()
            }]
        };
        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        Ok(Self { api, rtc_config })
    }

    /// Create a peer connection wired to the supplied callbacks
    pub async fn make_peer_connection(&self, callbacks: PeerCallbacks) -> Result<CallPeerConnection> {
        let connection = Arc::new(
            self.api
                .new_peer_connection(self.rtc_config.clone())
                .await
                .map_err(|e| Error::CallbackFailure(format!("Failed to create peer connection: {e}")))?,
        );
        info!("Created peer connection");

        let PeerCallbacks {
            on_ice_candidate,
            on_remote_track,
            on_connection_state,
        } = callbacks;

        connection.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            if let Some(candidate) = candidate {
                debug!("[on_ice_candidate] {candidate:?}");
                match candidate.to_json() {
                    Ok(init) => {
                        if let Some(handler) = on_ice_candidate.as_ref() {
                            handler(init);
                        }
                    }
                    Err(e) => warn!("Failed to serialize ICE candidate: {e}"),
                }
            }
            Box::pin(async {})
        }));

        connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            info!("[on_track] kind: {}, id: {}", track.kind(), track.id());
            if let Some(handler) = on_remote_track.as_ref() {
                handler(track);
            }
            Box::pin(async {})
        }));

        let (state_tx, state_rx) = watch::channel(RTCPeerConnectionState::New);
        connection.on_peer_connection_state_change(Box::new(
            move |state: RTCPeerConnectionState| {
                info!("[on_connection_change] {state}");
                let _ = state_tx.send(state);
                if let Some(handler) = on_connection_state.as_ref() {
                    handler(state);
                }
                Box::pin(async {})
            },
        ));

        // Paths this design does not cover fail loudly instead of
        // silently no-opping.
        connection.on_negotiation_needed(Box::new(move || {
            error!("[on_negotiation_needed] renegotiation is not yet supported");
            Box::pin(async {})
        }));
        connection.on_data_channel(Box::new(move |channel| {
            error!(
                "[on_data_channel] data channels are not yet supported (label: {})",
                channel.label()
            );
            Box::pin(async {})
        }));
        // Gathering transitions fire on every call; they stay observable
        // without being treated as a failure.
        connection.on_ice_gathering_state_change(Box::new(move |state: RTCIceGathererState| {
            debug!("[on_ice_gathering_change] {state} (not handled)");
            Box::pin(async {})
        }));

        Ok(CallPeerConnection::new(connection, state_rx))
    }

    /// Create the local video track (VP8)
    pub fn make_video_track(&self) -> Arc<TrackLocalStaticSample> {
        Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
            format!("Video{}", Uuid::new_v4()),
            LOCAL_STREAM_ID.to_owned(),
        ))
    }

    /// Create the local audio track (Opus)
    pub fn make_audio_track(&self) -> Arc<TrackLocalStaticSample> {
        Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            format!("Audio{}", Uuid::new_v4()),
            LOCAL_STREAM_ID.to_owned(),
        ))
    }
}
