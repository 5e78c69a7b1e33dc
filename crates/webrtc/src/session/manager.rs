//! Call session manager
//!
//! One [`CallSessionManager`] exclusively owns one call's peer
//! connection, local media tracks, capturer, and audio routing for the
//! call's lifetime, and drives the signaling exchange from initiation to
//! teardown.

use crate::audio::{AudioDevice, AudioRouter};
use crate::config::CallConfig;
use crate::media::{
    select_camera, select_capture_format, CameraEnumerator, CaptureFormat, VideoCapturer,
};
use crate::peer::{CallPeerConnection, CallPeerConnectionFactory, PeerCallbacks};
use crate::signaling::{IceCandidatePayload, SignalingClient};
use crate::{Error, Result};
use flexcall_core::{CallSessionState, SignalingCommand};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use webrtc::media::Sample;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Track fan-out depth; a call has a handful of tracks at most
const TRACK_CHANNEL_CAPACITY: usize = 8;

#[derive(Debug, Clone)]
struct CallAttempt {
    conversation_id: String,
    call_initiator_id: String,
}

/// State shared with engine callbacks and the command loop
struct SessionShared {
    signaling: Arc<SignalingClient>,
    attempt: RwLock<Option<CallAttempt>>,
    local_track_tx: broadcast::Sender<Arc<TrackLocalStaticSample>>,
    remote_track_tx: broadcast::Sender<Arc<TrackRemote>>,
}

impl SessionShared {
    /// Ship a locally discovered candidate over signaling
    fn forward_local_candidate(
        self: &Arc<Self>,
        init: webrtc::ice_transport::ice_candidate::RTCIceCandidateInit,
    ) {
        let Some(attempt) = self.attempt.read().clone() else {
            debug!("Discarding local candidate: no active call attempt");
            return;
        };
        let payload = match IceCandidatePayload::from_init(&init) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Dropping unshippable candidate: {e}");
                return;
            }
        };
        let signaling = Arc::clone(&self.signaling);
        tokio::spawn(async move {
            signaling
                .send_command(
                    SignalingCommand::Ice,
                    &payload.encode(),
                    &attempt.conversation_id,
                    &attempt.call_initiator_id,
                )
                .await;
        });
    }
}

/// Per-call orchestrator
///
/// Lifecycle: [`open`] acquires audio and camera and registers the local
/// tracks, then either [`start_call`] (initiator) or [`answer_call`]
/// (callee) runs the signaling exchange, and [`disconnect`] tears
/// everything down. The manager is single-call: reuse after disconnect
/// requires a fresh instance, matching the engine connection's own
/// lifecycle.
///
/// [`open`]: CallSessionManager::open
/// [`start_call`]: CallSessionManager::start_call
/// [`answer_call`]: CallSessionManager::answer_call
/// [`disconnect`]: CallSessionManager::disconnect
pub struct CallSessionManager {
    config: CallConfig,
    signaling: Arc<SignalingClient>,
    cameras: Arc<dyn CameraEnumerator>,
    capturer: Arc<dyn VideoCapturer>,
    audio: AudioRouter,
    peer: Arc<CallPeerConnection>,
    shared: Arc<SessionShared>,
    local_video_track: Arc<TrackLocalStaticSample>,
    local_audio_track: Arc<TrackLocalStaticSample>,
    active_camera: Mutex<Option<(String, CaptureFormat)>>,
    opened: AtomicBool,
    command_task: Mutex<Option<JoinHandle<()>>>,
    pump_task: Mutex<Option<JoinHandle<()>>>,
}

impl CallSessionManager {
    pub async fn new(
        config: CallConfig,
        factory: Arc<CallPeerConnectionFactory>,
        signaling: Arc<SignalingClient>,
        cameras: Arc<dyn CameraEnumerator>,
        capturer: Arc<dyn VideoCapturer>,
        audio_device: Arc<dyn AudioDevice>,
    ) -> Result<Self> {
        let (local_track_tx, _) = broadcast::channel(TRACK_CHANNEL_CAPACITY);
        let (remote_track_tx, _) = broadcast::channel(TRACK_CHANNEL_CAPACITY);
        let shared = Arc::new(SessionShared {
            signaling: Arc::clone(&signaling),
            attempt: RwLock::new(None),
            local_track_tx,
            remote_track_tx,
        });

        let callbacks = PeerCallbacks {
            on_ice_candidate: Some(Box::new({
                let shared = Arc::clone(&shared);
                move |init| shared.forward_local_candidate(init)
            })),
            on_remote_track: Some(Box::new({
                let shared = Arc::clone(&shared);
                move |track| {
                    if shared.remote_track_tx.send(track).is_err() {
                        debug!("Remote track arrived before any observer attached");
                    }
                }
            })),
            on_connection_state: None,
        };
        let peer = Arc::new(factory.make_peer_connection(callbacks).await?);

        Ok(Self {
            config,
            signaling,
            cameras,
            capturer,
            audio: AudioRouter::new(audio_device),
            peer,
            shared,
            local_video_track: factory.make_video_track(),
            local_audio_track: factory.make_audio_track(),
            active_camera: Mutex::new(None),
            opened: AtomicBool::new(false),
            command_task: Mutex::new(None),
            pump_task: Mutex::new(None),
        })
    }

    /// Acquire audio and camera, and register the local tracks
    ///
    /// Resolution selection fails hard: a device with none of the
    /// preferred capture widths surfaces [`Error::ResolutionUnavailable`]
    /// to the caller immediately instead of hanging the call attempt.
    pub async fn open(&self) -> Result<()> {
        if self.opened.load(Ordering::SeqCst) {
            debug!("Session already open");
            return Ok(());
        }

        self.audio.cache_audio_state();
        self.audio.set_audio_focus();

        let device = select_camera(self.cameras.as_ref())?;
        let formats = self.cameras.supported_formats(&device);
        let selected = select_capture_format(&formats, &self.config.capture.preferred_widths)?;
        let format = CaptureFormat {
            framerate: self.config.capture.framerate,
            ..selected
        };
        info!(
            "Opening session: camera {device} at {}x{}@{}",
            format.width, format.height, format.framerate
        );
        self.capturer.start(&device, format).await?;
        *self.active_camera.lock() = Some((device, format));

        self.peer
            .add_track(Arc::clone(&self.local_audio_track) as Arc<dyn TrackLocal + Send + Sync>)
            .await?;
        self.peer
            .add_track(Arc::clone(&self.local_video_track) as Arc<dyn TrackLocal + Send + Sync>)
            .await?;

        self.spawn_frame_pump();
        if self
            .shared
            .local_track_tx
            .send(Arc::clone(&self.local_video_track))
            .is_err()
        {
            debug!("Local track published before any observer attached");
        }

        self.opened.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Initiate a call on a conversation
    ///
    /// Publishes `STATE Creating`, then ships the local offer. The
    /// answer, once observed, moves the session to `Active`.
    pub async fn start_call(&self, conversation_id: &str, call_initiator_id: &str) -> Result<()> {
        self.begin_attempt(conversation_id, call_initiator_id).await?;

        self.signaling
            .send_command(
                SignalingCommand::State,
                CallSessionState::Creating.as_str(),
                conversation_id,
                call_initiator_id,
            )
            .await;

        let offer = self.peer.create_offer().await?;
        let offer_sdp = offer.sdp.clone();
        self.peer.set_local_description(offer).await?;
        self.signaling
            .send_command(SignalingCommand::Offer, &offer_sdp, conversation_id, call_initiator_id)
            .await;
        Ok(())
    }

    /// Join a call someone else initiated
    ///
    /// Observes the conversation and answers the offer when it arrives.
    pub async fn answer_call(&self, conversation_id: &str, call_initiator_id: &str) -> Result<()> {
        self.begin_attempt(conversation_id, call_initiator_id).await
    }

    async fn begin_attempt(&self, conversation_id: &str, call_initiator_id: &str) -> Result<()> {
        if !self.opened.load(Ordering::SeqCst) {
            return Err(Error::SessionNotOpen);
        }
        let state = self.signaling.current_state();
        if matches!(
            state,
            CallSessionState::Creating | CallSessionState::Ready | CallSessionState::Active
        ) {
            return Err(Error::CallInProgress(conversation_id.to_string()));
        }

        *self.shared.attempt.write() = Some(CallAttempt {
            conversation_id: conversation_id.to_string(),
            call_initiator_id: call_initiator_id.to_string(),
        });
        self.signaling.observe(conversation_id).await?;
        self.spawn_command_loop();
        Ok(())
    }

    fn spawn_command_loop(&self) {
        let mut commands = self.signaling.commands();
        let peer = Arc::clone(&self.peer);
        let shared = Arc::clone(&self.shared);

        let task = tokio::spawn(async move {
            loop {
                match commands.recv().await {
                    Ok((command, payload)) => {
                        handle_command(command, payload, &peer, &shared).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Command loop lagged, skipped {skipped} commands");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Command loop ended");
        });

        if let Some(previous) = self.command_task.lock().replace(task) {
            previous.abort();
        }
    }

    fn spawn_frame_pump(&self) {
        let mut frames = self.capturer.frames();
        let video_track = Arc::clone(&self.local_video_track);

        let task = tokio::spawn(async move {
            loop {
                match frames.recv().await {
                    Ok(frame) => {
                        let sample = Sample {
                            data: frame.data,
                            duration: frame.duration,
                            ..Default::default()
                        };
                        if let Err(e) = video_track.write_sample(&sample).await {
                            debug!("Dropping captured frame: {e}");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Frame pump lagged, skipped {skipped} frames");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Frame pump ended");
        });

        if let Some(previous) = self.pump_task.lock().replace(task) {
            previous.abort();
        }
    }

    /// Switch capture to the next enumerated camera
    ///
    /// The local track keeps its identity; the capturer just feeds it
    /// from a different device, so no renegotiation is required.
    pub async fn flip_camera(&self) -> Result<()> {
        let (current_device, _) = self
            .active_camera
            .lock()
            .clone()
            .ok_or(Error::SessionNotOpen)?;

        let names = self.cameras.device_names();
        if names.len() < 2 {
            debug!("No other camera to flip to");
            return Ok(());
        }
        let position = names
            .iter()
            .position(|name| *name == current_device)
            .unwrap_or(0);
        let next = names[(position + 1) % names.len()].clone();

        let formats = self.cameras.supported_formats(&next);
        let selected = select_capture_format(&formats, &self.config.capture.preferred_widths)?;
        let format = CaptureFormat {
            framerate: self.config.capture.framerate,
            ..selected
        };

        info!("Flipping camera: {current_device} -> {next}");
        self.capturer.stop().await?;
        self.capturer.start(&next, format).await?;
        *self.active_camera.lock() = Some((next, format));
        Ok(())
    }

    /// Mute or unmute the microphone at the device level
    pub fn enable_microphone(&self, enabled: bool) {
        self.audio.mute(!enabled);
    }

    /// Stop or resume local video capture
    pub async fn enable_camera(&self, enabled: bool) -> Result<()> {
        if enabled {
            let (device, format) = self
                .active_camera
                .lock()
                .clone()
                .ok_or(Error::SessionNotOpen)?;
            self.capturer.start(&device, format).await
        } else {
            self.capturer.stop().await
        }
    }

    /// Tear the call down
    ///
    /// Safe to call in any state and after any failure: capture stops,
    /// the engine connection is closed explicitly (its lifecycle is not
    /// tied to task cancellation), the cached audio state is restored,
    /// and the signaling channel resets to Offline and deletes the
    /// shared record.
    pub async fn disconnect(&self) {
        info!("Disconnecting call session");
        if let Some(task) = self.command_task.lock().take() {
            task.abort();
        }
        if let Some(task) = self.pump_task.lock().take() {
            task.abort();
        }
        if let Err(e) = self.capturer.stop().await {
            warn!("Error stopping capture: {e}");
        }
        if let Err(e) = self.peer.close().await {
            warn!("Error closing peer connection: {e}");
        }
        self.audio.restore_audio_state();
        self.signaling.dispose();
        *self.shared.attempt.write() = None;
        self.opened.store(false, Ordering::SeqCst);
    }

    /// Local video track stream (no replay for late subscribers)
    pub fn local_tracks(&self) -> broadcast::Receiver<Arc<TrackLocalStaticSample>> {
        self.shared.local_track_tx.subscribe()
    }

    /// Remote track stream (no replay for late subscribers)
    pub fn remote_tracks(&self) -> broadcast::Receiver<Arc<TrackRemote>> {
        self.shared.remote_track_tx.subscribe()
    }

    /// The local video track; hosts with their own capture pipeline can
    /// write samples to it directly
    pub fn local_video_track(&self) -> &Arc<TrackLocalStaticSample> {
        &self.local_video_track
    }

    /// The local audio track; microphone samples are written here by the
    /// host's audio pipeline
    pub fn local_audio_track(&self) -> &Arc<TrackLocalStaticSample> {
        &self.local_audio_track
    }

    /// Session-state stream from the signaling channel
    pub fn session_state(&self) -> watch::Receiver<CallSessionState> {
        self.signaling.session_state()
    }

    /// Engine connection-state stream
    pub fn connection_state(&self) -> watch::Receiver<RTCPeerConnectionState> {
        self.peer.connection_state()
    }

    /// The signaling client driving this session
    pub fn signaling(&self) -> &Arc<SignalingClient> {
        &self.signaling
    }

    /// The peer connection wrapper owned by this session
    pub fn peer(&self) -> &Arc<CallPeerConnection> {
        &self.peer
    }

    /// Audio routing controls
    pub fn audio(&self) -> &AudioRouter {
        &self.audio
    }
}

async fn handle_command(
    command: SignalingCommand,
    payload: String,
    peer: &Arc<CallPeerConnection>,
    shared: &Arc<SessionShared>,
) {
    let Some(attempt) = shared.attempt.read().clone() else {
        warn!("Ignoring {command}: no active call attempt");
        return;
    };

    match command {
        SignalingCommand::Offer => {
            if peer.has_remote_description().await {
                warn!("Offer received while already in a call; replying Impossible");
                shared
                    .signaling
                    .send_command(
                        SignalingCommand::State,
                        CallSessionState::Impossible.as_str(),
                        &attempt.conversation_id,
                        &attempt.call_initiator_id,
                    )
                    .await;
                return;
            }
            let offer = match RTCSessionDescription::offer(payload) {
                Ok(offer) => offer,
                Err(e) => {
                    error!("Discarding malformed offer: {e}");
                    return;
                }
            };
            if let Err(e) = peer.set_remote_description(offer).await {
                error!("Failed to apply remote offer: {e}");
                return;
            }
            let answer = match peer.create_answer().await {
                Ok(answer) => answer,
                Err(e) => {
                    error!("Failed to create answer: {e}");
                    return;
                }
            };
            let answer_sdp = answer.sdp.clone();
            if let Err(e) = peer.set_local_description(answer).await {
                error!("Failed to apply local answer: {e}");
                return;
            }
            shared
                .signaling
                .send_command(
                    SignalingCommand::Answer,
                    &answer_sdp,
                    &attempt.conversation_id,
                    &attempt.call_initiator_id,
                )
                .await;
            shared
                .signaling
                .send_command(
                    SignalingCommand::State,
                    CallSessionState::Ready.as_str(),
                    &attempt.conversation_id,
                    &attempt.call_initiator_id,
                )
                .await;
        }
        SignalingCommand::Answer => {
            let answer = match RTCSessionDescription::answer(payload) {
                Ok(answer) => answer,
                Err(e) => {
                    error!("Discarding malformed answer: {e}");
                    return;
                }
            };
            if let Err(e) = peer.set_remote_description(answer).await {
                error!("Failed to apply remote answer: {e}");
                return;
            }
            shared
                .signaling
                .send_command(
                    SignalingCommand::State,
                    CallSessionState::Active.as_str(),
                    &attempt.conversation_id,
                    &attempt.call_initiator_id,
                )
                .await;
        }
        SignalingCommand::Ice => match IceCandidatePayload::parse(&payload) {
            Ok(candidate) => match peer.add_ice_candidate(candidate.into_init()).await {
                Ok(()) => {}
                Err(e) if e.is_postponed() => {
                    debug!("Remote candidate postponed until the remote description lands")
                }
                Err(e) => warn!("Failed to add remote candidate: {e}"),
            },
            Err(e) => warn!("Discarding malformed ICE payload: {e}"),
        },
        // STATE envelopes are routed to the state stream by the
        // signaling client, never to the command stream.
        SignalingCommand::State => debug!("Unexpected STATE on the command stream"),
    }
}
