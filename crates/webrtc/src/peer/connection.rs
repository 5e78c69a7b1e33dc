//! Wrapper around one engine peer connection

use crate::peer::pending::PendingQueue;
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Callback invoked when the engine discovers a local ICE candidate
pub type IceCandidateHandler = Box<dyn Fn(RTCIceCandidateInit) + Send + Sync>;
/// Callback invoked when a remote media track is added
pub type RemoteTrackHandler = Box<dyn Fn(Arc<TrackRemote>) + Send + Sync>;
/// Callback invoked on engine connection-state changes
pub type ConnectionStateHandler = Box<dyn Fn(RTCPeerConnectionState) + Send + Sync>;

/// Observer callbacks supplied at construction time
///
/// Only the paths this design supports are forwarded; everything else
/// the engine can report is registered to fail loudly in the factory.
#[derive(Default)]
pub struct PeerCallbacks {
    pub on_ice_candidate: Option<IceCandidateHandler>,
    pub on_remote_track: Option<RemoteTrackHandler>,
    pub on_connection_state: Option<ConnectionStateHandler>,
}

/// One call's peer connection
///
/// Owns the pending-ICE queue: candidates arriving before a remote
/// description are buffered and applied, in arrival order, the moment
/// `set_remote_description` succeeds.
pub struct CallPeerConnection {
    connection: Arc<RTCPeerConnection>,
    pending_ice: PendingQueue<RTCIceCandidateInit>,
    connection_state: watch::Receiver<RTCPeerConnectionState>,
}

impl CallPeerConnection {
    pub(crate) fn new(
        connection: Arc<RTCPeerConnection>,
        connection_state: watch::Receiver<RTCPeerConnectionState>,
    ) -> Self {
        Self {
            connection,
            pending_ice: PendingQueue::new(),
            connection_state,
        }
    }

    /// The wrapped engine connection
    pub fn connection(&self) -> &Arc<RTCPeerConnection> {
        &self.connection
    }

    /// Watch-style stream of the engine connection state
    pub fn connection_state(&self) -> watch::Receiver<RTCPeerConnectionState> {
        self.connection_state.clone()
    }

    /// Create an SDP offer
    pub async fn create_offer(&self) -> Result<RTCSessionDescription> {
        debug!("[create_offer]");
        self.connection
            .create_offer(None)
            .await
            .map_err(|e| Error::CallbackFailure(format!("Failed to create offer: {e}")))
    }

    /// Create an SDP answer for a received offer
    pub async fn create_answer(&self) -> Result<RTCSessionDescription> {
        debug!("[create_answer]");
        self.connection
            .create_answer(None)
            .await
            .map_err(|e| Error::CallbackFailure(format!("Failed to create answer: {e}")))
    }

    /// Apply the local description, normalizing codec casing first
    pub async fn set_local_description(&self, description: RTCSessionDescription) -> Result<()> {
        debug!("[set_local_description] type: {}", description.sdp_type);
        let description = normalize_description(description)?;
        self.connection
            .set_local_description(description)
            .await
            .map_err(|e| Error::CallbackFailure(format!("Failed to set local description: {e}")))
    }

    /// Apply the remote description, then flush the pending-ICE queue
    ///
    /// The flush runs under the same mutex the queue is filled under, so
    /// every candidate buffered before this point is applied exactly
    /// once, in arrival order, and the queue ends empty. A candidate the
    /// engine rejects is logged and skipped; it does not abort the flush.
    pub async fn set_remote_description(&self, description: RTCSessionDescription) -> Result<()> {
        debug!("[set_remote_description] type: {}", description.sdp_type);
        let description = normalize_description(description)?;
        self.connection
            .set_remote_description(description)
            .await
            .map_err(|e| Error::CallbackFailure(format!("Failed to set remote description: {e}")))?;

        let mut queue = self.pending_ice.lock().await;
        for candidate in queue.drain(..) {
            info!("[set_remote_description] applying pending candidate: {}", candidate.candidate);
            if let Err(e) = self.connection.add_ice_candidate(candidate).await {
                warn!("Failed to apply pending ICE candidate: {e}");
            }
        }
        Ok(())
    }

    /// Apply a remote ICE candidate, or buffer it
    ///
    /// Without a remote description the candidate is queued and this
    /// returns [`Error::PostponedCandidate`] — expected and non-fatal;
    /// the queue flush on `set_remote_description` retries it, not the
    /// caller.
    pub async fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()> {
        if self.connection.remote_description().await.is_none() {
            warn!("[add_ice_candidate] postponed (no remote description): {}", candidate.candidate);
            self.pending_ice.push(candidate).await;
            return Err(Error::PostponedCandidate);
        }
        debug!("[add_ice_candidate] {}", candidate.candidate);
        self.connection
            .add_ice_candidate(candidate)
            .await
            .map_err(|e| Error::CallbackFailure(format!("Failed to add ICE candidate: {e}")))
    }

    /// Whether a remote description has been applied
    pub async fn has_remote_description(&self) -> bool {
        self.connection.remote_description().await.is_some()
    }

    /// The current local description
    pub async fn local_description(&self) -> Result<RTCSessionDescription> {
        self.connection
            .local_description()
            .await
            .ok_or_else(|| Error::NullResult("local description is not set".to_string()))
    }

    /// Candidates currently waiting on a remote description
    pub async fn pending_candidates(&self) -> usize {
        self.pending_ice.len().await
    }

    /// Add a local media track
    pub async fn add_track(
        &self,
        track: Arc<dyn TrackLocal + Send + Sync>,
    ) -> Result<Arc<RTCRtpSender>> {
        self.connection
            .add_track(track)
            .await
            .map_err(|e| Error::CallbackFailure(format!("Failed to add track: {e}")))
    }

    /// Close the engine connection
    ///
    /// The engine has its own lifecycle: cancelling the call's tasks is
    /// not enough, the connection must be closed explicitly.
    pub async fn close(&self) -> Result<()> {
        self.connection
            .close()
            .await
            .map_err(|e| Error::CallbackFailure(format!("Failed to close peer connection: {e}")))
    }
}

/// Normalize codec casing in an SDP string
///
/// Some peers advertise lowercase codec names while others match them
/// case-sensitively; uppercasing on both set paths keeps negotiation
/// symmetric. Idempotent.
pub fn munge_codecs(sdp: &str) -> String {
    sdp.replace("vp9", "VP9").replace("vp8", "VP8").replace("h264", "H264")
}

fn normalize_description(description: RTCSessionDescription) -> Result<RTCSessionDescription> {
    let sdp = munge_codecs(&description.sdp);
    let rebuilt = match description.sdp_type {
        RTCSdpType::Offer => RTCSessionDescription::offer(sdp),
        RTCSdpType::Answer => RTCSessionDescription::answer(sdp),
        RTCSdpType::Pranswer => RTCSessionDescription::pranswer(sdp),
        other => {
            return Err(Error::CallbackFailure(format!(
                "Unsupported session description type: {other}"
            )))
        }
    };
    rebuilt.map_err(|e| Error::CallbackFailure(format!("Invalid session description: {e}")))
}
