//! FlexCall WebRTC call orchestration
//!
//! A thin orchestration layer over the `webrtc` engine crate: SDP
//! offer/answer negotiation, ICE candidate buffering, signaling over a
//! shared per-conversation record, camera capture selection, and audio
//! routing around a call. The engine owns everything below the SDP —
//! media transport, encryption, NAT traversal.
//!
//! ## Layout
//!
//! - [`peer`] — peer-connection wrapper and factory
//! - [`signaling`] — signaling client over a [`flexcall_core::SignalingStore`]
//! - [`session`] — the per-call orchestrator
//! - [`media`] — camera enumeration and capture boundaries
//! - [`audio`] — audio focus and routing

pub mod audio;
pub mod config;
pub mod error;
pub mod media;
pub mod peer;
pub mod session;
pub mod signaling;

pub use config::{CallConfig, CaptureConfig};
pub use error::{Error, Result};
pub use peer::{CallPeerConnection, CallPeerConnectionFactory, PeerCallbacks};
pub use session::CallSessionManager;
pub use signaling::SignalingClient;

// Re-export the core data model so hosts depend on one crate.
pub use flexcall_core::{
    CallSessionState, MemorySignalingStore, OngoingCallRecord, SequencedEnvelope, SignalingCommand,
    SignalingStore,
};
