//! Peer connection wrapper and factory
//!
//! [`CallPeerConnection`] wraps one engine peer connection and owns the
//! pending-ICE queue; [`CallPeerConnectionFactory`] builds the engine API
//! once and produces wired connections and local media tracks.

pub mod connection;
pub mod factory;
mod pending;

pub use connection::{munge_codecs, CallPeerConnection, PeerCallbacks};
pub use factory::CallPeerConnectionFactory;
