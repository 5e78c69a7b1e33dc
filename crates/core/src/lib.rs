//! FlexCall core: call-signaling data model and store abstraction
//!
//! This crate owns everything two call participants agree on before any
//! media flows: the signaling command vocabulary, the call session state
//! machine, the ongoing-call record shape, and the [`SignalingStore`]
//! trait the transport layer persists envelopes through.
//!
//! The store is deliberately an append-only, sequenced message log per
//! conversation rather than a single overwritten document, so lost or
//! out-of-order writes are detectable by observers.

pub mod envelope;
pub mod error;
pub mod record;
pub mod state;
pub mod store;

pub use envelope::SignalingCommand;
pub use error::{Error, Result};
pub use record::{OngoingCallRecord, SequencedEnvelope};
pub use state::CallSessionState;
pub use store::{MemorySignalingStore, SignalingStore};
