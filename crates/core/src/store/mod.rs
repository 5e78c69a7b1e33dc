//! Signaling store abstraction
//!
//! The hosted document store is reached only through [`SignalingStore`];
//! the in-process [`MemorySignalingStore`] backs tests and the loopback
//! example, and vendor bindings implement the same trait out of tree.

mod memory;

pub use memory::MemorySignalingStore;

use crate::record::{OngoingCallRecord, SequencedEnvelope};
use crate::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Append-only, sequenced signaling log keyed by conversation id
///
/// Each conversation has its own log; `append` assigns the next sequence
/// number. Deleting a conversation's record clears the log but does not
/// reset the counter, so sequences stay monotonic across consecutive
/// calls on the same conversation.
#[async_trait]
pub trait SignalingStore: Send + Sync {
    /// Append one signaling step, returning its assigned sequence
    ///
    /// `sender_id` tags the log entry with the appending participant so
    /// observers can recognize their own writes echoed back.
    async fn append(&self, sender_id: &str, record: OngoingCallRecord) -> Result<u64>;

    /// The most recently appended entry, if any
    async fn latest(&self, conversation_id: &str) -> Result<Option<SequencedEnvelope>>;

    /// Delete the conversation's ongoing-call record
    ///
    /// Deleting an unknown conversation is not an error; call teardown
    /// must stay safe to repeat.
    async fn delete(&self, conversation_id: &str) -> Result<()>;

    /// Subscribe to envelopes appended after this call
    ///
    /// Late subscribers only see subsequent appends; there is no replay.
    async fn subscribe(
        &self,
        conversation_id: &str,
    ) -> Result<broadcast::Receiver<SequencedEnvelope>>;
}
