//! In-memory signaling store

use super::SignalingStore;
use crate::record::{OngoingCallRecord, SequencedEnvelope};
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

/// Capacity of each conversation's broadcast channel
///
/// A call exchanges a few dozen envelopes at most; a lagging subscriber
/// past this depth has effectively stopped consuming.
const CHANNEL_CAPACITY: usize = 64;

struct ConversationLog {
    entries: Vec<SequencedEnvelope>,
    /// Never reset, including across `delete`
    next_sequence: u64,
    tx: broadcast::Sender<SequencedEnvelope>,
}

impl ConversationLog {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            entries: Vec::new(),
            next_sequence: 1,
            tx,
        }
    }
}

/// In-process [`SignalingStore`] backed by a per-conversation log
///
/// Used by tests and the loopback example; the write/observe semantics
/// (sequenced appends, no replay for late subscribers) match what a
/// hosted-store binding must provide.
#[derive(Default)]
pub struct MemorySignalingStore {
    logs: RwLock<HashMap<String, ConversationLog>>,
}

impl MemorySignalingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retained entries for a conversation
    pub async fn len(&self, conversation_id: &str) -> usize {
        self.logs
            .read()
            .await
            .get(conversation_id)
            .map(|log| log.entries.len())
            .unwrap_or(0)
    }

    /// Whether the conversation currently has no ongoing-call record
    pub async fn is_empty(&self, conversation_id: &str) -> bool {
        self.len(conversation_id).await == 0
    }
}

#[async_trait]
impl SignalingStore for MemorySignalingStore {
    async fn append(&self, sender_id: &str, record: OngoingCallRecord) -> Result<u64> {
        let mut logs = self.logs.write().await;
        let log = logs
            .entry(record.conversation_id.clone())
            .or_insert_with(ConversationLog::new);

        let envelope = SequencedEnvelope {
            sequence: log.next_sequence,
            appended_at: Utc::now(),
            sender_id: sender_id.to_string(),
            record,
        };
        log.next_sequence += 1;
        log.entries.push(envelope.clone());

        // No receivers yet is fine; the send result only reports that.
        let _ = log.tx.send(envelope.clone());

        debug!(
            "Appended {} at sequence {} for conversation {}",
            envelope.record.signaling_command, envelope.sequence, envelope.record.conversation_id
        );
        Ok(envelope.sequence)
    }

    async fn latest(&self, conversation_id: &str) -> Result<Option<SequencedEnvelope>> {
        Ok(self
            .logs
            .read()
            .await
            .get(conversation_id)
            .and_then(|log| log.entries.last().cloned()))
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        if let Some(log) = self.logs.write().await.get_mut(conversation_id) {
            log.entries.clear();
            debug!("Deleted ongoing-call record for conversation {conversation_id}");
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        conversation_id: &str,
    ) -> Result<broadcast::Receiver<SequencedEnvelope>> {
        let mut logs = self.logs.write().await;
        let log = logs
            .entry(conversation_id.to_string())
            .or_insert_with(ConversationLog::new);
        Ok(log.tx.subscribe())
    }
}
