//! Ongoing-call record and sequenced log entries

use crate::envelope::{self, SignalingCommand};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One signaling step for a conversation's ongoing call
///
/// This is the document shape shared with the hosted store: field names
/// are camelCase on the wire. `session_description` holds the full
/// envelope string (`"<COMMAND> <payload>"`), `signaling_command` repeats
/// the command name for queryability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OngoingCallRecord {
    /// Conversation the call belongs to
    pub conversation_id: String,
    /// Envelope string, `"<COMMAND> <payload>"`
    pub session_description: String,
    /// Command name, e.g. `"OFFER"`
    pub signaling_command: String,
    /// User id of the participant that started the call
    pub call_initiator_id: String,
}

impl OngoingCallRecord {
    /// Build a record from a typed command and payload
    pub fn new(
        command: SignalingCommand,
        payload: &str,
        conversation_id: impl Into<String>,
        call_initiator_id: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            session_description: envelope::encode(command, payload),
            signaling_command: command.as_str().to_string(),
            call_initiator_id: call_initiator_id.into(),
        }
    }

    /// Classify the envelope string carried by this record
    pub fn command(&self) -> Option<SignalingCommand> {
        SignalingCommand::classify(&self.session_description)
    }

    /// The envelope payload with the command prefix stripped
    pub fn payload(&self) -> &str {
        envelope::payload(&self.session_description)
    }
}

/// A store-assigned position in a conversation's signaling log
///
/// Sequences are strictly monotonic per conversation and are never reset,
/// so an observer that sees `sequence` jump by more than one knows a
/// write was lost or delivered out of order.
///
/// `sender_id` is log metadata, not part of the shared document: both
/// participants observe the same record, so each client needs a way to
/// drop the envelopes it wrote itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencedEnvelope {
    /// Log position, starting at 1 for the conversation's first write
    pub sequence: u64,
    /// Store-side append time
    pub appended_at: DateTime<Utc>,
    /// Participant that appended this entry
    pub sender_id: String,
    /// The signaling step itself
    pub record: OngoingCallRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_carries_envelope() {
        let record = OngoingCallRecord::new(SignalingCommand::Offer, "v=0", "conv-1", "user-a");
        assert_eq!(record.session_description, "OFFER v=0");
        assert_eq!(record.signaling_command, "OFFER");
        assert_eq!(record.command(), Some(SignalingCommand::Offer));
        assert_eq!(record.payload(), "v=0");
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = OngoingCallRecord::new(SignalingCommand::State, "Creating", "conv-1", "user-a");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["conversationId"], "conv-1");
        assert_eq!(json["sessionDescription"], "STATE Creating");
        assert_eq!(json["signalingCommand"], "STATE");
        assert_eq!(json["callInitiatorId"], "user-a");
    }

    #[test]
    fn test_record_deserializes_camel_case() {
        let json = r#"{
            "conversationId": "conv-9",
            "sessionDescription": "ANSWER v=0",
            "signalingCommand": "ANSWER",
            "callInitiatorId": "user-b"
        }"#;
        let record: OngoingCallRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.conversation_id, "conv-9");
        assert_eq!(record.command(), Some(SignalingCommand::Answer));
    }
}
