//! Signaling envelope codec
//!
//! Every signaling message travels as a single string field on the shared
//! call record, shaped as `"<COMMAND> <payload>"`. The command prefix is
//! matched case-insensitively on the receive path; the payload is
//! everything after the first space.

use serde::{Deserialize, Serialize};

/// Signaling command vocabulary
///
/// `State` carries a [`crate::CallSessionState`] name; the other three
/// carry SDP or ICE payloads for the peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalingCommand {
    /// Session state broadcast (`STATE <state>`)
    State,
    /// SDP offer from the call initiator (`OFFER <sdp>`)
    Offer,
    /// SDP answer from the callee (`ANSWER <sdp>`)
    Answer,
    /// ICE candidate exchange (`ICE <mid>$<mline>$<candidate>`)
    Ice,
}

impl SignalingCommand {
    /// Canonical wire name of this command
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "STATE",
            Self::Offer => "OFFER",
            Self::Answer => "ANSWER",
            Self::Ice => "ICE",
        }
    }

    /// Classify a raw envelope string by its command prefix
    ///
    /// Matching is case-insensitive, mirroring the receive path of the
    /// hosted-store clients this record is shared with. Returns `None`
    /// for text that starts with no known command.
    pub fn classify(text: &str) -> Option<Self> {
        let lowered = text.to_ascii_lowercase();
        [Self::State, Self::Offer, Self::Answer, Self::Ice]
            .into_iter()
            .find(|command| lowered.starts_with(&command.as_str().to_ascii_lowercase()))
    }
}

impl std::fmt::Display for SignalingCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode a command and payload into the single-string envelope form
pub fn encode(command: SignalingCommand, payload: &str) -> String {
    format!("{} {}", command.as_str(), payload)
}

/// Strip the command prefix from an envelope string
///
/// Returns everything after the first space. An envelope with no space
/// (a bare command) yields the input unchanged, matching the original
/// client's `substringAfter` behavior.
pub fn payload(text: &str) -> &str {
    match text.split_once(' ') {
        Some((_, rest)) => rest,
        None => text,
    }
}
