//! Call session state machine

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle state of one call session
///
/// Driven by `STATE <value>` signaling messages. A session is created
/// `Offline` when a conversation is opened, moves through `Creating` and
/// `Ready` as the SDP exchange progresses, and reaches `Active` once the
/// answer is applied. Dispose resets any state to `Offline`.
///
/// `Failed` is terminal for the attempt: a signaling write that could not
/// be persisted drives the state stream here instead of leaving the call
/// stuck in `Creating` with only a log line to show for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallSessionState {
    /// No ongoing call for the conversation
    Offline,
    /// The initiator has started the call and is producing an offer
    Creating,
    /// The callee has answered; waiting for the session to connect
    Ready,
    /// Both descriptions applied; media can flow
    Active,
    /// The call cannot proceed (e.g. the callee is already in a call)
    Impossible,
    /// A signaling transport failure ended the attempt
    Failed,
}

impl CallSessionState {
    /// Canonical wire name used in `STATE` payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "Offline",
            Self::Creating => "Creating",
            Self::Ready => "Ready",
            Self::Active => "Active",
            Self::Impossible => "Impossible",
            Self::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for CallSessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallSessionState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let all = [
            Self::Offline,
            Self::Creating,
            Self::Ready,
            Self::Active,
            Self::Impossible,
            Self::Failed,
        ];
        all.into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidPayload(format!("unknown session state: {s}")))
    }
}
