//! Error types for FlexCall WebRTC orchestration

use thiserror::Error;

/// Result type alias for FlexCall WebRTC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while orchestrating a call
#[derive(Debug, Error)]
pub enum Error {
    /// The engine's asynchronous operation reported failure
    #[error("Engine callback failed: {0}")]
    CallbackFailure(String),

    /// The engine succeeded but produced no usable value
    #[error("Engine produced no usable value: {0}")]
    NullResult(String),

    /// Benign: the candidate was queued because no remote description is
    /// applied yet. The pending queue retries it automatically; callers
    /// must not treat this as terminal.
    #[error("ICE candidate postponed: remote description is not set")]
    PostponedCandidate,

    /// No supported capture format matches a preferred width. Fatal for
    /// the call attempt and surfaced immediately.
    #[error("No matched capture resolution (supported widths: {supported:?})")]
    ResolutionUnavailable {
        /// Widths the device actually offers
        supported: Vec<u32>,
    },

    /// No camera device is enumerable
    #[error("No camera device available")]
    CameraUnavailable,

    /// ICE payload did not match `<mid>$<mline>$<candidate>`
    #[error("Invalid ICE payload: {0}")]
    InvalidIcePayload(String),

    /// A call is already running on this session manager
    #[error("Call already in progress for conversation {0}")]
    CallInProgress(String),

    /// The session has not been opened (no media, no audio focus)
    #[error("Session is not open")]
    SessionNotOpen,

    /// Signaling-layer error
    #[error("Signaling error: {0}")]
    Signaling(#[from] flexcall_core::Error),
}

impl Error {
    /// Whether this error is the expected, non-terminal postponement
    pub fn is_postponed(&self) -> bool {
        matches!(self, Self::PostponedCandidate)
    }
}
