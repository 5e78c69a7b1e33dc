//! Audio focus bracketing and routing

use crate::audio::device::{AudioDevice, AudioMode, FocusGain, FocusOutcome};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
struct SavedAudioState {
    mode: AudioMode,
    microphone_muted: bool,
    speakerphone_enabled: bool,
}

/// Brackets a call's audio: focus and communication mode are acquired at
/// call start, and the pre-call {mode, mute, speakerphone} triple is
/// restored at call end no matter how the call terminated. Process-death
/// persistence of the saved triple is out of scope.
pub struct AudioRouter {
    device: Arc<dyn AudioDevice>,
    saved: Mutex<Option<SavedAudioState>>,
}

impl AudioRouter {
    pub fn new(device: Arc<dyn AudioDevice>) -> Self {
        Self {
            device,
            saved: Mutex::new(None),
        }
    }

    /// Request transient-exclusive voice focus, then force communication
    /// mode. Focus acquisition is best-effort: a denied request is
    /// logged, never fatal.
    ///
    /// Communication mode is required before playout or recording starts
    /// for usable VoIP performance; some devices misroute speaker audio
    /// without it.
    pub fn set_audio_focus(&self) {
        let outcome = self.device.request_focus(FocusGain::TransientExclusive);
        info!(
            "Audio focus request completed: {}",
            matches!(outcome, FocusOutcome::Granted)
        );
        self.device.set_mode(AudioMode::InCommunication);
    }

    /// Snapshot the current {mode, mute, speakerphone} triple
    pub fn cache_audio_state(&self) {
        let state = SavedAudioState {
            mode: self.device.mode(),
            microphone_muted: self.device.is_microphone_muted(),
            speakerphone_enabled: self.device.is_speakerphone_enabled(),
        };
        debug!("Cached audio state: {state:?}");
        *self.saved.lock() = Some(state);
    }

    /// Restore the cached triple and abandon the focus request
    ///
    /// Restoring without a prior cache is a logged no-op.
    pub fn restore_audio_state(&self) {
        let Some(state) = self.saved.lock().take() else {
            warn!("No cached audio state to restore");
            return;
        };
        debug!("Restoring audio state: {state:?}");
        self.device.set_mode(state.mode);
        self.mute(state.microphone_muted);
        self.enable_speakerphone(state.speakerphone_enabled);
        self.device.abandon_focus();
    }

    pub fn mute(&self, mute: bool) {
        info!("Microphone mute: {mute}");
        self.device.set_microphone_muted(mute);
    }

    pub fn enable_speakerphone(&self, enable: bool) {
        info!("Speakerphone: {enable}");
        self.device.set_speakerphone_enabled(enable);
    }

    pub fn enable_bluetooth_sco(&self, enable: bool) {
        info!("Bluetooth SCO: {enable}");
        self.device.set_bluetooth_sco_enabled(enable);
    }

    pub fn has_earpiece(&self) -> bool {
        self.device.has_earpiece()
    }

    pub fn has_speakerphone(&self) -> bool {
        self.device.has_speakerphone()
    }
}
