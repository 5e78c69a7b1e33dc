//! Platform audio-device boundary

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Global audio mode of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioMode {
    /// Ordinary media playback
    #[default]
    Normal,
    /// An incoming call is ringing
    Ringtone,
    /// A telephony call is up
    InCall,
    /// A VoIP call is up; playout and recording are tuned for voice
    InCommunication,
}

/// How much focus a request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusGain {
    /// Permanent gain
    Gain,
    /// Short-lived gain, other audio may duck
    Transient,
    /// Short-lived gain, other audio must pause entirely
    TransientExclusive,
}

/// Result of a focus request; acquisition is best-effort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    Granted,
    /// The platform will grant focus later
    Delayed,
    Failed,
}

/// Platform audio manager boundary
///
/// Implementations wrap whatever the host OS offers (Android's
/// AudioManager, CoreAudio, a test double). Version-specific request
/// shapes live behind this trait; the router above it sees one contract.
pub trait AudioDevice: Send + Sync {
    fn mode(&self) -> AudioMode;
    fn set_mode(&self, mode: AudioMode);

    fn is_microphone_muted(&self) -> bool;
    fn set_microphone_muted(&self, muted: bool);

    fn is_speakerphone_enabled(&self) -> bool;
    fn set_speakerphone_enabled(&self, enabled: bool);

    fn set_bluetooth_sco_enabled(&self, enabled: bool);

    /// Request audio focus; never fails hard, the outcome is advisory
    fn request_focus(&self, gain: FocusGain) -> FocusOutcome;

    /// Release a previously requested focus
    fn abandon_focus(&self);

    /// Whether the device has a wired earpiece
    fn has_earpiece(&self) -> bool;

    /// Whether the device has a built-in speaker
    fn has_speakerphone(&self) -> bool;
}

#[derive(Debug, Default)]
struct SoftwareAudioState {
    mode: AudioMode,
    microphone_muted: bool,
    speakerphone_enabled: bool,
    bluetooth_sco_enabled: bool,
    focus_held: bool,
}

/// In-process [`AudioDevice`] holding its flags in memory
///
/// Reference implementation for hosts without platform audio, and the
/// device the tests and the loopback example run against.
#[derive(Debug, Default)]
pub struct SoftwareAudioDevice {
    state: Mutex<SoftwareAudioState>,
}

impl SoftwareAudioDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a focus request is currently held
    pub fn focus_held(&self) -> bool {
        self.state.lock().focus_held
    }
}

impl AudioDevice for SoftwareAudioDevice {
    fn mode(&self) -> AudioMode {
        self.state.lock().mode
    }

    fn set_mode(&self, mode: AudioMode) {
        self.state.lock().mode = mode;
    }

    fn is_microphone_muted(&self) -> bool {
        self.state.lock().microphone_muted
    }

    fn set_microphone_muted(&self, muted: bool) {
        self.state.lock().microphone_muted = muted;
    }

    fn is_speakerphone_enabled(&self) -> bool {
        self.state.lock().speakerphone_enabled
    }

    fn set_speakerphone_enabled(&self, enabled: bool) {
        self.state.lock().speakerphone_enabled = enabled;
    }

    fn set_bluetooth_sco_enabled(&self, enabled: bool) {
        self.state.lock().bluetooth_sco_enabled = enabled;
    }

    fn request_focus(&self, _gain: FocusGain) -> FocusOutcome {
        self.state.lock().focus_held = true;
        FocusOutcome::Granted
    }

    fn abandon_focus(&self) {
        self.state.lock().focus_held = false;
    }

    fn has_earpiece(&self) -> bool {
        false
    }

    fn has_speakerphone(&self) -> bool {
        true
    }
}
