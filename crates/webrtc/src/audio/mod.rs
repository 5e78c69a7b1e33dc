//! Audio focus and routing
//!
//! The platform audio manager sits behind [`AudioDevice`]; the
//! [`AudioRouter`] brackets a call with focus acquisition and
//! state restoration on top of it.

pub mod device;
pub mod router;

pub use device::{AudioDevice, AudioMode, FocusGain, FocusOutcome, SoftwareAudioDevice};
pub use router::AudioRouter;
