//! Call configuration

use serde::{Deserialize, Serialize};

/// Configuration for one call session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallConfig {
    /// STUN/TURN server URLs handed to the engine
    pub ice_servers: Vec<String>,

    /// Gather candidates on loopback interfaces too. Off for real calls;
    /// single-host setups (tests, the loopback example) need it when no
    /// other interface is available.
    pub include_loopback: bool,

    /// Local camera capture preferences
    pub capture: CaptureConfig,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            include_loopback: false,
            capture: CaptureConfig::default(),
        }
    }
}

/// Camera capture preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureConfig {
    /// Capture widths accepted for the local video source, in no
    /// particular preference order: the first *enumerated* format whose
    /// width appears here wins.
    pub preferred_widths: Vec<u32>,

    /// Capture framerate in frames per second
    pub framerate: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            preferred_widths: vec![720, 480, 360],
            framerate: 30,
        }
    }
}
