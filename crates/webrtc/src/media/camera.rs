//! Camera enumeration and capture-format selection

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One capture format a camera can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    /// Maximum framerate the device supports at this size
    pub framerate: u32,
}

/// Platform camera enumeration boundary
pub trait CameraEnumerator: Send + Sync {
    /// Stable identifiers of the available cameras
    fn device_names(&self) -> Vec<String>;

    /// Whether the named camera faces the user
    fn is_front_facing(&self, name: &str) -> bool;

    /// Capture formats the named camera supports
    fn supported_formats(&self, name: &str) -> Vec<CaptureFormat>;
}

/// Pick the camera a call starts on
///
/// The first front-facing device wins; if none is front-facing the first
/// enumerated device is used. No devices at all is an error.
pub fn select_camera(enumerator: &dyn CameraEnumerator) -> Result<String> {
    let names = enumerator.device_names();
    let selected = names
        .iter()
        .find(|name| enumerator.is_front_facing(name))
        .or_else(|| names.first())
        .cloned()
        .ok_or(Error::CameraUnavailable)?;
    debug!("Selected camera {selected}");
    Ok(selected)
}

/// Pick a capture format from a device's supported list
///
/// Returns the first format in *enumeration order* whose width is one of
/// `preferred_widths`. No match fails the call attempt with
/// [`Error::ResolutionUnavailable`].
pub fn select_capture_format(
    formats: &[CaptureFormat],
    preferred_widths: &[u32],
) -> Result<CaptureFormat> {
    formats
        .iter()
        .find(|format| preferred_widths.contains(&format.width))
        .copied()
        .ok_or_else(|| Error::ResolutionUnavailable {
            supported: formats.iter().map(|format| format.width).collect(),
        })
}

/// A camera visible through [`StaticCameraEnumerator`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraDevice {
    pub name: String,
    pub front_facing: bool,
    pub formats: Vec<CaptureFormat>,
}

/// Enumerator over a fixed device list
///
/// Hosts that already know their camera topology (and tests) describe it
/// here; platform bindings implement [`CameraEnumerator`] directly.
#[derive(Debug, Clone, Default)]
pub struct StaticCameraEnumerator {
    devices: Vec<CameraDevice>,
}

impl StaticCameraEnumerator {
    pub fn new(devices: Vec<CameraDevice>) -> Self {
        Self { devices }
    }
}

impl CameraEnumerator for StaticCameraEnumerator {
    fn device_names(&self) -> Vec<String> {
        self.devices.iter().map(|device| device.name.clone()).collect()
    }

    fn is_front_facing(&self, name: &str) -> bool {
        self.devices
            .iter()
            .any(|device| device.name == name && device.front_facing)
    }

    fn supported_formats(&self, name: &str) -> Vec<CaptureFormat> {
        self.devices
            .iter()
            .find(|device| device.name == name)
            .map(|device| device.formats.clone())
            .unwrap_or_default()
    }
}
