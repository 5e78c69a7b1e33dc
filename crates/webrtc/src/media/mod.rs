//! Local media capture
//!
//! Camera enumeration and capture sit behind traits; the platform
//! (camera2, AVFoundation, a test fixture) supplies the implementation,
//! this module supplies the selection policy.

pub mod camera;
pub mod capture;

pub use camera::{
    select_camera, select_capture_format, CameraDevice, CameraEnumerator, CaptureFormat,
    StaticCameraEnumerator,
};
pub use capture::{CapturedFrame, SyntheticCapturer, VideoCapturer};
