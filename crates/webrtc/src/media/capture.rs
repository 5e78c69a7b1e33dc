//! Video capturer boundary

use crate::media::CaptureFormat;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// Frame fan-out depth; a subscriber this far behind is dropped into
/// `Lagged` rather than backpressuring the capturer.
const FRAME_CHANNEL_CAPACITY: usize = 32;

/// One encoded video frame from the local capturer
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Encoded frame payload
    pub data: Bytes,
    /// Presentation duration of this frame
    pub duration: Duration,
}

/// Platform video capture boundary
///
/// The session manager decides *which* device and format to capture;
/// producing frames is the platform's job. Implementations publish
/// encoded frames on the broadcast stream returned by [`frames`].
///
/// [`frames`]: VideoCapturer::frames
#[async_trait]
pub trait VideoCapturer: Send + Sync {
    /// Begin capturing from the named device at the given format
    async fn start(&self, device: &str, format: CaptureFormat) -> Result<()>;

    /// Stop capturing; the frame stream goes quiet but stays subscribable
    async fn stop(&self) -> Result<()>;

    /// Subscribe to captured frames (no replay for late subscribers)
    fn frames(&self) -> broadcast::Receiver<CapturedFrame>;

    /// Whether this source is a screen share rather than a camera
    fn is_screencast(&self) -> bool {
        false
    }
}

/// Capturer that synthesizes a fixed-pattern frame at the configured rate
///
/// Stands in for a real camera in tests and the loopback example: the
/// payload is not decodable video, but it exercises the full track and
/// transport path.
#[derive(Default)]
pub struct SyntheticCapturer {
    state: Mutex<SyntheticState>,
}

#[derive(Default)]
struct SyntheticState {
    tx: Option<broadcast::Sender<CapturedFrame>>,
    task: Option<JoinHandle<()>>,
}

impl SyntheticCapturer {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self) -> broadcast::Sender<CapturedFrame> {
        let mut state = self.state.lock();
        state
            .tx
            .get_or_insert_with(|| broadcast::channel(FRAME_CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl VideoCapturer for SyntheticCapturer {
    async fn start(&self, device: &str, format: CaptureFormat) -> Result<()> {
        debug!(
            "Starting synthetic capture on {device} at {}x{}@{}",
            format.width, format.height, format.framerate
        );
        let tx = self.sender();
        let frame_interval = Duration::from_millis(1000 / u64::from(format.framerate.max(1)));
        let payload = Bytes::from(vec![0u8; (format.width * 2) as usize]);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_interval);
            loop {
                ticker.tick().await;
                let frame = CapturedFrame {
                    data: payload.clone(),
                    duration: frame_interval,
                };
                if tx.send(frame).is_err() {
                    // No subscribers; keep producing, one may attach later.
                }
            }
        });

        let mut state = self.state.lock();
        if let Some(previous) = state.task.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if let Some(task) = self.state.lock().task.take() {
            task.abort();
            debug!("Stopped synthetic capture");
        }
        Ok(())
    }

    fn frames(&self) -> broadcast::Receiver<CapturedFrame> {
        self.sender().subscribe()
    }
}

impl Drop for SyntheticCapturer {
    fn drop(&mut self) {
        if let Some(task) = self.state.lock().task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format() -> CaptureFormat {
        CaptureFormat { width: 480, height: 360, framerate: 30 }
    }

    #[tokio::test]
    async fn test_synthetic_capturer_produces_frames() {
        let capturer = SyntheticCapturer::new();
        let mut frames = capturer.frames();
        capturer.start("front", format()).await.unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(1), frames.recv())
            .await
            .expect("frame within a second")
            .unwrap();
        assert!(!frame.data.is_empty());

        capturer.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_replaces_producer() {
        let capturer = SyntheticCapturer::new();
        capturer.start("front", format()).await.unwrap();
        capturer.start("back", format()).await.unwrap();
        capturer.stop().await.unwrap();
        // Second stop is a no-op, not an error.
        capturer.stop().await.unwrap();
    }
}
