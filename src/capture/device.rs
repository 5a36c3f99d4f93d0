//! Pull-style capture devices

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::buffer::{PixelBuffer, PixelFormat};
use crate::error::{DeviceError, Result};
use crate::frame::VideoFrame;
use crate::graph::{Broadcaster, Sink, SinkRef, SinkWants, Source};

/// Parameters requested from a capture device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureParams {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frames per second
    pub framerate: u32,
    /// Pixel format the device should produce
    pub pixel_format: PixelFormat,
}

impl Default for CaptureParams {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            framerate: 30,
            pixel_format: PixelFormat::I420,
        }
    }
}

impl CaptureParams {
    /// Set the frame size
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the frame rate
    pub fn framerate(mut self, fps: u32) -> Self {
        self.framerate = fps;
        self
    }

    /// Set the pixel format
    pub fn pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }
}

/// One picture read from a device
#[derive(Debug, Clone)]
pub struct CapturedSample {
    pub buffer: Arc<dyn PixelBuffer>,
    pub timestamp_us: u64,
}

/// A capture backend driven by polling
///
/// `read` blocks until the next picture is available.
pub trait CaptureDevice: Send + 'static {
    fn start(&mut self, params: &CaptureParams) -> std::result::Result<(), DeviceError>;

    fn stop(&mut self) -> std::result::Result<(), DeviceError>;

    fn read(&mut self) -> std::result::Result<CapturedSample, DeviceError>;
}

/// Consecutive read errors tolerated before the loop gives up
const MAX_READ_ERRORS: u32 = 8;

/// A [`Source`] that pulls frames from a [`CaptureDevice`]
///
/// The read loop runs on tokio's blocking pool. Each sample becomes a
/// [`VideoFrame`] with a monotonically increasing id and is broadcast to the
/// registered sinks.
pub struct DeviceSource {
    broadcaster: Arc<Broadcaster<VideoFrame>>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceSource {
    /// Start `device` with `params` and begin reading
    pub fn start(mut device: Box<dyn CaptureDevice>, params: CaptureParams) -> Result<Self> {
        device.start(&params)?;
        tracing::info!(
            width = params.width,
            height = params.height,
            fps = params.framerate,
            format = %params.pixel_format,
            "Capture device started"
        );

        let broadcaster = Arc::new(Broadcaster::new());
        let running = Arc::new(AtomicBool::new(true));

        let worker = {
            let broadcaster = Arc::clone(&broadcaster);
            let running = Arc::clone(&running);
            tokio::task::spawn_blocking(move || read_loop(device, &broadcaster, &running))
        };

        Ok(Self {
            broadcaster,
            running,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Whether the read loop is still running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask the read loop to stop after the current read
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Stop and wait for the device to be released
    pub async fn shutdown(&self) {
        self.stop();
        self.wait().await;
    }

    /// Wait for the read loop to end on its own
    pub async fn wait(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Capture loop panicked");
            }
        }
    }
}

impl Drop for DeviceSource {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Source<VideoFrame> for DeviceSource {
    fn add_or_update_sink(&self, sink: SinkRef<VideoFrame>, wants: SinkWants) {
        self.broadcaster.add_or_update_sink(sink, wants);
    }

    fn remove_sink(&self, sink: &SinkRef<VideoFrame>) {
        self.broadcaster.remove_sink(sink);
    }
}

fn read_loop(
    mut device: Box<dyn CaptureDevice>,
    broadcaster: &Broadcaster<VideoFrame>,
    running: &AtomicBool,
) {
    let mut next_id: u64 = 0;
    let mut errors = 0;

    while running.load(Ordering::Acquire) {
        match device.read() {
            Ok(sample) => {
                errors = 0;
                next_id += 1;
                let frame = VideoFrame::new(sample.buffer, sample.timestamp_us).with_id(next_id);
                tracing::trace!(frame_id = next_id, ts = sample.timestamp_us, "Frame captured");
                broadcaster.on_frame(frame);
            }
            Err(DeviceError::Eof) => {
                tracing::debug!(frames = next_id, "Capture device reached end of stream");
                break;
            }
            Err(e) => {
                errors += 1;
                tracing::warn!(error = %e, consecutive = errors, "Capture read failed");
                if errors >= MAX_READ_ERRORS {
                    tracing::error!("Too many capture errors, giving up");
                    break;
                }
            }
        }
    }

    running.store(false, Ordering::Release);
    if let Err(e) = device.stop() {
        tracing::warn!(error = %e, "Failed to stop capture device");
    }
    tracing::info!(frames = next_id, "Capture device stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CollectingSink, PatternDevice};

    /// Fails every read
    struct Broken;

    impl CaptureDevice for Broken {
        fn start(&mut self, _params: &CaptureParams) -> std::result::Result<(), DeviceError> {
            Ok(())
        }

        fn stop(&mut self) -> std::result::Result<(), DeviceError> {
            Ok(())
        }

        fn read(&mut self) -> std::result::Result<CapturedSample, DeviceError> {
            Err(DeviceError::ReadFailed("unplugged".into()))
        }
    }

    #[test]
    fn test_params_builder() {
        let params = CaptureParams::default()
            .resolution(640, 480)
            .framerate(15)
            .pixel_format(PixelFormat::Nv12);
        assert_eq!(params.width, 640);
        assert_eq!(params.height, 480);
        assert_eq!(params.framerate, 15);
        assert_eq!(params.pixel_format, PixelFormat::Nv12);
    }

    #[tokio::test]
    async fn test_frames_get_increasing_ids() {
        let sink: Arc<CollectingSink<VideoFrame>> = Arc::new(CollectingSink::new());
        let device = PatternDevice::new().frame_limit(5);
        let params = CaptureParams::default().resolution(64, 48).framerate(100);

        let source = DeviceSource::start(Box::new(device), params).unwrap();
        source.add_or_update_sink(sink.clone(), SinkWants::default());
        source.wait().await;

        let ids: Vec<u64> = sink.frames().iter().map(|f| f.id()).collect();
        assert!(!ids.is_empty());
        assert!(ids.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(ids.last(), Some(&5));
        assert!(!source.is_running());
    }

    #[tokio::test]
    async fn test_eof_ends_loop() {
        let device = PatternDevice::new().frame_limit(3).unpaced();
        let params = CaptureParams::default().resolution(32, 32);
        let source = DeviceSource::start(Box::new(device), params).unwrap();
        source.wait().await;
        assert!(!source.is_running());
    }

    #[tokio::test]
    async fn test_unsupported_params_fail_start() {
        let device = PatternDevice::new();
        let params = CaptureParams::default().pixel_format(PixelFormat::Mjpeg);
        let result = DeviceSource::start(Box::new(device), params);
        assert!(matches!(
            result,
            Err(crate::Error::Device(DeviceError::Unsupported(_)))
        ));
    }

    #[tokio::test]
    async fn test_read_errors_give_up() {
        let source = DeviceSource::start(Box::new(Broken), CaptureParams::default()).unwrap();
        source.shutdown().await;
        assert!(!source.is_running());
    }
}
