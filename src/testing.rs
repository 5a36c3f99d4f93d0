//! Deterministic stand-ins for hardware and codecs
//!
//! Used by the test suites and the demo pipeline: a capture device that
//! paints a moving pattern, a codec that "encodes" by tagging frames, and a
//! sink that records everything it receives.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::buffer::{Biplanar8, Packed8, PixelBuffer, PixelFormat, Planar8};
use crate::capture::{CaptureDevice, CaptureParams, CapturedSample};
use crate::encoder::{
    CodecProperty, EncodedImage, EncodedImageCallback, EncoderSettings, VideoCodec, VideoEncoder,
    VideoEncoderFactory,
};
use crate::error::{DeviceError, EncoderError};
use crate::frame::VideoFrame;
use crate::graph::Sink;

/// An I420 buffer filled with a gradient that shifts with `seed`
///
/// Panics if the buffer cannot be allocated.
pub fn pattern_i420(width: u32, height: u32, seed: u8) -> Planar8 {
    let buffer = Planar8::build(
        width,
        height,
        width as usize,
        (width as usize + 1) / 2,
        (width as usize + 1) / 2,
        |dst| {
            let (w, h) = (width as usize, height as usize);
            let (cw, ch) = ((w + 1) / 2, (h + 1) / 2);
            let seed = seed as usize;

            for row in 0..h {
                for col in 0..w {
                    dst.y[row * dst.stride_y + col] = ((col * 3 + row * 5 + seed * 7) & 0xff) as u8;
                }
            }
            for row in 0..ch {
                for col in 0..cw {
                    dst.u[row * dst.stride_u + col] = ((col * 11 + row + seed) & 0xff) as u8;
                    dst.v[row * dst.stride_v + col] = ((row * 13 + col + seed * 3) & 0xff) as u8;
                }
            }
        },
    );

    match buffer {
        Ok(buffer) => buffer,
        Err(e) => panic!("pattern buffer {}x{}: {}", width, height, e),
    }
}

/// A [`VideoFrame`] around [`pattern_i420`], stamped at 30 fps
pub fn pattern_frame(width: u32, height: u32, seed: u8) -> VideoFrame {
    VideoFrame::new(Arc::new(pattern_i420(width, height, seed)), seed as u64 * 33_333)
}

/// Records every frame it receives
pub struct CollectingSink<T> {
    frames: Mutex<Vec<T>>,
}

impl<T> CollectingSink<T> {
    pub fn new() -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

impl<T: Clone> CollectingSink<T> {
    /// Everything received so far, in order
    pub fn frames(&self) -> Vec<T> {
        self.frames.lock().clone()
    }

    pub fn last(&self) -> Option<T> {
        self.frames.lock().last().cloned()
    }
}

impl<T> Default for CollectingSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Sink<T> for CollectingSink<T> {
    fn on_frame(&self, frame: T) {
        self.frames.lock().push(frame);
    }
}

/// A capture device producing [`pattern_i420`] frames
///
/// Supports I420, NV12, NV21, YUY2 and UYVY. Reads are paced to the requested
/// frame rate unless [`unpaced`](Self::unpaced) is set.
pub struct PatternDevice {
    params: Option<CaptureParams>,
    frame_limit: Option<u64>,
    paced: bool,
    produced: u64,
}

impl PatternDevice {
    pub fn new() -> Self {
        Self {
            params: None,
            frame_limit: None,
            paced: true,
            produced: 0,
        }
    }

    /// Report end of stream after `frames` reads
    pub fn frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Return frames as fast as they are read
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    fn render(&self, params: &CaptureParams) -> crate::Result<Arc<dyn PixelBuffer>> {
        let pattern = pattern_i420(params.width, params.height, (self.produced & 0xff) as u8);
        let buffer: Arc<dyn PixelBuffer> = match params.pixel_format {
            PixelFormat::Nv12 | PixelFormat::Nv21 => {
                Arc::new(Biplanar8::copy_as(params.pixel_format, &pattern)?)
            }
            PixelFormat::Yuy2 | PixelFormat::Uyvy => {
                Arc::new(Packed8::copy_as(params.pixel_format, &pattern)?)
            }
            _ => Arc::new(pattern),
        };
        Ok(buffer)
    }
}

impl Default for PatternDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for PatternDevice {
    fn start(&mut self, params: &CaptureParams) -> Result<(), DeviceError> {
        match params.pixel_format {
            PixelFormat::I420
            | PixelFormat::Nv12
            | PixelFormat::Nv21
            | PixelFormat::Yuy2
            | PixelFormat::Uyvy => {}
            other => return Err(DeviceError::Unsupported(format!("pixel format {}", other))),
        }
        if params.width == 0 || params.height == 0 {
            return Err(DeviceError::Unsupported(format!(
                "resolution {}x{}",
                params.width, params.height
            )));
        }

        self.params = Some(params.clone());
        self.produced = 0;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.params = None;
        Ok(())
    }

    fn read(&mut self) -> Result<CapturedSample, DeviceError> {
        let params = self.params.clone().ok_or(DeviceError::NotStarted)?;
        if self.frame_limit.map_or(false, |limit| self.produced >= limit) {
            return Err(DeviceError::Eof);
        }

        let fps = params.framerate.max(1) as u64;
        if self.paced {
            std::thread::sleep(Duration::from_micros(1_000_000 / fps));
        }

        let buffer = self
            .render(&params)
            .map_err(|e| DeviceError::ReadFailed(e.to_string()))?;
        let timestamp_us = self.produced * 1_000_000 / fps;
        self.produced += 1;

        Ok(CapturedSample {
            buffer,
            timestamp_us,
        })
    }
}

#[derive(Default)]
struct FakeShared {
    created: AtomicU64,
    init_calls: AtomicU64,
    encode_calls: AtomicU64,
    releases: AtomicU64,
    fail_init: AtomicBool,
    fail_encode: AtomicBool,
    last_property: Mutex<Option<CodecProperty>>,
}

/// Creates [`FakeEncoder`]s and counts what is done to them
pub struct FakeEncoderFactory {
    shared: Arc<FakeShared>,
    unsupported: Vec<VideoCodec>,
}

impl FakeEncoderFactory {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(FakeShared::default()),
            unsupported: Vec::new(),
        }
    }

    /// Return no encoder for `codec`
    pub fn without_codec(mut self, codec: VideoCodec) -> Self {
        self.unsupported.push(codec);
        self
    }

    /// Make every subsequent `init` fail
    pub fn fail_init(&self, fail: bool) {
        self.shared.fail_init.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `encode` fail
    pub fn fail_encode(&self, fail: bool) {
        self.shared.fail_encode.store(fail, Ordering::SeqCst);
    }

    /// Encoders created so far
    pub fn created(&self) -> u64 {
        self.shared.created.load(Ordering::SeqCst)
    }

    pub fn init_calls(&self) -> u64 {
        self.shared.init_calls.load(Ordering::SeqCst)
    }

    pub fn encode_calls(&self) -> u64 {
        self.shared.encode_calls.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> u64 {
        self.shared.releases.load(Ordering::SeqCst)
    }

    /// Parameters of the most recent `init`
    pub fn last_property(&self) -> Option<CodecProperty> {
        self.shared.last_property.lock().clone()
    }
}

impl Default for FakeEncoderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoEncoderFactory for FakeEncoderFactory {
    fn create(&self, codec: VideoCodec) -> Option<Box<dyn VideoEncoder>> {
        if self.unsupported.contains(&codec) {
            return None;
        }

        self.shared.created.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(FakeEncoder {
            shared: Arc::clone(&self.shared),
            callback: None,
            property: None,
            key_frame_pending: true,
        }))
    }
}

/// A codec that emits a short tagged payload per frame
///
/// The first frame after `init` and the frame after a key frame request are
/// key frames.
pub struct FakeEncoder {
    shared: Arc<FakeShared>,
    callback: Option<Arc<dyn EncodedImageCallback>>,
    property: Option<CodecProperty>,
    key_frame_pending: bool,
}

impl VideoEncoder for FakeEncoder {
    fn init(
        &mut self,
        property: &CodecProperty,
        _settings: &EncoderSettings,
    ) -> Result<(), EncoderError> {
        self.shared.init_calls.fetch_add(1, Ordering::SeqCst);
        *self.shared.last_property.lock() = Some(property.clone());

        if self.shared.fail_init.load(Ordering::SeqCst) {
            self.property = None;
            return Err(EncoderError::InitFailed("rejected by fake encoder".into()));
        }

        self.property = Some(property.clone());
        self.key_frame_pending = true;
        Ok(())
    }

    fn register_complete_callback(&mut self, callback: Arc<dyn EncodedImageCallback>) {
        self.callback = Some(callback);
    }

    fn encode(&mut self, frame: &VideoFrame) -> Result<(), EncoderError> {
        let property = self.property.as_ref().ok_or(EncoderError::Uninitialized)?;
        self.shared.encode_calls.fetch_add(1, Ordering::SeqCst);

        if self.shared.fail_encode.load(Ordering::SeqCst) {
            return Err(EncoderError::EncodeFailed("fake encoder told to fail".into()));
        }

        let is_keyframe = std::mem::take(&mut self.key_frame_pending);
        let nal_type = if is_keyframe { 0x65 } else { 0x41 };
        let mut payload = vec![0, 0, 0, 1, nal_type];
        payload.extend_from_slice(&frame.id().to_be_bytes());

        let image = EncodedImage {
            data: Bytes::from(payload),
            width: frame.width(),
            height: frame.height(),
            timestamp_us: frame.timestamp_us(),
            qp: Some(property.max_qp.min(30)),
            is_keyframe,
        };

        if let Some(callback) = &self.callback {
            let result = callback.on_encoded_image(image);
            if !result.is_ok() || result.drop_next_frame {
                tracing::debug!(
                    frame_id = result.frame_id,
                    status = ?result.status,
                    drop_next = result.drop_next_frame,
                    "Downstream reported a problem"
                );
            }
        }
        Ok(())
    }

    fn request_key_frame(&mut self) {
        self.key_frame_pending = true;
    }

    fn release(&mut self) {
        self.shared.releases.fetch_add(1, Ordering::SeqCst);
        self.property = None;
    }
}
