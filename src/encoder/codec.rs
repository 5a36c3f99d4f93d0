//! Boundary to concrete codec implementations

use std::sync::Arc;

use bytes::Bytes;

use super::config::{CodecProperty, VideoCodec};
use crate::error::EncoderError;
use crate::frame::VideoFrame;

/// Runtime settings passed to a codec's `init`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    /// Largest payload a packetizer can carry
    pub max_payload_len: usize,
    /// Threads the codec may use
    pub number_of_cores: usize,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            max_payload_len: 1200,
            number_of_cores: 1,
        }
    }
}

/// Compressed output of one encode call
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Bitstream (zero-copy via reference counting)
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    /// Capture timestamp of the source frame
    pub timestamp_us: u64,
    pub qp: Option<u8>,
    pub is_keyframe: bool,
}

/// Outcome of delivering an [`EncodedImage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    Ok,
    SendFailed,
}

/// What a codec's output callback reports back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackResult {
    pub status: CallbackStatus,
    /// Sequence number assigned to the delivered frame
    pub frame_id: u64,
    /// The consumer asks the codec to skip its next frame
    pub drop_next_frame: bool,
}

impl CallbackResult {
    pub fn ok(frame_id: u64) -> Self {
        Self {
            status: CallbackStatus::Ok,
            frame_id,
            drop_next_frame: false,
        }
    }

    pub fn send_failed(frame_id: u64) -> Self {
        Self {
            status: CallbackStatus::SendFailed,
            frame_id,
            drop_next_frame: false,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == CallbackStatus::Ok
    }
}

/// Receives a codec's output
///
/// May be called from the codec's own thread.
pub trait EncodedImageCallback: Send + Sync {
    fn on_encoded_image(&self, image: EncodedImage) -> CallbackResult;
}

/// A concrete video codec
///
/// Output is delivered through the registered callback, either from within
/// `encode` or later from a codec thread.
pub trait VideoEncoder: Send {
    fn init(
        &mut self,
        property: &CodecProperty,
        settings: &EncoderSettings,
    ) -> Result<(), EncoderError>;

    fn register_complete_callback(&mut self, callback: Arc<dyn EncodedImageCallback>);

    fn encode(&mut self, frame: &VideoFrame) -> Result<(), EncoderError>;

    /// Make the next output a key frame
    fn request_key_frame(&mut self);

    fn release(&mut self);
}

/// Creates codecs on demand
pub trait VideoEncoderFactory: Send + Sync {
    /// A fresh codec for `codec`, or None if it is not supported
    fn create(&self, codec: VideoCodec) -> Option<Box<dyn VideoEncoder>>;
}
