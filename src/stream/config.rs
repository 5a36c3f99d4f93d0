//! Send stream configuration

use crate::encoder::{EncoderConfig, EncoderSettings};
use crate::frame::StreamId;

/// Send stream configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendStreamConfig {
    /// Stream the encoded output is published under
    pub stream_id: StreamId,

    /// Encoder configuration
    pub encoder: EncoderConfig,

    /// Codec runtime settings (payload size, threads)
    pub settings: EncoderSettings,

    /// Request a key frame whenever a consumer joins
    pub key_frame_on_join: bool,
}

impl Default for SendStreamConfig {
    fn default() -> Self {
        Self {
            stream_id: StreamId(0),
            encoder: EncoderConfig::default(),
            settings: EncoderSettings::default(),
            key_frame_on_join: true,
        }
    }
}

impl SendStreamConfig {
    /// Create a config for `stream_id` with defaults
    pub fn new(stream_id: StreamId) -> Self {
        Self {
            stream_id,
            ..Default::default()
        }
    }

    /// Set the encoder configuration
    pub fn encoder(mut self, encoder: EncoderConfig) -> Self {
        self.encoder = encoder;
        self
    }

    /// Set the max payload length
    pub fn max_payload_len(mut self, len: usize) -> Self {
        self.settings.max_payload_len = len;
        self
    }

    /// Set the number of codec threads
    pub fn cores(mut self, cores: usize) -> Self {
        self.settings.number_of_cores = cores.max(1);
        self
    }

    /// Don't request key frames when consumers join
    pub fn disable_key_frame_on_join(mut self) -> Self {
        self.key_frame_on_join = false;
        self
    }
}
