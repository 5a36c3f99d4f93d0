//! Demand-driven video encoding
//!
//! An [`AdaptiveEncoder`] sits between a raw video source and one stream's
//! sender. It owns a codec obtained from a [`VideoEncoderFactory`] and keeps
//! it configured for whatever the source is currently producing:
//!
//! ```text
//!   configure ──► pending_reconfiguration ──┐
//!   frame size/type change ─────────────────┤
//!                                           ▼
//!   frame ──► reconfigure (create? + init) ──► encode ──► EncodedImageCallback
//! ```
//!
//! Concrete codecs live outside this crate and plug in through the
//! [`VideoEncoder`] trait. Layer and bitrate policy is computed by
//! [`derive_stream_configs`] and [`build_codec_property`].

pub mod adaptive;
pub mod codec;
pub mod config;

pub use adaptive::AdaptiveEncoder;
pub use codec::{
    CallbackResult, CallbackStatus, EncodedImage, EncodedImageCallback, EncoderSettings,
    VideoEncoder, VideoEncoderFactory,
};
pub use config::{
    build_codec_property, derive_stream_configs, max_default_bitrate_kbps, CodecProperty,
    ContentType, EncoderConfig, StreamConfig, VideoCodec,
};
