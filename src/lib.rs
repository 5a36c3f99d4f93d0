//! Video pipeline core for IP cameras
//!
//! Raw pictures flow from a capture device through a [`Capturer`] to one
//! [`AdaptiveEncoder`] per logical stream, and the encoded output fans out to
//! downstream consumers through the [`Transport`]:
//!
//! ```text
//!   CaptureDevice ─► DeviceSource ─► Capturer ─┬─► SendStream(0): AdaptiveEncoder ─► StreamSender ─► consumers
//!                                              └─► SendStream(1): AdaptiveEncoder ─► StreamSender ─► consumers
//! ```
//!
//! Encoders run only while their stream has at least one consumer.
//!
//! # Modules
//!
//! - [`buffer`]: pixel memory (`Planar8`, `Biplanar8`, `Packed8`), conversion, crop and scale
//! - [`frame`]: raw [`VideoFrame`]s and [`EncodedFrame`]s
//! - [`graph`]: `Source`/`Sink` traits and the [`Broadcaster`]
//! - [`capture`]: the capturer actor and pull-style devices
//! - [`encoder`]: the adaptive encoder and the codec boundary
//! - [`transport`]: per-stream senders
//! - [`stream`]: send streams with demand-driven encoding
//! - [`stats`]: counters reported by each stage
//! - [`testing`]: deterministic fakes for tests and demos

pub mod buffer;
pub mod capture;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod graph;
pub mod stats;
pub mod stream;
pub mod testing;
pub mod transport;

pub use buffer::{Biplanar8, BufferType, CropRect, Packed8, PixelBuffer, PixelFormat, Planar8};
pub use capture::{CaptureDevice, CaptureParams, Capturer, DeviceSource};
pub use encoder::{AdaptiveEncoder, EncoderConfig, VideoCodec, VideoEncoder, VideoEncoderFactory};
pub use error::{Error, Result};
pub use frame::{CodecId, EncodedFrame, StreamId, VideoFrame};
pub use graph::{Broadcaster, Sink, SinkRef, SinkWants, Source};
pub use stream::{SendStream, SendStreamConfig};
pub use transport::{StreamSender, Transport};
