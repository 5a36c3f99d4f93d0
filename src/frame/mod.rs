//! Frames flowing through the pipeline
//!
//! Two kinds of frames move through the routing graph:
//!
//! - [`VideoFrame`]: a raw picture straight from capture. It holds its pixels
//!   through an `Arc<dyn PixelBuffer>`, so copying a frame never copies pixels.
//! - [`EncodedFrame`]: compressed output of an encoder, tagged with the stream
//!   it belongs to. The payload is `bytes::Bytes`, again shared rather than
//!   copied on fan-out.

pub mod encoded;
pub mod video;

pub use encoded::{CodecId, EncodedFrame, MediaKind, StreamId};
pub use video::VideoFrame;
