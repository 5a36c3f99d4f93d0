//! Send streams
//!
//! A [`SendStream`] ties one logical stream together: an
//! [`AdaptiveEncoder`](crate::encoder::AdaptiveEncoder) reading from a video
//! source and the stream's [`StreamSender`](crate::transport::StreamSender)
//! in the [`Transport`](crate::transport::Transport). Encoding only runs while
//! the stream is started and at least one consumer is attached.

pub mod config;
pub mod send;

pub use config::SendStreamConfig;
pub use send::SendStream;
