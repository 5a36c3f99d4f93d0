//! Stream-sender registry
//!
//! Encoded output leaves the pipeline through a [`StreamSender`], one per
//! logical stream. The [`Transport`] keeps them keyed by stream id (video) or
//! by stream id and codec (audio) and creates them on first use.
//!
//! ```text
//!   AdaptiveEncoder ──► StreamSender(stream-0) ──► packetizer A
//!                                              └─► packetizer B
//!   AdaptiveEncoder ──► StreamSender(stream-1) ──► recorder
//! ```
//!
//! # Zero-Copy Design
//!
//! Encoded payloads are `bytes::Bytes`, so every consumer of a sender shares
//! the same allocation; fan-out clones only the reference count.

pub mod registry;
pub mod sender;

pub use registry::Transport;
pub use sender::StreamSender;
