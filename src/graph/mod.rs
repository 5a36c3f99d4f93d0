//! Publish/subscribe routing graph
//!
//! Every stage of the pipeline is wired together with the same two traits,
//! written once and instantiated per frame type (raw [`VideoFrame`]s and
//! [`EncodedFrame`]s):
//!
//! ```text
//!   Source<T> ──on_frame──► Broadcaster<T> ──on_frame──► Sink<T>  (A)
//!                           (Source + Sink)  ──on_frame──► Sink<T>  (B)
//!                                            ──on_frame──► Sink<T>  (C)
//! ```
//!
//! A [`Broadcaster`] is both a sink (it receives one stream) and a source (it
//! serves many registered sinks). Delivery is synchronous and follows
//! registration order.
//!
//! [`VideoFrame`]: crate::frame::VideoFrame
//! [`EncodedFrame`]: crate::frame::EncodedFrame

pub mod broadcaster;
pub mod sink;
pub mod source_base;

pub use broadcaster::Broadcaster;
pub use sink::{same_sink, Sink, SinkRef, SinkWants, Source};
pub use source_base::{SinkPair, SourceBase};
