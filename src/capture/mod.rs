//! Video capture
//!
//! The [`Capturer`] actor owns one upstream source and fans its frames out to
//! registered sinks, optionally through a [`FrameProcessor`]. Upstream sources
//! are usually a [`DeviceSource`], which drives a pull-style
//! [`CaptureDevice`] on a blocking thread:
//!
//! ```text
//!   CaptureDevice ──read──► DeviceSource ──► Capturer ──► sinks
//!                                              │  ▲
//!                                              ▼  │
//!                                        FrameProcessor
//! ```
//!
//! Every mutating capturer operation is a command posted to the actor's
//! queue, so the capturer's state is only touched by its own worker task.

pub mod capturer;
pub mod device;
pub mod processor;

pub use capturer::Capturer;
pub use device::{CaptureDevice, CaptureParams, CapturedSample, DeviceSource};
pub use processor::{FrameProcessor, ProcessedFrameSink};
