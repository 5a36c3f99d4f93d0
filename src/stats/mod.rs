//! Pipeline statistics
//!
//! Snapshot types reported by the capturer, the adaptive encoder and the
//! stream senders, plus the lock-free counters the senders record into.

pub mod metrics;

pub use metrics::{CapturerStats, EncoderState, EncoderStats, SenderCounters, StreamSenderStats};
