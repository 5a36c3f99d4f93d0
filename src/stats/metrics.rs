//! Statistics and metrics for the video pipeline

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::frame::EncodedFrame;

/// Capturer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapturerStats {
    /// Frames delivered by the upstream source
    pub frames_received: u64,
    /// Frames broadcast to at least one sink
    pub frames_sent: u64,
    /// Frames returned by the frame processor
    pub frames_processed: u64,
}

impl CapturerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames received but never broadcast
    pub fn frames_dropped(&self) -> u64 {
        self.frames_received.saturating_sub(self.frames_sent)
    }
}

/// Lifecycle state of an adaptive encoder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncoderState {
    /// Not attached to its source
    #[default]
    Idle,
    /// Attached, waiting for a frame to (re)configure the codec
    Pending,
    /// Codec initialised and encoding
    Encoding,
    /// Codec init failed; inert until the next configure
    Failed,
    /// Terminal
    Stopped,
}

impl std::fmt::Display for EncoderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EncoderState::Idle => "idle",
            EncoderState::Pending => "pending",
            EncoderState::Encoding => "encoding",
            EncoderState::Failed => "failed",
            EncoderState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Adaptive encoder counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStats {
    /// Calls to the codec's init
    pub init_calls: u64,
    /// Init calls that failed
    pub init_failures: u64,
    /// Frames accepted by the codec
    pub frames_encoded: u64,
    /// Frames the codec rejected
    pub encode_failures: u64,
    /// Frames received while no codec was usable
    pub frames_dropped: u64,
    /// Key frames requested from the codec
    pub key_frames_requested: u64,
    /// Current state
    pub state: EncoderState,
}

/// Stream sender snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSenderStats {
    /// Encoded frames broadcast
    pub frames: u64,
    /// Key frames among them
    pub key_frames: u64,
    /// Payload bytes broadcast
    pub bytes: u64,
    /// Consumers currently attached
    pub consumers: usize,
    /// Time since the sender was created
    pub uptime: Duration,
}

impl StreamSenderStats {
    /// Average bitrate in bits per second since creation
    pub fn bitrate(&self) -> u64 {
        let secs = self.uptime.as_secs();
        if secs > 0 {
            (self.bytes * 8) / secs
        } else {
            0
        }
    }
}

/// Counters shared between a sender's producer and its readers
#[derive(Debug)]
pub struct SenderCounters {
    created_at: Instant,
    frames: AtomicU64,
    key_frames: AtomicU64,
    bytes: AtomicU64,
}

impl SenderCounters {
    pub fn new() -> Self {
        Self {
            created_at: Instant::now(),
            frames: AtomicU64::new(0),
            key_frames: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Account for one broadcast frame
    pub fn record(&self, frame: &EncodedFrame) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        if frame.is_keyframe {
            self.key_frames.fetch_add(1, Ordering::Relaxed);
        }
        self.bytes.fetch_add(frame.size() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self, consumers: usize) -> StreamSenderStats {
        StreamSenderStats {
            frames: self.frames.load(Ordering::Relaxed),
            key_frames: self.key_frames.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            consumers,
            uptime: self.created_at.elapsed(),
        }
    }
}

impl Default for SenderCounters {
    fn default() -> Self {
        Self::new()
    }
}
