//! Frame processing hook

use tokio::sync::mpsc;

use super::capturer::Command;
use crate::frame::VideoFrame;

/// Transforms captured frames before they are fanned out
///
/// A processor may work asynchronously: it hands each result to the
/// [`ProcessedFrameSink`] whenever it is ready, from any thread. Frames it
/// never returns are simply not broadcast.
pub trait FrameProcessor: Send + Sync {
    fn process(&self, frame: VideoFrame, output: ProcessedFrameSink);
}

/// Return path from a [`FrameProcessor`] back into its capturer
#[derive(Clone)]
pub struct ProcessedFrameSink {
    tx: mpsc::WeakUnboundedSender<Command>,
}

impl ProcessedFrameSink {
    pub(crate) fn new(tx: mpsc::WeakUnboundedSender<Command>) -> Self {
        Self { tx }
    }

    /// Hand a processed frame back for broadcast
    ///
    /// Returns false if the capturer has shut down.
    pub fn deliver(&self, frame: VideoFrame) -> bool {
        match self.tx.upgrade() {
            Some(tx) => tx.send(Command::Processed(frame)).is_ok(),
            None => false,
        }
    }
}

impl std::fmt::Debug for ProcessedFrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessedFrameSink").finish_non_exhaustive()
    }
}
