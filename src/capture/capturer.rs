//! Capturer actor

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::processor::{FrameProcessor, ProcessedFrameSink};
use crate::error::{Error, Result};
use crate::frame::VideoFrame;
use crate::graph::{Broadcaster, Sink, SinkRef, SinkWants, Source};
use crate::stats::CapturerStats;

pub(crate) enum Command {
    SetSource {
        source: Arc<dyn Source<VideoFrame>>,
        wants: SinkWants,
    },
    SetProcessor(Option<Arc<dyn FrameProcessor>>),
    Frame(VideoFrame),
    Processed(VideoFrame),
    AddSink {
        sink: SinkRef<VideoFrame>,
        wants: SinkWants,
    },
    RemoveSink(SinkRef<VideoFrame>),
    Stats(oneshot::Sender<CapturerStats>),
    Stop,
}

/// Handle to a capturer actor
///
/// Cloning the handle is cheap; all clones talk to the same actor. The actor
/// shuts down when [`stop`](Self::stop) is called or every handle is dropped,
/// detaching itself from its upstream source.
#[derive(Clone)]
pub struct Capturer {
    tx: mpsc::UnboundedSender<Command>,
}

impl Capturer {
    /// Spawn a capturer on the current tokio runtime
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let weak = tx.downgrade();
        let input: SinkRef<VideoFrame> = Arc::new(CapturerInput { tx: weak.clone() });

        let actor = CapturerActor {
            rx,
            weak,
            input,
            source: None,
            source_wants: SinkWants::default(),
            processor: None,
            broadcaster: Broadcaster::new(),
            stats: CapturerStats::new(),
        };
        tokio::spawn(actor.run());

        Self { tx }
    }

    /// Replace the upstream source
    ///
    /// The previous source, if any, is detached first. `wants` is combined
    /// with the wants of the capturer's own sinks before it is sent upstream.
    pub fn set_video_source(&self, source: Arc<dyn Source<VideoFrame>>, wants: SinkWants) {
        self.post(Command::SetSource { source, wants });
    }

    /// Route frames through `processor` before fan-out, or stop doing so
    pub fn set_frame_processor(&self, processor: Option<Arc<dyn FrameProcessor>>) {
        self.post(Command::SetProcessor(processor));
    }

    /// Current counters
    pub async fn stats(&self) -> Result<CapturerStats> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Stats(reply))
            .map_err(|_| Error::ActorClosed("capturer"))?;
        rx.await.map_err(|_| Error::ActorClosed("capturer"))
    }

    /// Detach from the source and shut the actor down
    pub fn stop(&self) {
        self.post(Command::Stop);
    }

    /// Whether the actor is still accepting commands
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    fn post(&self, command: Command) {
        if self.tx.send(command).is_err() {
            tracing::debug!("Capturer is stopped, command dropped");
        }
    }
}

impl Default for Capturer {
    fn default() -> Self {
        Self::new()
    }
}

impl Source<VideoFrame> for Capturer {
    fn add_or_update_sink(&self, sink: SinkRef<VideoFrame>, wants: SinkWants) {
        self.post(Command::AddSink { sink, wants });
    }

    fn remove_sink(&self, sink: &SinkRef<VideoFrame>) {
        self.post(Command::RemoveSink(SinkRef::clone(sink)));
    }
}

/// The sink a capturer registers with its upstream source
struct CapturerInput {
    tx: mpsc::WeakUnboundedSender<Command>,
}

impl Sink<VideoFrame> for CapturerInput {
    fn on_frame(&self, frame: VideoFrame) {
        if let Some(tx) = self.tx.upgrade() {
            let _ = tx.send(Command::Frame(frame));
        }
    }
}

struct CapturerActor {
    rx: mpsc::UnboundedReceiver<Command>,
    weak: mpsc::WeakUnboundedSender<Command>,
    input: SinkRef<VideoFrame>,
    source: Option<Arc<dyn Source<VideoFrame>>>,
    source_wants: SinkWants,
    processor: Option<Arc<dyn FrameProcessor>>,
    broadcaster: Broadcaster<VideoFrame>,
    stats: CapturerStats,
}

impl CapturerActor {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::SetSource { source, wants } => self.set_source(source, wants),
                Command::SetProcessor(processor) => {
                    tracing::debug!(enabled = processor.is_some(), "Frame processor updated");
                    self.processor = processor;
                }
                Command::Frame(frame) => self.on_frame(frame),
                Command::Processed(frame) => {
                    self.stats.frames_processed += 1;
                    self.fan_out(frame);
                }
                Command::AddSink { sink, wants } => {
                    self.broadcaster.add_or_update_sink(sink, wants);
                    self.update_upstream();
                }
                Command::RemoveSink(sink) => {
                    self.broadcaster.remove_sink(&sink);
                    self.update_upstream();
                }
                Command::Stats(reply) => {
                    let _ = reply.send(self.stats);
                }
                Command::Stop => break,
            }
        }

        if let Some(source) = self.source.take() {
            source.remove_sink(&self.input);
        }
        tracing::debug!(
            received = self.stats.frames_received,
            sent = self.stats.frames_sent,
            "Capturer stopped"
        );
    }

    fn set_source(&mut self, source: Arc<dyn Source<VideoFrame>>, wants: SinkWants) {
        if let Some(previous) = self.source.take() {
            previous.remove_sink(&self.input);
        }

        self.source_wants = wants;
        self.source = Some(source);
        self.update_upstream();
        tracing::debug!(sinks = self.broadcaster.sink_count(), "Video source attached");
    }

    fn on_frame(&mut self, frame: VideoFrame) {
        self.stats.frames_received += 1;

        if let Some(processor) = &self.processor {
            processor.process(frame, ProcessedFrameSink::new(self.weak.clone()));
            return;
        }

        self.fan_out(frame);
    }

    fn fan_out(&mut self, frame: VideoFrame) {
        if !self.broadcaster.frame_wanted() {
            tracing::trace!(frame_id = frame.id(), "No sinks, frame dropped");
            return;
        }

        self.stats.frames_sent += 1;
        self.broadcaster.on_frame(frame);
    }

    fn update_upstream(&self) {
        if let Some(source) = &self.source {
            let wants = self.source_wants.merged(&self.broadcaster.wants());
            source.add_or_update_sink(SinkRef::clone(&self.input), wants);
        }
    }
}
