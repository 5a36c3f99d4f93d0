//! Adaptive encoder actor
//!
//! Subscribes to a video source and drives one codec for one stream. The codec
//! is created and initialised lazily: parameters depend on the frame size, so
//! nothing happens until a frame has been seen. A change in frame size or
//! buffer type, or a new configuration, re-runs initialisation before the next
//! frame is encoded.
//!
//! All state lives in the actor task; configuration and frames for one stream
//! go through the same queue, so at most one reconfiguration is in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::codec::{
    CallbackResult, EncodedImage, EncodedImageCallback, EncoderSettings, VideoEncoder,
    VideoEncoderFactory,
};
use super::config::{build_codec_property, derive_stream_configs, EncoderConfig};
use crate::buffer::BufferType;
use crate::error::{Error, Result};
use crate::frame::{EncodedFrame, StreamId, VideoFrame};
use crate::graph::{Sink, SinkRef, SinkWants, Source};
use crate::stats::{EncoderState, EncoderStats};

enum Command {
    Start,
    Suspend,
    Configure {
        config: EncoderConfig,
        max_payload_len: usize,
    },
    Frame(VideoFrame),
    KeyFrame,
    Stats(oneshot::Sender<EncoderStats>),
    Stop,
}

/// Handle to an adaptive encoder actor
#[derive(Clone)]
pub struct AdaptiveEncoder {
    stream_id: StreamId,
    tx: mpsc::UnboundedSender<Command>,
}

impl AdaptiveEncoder {
    /// Spawn an encoder for `stream_id` on the current tokio runtime
    ///
    /// The encoder stays detached from `source` until [`start`](Self::start).
    /// Encoded frames are delivered to `output`.
    pub fn new(
        stream_id: StreamId,
        source: Arc<dyn Source<VideoFrame>>,
        factory: Arc<dyn VideoEncoderFactory>,
        output: SinkRef<EncodedFrame>,
        settings: EncoderSettings,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let input: SinkRef<VideoFrame> = Arc::new(EncoderInput {
            tx: tx.downgrade(),
        });

        let actor = EncoderActor {
            rx,
            stream_id,
            input,
            source,
            factory,
            output: Arc::new(EncoderOutput {
                stream_id,
                sink: output,
                next_frame_id: AtomicU64::new(0),
            }),
            settings,
            wants: SinkWants::default(),
            attached: false,
            config: None,
            encoder: None,
            pending_creation: false,
            pending_reconfiguration: false,
            inert: false,
            last_frame_info: None,
            stats: EncoderStats::default(),
        };
        tokio::spawn(actor.run());

        Self { stream_id, tx }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Attach to the source
    pub fn start(&self) {
        self.post(Command::Start);
    }

    /// Detach from the source and release the codec, keeping the configuration
    pub fn suspend(&self) {
        self.post(Command::Suspend);
    }

    /// Apply a new configuration
    ///
    /// Runs immediately if the encoder is attached and has already seen a
    /// frame, otherwise on the next frame.
    pub fn configure(&self, config: EncoderConfig, max_payload_len: usize) {
        self.post(Command::Configure {
            config,
            max_payload_len,
        });
    }

    /// Ask the codec for a key frame; no-op without a codec
    pub fn send_key_frame(&self) {
        self.post(Command::KeyFrame);
    }

    /// Current counters
    pub async fn stats(&self) -> Result<EncoderStats> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Stats(reply))
            .map_err(|_| Error::ActorClosed("encoder"))?;
        rx.await.map_err(|_| Error::ActorClosed("encoder"))
    }

    /// Release the codec and end the actor
    pub fn stop(&self) {
        self.post(Command::Stop);
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    fn post(&self, command: Command) {
        if self.tx.send(command).is_err() {
            tracing::debug!(stream = %self.stream_id, "Encoder is stopped, command dropped");
        }
    }
}

/// Sink registered with the video source
struct EncoderInput {
    tx: mpsc::WeakUnboundedSender<Command>,
}

impl Sink<VideoFrame> for EncoderInput {
    fn on_frame(&self, frame: VideoFrame) {
        if let Some(tx) = self.tx.upgrade() {
            let _ = tx.send(Command::Frame(frame));
        }
    }
}

/// Turns codec output into encoded frames for the stream
struct EncoderOutput {
    stream_id: StreamId,
    sink: SinkRef<EncodedFrame>,
    next_frame_id: AtomicU64,
}

impl EncodedImageCallback for EncoderOutput {
    fn on_encoded_image(&self, image: EncodedImage) -> CallbackResult {
        let frame_id = self.next_frame_id.fetch_add(1, Ordering::Relaxed);
        let mut frame = EncodedFrame::video(
            self.stream_id,
            image.timestamp_us,
            image.data,
            image.is_keyframe,
            image.width,
            image.height,
        );
        frame.qp = image.qp;

        tracing::trace!(
            stream = %self.stream_id,
            frame_id = frame_id,
            size = frame.size(),
            keyframe = frame.is_keyframe,
            "Encoded frame"
        );
        self.sink.on_frame(frame);

        CallbackResult::ok(frame_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameInfo {
    width: u32,
    height: u32,
    buffer_type: Option<BufferType>,
}

impl FrameInfo {
    fn of(frame: &VideoFrame) -> Self {
        Self {
            width: frame.width(),
            height: frame.height(),
            buffer_type: frame.buffer_type(),
        }
    }
}

struct EncoderActor {
    rx: mpsc::UnboundedReceiver<Command>,
    stream_id: StreamId,
    input: SinkRef<VideoFrame>,
    source: Arc<dyn Source<VideoFrame>>,
    factory: Arc<dyn VideoEncoderFactory>,
    output: Arc<EncoderOutput>,
    settings: EncoderSettings,
    wants: SinkWants,
    attached: bool,
    config: Option<EncoderConfig>,
    encoder: Option<Box<dyn VideoEncoder>>,
    pending_creation: bool,
    pending_reconfiguration: bool,
    /// Init failed; nothing is encoded until the next configure
    inert: bool,
    last_frame_info: Option<FrameInfo>,
    stats: EncoderStats,
}

impl EncoderActor {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Start => self.start(),
                Command::Suspend => self.suspend(),
                Command::Configure {
                    config,
                    max_payload_len,
                } => self.configure(config, max_payload_len),
                Command::Frame(frame) => self.on_frame(frame),
                Command::KeyFrame => self.send_key_frame(),
                Command::Stats(reply) => {
                    let _ = reply.send(self.stats);
                }
                Command::Stop => break,
            }
        }

        self.suspend();
        self.release_encoder();
        self.stats.state = EncoderState::Stopped;
        tracing::info!(
            stream = %self.stream_id,
            encoded = self.stats.frames_encoded,
            "Encoder stopped"
        );
    }

    fn start(&mut self) {
        if self.attached {
            return;
        }

        if let Some(config) = &self.config {
            self.wants = SinkWants::default().max_framerate(config.max_framerate);
        }
        self.source
            .add_or_update_sink(SinkRef::clone(&self.input), self.wants.clone());
        self.attached = true;
        if !self.inert {
            self.stats.state = EncoderState::Pending;
        }
        tracing::debug!(stream = %self.stream_id, "Encoder attached to source");
    }

    fn suspend(&mut self) {
        if !self.attached {
            return;
        }

        self.source.remove_sink(&self.input);
        self.attached = false;
        self.release_encoder();
        self.pending_creation = true;
        self.pending_reconfiguration = true;
        if !self.inert {
            self.stats.state = EncoderState::Idle;
        }
        tracing::debug!(stream = %self.stream_id, "Encoder detached from source");
    }

    fn configure(&mut self, config: EncoderConfig, max_payload_len: usize) {
        let codec_changed = self.config.as_ref().map_or(false, |c| c.codec != config.codec);
        if self.encoder.is_none()
            || max_payload_len != self.settings.max_payload_len
            || codec_changed
        {
            self.pending_creation = true;
        }

        tracing::debug!(
            stream = %self.stream_id,
            codec = %config.codec,
            max_payload_len = max_payload_len,
            "Encoder configured"
        );

        if self.attached && config.max_framerate != self.wants.max_framerate_fps {
            self.wants = SinkWants::default().max_framerate(config.max_framerate);
            self.source
                .add_or_update_sink(SinkRef::clone(&self.input), self.wants.clone());
        }

        self.settings.max_payload_len = max_payload_len;
        self.config = Some(config);
        self.pending_reconfiguration = true;
        self.inert = false;
        if self.attached {
            self.stats.state = EncoderState::Pending;
        }

        if self.attached && self.last_frame_info.is_some() {
            self.reconfigure();
        }
    }

    fn on_frame(&mut self, frame: VideoFrame) {
        if !self.attached {
            // Posted before the encoder detached
            return;
        }

        let info = FrameInfo::of(&frame);
        if self.last_frame_info != Some(info) {
            if self.last_frame_info.is_some() {
                tracing::debug!(
                    stream = %self.stream_id,
                    width = info.width,
                    height = info.height,
                    "Frame format changed"
                );
            }
            self.last_frame_info = Some(info);
            self.pending_reconfiguration = true;
        }

        if self.config.is_none() || self.inert {
            self.stats.frames_dropped += 1;
            return;
        }

        if self.pending_reconfiguration {
            self.reconfigure();
        }

        let Some(encoder) = self.encoder.as_mut() else {
            self.stats.frames_dropped += 1;
            return;
        };

        match encoder.encode(&frame) {
            Ok(()) => self.stats.frames_encoded += 1,
            Err(e) => {
                self.stats.encode_failures += 1;
                tracing::warn!(
                    stream = %self.stream_id,
                    frame_id = frame.id(),
                    error = %e,
                    "Encode failed, skipping frame"
                );
            }
        }
    }

    fn send_key_frame(&mut self) {
        match self.encoder.as_mut() {
            Some(encoder) => {
                encoder.request_key_frame();
                self.stats.key_frames_requested += 1;
                tracing::debug!(stream = %self.stream_id, "Key frame requested");
            }
            None => tracing::trace!(stream = %self.stream_id, "Key frame request without encoder"),
        }
    }

    fn reconfigure(&mut self) {
        let (Some(config), Some(info)) = (self.config.clone(), self.last_frame_info) else {
            return;
        };

        if self.pending_creation {
            self.release_encoder();
            let mut encoder = match self.factory.create(config.codec) {
                Some(encoder) => encoder,
                None => panic!("encoder factory has no {} encoder", config.codec),
            };
            let callback: Arc<dyn EncodedImageCallback> = self.output.clone();
            encoder.register_complete_callback(callback);
            self.encoder = Some(encoder);
            self.pending_creation = false;
            tracing::info!(stream = %self.stream_id, codec = %config.codec, "Encoder created");
        }

        let Some(encoder) = self.encoder.as_mut() else {
            return;
        };

        let streams = derive_stream_configs(info.width, info.height, &config);
        let property = build_codec_property(&config, &streams);

        self.stats.init_calls += 1;
        self.pending_reconfiguration = false;
        match encoder.init(&property, &self.settings) {
            Ok(()) => {
                self.stats.state = EncoderState::Encoding;
                tracing::info!(
                    stream = %self.stream_id,
                    width = property.width,
                    height = property.height,
                    layers = streams.len(),
                    max_kbps = property.max_bitrate_kbps,
                    "Encoder initialised"
                );
            }
            Err(e) => {
                self.stats.init_failures += 1;
                self.stats.state = EncoderState::Failed;
                self.inert = true;
                tracing::error!(
                    stream = %self.stream_id,
                    error = %e,
                    "Encoder init failed, waiting for a new configuration"
                );
                self.release_encoder();
            }
        }
    }

    fn release_encoder(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            encoder.release();
            tracing::info!(stream = %self.stream_id, "Encoder released");
        }
    }
}

impl Drop for EncoderActor {
    // Also runs when the task unwinds from a panic
    fn drop(&mut self) {
        if self.attached {
            self.source.remove_sink(&self.input);
            self.attached = false;
            tracing::warn!(stream = %self.stream_id, "Encoder task ended while attached");
        }
        self.release_encoder();
    }
}
