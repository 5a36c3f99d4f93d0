//! Demand-driven send stream

use std::sync::Arc;

use parking_lot::Mutex;

use super::config::SendStreamConfig;
use crate::encoder::{AdaptiveEncoder, EncoderConfig, VideoEncoderFactory};
use crate::error::Result;
use crate::frame::{EncodedFrame, StreamId, VideoFrame};
use crate::graph::{SinkRef, Source};
use crate::stats::{EncoderStats, StreamSenderStats};
use crate::transport::{StreamSender, Transport};

/// One encoder publishing into one stream sender
///
/// The encoder is attached to the video source only while the stream is
/// started and has at least one consumer. A joining consumer triggers a key
/// frame request so it does not wait for the next natural refresh.
pub struct SendStream {
    stream_id: StreamId,
    transport: Arc<Transport>,
    sender: Arc<StreamSender>,
    encoder: AdaptiveEncoder,
    key_frame_on_join: bool,
    max_payload_len: usize,
    /// Serializes consumer changes with start/stop so encoder commands are
    /// posted in the same order the demand changed
    state: Mutex<DemandState>,
}

#[derive(Debug, Default)]
struct DemandState {
    started: bool,
    encoding: bool,
}

impl SendStream {
    /// Create a stopped send stream
    ///
    /// The stream's sender is created in `transport` if it does not exist yet.
    pub fn new(
        config: SendStreamConfig,
        source: Arc<dyn Source<VideoFrame>>,
        transport: Arc<Transport>,
        factory: Arc<dyn VideoEncoderFactory>,
    ) -> Self {
        let stream_id = config.stream_id;
        let sender = transport.get_video_stream_sender(stream_id);
        let output: SinkRef<EncodedFrame> = Arc::clone(&sender) as SinkRef<EncodedFrame>;

        let max_payload_len = config.settings.max_payload_len;
        let encoder = AdaptiveEncoder::new(stream_id, source, factory, output, config.settings);
        encoder.configure(config.encoder, max_payload_len);

        tracing::info!(stream = %stream_id, "Send stream created");

        Self {
            stream_id,
            transport,
            sender,
            encoder,
            key_frame_on_join: config.key_frame_on_join,
            max_payload_len,
            state: Mutex::new(DemandState::default()),
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// The sender consumers receive encoded frames from
    pub fn sender(&self) -> &Arc<StreamSender> {
        &self.sender
    }

    pub fn consumer_count(&self) -> usize {
        self.sender.consumer_count()
    }

    /// Allow encoding whenever consumers are attached
    pub fn start(&self) {
        let mut state = self.state.lock();
        state.started = true;
        self.update_encoder(&mut state);
    }

    /// Stop encoding regardless of consumers
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.started = false;
        self.update_encoder(&mut state);
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// Whether the encoder is currently attached to the source
    pub fn is_encoding(&self) -> bool {
        self.state.lock().encoding
    }

    /// Attach a downstream consumer
    pub fn add_consumer(&self, sink: SinkRef<EncodedFrame>) {
        let mut state = self.state.lock();
        let first = self.transport.add_video_sink(self.stream_id, sink);
        if first {
            tracing::debug!(stream = %self.stream_id, "First consumer joined");
        }
        self.update_encoder(&mut state);

        if self.key_frame_on_join && state.encoding {
            self.encoder.send_key_frame();
        }
    }

    /// Detach a downstream consumer
    ///
    /// Panics if `sink` was never added. Must not be called from a consumer's
    /// `on_frame`: it takes the stream's demand lock, which `add_consumer`
    /// holds while attaching to the sender.
    pub fn remove_consumer(&self, sink: &SinkRef<EncodedFrame>) {
        let mut state = self.state.lock();
        let empty = self.transport.remove_video_sink(self.stream_id, sink);
        if empty {
            tracing::debug!(stream = %self.stream_id, "Last consumer left");
        }
        self.update_encoder(&mut state);
    }

    /// Ask the encoder for a key frame
    pub fn request_key_frame(&self) {
        self.encoder.send_key_frame();
    }

    /// Replace the encoder configuration
    pub fn reconfigure(&self, config: EncoderConfig) {
        self.encoder.configure(config, self.max_payload_len);
    }

    pub async fn encoder_stats(&self) -> Result<EncoderStats> {
        self.encoder.stats().await
    }

    pub fn sender_stats(&self) -> StreamSenderStats {
        self.sender.stats()
    }

    /// Stop the encoder and remove the stream's sender from the transport
    pub fn close(self) {
        self.encoder.stop();
        self.transport.remove_video_stream_sender(self.stream_id);
        tracing::info!(stream = %self.stream_id, "Send stream closed");
    }

    fn update_encoder(&self, state: &mut DemandState) {
        let wanted = state.started && self.sender.frame_wanted();
        if wanted == state.encoding {
            return;
        }

        state.encoding = wanted;
        if wanted {
            tracing::info!(
                stream = %self.stream_id,
                consumers = self.sender.consumer_count(),
                "Encoding started"
            );
            self.encoder.start();
        } else {
            tracing::info!(stream = %self.stream_id, "Encoding suspended");
            self.encoder.suspend();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Broadcaster, Sink};
    use crate::stats::EncoderState;
    use crate::testing::{pattern_frame, CollectingSink, FakeEncoderFactory};

    struct Fixture {
        source: Arc<Broadcaster<VideoFrame>>,
        transport: Arc<Transport>,
        factory: Arc<FakeEncoderFactory>,
        stream: SendStream,
    }

    fn fixture() -> Fixture {
        let source: Arc<Broadcaster<VideoFrame>> = Arc::new(Broadcaster::new());
        let transport = Arc::new(Transport::new());
        let factory = Arc::new(FakeEncoderFactory::new());
        let stream = SendStream::new(
            SendStreamConfig::new(StreamId(0)),
            source.clone(),
            Arc::clone(&transport),
            factory.clone(),
        );
        Fixture {
            source,
            transport,
            factory,
            stream,
        }
    }

    #[tokio::test]
    async fn test_encodes_only_with_consumers() {
        let f = fixture();
        f.stream.start();
        assert!(!f.stream.is_encoding());
        assert!(!f.source.frame_wanted());

        let consumer: Arc<CollectingSink<EncodedFrame>> = Arc::new(CollectingSink::new());
        let handle: SinkRef<EncodedFrame> = consumer.clone();
        f.stream.add_consumer(handle.clone());
        f.stream.encoder_stats().await.unwrap();
        assert!(f.stream.is_encoding());
        assert!(f.source.frame_wanted());

        f.source.on_frame(pattern_frame(64, 48, 0));
        f.stream.encoder_stats().await.unwrap();
        assert_eq!(consumer.count(), 1);
        assert!(consumer.frames()[0].is_keyframe);

        f.stream.remove_consumer(&handle);
        let stats = f.stream.encoder_stats().await.unwrap();
        assert!(!f.stream.is_encoding());
        assert!(!f.source.frame_wanted());
        assert_eq!(stats.state, EncoderState::Idle);
        assert_eq!(f.factory.releases(), 1);
    }

    #[tokio::test]
    async fn test_stopped_stream_does_not_encode() {
        let f = fixture();
        let consumer: SinkRef<EncodedFrame> = Arc::new(CollectingSink::new());
        f.stream.add_consumer(consumer);
        f.stream.encoder_stats().await.unwrap();
        assert!(!f.stream.is_encoding());
        assert!(!f.source.frame_wanted());

        f.stream.start();
        f.stream.encoder_stats().await.unwrap();
        assert!(f.source.frame_wanted());

        f.stream.stop();
        f.stream.encoder_stats().await.unwrap();
        assert!(!f.source.frame_wanted());
        assert!(!f.stream.is_started());
    }

    #[tokio::test]
    async fn test_joining_consumer_requests_key_frame() {
        let f = fixture();
        f.stream.start();
        let first: Arc<CollectingSink<EncodedFrame>> = Arc::new(CollectingSink::new());
        f.stream.add_consumer(first.clone());
        f.source.on_frame(pattern_frame(64, 48, 0));
        f.source.on_frame(pattern_frame(64, 48, 1));

        let second: Arc<CollectingSink<EncodedFrame>> = Arc::new(CollectingSink::new());
        f.stream.add_consumer(second.clone());
        f.source.on_frame(pattern_frame(64, 48, 2));
        let stats = f.stream.encoder_stats().await.unwrap();

        assert!(stats.key_frames_requested >= 1);
        assert_eq!(second.count(), 1);
        assert!(second.frames()[0].is_keyframe);
        let keys: Vec<bool> = first.frames().iter().map(|frame| frame.is_keyframe).collect();
        assert_eq!(keys, vec![true, false, true]);
    }

    #[tokio::test]
    async fn test_close_removes_sender() {
        let f = fixture();
        assert_eq!(f.transport.video_stream_count(), 1);
        assert_eq!(f.stream.sender().stream_id(), StreamId(0));

        f.stream.close();
        assert_eq!(f.transport.video_stream_count(), 0);
        assert!(!f.transport.frame_wanted(StreamId(0)));
    }

    #[tokio::test]
    async fn test_reconfigure_reinitialises() {
        let f = fixture();
        f.stream.start();
        let consumer: SinkRef<EncodedFrame> = Arc::new(CollectingSink::new());
        f.stream.add_consumer(consumer);
        f.source.on_frame(pattern_frame(64, 48, 0));
        f.stream.encoder_stats().await.unwrap();
        assert_eq!(f.factory.init_calls(), 1);

        f.stream.reconfigure(EncoderConfig::default().max_bitrate(300));
        f.stream.encoder_stats().await.unwrap();
        assert_eq!(f.factory.init_calls(), 2);
        assert_eq!(f.factory.last_property().map(|p| p.max_bitrate_kbps), Some(300));
    }
}
