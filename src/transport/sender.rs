//! Per-stream fan-out of encoded frames

use crate::frame::{EncodedFrame, MediaKind, StreamId};
use crate::graph::{Broadcaster, Sink, SinkRef, SinkWants, Source};
use crate::stats::{SenderCounters, StreamSenderStats};

/// Broadcasts one stream's encoded frames to its consumers
///
/// Encoders push into it from their own task while protocol servers attach
/// and detach consumers from theirs; the broadcaster's mutex serializes both.
pub struct StreamSender {
    stream_id: StreamId,
    kind: MediaKind,
    broadcaster: Broadcaster<EncodedFrame>,
    counters: SenderCounters,
}

impl StreamSender {
    pub fn new(stream_id: StreamId, kind: MediaKind) -> Self {
        Self {
            stream_id,
            kind,
            broadcaster: Broadcaster::new(),
            counters: SenderCounters::new(),
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Whether any consumer is attached
    pub fn frame_wanted(&self) -> bool {
        self.broadcaster.frame_wanted()
    }

    pub fn consumer_count(&self) -> usize {
        self.broadcaster.sink_count()
    }

    /// Attach a consumer; true if it is the first one
    pub fn attach(&self, sink: SinkRef<EncodedFrame>) -> bool {
        self.broadcaster.attach(sink, SinkWants::default())
    }

    /// Detach a consumer; true if none remain
    ///
    /// Panics if `sink` is not attached.
    pub fn detach(&self, sink: &SinkRef<EncodedFrame>) -> bool {
        self.broadcaster.detach(sink)
    }

    pub fn stats(&self) -> StreamSenderStats {
        self.counters.snapshot(self.consumer_count())
    }
}

impl Sink<EncodedFrame> for StreamSender {
    fn on_frame(&self, frame: EncodedFrame) {
        if !self.broadcaster.frame_wanted() {
            tracing::trace!(stream = %self.stream_id, "No consumers, encoded frame dropped");
            return;
        }

        self.counters.record(&frame);
        self.broadcaster.on_frame(frame);
    }
}

impl Source<EncodedFrame> for StreamSender {
    fn add_or_update_sink(&self, sink: SinkRef<EncodedFrame>, wants: SinkWants) {
        self.broadcaster.add_or_update_sink(sink, wants);
    }

    fn remove_sink(&self, sink: &SinkRef<EncodedFrame>) {
        self.broadcaster.remove_sink(sink);
    }
}

impl std::fmt::Debug for StreamSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSender")
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .field("consumers", &self.consumer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use parking_lot::Mutex;

    use super::*;
    use crate::testing::CollectingSink;

    fn frame(key: bool, len: usize) -> EncodedFrame {
        EncodedFrame::video(StreamId(0), 0, Bytes::from(vec![0u8; len]), key, 64, 48)
    }

    #[test]
    fn test_fan_out_and_stats() {
        let sender = StreamSender::new(StreamId(0), MediaKind::Video);
        let a: Arc<CollectingSink<EncodedFrame>> = Arc::new(CollectingSink::new());
        let b: Arc<CollectingSink<EncodedFrame>> = Arc::new(CollectingSink::new());

        assert!(sender.attach(a.clone()));
        assert!(!sender.attach(b.clone()));
        assert!(sender.frame_wanted());

        sender.on_frame(frame(true, 100));
        sender.on_frame(frame(false, 10));

        assert_eq!(a.count(), 2);
        assert_eq!(b.count(), 2);
        // Consumers share the payload
        assert_eq!(a.frames()[0].data.as_ptr(), b.frames()[0].data.as_ptr());

        let stats = sender.stats();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.key_frames, 1);
        assert_eq!(stats.bytes, 110);
        assert_eq!(stats.consumers, 2);
    }

    #[test]
    fn test_frames_without_consumers_are_not_counted() {
        let sender = StreamSender::new(StreamId(1), MediaKind::Video);
        sender.on_frame(frame(true, 100));
        assert_eq!(sender.stats().frames, 0);
    }

    #[test]
    fn test_detach_reports_empty() {
        let sender = StreamSender::new(StreamId(0), MediaKind::Video);
        let a: SinkRef<EncodedFrame> = Arc::new(CollectingSink::new());
        let b: SinkRef<EncodedFrame> = Arc::new(CollectingSink::new());
        sender.attach(a.clone());
        sender.attach(b.clone());

        assert!(!sender.detach(&a));
        assert!(sender.detach(&b));
        assert!(!sender.frame_wanted());
    }

    /// Hangs up after the first key frame, like a snapshot consumer
    struct OneShotConsumer {
        sender: Arc<StreamSender>,
        me: Mutex<Option<SinkRef<EncodedFrame>>>,
        received: Mutex<usize>,
    }

    impl Sink<EncodedFrame> for OneShotConsumer {
        fn on_frame(&self, frame: EncodedFrame) {
            *self.received.lock() += 1;
            if frame.is_keyframe {
                if let Some(me) = self.me.lock().take() {
                    self.sender.detach(&me);
                }
            }
        }
    }

    #[test]
    fn test_consumer_detaches_itself() {
        let sender = Arc::new(StreamSender::new(StreamId(0), MediaKind::Video));
        let consumer = Arc::new(OneShotConsumer {
            sender: Arc::clone(&sender),
            me: Mutex::new(None),
            received: Mutex::new(0),
        });
        let handle: SinkRef<EncodedFrame> = consumer.clone();
        *consumer.me.lock() = Some(handle.clone());

        assert!(sender.attach(handle));
        sender.on_frame(frame(true, 10));
        assert!(!sender.frame_wanted());

        sender.on_frame(frame(false, 10));
        assert_eq!(*consumer.received.lock(), 1);
        assert_eq!(sender.stats().frames, 1);
    }
}
