//! Transport: keyed registry of stream senders

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use super::sender::StreamSender;
use crate::frame::{CodecId, EncodedFrame, MediaKind, StreamId};
use crate::graph::SinkRef;

/// Central registry for all stream senders
///
/// Thread-safe via `RwLock`. Lookups and demand checks take the read lock;
/// only creation and removal take the write lock.
#[derive(Default)]
pub struct Transport {
    video: SenderMap<StreamId>,
    audio: SenderMap<(StreamId, CodecId)>,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The video sender for `id`, created on first use
    pub fn get_video_stream_sender(&self, id: StreamId) -> Arc<StreamSender> {
        self.video.get_or_create(id, || StreamSender::new(id, MediaKind::Video))
    }

    /// The video sender for `id`, if it exists
    pub fn find_video_stream_sender(&self, id: StreamId) -> Option<Arc<StreamSender>> {
        self.video.find(&id)
    }

    /// Tear down the video sender for `id`
    pub fn remove_video_stream_sender(&self, id: StreamId) -> Option<Arc<StreamSender>> {
        self.video.remove(&id)
    }

    /// Whether the video stream `id` has any consumer
    pub fn frame_wanted(&self, id: StreamId) -> bool {
        self.video.frame_wanted(&id)
    }

    /// Attach a consumer to video stream `id`
    ///
    /// Returns true if it is the stream's first consumer, in which case the
    /// caller should start the stream's encoder.
    pub fn add_video_sink(&self, id: StreamId, sink: SinkRef<EncodedFrame>) -> bool {
        let first = self.get_video_stream_sender(id).attach(sink);
        tracing::info!(stream = %id, first = first, "Video consumer added");
        first
    }

    /// Detach a consumer from video stream `id`
    ///
    /// Returns true if no consumers remain, in which case the caller should
    /// stop the stream's encoder. Panics if `sink` is not attached to an
    /// existing stream.
    pub fn remove_video_sink(&self, id: StreamId, sink: &SinkRef<EncodedFrame>) -> bool {
        self.video.detach(&id, sink)
    }

    /// The audio sender for `id` and `codec`, created on first use
    pub fn get_audio_stream_sender(&self, id: StreamId, codec: CodecId) -> Arc<StreamSender> {
        self.audio
            .get_or_create((id, codec), || StreamSender::new(id, MediaKind::Audio(codec)))
    }

    pub fn find_audio_stream_sender(
        &self,
        id: StreamId,
        codec: CodecId,
    ) -> Option<Arc<StreamSender>> {
        self.audio.find(&(id, codec))
    }

    pub fn remove_audio_stream_sender(
        &self,
        id: StreamId,
        codec: CodecId,
    ) -> Option<Arc<StreamSender>> {
        self.audio.remove(&(id, codec))
    }

    pub fn audio_frame_wanted(&self, id: StreamId, codec: CodecId) -> bool {
        self.audio.frame_wanted(&(id, codec))
    }

    /// Attach a consumer to an audio stream; true if it is the first
    pub fn add_audio_sink(
        &self,
        id: StreamId,
        codec: CodecId,
        sink: SinkRef<EncodedFrame>,
    ) -> bool {
        let first = self.get_audio_stream_sender(id, codec).attach(sink);
        tracing::info!(stream = %id, codec = %codec, first = first, "Audio consumer added");
        first
    }

    /// Detach a consumer from an audio stream; true if none remain
    pub fn remove_audio_sink(
        &self,
        id: StreamId,
        codec: CodecId,
        sink: &SinkRef<EncodedFrame>,
    ) -> bool {
        self.audio.detach(&(id, codec), sink)
    }

    /// Number of video senders
    pub fn video_stream_count(&self) -> usize {
        self.video.len()
    }

    /// Number of audio senders
    pub fn audio_stream_count(&self) -> usize {
        self.audio.len()
    }

    /// Ids of all video streams
    pub fn video_stream_ids(&self) -> Vec<StreamId> {
        let mut ids = self.video.keys();
        ids.sort();
        ids
    }
}

struct SenderMap<K> {
    senders: RwLock<HashMap<K, Arc<StreamSender>>>,
}

impl<K> Default for SenderMap<K> {
    fn default() -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
        }
    }
}

impl<K: Copy + Eq + Hash + Debug> SenderMap<K> {
    fn get_or_create(&self, key: K, create: impl FnOnce() -> StreamSender) -> Arc<StreamSender> {
        if let Some(sender) = self.senders.read().get(&key) {
            return Arc::clone(sender);
        }

        let mut senders = self.senders.write();
        let sender = senders.entry(key).or_insert_with(|| {
            tracing::info!(key = ?key, "Stream sender created");
            Arc::new(create())
        });
        Arc::clone(sender)
    }

    fn find(&self, key: &K) -> Option<Arc<StreamSender>> {
        self.senders.read().get(key).cloned()
    }

    fn remove(&self, key: &K) -> Option<Arc<StreamSender>> {
        let removed = self.senders.write().remove(key);
        match &removed {
            Some(sender) => tracing::info!(
                key = ?key,
                consumers = sender.consumer_count(),
                "Stream sender removed"
            ),
            None => tracing::debug!(key = ?key, "No stream sender to remove"),
        }
        removed
    }

    fn frame_wanted(&self, key: &K) -> bool {
        self.senders
            .read()
            .get(key)
            .map_or(false, |sender| sender.frame_wanted())
    }

    fn detach(&self, key: &K, sink: &SinkRef<EncodedFrame>) -> bool {
        let sender = match self.find(key) {
            Some(sender) => sender,
            None => panic!("remove_sink called for {:?}, which has no stream sender", key),
        };

        let empty = sender.detach(sink);
        tracing::info!(key = ?key, remaining = sender.consumer_count(), "Consumer removed");
        empty
    }

    fn len(&self) -> usize {
        self.senders.read().len()
    }

    fn keys(&self) -> Vec<K> {
        self.senders.read().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use bytes::Bytes;

    use super::*;
    use crate::graph::Sink;
    use crate::testing::CollectingSink;

    fn consumer() -> Arc<CollectingSink<EncodedFrame>> {
        Arc::new(CollectingSink::new())
    }

    #[test]
    fn test_get_or_create_returns_same_sender() {
        let transport = Transport::new();
        let a = transport.get_video_stream_sender(StreamId(0));
        let b = transport.get_video_stream_sender(StreamId(0));
        let c = transport.get_video_stream_sender(StreamId(1));

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(transport.video_stream_count(), 2);
        assert_eq!(transport.video_stream_ids(), vec![StreamId(0), StreamId(1)]);
    }

    #[test]
    fn test_remove_tears_down() {
        let transport = Transport::new();
        let sink = consumer();
        transport.add_video_sink(StreamId(0), sink);
        assert!(transport.frame_wanted(StreamId(0)));

        assert!(transport.remove_video_stream_sender(StreamId(0)).is_some());
        assert!(!transport.frame_wanted(StreamId(0)));
        assert!(transport.find_video_stream_sender(StreamId(0)).is_none());
        assert!(transport.remove_video_stream_sender(StreamId(0)).is_none());
    }

    #[test]
    fn test_frame_wanted_for_unknown_stream() {
        let transport = Transport::new();
        assert!(!transport.frame_wanted(StreamId(9)));
        assert_eq!(transport.video_stream_count(), 0);
    }

    #[test]
    fn test_first_and_last_sink_transitions() {
        let transport = Transport::new();
        let a: SinkRef<EncodedFrame> = consumer();
        let b: SinkRef<EncodedFrame> = consumer();

        assert!(transport.add_video_sink(StreamId(0), a.clone()));
        assert!(!transport.add_video_sink(StreamId(0), b.clone()));
        assert!(!transport.remove_video_sink(StreamId(0), &a));
        assert!(transport.remove_video_sink(StreamId(0), &b));
        assert!(!transport.frame_wanted(StreamId(0)));
        // The sender stays until removed explicitly
        assert_eq!(transport.video_stream_count(), 1);
    }

    #[test]
    #[should_panic(expected = "no stream sender")]
    fn test_remove_sink_from_unknown_stream_panics() {
        let transport = Transport::new();
        let sink: SinkRef<EncodedFrame> = consumer();
        transport.remove_video_sink(StreamId(3), &sink);
    }

    #[test]
    fn test_audio_keyed_by_codec() {
        let transport = Transport::new();
        let aac = transport.get_audio_stream_sender(StreamId(0), CodecId::Aac);
        let opus = transport.get_audio_stream_sender(StreamId(0), CodecId::Opus);
        assert!(!Arc::ptr_eq(&aac, &opus));
        assert_eq!(aac.kind(), MediaKind::Audio(CodecId::Aac));

        let sink = consumer();
        assert!(transport.add_audio_sink(StreamId(0), CodecId::Aac, sink.clone()));
        assert!(transport.audio_frame_wanted(StreamId(0), CodecId::Aac));
        assert!(!transport.audio_frame_wanted(StreamId(0), CodecId::Opus));

        aac.on_frame(EncodedFrame::audio(
            StreamId(0),
            CodecId::Aac,
            0,
            Bytes::from_static(&[1, 2]),
        ));
        assert_eq!(sink.count(), 1);

        let sink: SinkRef<EncodedFrame> = sink;
        assert!(transport.remove_audio_sink(StreamId(0), CodecId::Aac, &sink));
        assert!(transport.remove_audio_stream_sender(StreamId(0), CodecId::Aac).is_some());
        assert_eq!(transport.audio_stream_count(), 1);
    }

    #[test]
    fn test_concurrent_get_or_create() {
        let transport = Arc::new(Transport::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let transport = Arc::clone(&transport);
                thread::spawn(move || transport.get_video_stream_sender(StreamId(0)))
            })
            .collect();

        let senders: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(senders.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(transport.video_stream_count(), 1);
    }
}
