//! Observable guarantees of the public API

mod common;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_test::{assert_err, assert_ok};

use ipcam_media::encoder::max_default_bitrate_kbps;
use ipcam_media::testing::{pattern_frame, pattern_i420, CollectingSink, FakeEncoderFactory};
use ipcam_media::{
    AdaptiveEncoder, Biplanar8, Broadcaster, Capturer, EncodedFrame, EncoderConfig, Packed8,
    PixelBuffer, PixelFormat, Planar8, Sink, SinkRef, SinkWants, Source, StreamId, Transport,
    VideoFrame,
};

#[test]
fn planar_create_uses_tight_strides() {
    for (w, h) in [(1, 1), (2, 2), (15, 9), (640, 480), (1921, 1081)] {
        let buffer = assert_ok!(Planar8::create(w, h));
        assert_eq!(buffer.width(), w);
        assert_eq!(buffer.height(), h);
        let half = (w as usize + 1) / 2;
        assert_eq!(
            (buffer.stride_y(), buffer.stride_u(), buffer.stride_v()),
            (w as usize, half, half)
        );
    }
}

#[test]
fn biplanar_round_trip_is_lossless() {
    let original = pattern_i420(320, 240, 17);
    let nv12 = assert_ok!(Biplanar8::copy(&original));
    assert_eq!(nv12.pixel_format(), PixelFormat::Nv12);
    assert_eq!(assert_ok!(nv12.to_i420()), original);
}

#[test]
fn identity_crop_and_scale_matches_copy() {
    let original = pattern_i420(96, 64, 5);
    let buffers: Vec<Arc<dyn PixelBuffer>> = vec![
        Arc::new(original.clone()),
        Arc::new(assert_ok!(Biplanar8::copy(&original))),
        Arc::new(assert_ok!(Packed8::copy(&original))),
    ];

    for buffer in buffers {
        let scaled = assert_ok!(buffer.crop_and_scale(0, 0, 96, 64, 96, 64));
        assert_eq!((scaled.width(), scaled.height()), (96, 64));
        let direct = assert_ok!(Planar8::copy(buffer.as_ref()));
        assert_eq!(assert_ok!(scaled.to_i420()), direct, "{}", buffer.pixel_format());
    }
}

#[test]
fn centered_crop_keeps_requested_size() {
    let buffer = pattern_i420(640, 480, 1);
    let scaled = assert_ok!(buffer.crop_and_scale_centered(320, 320));
    assert_eq!((scaled.width(), scaled.height()), (320, 320));
}

#[test]
fn broadcaster_delivers_in_registration_order() {
    struct Tagged(&'static str, Arc<Mutex<Vec<(&'static str, u32)>>>);

    impl Sink<u32> for Tagged {
        fn on_frame(&self, frame: u32) {
            self.1.lock().push((self.0, frame));
        }
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let a: SinkRef<u32> = Arc::new(Tagged("a", log.clone()));
    let b: SinkRef<u32> = Arc::new(Tagged("b", log.clone()));
    let broadcaster = Broadcaster::new();
    broadcaster.add_or_update_sink(a.clone(), SinkWants::default());
    broadcaster.add_or_update_sink(b, SinkWants::default());

    broadcaster.on_frame(1);
    broadcaster.remove_sink(&a);
    broadcaster.on_frame(2);

    assert_eq!(*log.lock(), vec![("a", 1), ("b", 1), ("b", 2)]);
}

#[tokio::test]
async fn capturer_drops_frames_without_sinks() {
    common::init_test_tracing();

    let upstream: Arc<Broadcaster<VideoFrame>> = Arc::new(Broadcaster::new());
    let capturer = Capturer::new();
    capturer.set_video_source(upstream.clone(), SinkWants::default());
    assert_ok!(capturer.stats().await);

    upstream.on_frame(pattern_frame(640, 480, 0));
    let stats = assert_ok!(capturer.stats().await);
    assert_eq!((stats.frames_received, stats.frames_sent), (1, 0));

    let sink: Arc<CollectingSink<VideoFrame>> = Arc::new(CollectingSink::new());
    capturer.add_or_update_sink(sink.clone(), SinkWants::default());
    upstream.on_frame(pattern_frame(640, 480, 1));

    let stats = assert_ok!(capturer.stats().await);
    assert_eq!((stats.frames_received, stats.frames_sent), (2, 1));
    assert_eq!(sink.count(), 1);
}

#[tokio::test]
async fn encoder_initialises_lazily() {
    common::init_test_tracing();

    let source: Arc<Broadcaster<VideoFrame>> = Arc::new(Broadcaster::new());
    let factory = Arc::new(FakeEncoderFactory::new());
    let output: Arc<CollectingSink<EncodedFrame>> = Arc::new(CollectingSink::new());
    let encoder = AdaptiveEncoder::new(
        StreamId(0),
        source.clone(),
        factory.clone(),
        output,
        Default::default(),
    );
    encoder.configure(EncoderConfig::default(), 1200);
    encoder.start();
    assert_ok!(encoder.stats().await);

    source.on_frame(pattern_frame(640, 480, 0));
    assert_ok!(encoder.stats().await);
    assert_eq!(factory.init_calls(), 1);

    source.on_frame(pattern_frame(640, 480, 1));
    assert_ok!(encoder.stats().await);
    assert_eq!(factory.init_calls(), 1);

    source.on_frame(pattern_frame(1280, 720, 2));
    assert_ok!(encoder.stats().await);
    assert_eq!(factory.init_calls(), 2);

    encoder.stop();
    assert_err!(encoder.stats().await);
}

#[test]
fn transport_get_or_create() {
    let transport = Transport::new();
    let first = transport.get_video_stream_sender(StreamId(0));
    let second = transport.get_video_stream_sender(StreamId(0));
    assert!(Arc::ptr_eq(&first, &second));

    transport.remove_video_stream_sender(StreamId(0));
    assert!(!transport.frame_wanted(StreamId(0)));
}

#[test]
fn default_bitrate_table() {
    assert_eq!(max_default_bitrate_kbps(320, 240, false), 600);
    assert_eq!(max_default_bitrate_kbps(640, 480, false), 1700);
    assert_eq!(max_default_bitrate_kbps(1920, 1080, false), 2500);
}
