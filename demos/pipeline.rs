//! End-to-end pipeline demo
//!
//! Run with: cargo run --example pipeline [SECONDS]
//!
//! A pattern device feeds a capturer, which feeds two send streams (main and
//! sub). A logging consumer joins the main stream for the whole run and the
//! sub stream for the second half only, so the sub stream's encoder is
//! started and suspended on demand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ipcam_media::encoder::EncoderConfig;
use ipcam_media::testing::{FakeEncoderFactory, PatternDevice};
use ipcam_media::{
    CaptureParams, Capturer, DeviceSource, EncodedFrame, PixelFormat, SendStream,
    SendStreamConfig, Sink, SinkRef, SinkWants, StreamId, Transport,
};

/// Consumer that logs key frames and counts everything
struct LoggingConsumer {
    name: &'static str,
    frames: AtomicU64,
    bytes: AtomicU64,
}

impl LoggingConsumer {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            frames: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }
}

impl Sink<EncodedFrame> for LoggingConsumer {
    fn on_frame(&self, frame: EncodedFrame) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(frame.size() as u64, Ordering::Relaxed);
        if frame.is_keyframe {
            println!(
                "[{}] key frame on {} ({}x{}, ts={}us)",
                self.name, frame.stream_id, frame.width, frame.height, frame.timestamp_us
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let seconds: u64 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(4);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ipcam_media=debug".parse()?)
                .add_directive("pipeline=debug".parse()?),
        )
        .init();

    let params = CaptureParams::default()
        .resolution(640, 480)
        .framerate(15)
        .pixel_format(PixelFormat::Nv12);
    let device = Arc::new(DeviceSource::start(Box::new(PatternDevice::new()), params)?);

    let capturer = Capturer::new();
    capturer.set_video_source(device.clone(), SinkWants::default());

    let transport = Arc::new(Transport::new());
    let factory = Arc::new(FakeEncoderFactory::new());
    let source = Arc::new(capturer.clone());

    let main_stream = SendStream::new(
        SendStreamConfig::new(StreamId(0)).encoder(EncoderConfig::default().simulcast_layers(2)),
        source.clone(),
        Arc::clone(&transport),
        factory.clone(),
    );
    let sub_stream = SendStream::new(
        SendStreamConfig::new(StreamId(1)).encoder(EncoderConfig::default().max_bitrate(600)),
        source,
        Arc::clone(&transport),
        factory.clone(),
    );
    main_stream.start();
    sub_stream.start();

    let viewer = Arc::new(LoggingConsumer::new("viewer"));
    let handle: SinkRef<EncodedFrame> = viewer.clone();
    main_stream.add_consumer(handle.clone());

    tokio::time::sleep(Duration::from_secs(seconds / 2)).await;
    sub_stream.add_consumer(handle.clone());
    tokio::time::sleep(Duration::from_secs(seconds - seconds / 2)).await;
    sub_stream.remove_consumer(&handle);

    let capture = capturer.stats().await?;
    println!(
        "Capture: received={} sent={} dropped={}",
        capture.frames_received,
        capture.frames_sent,
        capture.frames_dropped()
    );
    for stream in [&main_stream, &sub_stream] {
        let encoder = stream.encoder_stats().await?;
        let sender = stream.sender_stats();
        println!(
            "{}: encoder={} inits={} encoded={} | sent frames={} keys={} bytes={}",
            stream.stream_id(),
            encoder.state,
            encoder.init_calls,
            encoder.frames_encoded,
            sender.frames,
            sender.key_frames,
            sender.bytes
        );
    }
    println!(
        "Viewer: frames={} bytes={}",
        viewer.frames.load(Ordering::Relaxed),
        viewer.bytes.load(Ordering::Relaxed)
    );

    main_stream.remove_consumer(&handle);
    main_stream.close();
    sub_stream.close();
    capturer.stop();
    device.shutdown().await;

    Ok(())
}
