//! Encoder configuration and per-layer stream derivation

/// Lowest bitrate any layer is configured with
pub const MIN_BITRATE_KBPS: u32 = 30;

/// Max bitrate floor for screen content
pub const SCREENSHARE_MIN_BITRATE_KBPS: u32 = 1200;

/// Default quantizer ceiling
pub const DEFAULT_MAX_QP: u8 = 56;

/// Most simulcast layers a stream can carry
pub const MAX_SIMULCAST_LAYERS: u8 = 3;

/// Smallest width or height a simulcast layer may have
const MIN_LAYER_DIMENSION: u32 = 16;

/// Video codec produced by an encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoCodec {
    H264,
    H265,
    Mjpeg,
}

impl std::fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VideoCodec::H264 => "h264",
            VideoCodec::H265 => "h265",
            VideoCodec::Mjpeg => "mjpeg",
        };
        f.write_str(name)
    }
}

/// What the picture shows, which changes the rate policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentType {
    /// Camera video
    #[default]
    Realtime,
    /// Screen capture
    Screen,
}

/// Encoder configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Output codec
    pub codec: VideoCodec,

    /// Content type
    pub content_type: ContentType,

    /// Max bitrate of the top layer (None = resolution table)
    pub max_bitrate_kbps: Option<u32>,

    /// Min bitrate of every layer, never below [`MIN_BITRATE_KBPS`]
    pub min_bitrate_kbps: u32,

    /// Initial bitrate (None = sum of the layer targets)
    pub start_bitrate_kbps: Option<u32>,

    /// Quantizer ceiling
    pub max_qp: u8,

    /// Max frames per second
    pub max_framerate: u32,

    /// Temporal layers per stream
    pub num_temporal_layers: u8,

    /// Simulcast layers, 1 to [`MAX_SIMULCAST_LAYERS`]
    pub num_simulcast_layers: u8,

    /// Frames between key frames (0 = codec default)
    pub key_frame_interval: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            codec: VideoCodec::H264,
            content_type: ContentType::Realtime,
            max_bitrate_kbps: None,
            min_bitrate_kbps: MIN_BITRATE_KBPS,
            start_bitrate_kbps: None,
            max_qp: DEFAULT_MAX_QP,
            max_framerate: 30,
            num_temporal_layers: 1,
            num_simulcast_layers: 1,
            key_frame_interval: 0,
        }
    }
}

impl EncoderConfig {
    /// Set the codec
    pub fn codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the content type
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Cap the top layer's bitrate
    pub fn max_bitrate(mut self, kbps: u32) -> Self {
        self.max_bitrate_kbps = Some(kbps);
        self
    }

    /// Set the min bitrate
    pub fn min_bitrate(mut self, kbps: u32) -> Self {
        self.min_bitrate_kbps = kbps.max(MIN_BITRATE_KBPS);
        self
    }

    /// Set the initial bitrate
    pub fn start_bitrate(mut self, kbps: u32) -> Self {
        self.start_bitrate_kbps = Some(kbps);
        self
    }

    /// Set the quantizer ceiling
    pub fn max_qp(mut self, qp: u8) -> Self {
        self.max_qp = qp;
        self
    }

    /// Set the frame rate limit
    pub fn max_framerate(mut self, fps: u32) -> Self {
        self.max_framerate = fps;
        self
    }

    /// Set the number of temporal layers
    pub fn temporal_layers(mut self, layers: u8) -> Self {
        self.num_temporal_layers = layers.max(1);
        self
    }

    /// Set the number of simulcast layers
    pub fn simulcast_layers(mut self, layers: u8) -> Self {
        self.num_simulcast_layers = layers.clamp(1, MAX_SIMULCAST_LAYERS);
        self
    }

    /// Set the key frame interval in frames
    pub fn key_frame_interval(mut self, frames: u32) -> Self {
        self.key_frame_interval = frames;
        self
    }

    pub fn is_screen(&self) -> bool {
        self.content_type == ContentType::Screen
    }
}

/// Parameters of one encoded layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub width: u32,
    pub height: u32,
    pub max_framerate: u32,
    pub min_bitrate_kbps: u32,
    pub target_bitrate_kbps: u32,
    pub max_bitrate_kbps: u32,
    pub max_qp: u8,
    pub num_temporal_layers: u8,
    pub active: bool,
}

/// Everything a codec needs for `init`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecProperty {
    pub codec: VideoCodec,
    pub content_type: ContentType,
    /// Size of the top layer
    pub width: u32,
    pub height: u32,
    pub max_framerate: u32,
    pub start_bitrate_kbps: u32,
    pub min_bitrate_kbps: u32,
    /// Sum over active layers
    pub max_bitrate_kbps: u32,
    pub max_qp: u8,
    pub key_frame_interval: u32,
    /// Layers from lowest to highest resolution
    pub streams: Vec<StreamConfig>,
}

/// Max bitrate for a resolution when the configuration sets none
pub fn max_default_bitrate_kbps(width: u32, height: u32, is_screen: bool) -> u32 {
    let pixels = width as u64 * height as u64;
    let kbps = if pixels <= 320 * 240 {
        600
    } else if pixels <= 640 * 480 {
        1700
    } else if pixels <= 960 * 540 {
        2000
    } else {
        2500
    };

    if is_screen {
        kbps.max(SCREENSHARE_MIN_BITRATE_KBPS)
    } else {
        kbps
    }
}

/// Split a `width` x `height` picture into encoded layers
///
/// Each layer is half the size of the one above it. Layers that would fall
/// below 16 pixels on either side are dropped.
pub fn derive_stream_configs(width: u32, height: u32, config: &EncoderConfig) -> Vec<StreamConfig> {
    let mut layers = config.num_simulcast_layers.clamp(1, MAX_SIMULCAST_LAYERS) as u32;
    while layers > 1
        && ((width >> (layers - 1)) < MIN_LAYER_DIMENSION
            || (height >> (layers - 1)) < MIN_LAYER_DIMENSION)
    {
        layers -= 1;
    }

    let min_bitrate = config.min_bitrate_kbps.max(MIN_BITRATE_KBPS);

    (0..layers)
        .map(|i| {
            let shift = layers - 1 - i;
            let w = (width >> shift).max(1);
            let h = (height >> shift).max(1);
            let is_top = shift == 0;

            let table = max_default_bitrate_kbps(w, h, config.is_screen());
            let max_bitrate = match config.max_bitrate_kbps {
                Some(kbps) if is_top => kbps,
                Some(kbps) => kbps.min(table),
                None => table,
            }
            .max(min_bitrate);

            StreamConfig {
                width: w,
                height: h,
                max_framerate: config.max_framerate,
                min_bitrate_kbps: min_bitrate,
                target_bitrate_kbps: max_bitrate,
                max_bitrate_kbps: max_bitrate,
                max_qp: config.max_qp,
                num_temporal_layers: config.num_temporal_layers.max(1),
                active: true,
            }
        })
        .collect()
}

/// Combine the configuration and derived layers into codec init parameters
///
/// Panics if `streams` is empty.
pub fn build_codec_property(config: &EncoderConfig, streams: &[StreamConfig]) -> CodecProperty {
    let (lowest, top) = match (streams.first(), streams.last()) {
        (Some(lowest), Some(top)) => (lowest, top),
        _ => panic!("build_codec_property needs at least one stream"),
    };

    let active = streams.iter().filter(|s| s.active);
    let max_bitrate: u32 = active.clone().map(|s| s.max_bitrate_kbps).sum();
    let target: u32 = active.map(|s| s.target_bitrate_kbps).sum();
    let min_bitrate = lowest.min_bitrate_kbps;
    let max_bitrate = max_bitrate.max(min_bitrate);

    let start_bitrate = config
        .start_bitrate_kbps
        .unwrap_or(target)
        .clamp(min_bitrate, max_bitrate);

    CodecProperty {
        codec: config.codec,
        content_type: config.content_type,
        width: top.width,
        height: top.height,
        max_framerate: config.max_framerate,
        start_bitrate_kbps: start_bitrate,
        min_bitrate_kbps: min_bitrate,
        max_bitrate_kbps: max_bitrate,
        max_qp: config.max_qp,
        key_frame_interval: config.key_frame_interval,
        streams: streams.to_vec(),
    }
}
