//! Pixel format and buffer type tags

/// Where the pixel memory of a buffer lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferType {
    /// Plain CPU memory
    Normal,
    /// GPU texture mapped for CPU access
    Texture,
    /// Memory owned by a hardware block (ISP, VPU)
    Hardware,
    /// Vendor-private layout
    Private,
}

/// Enumerated pixel formats
///
/// Only the YUV 4:2:0 and 4:2:2 families have concrete buffer shapes in this
/// crate; the rest are carried as tags so devices can describe what they
/// produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Y, U, V planes, chroma subsampled 2x2
    I420,
    /// I420 with an extra alpha plane
    I420A,
    /// Y, U, V planes without subsampling
    I444,
    /// Alias of I420 used by some capture stacks
    Iyuv,
    /// Packed 8-bit R, G, B
    Rgb24,
    /// Packed 32-bit A, B, G, R
    Abgr,
    /// Packed 32-bit A, R, G, B
    Argb,
    /// Packed 16-bit ARGB, 4 bits per channel
    Argb4444,
    /// Packed 16-bit RGB 5:6:5
    Rgb565,
    /// Packed 16-bit ARGB 1:5:5:5
    Argb1555,
    /// Packed 4:2:2, byte order Y0 U Y1 V
    Yuy2,
    /// Y, V, U planes, chroma subsampled 2x2
    Yv12,
    /// Packed 4:2:2, byte order U Y0 V Y1
    Uyvy,
    /// Motion JPEG compressed frames
    Mjpeg,
    /// Y plane plus interleaved V/U plane
    Nv21,
    /// Y plane plus interleaved U/V plane
    Nv12,
    /// Packed 32-bit B, G, R, A
    Bgra,
}

impl PixelFormat {
    /// Whether the format is a YUV layout
    pub fn is_yuv(&self) -> bool {
        matches!(
            self,
            PixelFormat::I420
                | PixelFormat::I420A
                | PixelFormat::I444
                | PixelFormat::Iyuv
                | PixelFormat::Yuy2
                | PixelFormat::Yv12
                | PixelFormat::Uyvy
                | PixelFormat::Nv21
                | PixelFormat::Nv12
        )
    }

    /// Bytes per pixel for single-plane packed formats
    pub fn packed_bytes_per_pixel(&self) -> Option<usize> {
        match self {
            PixelFormat::Rgb24 => Some(3),
            PixelFormat::Abgr | PixelFormat::Argb | PixelFormat::Bgra => Some(4),
            PixelFormat::Argb4444
            | PixelFormat::Rgb565
            | PixelFormat::Argb1555
            | PixelFormat::Yuy2
            | PixelFormat::Uyvy => Some(2),
            _ => None,
        }
    }

    /// Short name as used by V4L2-style fourcc listings
    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::I420 => "I420",
            PixelFormat::I420A => "I420A",
            PixelFormat::I444 => "I444",
            PixelFormat::Iyuv => "IYUV",
            PixelFormat::Rgb24 => "RGB24",
            PixelFormat::Abgr => "ABGR",
            PixelFormat::Argb => "ARGB",
            PixelFormat::Argb4444 => "ARGB4444",
            PixelFormat::Rgb565 => "RGB565",
            PixelFormat::Argb1555 => "ARGB1555",
            PixelFormat::Yuy2 => "YUY2",
            PixelFormat::Yv12 => "YV12",
            PixelFormat::Uyvy => "UYVY",
            PixelFormat::Mjpeg => "MJPEG",
            PixelFormat::Nv21 => "NV21",
            PixelFormat::Nv12 => "NV12",
            PixelFormat::Bgra => "BGRA",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
