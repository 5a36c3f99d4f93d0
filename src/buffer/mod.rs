//! Pixel buffers
//!
//! A pixel buffer owns the raw memory of one picture plus the description of
//! how that memory is laid out. Three layout families are supported:
//!
//! ```text
//!  Planar8 (I420)          Biplanar8 (NV12/NV21)     Packed8 (YUY2/UYVY)
//! ┌──────────────┐        ┌──────────────┐          ┌──────────────────┐
//! │ Y            │        │ Y            │          │ Y0 U Y1 V Y0 U … │
//! │  stride_y*h  │        │  stride_y*h  │          │   stride * h     │
//! ├───────┬──────┘        ├──────────────┤          └──────────────────┘
//! │ U     │               │ UV UV UV …   │
//! ├───────┤               │ stride_uv*ch │
//! │ V     │               └──────────────┘
//! └───────┘
//! ```
//!
//! Buffers never change after construction. Pixel memory is held in
//! `bytes::Bytes`, so cloning a buffer (or wrapping it in an `Arc`) shares the
//! allocation instead of copying it; one captured picture can be read by any
//! number of consumers.

pub mod biplanar;
pub mod convert;
pub mod format;
pub mod packed;
pub mod planar;
pub mod scale;

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

pub use biplanar::Biplanar8;
pub use format::{BufferType, PixelFormat};
pub use packed::Packed8;
pub use planar::Planar8;

/// Borrowed view of a buffer's planes
#[derive(Debug, Clone, Copy)]
pub enum Planes<'a> {
    /// Three separate planes, chroma subsampled 2x2
    Planar {
        y: &'a [u8],
        u: &'a [u8],
        v: &'a [u8],
        stride_y: usize,
        stride_u: usize,
        stride_v: usize,
    },
    /// Luma plane plus one interleaved chroma plane
    Biplanar {
        y: &'a [u8],
        uv: &'a [u8],
        stride_y: usize,
        stride_uv: usize,
        /// Chroma bytes are ordered V then U (NV21)
        swapped: bool,
    },
    /// One interleaved 4:2:2 plane
    Packed {
        data: &'a [u8],
        stride: usize,
        order: PackedOrder,
    },
}

/// Byte order inside a packed 4:2:2 macropixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedOrder {
    /// Y0 U Y1 V
    Yuyv,
    /// U Y0 V Y1
    Uyvy,
}

impl PackedOrder {
    /// Byte offsets of (y0, u, y1, v) inside a macropixel
    pub(crate) fn offsets(self) -> [usize; 4] {
        match self {
            PackedOrder::Yuyv => [0, 1, 2, 3],
            PackedOrder::Uyvy => [1, 0, 3, 2],
        }
    }
}

/// A rectangle inside a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub offset_x: u32,
    pub offset_y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(offset_x: u32, offset_y: u32, width: u32, height: u32) -> Self {
        Self {
            offset_x,
            offset_y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width` x `height` buffer
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Whether the rectangle is non-empty and lies inside a `width` x `height` buffer
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.offset_x as u64 + self.width as u64 <= width as u64
            && self.offset_y as u64 + self.height as u64 <= height as u64
    }

    /// Maximal centered crop of a `src_w` x `src_h` picture with the aspect
    /// ratio of `dst_w` x `dst_h`
    pub fn centered(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Self {
        assert!(
            dst_w > 0 && dst_h > 0,
            "destination size must be positive, got {}x{}",
            dst_w,
            dst_h
        );
        let (sw, sh, dw, dh) = (src_w as u64, src_h as u64, dst_w as u64, dst_h as u64);
        let crop_w = sw.min(dw * sh / dh).max(1) as u32;
        let crop_h = sh.min(dh * sw / dw).max(1) as u32;
        Self::new((src_w - crop_w) / 2, (src_h - crop_h) / 2, crop_w, crop_h)
    }
}

/// A picture's pixel memory plus its layout
///
/// Implementations are immutable; every transforming operation returns a new
/// buffer. `to_i420` and `crop_and_scale` have default implementations that
/// go through the canonical [`Planar8`] shape, shapes with a cheaper native
/// path override them.
pub trait PixelBuffer: fmt::Debug + Send + Sync {
    /// Where the memory lives
    fn buffer_type(&self) -> BufferType {
        BufferType::Normal
    }

    /// Pixel format tag
    fn pixel_format(&self) -> PixelFormat;

    /// Width in pixels
    fn width(&self) -> u32;

    /// Height in pixels
    fn height(&self) -> u32;

    /// Borrow the planes for reading
    fn planes(&self) -> Planes<'_>;

    /// Convert to I420
    ///
    /// For a [`Planar8`] this shares the existing memory.
    fn to_i420(&self) -> Result<Planar8> {
        Planar8::from_planes(self.planes(), self.width(), self.height())
    }

    /// Crop the rectangle at (`offset_x`, `offset_y`) of size `crop_w` x
    /// `crop_h` and scale it to `scaled_w` x `scaled_h`
    ///
    /// Offsets are snapped down to even values to stay aligned with chroma.
    /// Panics if the crop rectangle is not inside the buffer.
    fn crop_and_scale(
        &self,
        offset_x: u32,
        offset_y: u32,
        crop_w: u32,
        crop_h: u32,
        scaled_w: u32,
        scaled_h: u32,
    ) -> Result<Arc<dyn PixelBuffer>> {
        let i420 = self.to_i420()?;
        let scaled =
            i420.cropped_and_scaled(offset_x, offset_y, crop_w, crop_h, scaled_w, scaled_h)?;
        Ok(Arc::new(scaled))
    }

    /// Scale the whole buffer to `scaled_w` x `scaled_h`
    fn scale(&self, scaled_w: u32, scaled_h: u32) -> Result<Arc<dyn PixelBuffer>> {
        self.crop_and_scale(0, 0, self.width(), self.height(), scaled_w, scaled_h)
    }

    /// Center-crop to the aspect ratio of `scaled_w` x `scaled_h`, then scale
    fn crop_and_scale_centered(
        &self,
        scaled_w: u32,
        scaled_h: u32,
    ) -> Result<Arc<dyn PixelBuffer>> {
        let rect = CropRect::centered(self.width(), self.height(), scaled_w, scaled_h);
        self.crop_and_scale(
            rect.offset_x,
            rect.offset_y,
            rect.width,
            rect.height,
            scaled_w,
            scaled_h,
        )
    }
}

/// Chroma dimension for a 2x subsampled axis
pub(crate) fn half(len: u32) -> usize {
    (len as usize + 1) / 2
}

pub(crate) fn check_dimensions(width: u32, height: u32) {
    assert!(
        width > 0 && height > 0,
        "buffer dimensions must be positive, got {}x{}",
        width,
        height
    );
}

pub(crate) fn check_crop(width: u32, height: u32, rect: CropRect, scaled_w: u32, scaled_h: u32) {
    assert!(
        rect.fits_within(width, height),
        "crop rectangle {:?} is outside the {}x{} buffer",
        rect,
        width,
        height
    );
    check_dimensions(scaled_w, scaled_h);
}

/// Sum plane sizes, failing as an allocation error on overflow
pub(crate) fn total_len(parts: &[(usize, usize)]) -> Result<usize> {
    parts.iter().try_fold(0usize, |acc, &(stride, rows)| {
        stride
            .checked_mul(rows)
            .and_then(|n| acc.checked_add(n))
            .ok_or(Error::Allocation { bytes: usize::MAX })
    })
}

/// Allocate zeroed pixel memory
pub(crate) fn alloc(len: usize) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| Error::Allocation { bytes: len })?;
    data.resize(len, 0);
    Ok(data)
}
