//! Packed 4:2:2 buffers (YUY2 / UYVY)
//!
//! There is no native crop-and-scale here; the default path converts to I420
//! first, so the result of `crop_and_scale` on a packed buffer is I420.

use bytes::Bytes;

use super::convert;
use super::{alloc, check_dimensions, half, total_len};
use super::{PackedOrder, PixelBuffer, PixelFormat, Planes};
use crate::error::Result;

/// A single interleaved plane, two pixels per four-byte macropixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packed8 {
    format: PixelFormat,
    width: u32,
    height: u32,
    stride: usize,
    data: Bytes,
}

impl Packed8 {
    /// Create a zeroed YUY2 buffer with a tight stride
    pub fn create(width: u32, height: u32) -> Result<Self> {
        Self::create_with_format(PixelFormat::Yuy2, width, height)
    }

    /// Create a zeroed YUY2 or UYVY buffer with a tight stride
    pub fn create_with_format(format: PixelFormat, width: u32, height: u32) -> Result<Self> {
        Self::build(format, width, height, row_bytes(width), |_, _| {})
    }

    /// Create a zeroed YUY2 buffer with an explicit stride
    pub fn create_with_stride(width: u32, height: u32, stride: usize) -> Result<Self> {
        Self::build(PixelFormat::Yuy2, width, height, stride, |_, _| {})
    }

    /// Wrap bytes captured from a device
    ///
    /// Panics if `data` is too short for the given layout.
    pub fn from_bytes(
        format: PixelFormat,
        width: u32,
        height: u32,
        stride: usize,
        data: Bytes,
    ) -> Self {
        validate(format, width, height, stride);
        let needed = stride * (height as usize - 1) + row_bytes(width);
        assert!(
            data.len() >= needed,
            "{} bytes cannot hold a {}x{} {} picture",
            data.len(),
            width,
            height,
            format
        );
        Self {
            format,
            width,
            height,
            stride,
            data,
        }
    }

    /// Convert any buffer into a new YUY2 buffer
    pub fn copy(src: &dyn PixelBuffer) -> Result<Self> {
        Self::copy_as(PixelFormat::Yuy2, src)
    }

    /// Convert any buffer into a new YUY2 or UYVY buffer
    pub fn copy_as(format: PixelFormat, src: &dyn PixelBuffer) -> Result<Self> {
        let (width, height) = (src.width(), src.height());

        if let Planes::Packed {
            data,
            stride,
            order,
        } = src.planes()
        {
            if order == order_of(format) {
                let bytes = row_bytes(width);
                return Self::build(format, width, height, bytes, |dst, dst_stride| {
                    convert::copy_plane(data, stride, dst, dst_stride, bytes, height as usize);
                });
            }
        }

        let i420 = src.to_i420()?;
        Self::build(format, width, height, row_bytes(width), |dst, dst_stride| {
            convert::i420_to_packed(
                i420.i420_planes(),
                dst,
                dst_stride,
                width as usize,
                height as usize,
                order_of(format),
            );
        })
    }

    fn build(
        format: PixelFormat,
        width: u32,
        height: u32,
        stride: usize,
        fill: impl FnOnce(&mut [u8], usize),
    ) -> Result<Self> {
        validate(format, width, height, stride);
        let len = total_len(&[(stride, height as usize)])?;
        let mut data = alloc(len)?;
        fill(&mut data, stride);

        Ok(Self {
            format,
            width,
            height,
            stride,
            data: Bytes::from(data),
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

fn validate(format: PixelFormat, width: u32, height: u32, stride: usize) {
    assert!(
        matches!(format, PixelFormat::Yuy2 | PixelFormat::Uyvy),
        "{} is not a packed 4:2:2 format",
        format
    );
    check_dimensions(width, height);
    assert!(
        stride >= row_bytes(width),
        "stride {} is narrower than {} bytes",
        stride,
        row_bytes(width)
    );
}

fn row_bytes(width: u32) -> usize {
    half(width) * 4
}

fn order_of(format: PixelFormat) -> PackedOrder {
    match format {
        PixelFormat::Uyvy => PackedOrder::Uyvy,
        _ => PackedOrder::Yuyv,
    }
}

impl PixelBuffer for Packed8 {
    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn planes(&self) -> Planes<'_> {
        Planes::Packed {
            data: &self.data,
            stride: self.stride,
            order: order_of(self.format),
        }
    }
}
