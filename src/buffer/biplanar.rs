//! Bi-planar 4:2:0 buffers (NV12 / NV21)

use std::sync::Arc;

use bytes::Bytes;

use super::convert;
use super::scale::{scale_plane, PlaneRef};
use super::{alloc, check_crop, check_dimensions, half, total_len};
use super::{CropRect, PixelBuffer, PixelFormat, Planar8, Planes};
use crate::error::Result;

/// Luma plane plus one interleaved chroma plane
///
/// The chroma plane starts at `stride_y * height`. NV12 stores U before V,
/// NV21 stores V before U.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Biplanar8 {
    format: PixelFormat,
    width: u32,
    height: u32,
    stride_y: usize,
    stride_uv: usize,
    data: Bytes,
}

/// Mutable planes handed to a fill closure
pub(crate) struct BiplanarMut<'a> {
    pub y: &'a mut [u8],
    pub stride_y: usize,
    pub uv: &'a mut [u8],
    pub stride_uv: usize,
}

impl Biplanar8 {
    /// Create a zeroed NV12 buffer with tight strides
    pub fn create(width: u32, height: u32) -> Result<Self> {
        Self::create_with_format(PixelFormat::Nv12, width, height)
    }

    /// Create a zeroed NV12 or NV21 buffer with tight strides
    pub fn create_with_format(format: PixelFormat, width: u32, height: u32) -> Result<Self> {
        Self::build(format, width, height, width as usize, half(width) * 2, |_| {})
    }

    /// Create a zeroed NV12 buffer with explicit strides
    pub fn create_with_strides(
        width: u32,
        height: u32,
        stride_y: usize,
        stride_uv: usize,
    ) -> Result<Self> {
        Self::build(PixelFormat::Nv12, width, height, stride_y, stride_uv, |_| {})
    }

    /// Convert any buffer into a new NV12 buffer
    pub fn copy(src: &dyn PixelBuffer) -> Result<Self> {
        Self::copy_as(PixelFormat::Nv12, src)
    }

    /// Convert any buffer into a new NV12 or NV21 buffer
    pub fn copy_as(format: PixelFormat, src: &dyn PixelBuffer) -> Result<Self> {
        let (width, height) = (src.width(), src.height());
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (half(width), half(height));
        let swapped = format == PixelFormat::Nv21;

        match src.planes() {
            Planes::Planar {
                y,
                u,
                v,
                stride_y,
                stride_u,
                stride_v,
            } => Self::build(format, width, height, w, cw * 2, |dst| {
                convert::copy_plane(y, stride_y, dst.y, dst.stride_y, w, h);
                convert::merge_uv(
                    u,
                    stride_u,
                    v,
                    stride_v,
                    dst.uv,
                    dst.stride_uv,
                    cw,
                    ch,
                    swapped,
                );
            }),
            Planes::Biplanar {
                y,
                uv,
                stride_y,
                stride_uv,
                swapped: src_swapped,
            } => Self::build(format, width, height, w, cw * 2, |dst| {
                convert::copy_plane(y, stride_y, dst.y, dst.stride_y, w, h);
                if src_swapped == swapped {
                    convert::copy_plane(uv, stride_uv, dst.uv, dst.stride_uv, cw * 2, ch);
                } else {
                    convert::swap_uv(uv, stride_uv, dst.uv, dst.stride_uv, cw, ch);
                }
            }),
            Planes::Packed { .. } => {
                let i420 = src.to_i420()?;
                Self::copy_as(format, &i420)
            }
        }
    }

    fn build(
        format: PixelFormat,
        width: u32,
        height: u32,
        stride_y: usize,
        stride_uv: usize,
        fill: impl FnOnce(BiplanarMut<'_>),
    ) -> Result<Self> {
        assert!(
            matches!(format, PixelFormat::Nv12 | PixelFormat::Nv21),
            "{} is not a bi-planar format",
            format
        );
        check_dimensions(width, height);
        assert!(
            stride_y >= width as usize,
            "luma stride {} is narrower than width {}",
            stride_y,
            width
        );
        assert!(
            stride_uv >= half(width) * 2,
            "chroma stride {} is narrower than {}",
            stride_uv,
            half(width) * 2
        );

        let rows = height as usize;
        let len = total_len(&[(stride_y, rows), (stride_uv, half(height))])?;
        let mut data = alloc(len)?;

        {
            let (y, uv) = data.split_at_mut(stride_y * rows);
            fill(BiplanarMut {
                y,
                stride_y,
                uv,
                stride_uv,
            });
        }

        Ok(Self {
            format,
            width,
            height,
            stride_y,
            stride_uv,
            data: Bytes::from(data),
        })
    }

    pub fn stride_y(&self) -> usize {
        self.stride_y
    }

    pub fn stride_uv(&self) -> usize {
        self.stride_uv
    }

    pub fn chroma_width(&self) -> usize {
        half(self.width)
    }

    pub fn chroma_height(&self) -> usize {
        half(self.height)
    }

    pub fn data_y(&self) -> &[u8] {
        &self.data[..self.stride_y * self.height as usize]
    }

    pub fn data_uv(&self) -> &[u8] {
        &self.data[self.stride_y * self.height as usize..]
    }

    fn swapped(&self) -> bool {
        self.format == PixelFormat::Nv21
    }
}

impl PixelBuffer for Biplanar8 {
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
        Planes::Biplanar {
            y: self.data_y(),
            uv: self.data_uv(),
            stride_y: self.stride_y,
            stride_uv: self.stride_uv,
            swapped: self.swapped(),
        }
    }

    /// Native path: scales the luma plane and the interleaved chroma plane
    /// directly, output keeps this buffer's format
    fn crop_and_scale(
        &self,
        offset_x: u32,
        offset_y: u32,
        crop_w: u32,
        crop_h: u32,
        scaled_w: u32,
        scaled_h: u32,
    ) -> Result<Arc<dyn PixelBuffer>> {
        let rect = CropRect::new(offset_x, offset_y, crop_w, crop_h);
        check_crop(self.width, self.height, rect, scaled_w, scaled_h);

        let x = (offset_x & !1) as usize;
        let y = (offset_y & !1) as usize;
        let (cw, ch) = (crop_w as usize, crop_h as usize);
        let uv_w = ((cw + 1) / 2).min(self.chroma_width() - x / 2);
        let uv_h = ((ch + 1) / 2).min(self.chroma_height() - y / 2);

        let (sw, sh) = (scaled_w as usize, scaled_h as usize);
        let (scw, sch) = (half(scaled_w), half(scaled_h));

        let src_y = PlaneRef {
            data: self.data_y(),
            stride: self.stride_y,
            width: self.width as usize,
            height: self.height as usize,
        };
        let src_uv = PlaneRef {
            data: self.data_uv(),
            stride: self.stride_uv,
            width: self.chroma_width(),
            height: self.chroma_height(),
        };

        let scaled = Self::build(self.format, scaled_w, scaled_h, sw, scw * 2, |dst| {
            scale_plane(src_y.crop(x, y, cw, ch, 1), dst.y, dst.stride_y, sw, sh, 1);
            scale_plane(
                src_uv.crop(x / 2, y / 2, uv_w, uv_h, 2),
                dst.uv,
                dst.stride_uv,
                scw,
                sch,
                2,
            );
        })?;
        Ok(Arc::new(scaled))
    }
}
