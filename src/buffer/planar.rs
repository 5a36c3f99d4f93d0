//! Planar 4:2:0 buffers (I420)

use bytes::Bytes;

use super::convert::{self, I420Planes, I420PlanesMut};
use super::scale::{scale_plane, PlaneRef};
use super::{alloc, check_crop, check_dimensions, half, total_len};
use super::{CropRect, PixelBuffer, PixelFormat, Planes};
use crate::error::Result;

/// Three 8-bit planes, chroma subsampled 2x2
///
/// Memory layout is one allocation: the Y plane, then U at
/// `stride_y * height`, then V at `stride_y * height + stride_u * ceil(height / 2)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Planar8 {
    width: u32,
    height: u32,
    stride_y: usize,
    stride_u: usize,
    stride_v: usize,
    data: Bytes,
}

impl Planar8 {
    /// Create a zeroed buffer with tight strides
    pub fn create(width: u32, height: u32) -> Result<Self> {
        Self::create_with_strides(width, height, width as usize, half(width), half(width))
    }

    /// Create a zeroed buffer with explicit strides
    ///
    /// Panics if a stride is narrower than its plane.
    pub fn create_with_strides(
        width: u32,
        height: u32,
        stride_y: usize,
        stride_u: usize,
        stride_v: usize,
    ) -> Result<Self> {
        Self::build(width, height, stride_y, stride_u, stride_v, |_| {})
    }

    /// Copy any buffer into a new I420 buffer
    pub fn copy(src: &dyn PixelBuffer) -> Result<Self> {
        Self::from_planes(src.planes(), src.width(), src.height())
    }

    /// Copy raw I420 planes into a new tightly strided buffer
    pub fn copy_from_planes(width: u32, height: u32, src: I420Planes<'_>) -> Result<Self> {
        let (cw, ch) = (half(width), half(height));
        Self::build(width, height, width as usize, cw, cw, |dst| {
            copy_i420(src, dst, width as usize, height as usize, cw, ch);
        })
    }

    pub(crate) fn build(
        width: u32,
        height: u32,
        stride_y: usize,
        stride_u: usize,
        stride_v: usize,
        fill: impl FnOnce(I420PlanesMut<'_>),
    ) -> Result<Self> {
        check_dimensions(width, height);
        assert!(
            stride_y >= width as usize,
            "luma stride {} is narrower than width {}",
            stride_y,
            width
        );
        assert!(
            stride_u >= half(width) && stride_v >= half(width),
            "chroma strides {}/{} are narrower than {}",
            stride_u,
            stride_v,
            half(width)
        );

        let rows = height as usize;
        let chroma_rows = half(height);
        let len = total_len(&[
            (stride_y, rows),
            (stride_u, chroma_rows),
            (stride_v, chroma_rows),
        ])?;
        let mut data = alloc(len)?;

        {
            let (y, rest) = data.split_at_mut(stride_y * rows);
            let (u, v) = rest.split_at_mut(stride_u * chroma_rows);
            fill(I420PlanesMut {
                y,
                stride_y,
                u,
                stride_u,
                v,
                stride_v,
            });
        }

        Ok(Self {
            width,
            height,
            stride_y,
            stride_u,
            stride_v,
            data: Bytes::from(data),
        })
    }

    pub(crate) fn from_planes(planes: Planes<'_>, width: u32, height: u32) -> Result<Self> {
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (half(width), half(height));

        match planes {
            Planes::Planar {
                y,
                u,
                v,
                stride_y,
                stride_u,
                stride_v,
            } => {
                let src = I420Planes {
                    y,
                    stride_y,
                    u,
                    stride_u,
                    v,
                    stride_v,
                };
                Self::copy_from_planes(width, height, src)
            }
            Planes::Biplanar {
                y,
                uv,
                stride_y,
                stride_uv,
                swapped,
            } => Self::build(width, height, w, cw, cw, |dst| {
                convert::copy_plane(y, stride_y, dst.y, dst.stride_y, w, h);
                convert::split_uv(
                    uv,
                    stride_uv,
                    dst.u,
                    dst.stride_u,
                    dst.v,
                    dst.stride_v,
                    cw,
                    ch,
                    swapped,
                );
            }),
            Planes::Packed {
                data,
                stride,
                order,
            } => Self::build(width, height, w, cw, cw, |dst| {
                convert::packed_to_i420(data, stride, dst, w, h, order);
            }),
        }
    }

    pub fn stride_y(&self) -> usize {
        self.stride_y
    }

    pub fn stride_u(&self) -> usize {
        self.stride_u
    }

    pub fn stride_v(&self) -> usize {
        self.stride_v
    }

    pub fn chroma_width(&self) -> usize {
        half(self.width)
    }

    pub fn chroma_height(&self) -> usize {
        half(self.height)
    }

    fn offset_u(&self) -> usize {
        self.stride_y * self.height as usize
    }

    fn offset_v(&self) -> usize {
        self.offset_u() + self.stride_u * self.chroma_height()
    }

    pub fn data_y(&self) -> &[u8] {
        &self.data[..self.offset_u()]
    }

    pub fn data_u(&self) -> &[u8] {
        &self.data[self.offset_u()..self.offset_v()]
    }

    pub fn data_v(&self) -> &[u8] {
        &self.data[self.offset_v()..]
    }

    /// Borrow all three planes
    pub fn i420_planes(&self) -> I420Planes<'_> {
        I420Planes {
            y: self.data_y(),
            stride_y: self.stride_y,
            u: self.data_u(),
            stride_u: self.stride_u,
            v: self.data_v(),
            stride_v: self.stride_v,
        }
    }

    /// Crop and scale into a new tightly strided I420 buffer
    ///
    /// Offsets are snapped down to even values. Panics if the crop rectangle
    /// is outside the buffer.
    pub fn cropped_and_scaled(
        &self,
        offset_x: u32,
        offset_y: u32,
        crop_w: u32,
        crop_h: u32,
        scaled_w: u32,
        scaled_h: u32,
    ) -> Result<Self> {
        let rect = CropRect::new(offset_x, offset_y, crop_w, crop_h);
        check_crop(self.width, self.height, rect, scaled_w, scaled_h);

        let x = (offset_x & !1) as usize;
        let y = (offset_y & !1) as usize;
        let (cw, ch) = (crop_w as usize, crop_h as usize);
        let uv_w = ((cw + 1) / 2).min(self.chroma_width() - x / 2);
        let uv_h = ((ch + 1) / 2).min(self.chroma_height() - y / 2);

        let (sw, sh) = (scaled_w as usize, scaled_h as usize);
        let (scw, sch) = (half(scaled_w), half(scaled_h));

        let src_y = self.plane(self.data_y(), self.stride_y, 1);
        let src_u = self.plane(self.data_u(), self.stride_u, 2);
        let src_v = self.plane(self.data_v(), self.stride_v, 2);

        Self::build(scaled_w, scaled_h, sw, scw, scw, |dst| {
            scale_plane(src_y.crop(x, y, cw, ch, 1), dst.y, dst.stride_y, sw, sh, 1);
            scale_plane(
                src_u.crop(x / 2, y / 2, uv_w, uv_h, 1),
                dst.u,
                dst.stride_u,
                scw,
                sch,
                1,
            );
            scale_plane(
                src_v.crop(x / 2, y / 2, uv_w, uv_h, 1),
                dst.v,
                dst.stride_v,
                scw,
                sch,
                1,
            );
        })
    }

    fn plane<'a>(&self, data: &'a [u8], stride: usize, subsampling: u32) -> PlaneRef<'a> {
        let (width, height) = if subsampling == 1 {
            (self.width as usize, self.height as usize)
        } else {
            (self.chroma_width(), self.chroma_height())
        };
        PlaneRef {
            data,
            stride,
            width,
            height,
        }
    }
}

fn copy_i420(
    src: I420Planes<'_>,
    dst: I420PlanesMut<'_>,
    w: usize,
    h: usize,
    cw: usize,
    ch: usize,
) {
    convert::copy_plane(src.y, src.stride_y, dst.y, dst.stride_y, w, h);
    convert::copy_plane(src.u, src.stride_u, dst.u, dst.stride_u, cw, ch);
    convert::copy_plane(src.v, src.stride_v, dst.v, dst.stride_v, cw, ch);
}

impl PixelBuffer for Planar8 {
    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::I420
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn planes(&self) -> Planes<'_> {
        Planes::Planar {
            y: self.data_y(),
            u: self.data_u(),
            v: self.data_v(),
            stride_y: self.stride_y,
            stride_u: self.stride_u,
            stride_v: self.stride_v,
        }
    }

    fn to_i420(&self) -> Result<Planar8> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::pattern_i420;

    #[test]
    fn test_create_dimensions_and_strides() {
        for (w, h) in [(640, 480), (1, 1), (333, 17)] {
            let buffer = Planar8::create(w, h).unwrap();
            assert_eq!(buffer.width(), w);
            assert_eq!(buffer.height(), h);
            assert_eq!(buffer.stride_y(), w as usize);
            assert_eq!(buffer.stride_u(), (w as usize + 1) / 2);
            assert_eq!(buffer.stride_v(), (w as usize + 1) / 2);
        }
    }

    #[test]
    fn test_plane_offsets() {
        let buffer = Planar8::create_with_strides(6, 3, 8, 4, 5).unwrap();
        assert_eq!(buffer.data_y().len(), 8 * 3);
        assert_eq!(buffer.data_u().len(), 4 * 2);
        assert_eq!(buffer.data_v().len(), 5 * 2);
    }

    #[test]
    #[should_panic(expected = "luma stride")]
    fn test_narrow_luma_stride_panics() {
        let _ = Planar8::create_with_strides(64, 64, 32, 32, 32);
    }

    #[test]
    #[should_panic(expected = "chroma strides")]
    fn test_narrow_chroma_stride_panics() {
        let _ = Planar8::create_with_strides(65, 64, 65, 32, 33);
    }

    #[test]
    #[should_panic(expected = "buffer dimensions must be positive")]
    fn test_zero_height_panics() {
        let _ = Planar8::create(16, 0);
    }

    #[test]
    fn test_oversized_strides_fail_allocation() {
        let result = Planar8::create_with_strides(1, 4, usize::MAX / 2, 1, 1);
        assert!(matches!(result, Err(Error::Allocation { .. })));
    }

    #[test]
    fn test_to_i420_shares_memory() {
        let buffer = pattern_i420(64, 48, 3);
        let shared = buffer.to_i420().unwrap();
        assert_eq!(shared.data_y().as_ptr(), buffer.data_y().as_ptr());
    }

    #[test]
    fn test_copy_repacks_padded_strides() {
        let padded = Planar8::create_with_strides(4, 2, 8, 4, 4).unwrap();
        let copy = Planar8::copy(&padded).unwrap();
        assert_eq!(copy.stride_y(), 4);
        assert_eq!(copy.data_y().len(), 8);
    }

    #[test]
    fn test_identity_crop_and_scale_matches_copy() {
        let buffer = pattern_i420(64, 48, 7);
        let scaled = buffer.cropped_and_scaled(0, 0, 64, 48, 64, 48).unwrap();
        let copy = Planar8::copy(&buffer).unwrap();
        assert_eq!(scaled, copy);
    }

    #[test]
    fn test_odd_offsets_snap_to_even() {
        let buffer = pattern_i420(32, 32, 1);
        let snapped = buffer.cropped_and_scaled(3, 5, 16, 16, 16, 16).unwrap();
        let even = buffer.cropped_and_scaled(2, 4, 16, 16, 16, 16).unwrap();
        assert_eq!(snapped, even);
    }

    #[test]
    fn test_crop_and_scale_output_size() {
        let buffer = pattern_i420(640, 480, 0);
        let scaled = buffer.crop_and_scale(80, 60, 480, 360, 320, 240).unwrap();
        assert_eq!(scaled.width(), 320);
        assert_eq!(scaled.height(), 240);
        assert_eq!(scaled.pixel_format(), PixelFormat::I420);
    }

    #[test]
    fn test_centered_crop_and_scale() {
        let buffer = pattern_i420(640, 480, 0);
        let scaled = buffer.crop_and_scale_centered(100, 100).unwrap();
        assert_eq!((scaled.width(), scaled.height()), (100, 100));
    }

    #[test]
    #[should_panic(expected = "crop rectangle")]
    fn test_crop_outside_buffer_panics() {
        let buffer = pattern_i420(64, 64, 0);
        let _ = buffer.cropped_and_scaled(32, 0, 64, 64, 32, 32);
    }
}
