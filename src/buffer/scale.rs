//! Plane scaling
//!
//! Bilinear filtering in 16.16 fixed point. When source and destination sizes
//! match, every sample lands exactly on a source sample and the output is a
//! byte-exact copy.

/// One plane to read from
#[derive(Debug, Clone, Copy)]
pub struct PlaneRef<'a> {
    pub data: &'a [u8],
    pub stride: usize,
    /// Width in samples (a UV pair counts as one sample)
    pub width: usize,
    pub height: usize,
}

impl<'a> PlaneRef<'a> {
    /// Sub-plane starting at sample (`x`, `y`)
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize, channels: usize) -> Self {
        let start = y * self.stride + x * channels;
        Self {
            data: &self.data[start..],
            stride: self.stride,
            width,
            height,
        }
    }
}

/// Scale `src` into a `dst_w` x `dst_h` region of `dst`
///
/// `channels` is 1 for ordinary planes and 2 for interleaved UV planes.
pub fn scale_plane(
    src: PlaneRef<'_>,
    dst: &mut [u8],
    dst_stride: usize,
    dst_w: usize,
    dst_h: usize,
    channels: usize,
) {
    if src.width == 0 || src.height == 0 || dst_w == 0 || dst_h == 0 {
        return;
    }

    let x_step = ((src.width as u64) << 16) / dst_w as u64;
    let y_step = ((src.height as u64) << 16) / dst_h as u64;
    let max_x = src.width - 1;
    let max_y = src.height - 1;

    for dy in 0..dst_h {
        let sy = dy as u64 * y_step;
        let y0 = ((sy >> 16) as usize).min(max_y);
        let y1 = (y0 + 1).min(max_y);
        let fy = sy & 0xFFFF;

        let top = &src.data[y0 * src.stride..];
        let bottom = &src.data[y1 * src.stride..];
        let out = &mut dst[dy * dst_stride..];

        for dx in 0..dst_w {
            let sx = dx as u64 * x_step;
            let x0 = ((sx >> 16) as usize).min(max_x);
            let x1 = (x0 + 1).min(max_x);
            let fx = sx & 0xFFFF;

            for c in 0..channels {
                let p00 = top[x0 * channels + c] as u64;
                let p01 = top[x1 * channels + c] as u64;
                let p10 = bottom[x0 * channels + c] as u64;
                let p11 = bottom[x1 * channels + c] as u64;

                let upper = p00 * (0x10000 - fx) + p01 * fx;
                let lower = p10 * (0x10000 - fx) + p11 * fx;
                let value = (upper * (0x10000 - fy) + lower * fy + (1 << 31)) >> 32;
                out[dx * channels + c] = value as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(data: &[u8], width: usize, height: usize) -> PlaneRef<'_> {
        PlaneRef {
            data,
            stride: width,
            width,
            height,
        }
    }

    #[test]
    fn test_identity_is_exact() {
        let src: Vec<u8> = (0..64).map(|v| (v * 3) as u8).collect();
        let mut dst = vec![0u8; 64];
        scale_plane(plane(&src, 8, 8), &mut dst, 8, 8, 8, 1);
        assert_eq!(src, dst);
    }

    #[test]
    fn test_downscale_flat_plane() {
        let src = vec![77u8; 16 * 16];
        let mut dst = vec![0u8; 4 * 4];
        scale_plane(plane(&src, 16, 16), &mut dst, 4, 4, 4, 1);
        assert!(dst.iter().all(|&v| v == 77));
    }

    #[test]
    fn test_upscale_interpolates() {
        let src = [0u8, 200];
        let mut dst = [0u8; 4];
        scale_plane(plane(&src, 2, 1), &mut dst, 4, 4, 1, 1);
        assert_eq!(dst[0], 0);
        assert_eq!(dst[1], 100);
        assert_eq!(dst[2], 200);
        assert_eq!(dst[3], 200);
    }

    #[test]
    fn test_interleaved_channels_stay_separate() {
        // UV pairs: U ramps, V constant
        let src = [0u8, 50, 100, 50, 200, 50, 250, 50];
        let mut dst = [0u8; 4];
        let src = PlaneRef {
            data: &src,
            stride: 8,
            width: 4,
            height: 1,
        };
        scale_plane(src, &mut dst, 4, 2, 1, 2);
        assert_eq!(dst[1], 50);
        assert_eq!(dst[3], 50);
        assert_eq!(dst[0], 0);
        assert_eq!(dst[2], 200);
    }

    #[test]
    fn test_crop_offsets_into_plane() {
        let src: Vec<u8> = (0..16).collect();
        let p = plane(&src, 4, 4).crop(1, 2, 2, 2, 1);
        let mut dst = [0u8; 4];
        scale_plane(p, &mut dst, 2, 2, 2, 1);
        assert_eq!(dst, [9, 10, 13, 14]);
    }
}
