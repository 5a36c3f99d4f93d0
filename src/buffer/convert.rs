//! Plane conversion kernels
//!
//! All kernels work row by row on borrowed slices with explicit strides, so
//! they never care which buffer shape owns the memory. Widths and heights are
//! in samples of the plane being touched, not in picture pixels.

use super::PackedOrder;

/// Copy `width` x `height` bytes between two planes
pub fn copy_plane(
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    width: usize,
    height: usize,
) {
    for row in 0..height {
        let s = &src[row * src_stride..row * src_stride + width];
        dst[row * dst_stride..row * dst_stride + width].copy_from_slice(s);
    }
}

/// Interleave separate U and V planes into one UV plane
///
/// With `swapped` the output is V first (NV21).
#[allow(clippy::too_many_arguments)]
pub fn merge_uv(
    u: &[u8],
    stride_u: usize,
    v: &[u8],
    stride_v: usize,
    uv: &mut [u8],
    stride_uv: usize,
    width: usize,
    height: usize,
    swapped: bool,
) {
    let (first, first_stride, second, second_stride) = if swapped {
        (v, stride_v, u, stride_u)
    } else {
        (u, stride_u, v, stride_v)
    };

    for row in 0..height {
        let a = &first[row * first_stride..row * first_stride + width];
        let b = &second[row * second_stride..row * second_stride + width];
        let out = &mut uv[row * stride_uv..row * stride_uv + width * 2];
        for (col, pair) in out.chunks_exact_mut(2).enumerate() {
            pair[0] = a[col];
            pair[1] = b[col];
        }
    }
}

/// Split an interleaved UV plane into separate U and V planes
#[allow(clippy::too_many_arguments)]
pub fn split_uv(
    uv: &[u8],
    stride_uv: usize,
    u: &mut [u8],
    stride_u: usize,
    v: &mut [u8],
    stride_v: usize,
    width: usize,
    height: usize,
    swapped: bool,
) {
    for row in 0..height {
        let pairs = &uv[row * stride_uv..row * stride_uv + width * 2];
        let u_row = &mut u[row * stride_u..row * stride_u + width];
        let v_row = &mut v[row * stride_v..row * stride_v + width];
        for (col, pair) in pairs.chunks_exact(2).enumerate() {
            let (cu, cv) = if swapped {
                (pair[1], pair[0])
            } else {
                (pair[0], pair[1])
            };
            u_row[col] = cu;
            v_row[col] = cv;
        }
    }
}

/// Swap the two bytes of every chroma pair (NV12 <-> NV21)
pub fn swap_uv(
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    width: usize,
    height: usize,
) {
    for row in 0..height {
        let s = &src[row * src_stride..row * src_stride + width * 2];
        let d = &mut dst[row * dst_stride..row * dst_stride + width * 2];
        for (out, pair) in d.chunks_exact_mut(2).zip(s.chunks_exact(2)) {
            out[0] = pair[1];
            out[1] = pair[0];
        }
    }
}

/// Borrowed I420 planes
#[derive(Debug, Clone, Copy)]
pub struct I420Planes<'a> {
    pub y: &'a [u8],
    pub stride_y: usize,
    pub u: &'a [u8],
    pub stride_u: usize,
    pub v: &'a [u8],
    pub stride_v: usize,
}

/// Mutably borrowed I420 planes
#[derive(Debug)]
pub struct I420PlanesMut<'a> {
    pub y: &'a mut [u8],
    pub stride_y: usize,
    pub u: &'a mut [u8],
    pub stride_u: usize,
    pub v: &'a mut [u8],
    pub stride_v: usize,
}

/// Pack I420 into 4:2:2
///
/// Each output row takes its chroma from source chroma row `row / 2`.
pub fn i420_to_packed(
    src: I420Planes<'_>,
    dst: &mut [u8],
    dst_stride: usize,
    width: usize,
    height: usize,
    order: PackedOrder,
) {
    let [oy0, ou, oy1, ov] = order.offsets();
    let pairs = width / 2;

    for row in 0..height {
        let y = &src.y[row * src.stride_y..];
        let u = &src.u[(row / 2) * src.stride_u..];
        let v = &src.v[(row / 2) * src.stride_v..];
        let out = &mut dst[row * dst_stride..];

        for pair in 0..pairs {
            let m = &mut out[pair * 4..pair * 4 + 4];
            m[oy0] = y[pair * 2];
            m[oy1] = y[pair * 2 + 1];
            m[ou] = u[pair];
            m[ov] = v[pair];
        }

        // Odd width: the last macropixel repeats its only luma sample
        if width % 2 == 1 {
            let m = &mut out[pairs * 4..pairs * 4 + 4];
            m[oy0] = y[width - 1];
            m[oy1] = y[width - 1];
            m[ou] = u[pairs];
            m[ov] = v[pairs];
        }
    }
}

/// Unpack 4:2:2 into I420
///
/// Vertical chroma is the rounded average of each pair of rows.
pub fn packed_to_i420(
    src: &[u8],
    src_stride: usize,
    dst: I420PlanesMut<'_>,
    width: usize,
    height: usize,
    order: PackedOrder,
) {
    let [oy0, ou, oy1, ov] = order.offsets();
    let chroma_w = (width + 1) / 2;

    for row in 0..height {
        let line = &src[row * src_stride..];
        let y = &mut dst.y[row * dst.stride_y..];
        for col in 0..width {
            let m = &line[(col / 2) * 4..(col / 2) * 4 + 4];
            y[col] = if col % 2 == 0 { m[oy0] } else { m[oy1] };
        }
    }

    for crow in 0..(height + 1) / 2 {
        let top = &src[(crow * 2) * src_stride..];
        let bottom_row = (crow * 2 + 1).min(height - 1);
        let bottom = &src[bottom_row * src_stride..];
        let u = &mut dst.u[crow * dst.stride_u..];
        let v = &mut dst.v[crow * dst.stride_v..];
        for col in 0..chroma_w {
            let t = &top[col * 4..col * 4 + 4];
            let b = &bottom[col * 4..col * 4 + 4];
            u[col] = ((t[ou] as u16 + b[ou] as u16 + 1) / 2) as u8;
            v[col] = ((t[ov] as u16 + b[ov] as u16 + 1) / 2) as u8;
        }
    }
}
