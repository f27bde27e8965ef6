// src/preprocessing.rs

use crate::types::TensorLayout;
use anyhow::{bail, Result};

/// Resize a packed RGB frame to the landmark model input and lay it out as
/// f32 in the requested layout, multiplying each 0..255 value by `scale`.
pub fn preprocess(
    src: &[u8],
    src_width: usize,
    src_height: usize,
    dst_width: usize,
    dst_height: usize,
    layout: TensorLayout,
    scale: f32,
) -> Result<Vec<f32>> {
    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        bail!(
            "Invalid resize {}x{} -> {}x{}",
            src_width,
            src_height,
            dst_width,
            dst_height
        );
    }
    if src.len() != src_width * src_height * 3 {
        bail!(
            "Frame buffer has {} bytes, expected {} for {}x{} RGB",
            src.len(),
            src_width * src_height * 3,
            src_width,
            src_height
        );
    }

    let resized = resize_bilinear(src, src_width, src_height, dst_width, dst_height);

    let output = match layout {
        // Already HWC, just convert
        TensorLayout::Nhwc => resized.iter().map(|p| *p as f32 * scale).collect(),
        TensorLayout::Nchw => {
            let mut output = vec![0.0f32; 3 * dst_height * dst_width];
            for c in 0..3 {
                for h in 0..dst_height {
                    for w in 0..dst_width {
                        let hwc_idx = (h * dst_width + w) * 3 + c;
                        let chw_idx = c * dst_height * dst_width + h * dst_width + w;
                        output[chw_idx] = resized[hwc_idx] as f32 * scale;
                    }
                }
            }
            output
        }
    };

    Ok(output)
}

/// Tensor shape matching [`preprocess`] output for a batch of one.
pub fn input_shape(width: usize, height: usize, layout: TensorLayout) -> [usize; 4] {
    match layout {
        TensorLayout::Nhwc => [1, height, width, 3],
        TensorLayout::Nchw => [1, 3, height, width],
    }
}

/// Bilinear image resize
fn resize_bilinear(src: &[u8], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<u8> {
    let mut dst = vec![0u8; dst_h * dst_w * 3];

    let x_ratio = src_w as f32 / dst_w as f32;
    let y_ratio = src_h as f32 / dst_h as f32;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx as f32 * x_ratio;
            let sy = dy as f32 * y_ratio;

            let sx0 = (sx.floor() as usize).min(src_w - 1);
            let sy0 = (sy.floor() as usize).min(src_h - 1);
            let sx1 = (sx0 + 1).min(src_w - 1);
            let sy1 = (sy0 + 1).min(src_h - 1);

            let fx = sx - sx0 as f32;
            let fy = sy - sy0 as f32;

            for c in 0..3 {
                let p00 = src[(sy0 * src_w + sx0) * 3 + c] as f32;
                let p10 = src[(sy0 * src_w + sx1) * 3 + c] as f32;
                let p01 = src[(sy1 * src_w + sx0) * 3 + c] as f32;
                let p11 = src[(sy1 * src_w + sx1) * 3 + c] as f32;

                let val = p00 * (1.0 - fx) * (1.0 - fy)
                    + p10 * fx * (1.0 - fy)
                    + p01 * (1.0 - fx) * fy
                    + p11 * fx * fy;

                dst[(dy * dst_w + dx) * 3 + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_nhwc() {
        let src = vec![128u8; 640 * 480 * 3];
        let result = preprocess(&src, 640, 480, 192, 192, TensorLayout::Nhwc, 1.0).unwrap();
        assert_eq!(result.len(), 192 * 192 * 3);
        assert!(result.iter().all(|v| (*v - 128.0).abs() < 1e-3));
    }

    #[test]
    fn test_preprocess_nchw_separates_channels() {
        // Pure red frame
        let mut src = vec![0u8; 4 * 4 * 3];
        for px in src.chunks_mut(3) {
            px[0] = 255;
        }
        let result = preprocess(&src, 4, 4, 2, 2, TensorLayout::Nchw, 1.0 / 255.0).unwrap();
        assert_eq!(result.len(), 3 * 2 * 2);
        assert!(result[..4].iter().all(|v| (*v - 1.0).abs() < 1e-6));
        assert!(result[4..].iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_rejects_short_buffer() {
        let src = vec![0u8; 10];
        assert!(preprocess(&src, 4, 4, 2, 2, TensorLayout::Nhwc, 1.0).is_err());
    }

    #[test]
    fn test_resize() {
        let src = vec![255u8; 100 * 100 * 3];
        let dst = resize_bilinear(&src, 100, 100, 50, 50);
        assert_eq!(dst.len(), 50 * 50 * 3);
    }

    #[test]
    fn test_input_shape() {
        assert_eq!(input_shape(192, 256, TensorLayout::Nhwc), [1, 256, 192, 3]);
        assert_eq!(input_shape(192, 256, TensorLayout::Nchw), [1, 3, 256, 192]);
    }
}
