//! Grayscale conversion for RGBA frames
//!
//! Two weightings are used:
//! - BT.601 fixed point: Y = (76*R + 150*G + 29*B) >> 8, for the rescue pipeline
//! - BT.709 floating point: Y = 0.2126*R + 0.7152*G + 0.0722*B, for `enhance`

use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: i32 = 76;
const COEF_G: i32 = 150;
const COEF_B: i32 = 29;

/// BT.709 luma weights
pub const LUMA_709: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Rows at or above this pixel count are converted in parallel
const PARALLEL_MIN_PIXELS: usize = 64 * 1024;

#[inline]
fn bt601(r: u8, g: u8, b: u8) -> u8 {
    let lum = (COEF_R * r as i32 + COEF_G * g as i32 + COEF_B * b as i32) >> 8;
    lum.min(255) as u8
}

/// BT.709 luma of one pixel, unclamped
#[inline]
pub fn luma709(r: u8, g: u8, b: u8) -> f32 {
    LUMA_709[0] * r as f32 + LUMA_709[1] * g as f32 + LUMA_709[2] * b as f32
}

/// Convert RGBA to grayscale (ignores alpha channel)
pub fn rgba_to_grayscale(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    rgba_to_grayscale_with_buffer(rgba, width, height, &mut gray);
    gray
}

/// Convert RGBA to grayscale using a pre-allocated buffer (no allocation)
///
/// # Returns
/// Number of pixels written (width * height)
pub fn rgba_to_grayscale_with_buffer(
    rgba: &[u8],
    width: usize,
    height: usize,
    output: &mut [u8],
) -> usize {
    let pixel_count = width * height;
    assert!(output.len() >= pixel_count, "Output buffer too small");
    assert!(rgba.len() >= pixel_count * 4, "Input buffer too small");
    if pixel_count == 0 {
        return 0;
    }

    let convert_row = |(y, row): (usize, &mut [u8])| {
        let src = &rgba[y * width * 4..(y + 1) * width * 4];
        for (dst, px) in row.iter_mut().zip(src.chunks_exact(4)) {
            *dst = bt601(px[0], px[1], px[2]);
        }
    };

    let output = &mut output[..pixel_count];
    if pixel_count >= PARALLEL_MIN_PIXELS {
        output.par_chunks_mut(width).enumerate().for_each(convert_row);
    } else {
        output.chunks_mut(width).enumerate().for_each(convert_row);
    }

    pixel_count
}

/// Write a grayscale plane back into an RGBA buffer with opaque alpha
pub fn grayscale_to_rgba(gray: &[u8], rgba: &mut [u8]) {
    for (px, &v) in rgba.chunks_exact_mut(4).zip(gray) {
        px[0] = v;
        px[1] = v;
        px[2] = v;
        px[3] = 255;
    }
}
