//! Small-kernel filters on single-channel planes
//!
//! All planes are row-major `width * height` buffers. Callers provide the
//! output (and any scratch) so the preprocessing pipeline can serve them
//! from its buffer pool.

use rayon::prelude::*;

/// Rows at or above this pixel count are filtered in parallel
const PARALLEL_MIN_PIXELS: usize = 64 * 1024;

/// Mirror an index into `0..n` without repeating the edge (OpenCV's
/// BORDER_REFLECT_101: `gfedcb|abcdefgh|gfedcba`)
#[inline]
pub fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let period = 2 * (n - 1);
    let mut i = i.rem_euclid(period);
    if i >= n {
        i = period - i;
    }
    i as usize
}

/// Clamp an index into `0..n` (BORDER_REPLICATE)
#[inline]
pub fn replicate(i: isize, n: usize) -> usize {
    i.clamp(0, n as isize - 1) as usize
}

/// Variance of the 4-neighbour Laplacian response.
///
/// Sharp edges give a large variance; a defocused frame gives a small one.
pub fn laplacian_variance(gray: &[u8], width: usize, height: usize) -> f64 {
    let n = width * height;
    if n == 0 {
        return 0.0;
    }
    let at = |x: isize, y: isize| -> f64 {
        gray[reflect101(y, height) * width + reflect101(x, width)] as f64
    };

    let row_sums = |y: usize| -> (f64, f64) {
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let yi = y as isize;
        for x in 0..width as isize {
            let v = at(x, yi - 1) + at(x, yi + 1) + at(x - 1, yi) + at(x + 1, yi) - 4.0 * at(x, yi);
            sum += v;
            sum_sq += v * v;
        }
        (sum, sum_sq)
    };

    let (sum, sum_sq) = if n >= PARALLEL_MIN_PIXELS {
        (0..height)
            .into_par_iter()
            .map(row_sums)
            .reduce(|| (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1))
    } else {
        (0..height)
            .map(row_sums)
            .fold((0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1))
    };

    let mean = sum / n as f64;
    (sum_sq / n as f64 - mean * mean).max(0.0)
}

/// Normalized 1D Gaussian kernel.
///
/// A non-positive `sigma` is derived from the size the same way OpenCV
/// does: `0.3 * ((ksize - 1) * 0.5 - 1) + 0.8`. Size 3 with sigma <= 0
/// yields the binomial `[1, 2, 1] / 4`.
pub fn gaussian_kernel(ksize: usize, sigma: f32) -> Vec<f32> {
    let ksize = ksize.max(1) | 1;
    if ksize == 3 && sigma <= 0.0 {
        return vec![0.25, 0.5, 0.25];
    }
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
    };
    let half = (ksize / 2) as f32;
    let scale = -0.5 / (sigma * sigma);
    let mut kernel: Vec<f32> = (0..ksize)
        .map(|i| {
            let d = i as f32 - half;
            (scale * d * d).exp()
        })
        .collect();
    let total: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= total);
    kernel
}

/// Separable convolution of a u8 plane into an f32 plane.
///
/// `tmp` receives the horizontal pass and must hold `width * height` values.
/// `border` maps an out-of-range index back into the image.
pub fn convolve_separable(
    src: &[u8],
    width: usize,
    height: usize,
    kernel: &[f32],
    border: fn(isize, usize) -> usize,
    tmp: &mut [f32],
    dst: &mut [f32],
) {
    let n = width * height;
    if n == 0 {
        return;
    }
    let half = (kernel.len() / 2) as isize;
    let parallel = n >= PARALLEL_MIN_PIXELS;

    let horizontal = |(y, row): (usize, &mut [f32])| {
        let src_row = &src[y * width..(y + 1) * width];
        for (x, out) in row.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let sx = border(x as isize + k as isize - half, width);
                acc += w * src_row[sx] as f32;
            }
            *out = acc;
        }
    };
    if parallel {
        tmp[..n].par_chunks_mut(width).enumerate().for_each(horizontal);
    } else {
        tmp[..n].chunks_mut(width).enumerate().for_each(horizontal);
    }

    let tmp = &tmp[..n];
    let vertical = |(y, row): (usize, &mut [f32])| {
        for (x, out) in row.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let sy = border(y as isize + k as isize - half, height);
                acc += w * tmp[sy * width + x];
            }
            *out = acc;
        }
    };
    if parallel {
        dst[..n].par_chunks_mut(width).enumerate().for_each(vertical);
    } else {
        dst[..n].chunks_mut(width).enumerate().for_each(vertical);
    }
}

/// 3x3 Gaussian blur (binomial kernel, reflect-101 borders)
pub fn gaussian_blur_3x3(
    src: &[u8],
    width: usize,
    height: usize,
    tmp: &mut [f32],
    smooth: &mut [f32],
    dst: &mut [u8],
) {
    let kernel = gaussian_kernel(3, 0.0);
    convolve_separable(src, width, height, &kernel, reflect101, tmp, smooth);
    for (d, &s) in dst.iter_mut().zip(smooth.iter()).take(width * height) {
        *d = s.round().clamp(0.0, 255.0) as u8;
    }
}

/// Apply a 3x3 min or max filter; out-of-image neighbours are ignored
fn rank_3x3(src: &[u8], width: usize, height: usize, dst: &mut [u8], take_max: bool) {
    for y in 0..height {
        let y0 = y.saturating_sub(1);
        let y1 = (y + 1).min(height - 1);
        for x in 0..width {
            let x0 = x.saturating_sub(1);
            let x1 = (x + 1).min(width - 1);
            let mut v = if take_max { u8::MIN } else { u8::MAX };
            for yy in y0..=y1 {
                for &s in &src[yy * width + x0..=yy * width + x1] {
                    v = if take_max { v.max(s) } else { v.min(s) };
                }
            }
            dst[y * width + x] = v;
        }
    }
}

/// Morphological close with a 3x3 rectangle: dilate, then erode.
///
/// Removes dark specks and breaks narrower than the structuring element
/// while leaving larger shapes in place. `tmp` holds the dilated plane; the
/// result is written back into `plane`.
pub fn morph_close_3x3(plane: &mut [u8], width: usize, height: usize, tmp: &mut [u8]) {
    if width == 0 || height == 0 {
        return;
    }
    rank_3x3(plane, width, height, tmp, true);
    rank_3x3(tmp, width, height, plane, false);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect101() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(6, 5), 2);
        assert_eq!(reflect101(2, 5), 2);
        assert_eq!(reflect101(-3, 1), 0);
    }

    #[test]
    fn test_replicate() {
        assert_eq!(replicate(-4, 5), 0);
        assert_eq!(replicate(9, 5), 4);
        assert_eq!(replicate(3, 5), 3);
    }

    #[test]
    fn test_laplacian_variance_flat_is_zero() {
        let gray = vec![120u8; 32 * 32];
        assert_eq!(laplacian_variance(&gray, 32, 32), 0.0);
    }

    #[test]
    fn test_laplacian_variance_stripes_high() {
        let (w, h) = (64, 32);
        let gray: Vec<u8> = (0..w * h)
            .map(|i| if (i % w / 2) % 2 == 0 { 0 } else { 255 })
            .collect();
        assert!(laplacian_variance(&gray, w, h) > 1000.0);
    }

    #[test]
    fn test_gaussian_kernel() {
        assert_eq!(gaussian_kernel(3, 0.0), vec![0.25, 0.5, 0.25]);
        let k = gaussian_kernel(31, 0.0);
        assert_eq!(k.len(), 31);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(k[15] > k[14] && k[14] > k[0]);
        assert!((k[0] - k[30]).abs() < 1e-9);
    }

    #[test]
    fn test_blur_preserves_flat_and_smooths_step() {
        let (w, h) = (8, 4);
        let mut src = vec![0u8; w * h];
        for y in 0..h {
            for x in 4..w {
                src[y * w + x] = 200;
            }
        }
        let mut tmp = vec![0.0; w * h];
        let mut smooth = vec![0.0; w * h];
        let mut dst = vec![0u8; w * h];
        gaussian_blur_3x3(&src, w, h, &mut tmp, &mut smooth, &mut dst);
        assert_eq!(dst[0], 0);
        assert_eq!(dst[w - 1], 200);
        assert_eq!(dst[3], 50);
        assert_eq!(dst[4], 150);
    }

    #[test]
    fn test_close_removes_dark_speck() {
        // an isolated bright pixel survives closing unchanged
        let (w, h) = (5, 5);
        let mut plane = vec![0u8; w * h];
        plane[2 * w + 2] = 255;
        let original = plane.clone();
        let mut tmp = vec![0u8; w * h];
        morph_close_3x3(&mut plane, w, h, &mut tmp);
        assert_eq!(plane, original);

        // white background with a one-pixel dark speck closes to white
        let mut plane = vec![255u8; w * h];
        plane[2 * w + 2] = 0;
        morph_close_3x3(&mut plane, w, h, &mut tmp);
        assert!(plane.iter().all(|&v| v == 255));
    }
}
