use super::filters::{convolve_separable, gaussian_kernel, replicate};

/// Gaussian-weighted adaptive threshold.
///
/// Each pixel is compared with the Gaussian-weighted mean of its
/// `block_size` x `block_size` neighbourhood minus `offset`: brighter pixels
/// become 255, the rest 0. Handles illumination that varies across the
/// barcode, which a single global threshold cannot.
///
/// `tmp` and `mean` are scratch planes of `width * height` values.
#[allow(clippy::too_many_arguments)]
pub fn adaptive_threshold_gaussian(
    src: &[u8],
    width: usize,
    height: usize,
    block_size: usize,
    offset: f32,
    tmp: &mut [f32],
    mean: &mut [f32],
    dst: &mut [u8],
) {
    let n = width * height;
    if n == 0 {
        return;
    }
    let kernel = gaussian_kernel(block_size, 0.0);
    convolve_separable(src, width, height, &kernel, replicate, tmp, mean);

    let delta = offset.ceil() as i32;
    for ((d, &s), &m) in dst[..n].iter_mut().zip(&src[..n]).zip(&mean[..n]) {
        let m = m.round().clamp(0.0, 255.0) as i32;
        *d = if s as i32 - m > -delta { 255 } else { 0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &[u8], w: usize, h: usize, block: usize, offset: f32) -> Vec<u8> {
        let mut tmp = vec![0.0; w * h];
        let mut mean = vec![0.0; w * h];
        let mut dst = vec![0u8; w * h];
        adaptive_threshold_gaussian(src, w, h, block, offset, &mut tmp, &mut mean, &mut dst);
        dst
    }

    #[test]
    fn test_flat_region_is_white() {
        // equal to its own mean, which is above mean - offset
        let src = vec![90u8; 40 * 20];
        assert!(run(&src, 40, 20, 31, 7.0).iter().all(|&v| v == 255));
    }

    #[test]
    fn test_dark_bars_survive_gradient() {
        // bars 40 levels darker than a background ramping from 60 to 220
        let (w, h) = (120, 20);
        let mut src = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let base = 60 + (x * 160 / w) as i32;
                let bar = (x / 4) % 2 == 1;
                src[y * w + x] = (base - if bar { 40 } else { 0 }) as u8;
            }
        }
        let dst = run(&src, w, h, 31, 7.0);
        let row = &dst[10 * w..11 * w];
        for x in 8..w - 8 {
            let bar = (x / 4) % 2 == 1;
            assert_eq!(row[x] == 0, bar, "x={x}");
        }
    }
}
