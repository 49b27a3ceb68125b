//! `enhance` mode: contrast-stretched luma followed by a cross sharpen.

use image::RgbaImage;

use crate::config::EnhanceConfig;
use crate::error::PreprocessError;
use crate::utils::grayscale::luma709;
use crate::utils::memory_pool::BufferPool;

/// Contrast stretch around mid-gray, clamped to the u8 range
#[inline]
fn stretch(luma: f32, gain: f32) -> u8 {
    ((luma - 128.0) * gain + 128.0).round().clamp(0.0, 255.0) as u8
}

/// Run both passes in place.
///
/// Pass one writes `stretch(luma709)` into R, G and B. Pass two sharpens
/// interior pixels with a 5 / -1 cross kernel read from the pass-one plane;
/// border pixels keep their pass-one value. Alpha ends up opaque everywhere.
pub(crate) fn apply(
    image: &mut RgbaImage,
    config: &EnhanceConfig,
    pool: &BufferPool<u8>,
) -> Result<(), PreprocessError> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut plane = pool.acquire(width * height)?;

    let raw: &mut [u8] = image;
    for (px, g) in raw.chunks_exact_mut(4).zip(plane.iter_mut()) {
        let v = stretch(luma709(px[0], px[1], px[2]), config.contrast);
        *g = v;
        px[0] = v;
        px[1] = v;
        px[2] = v;
        px[3] = 255;
    }

    if width < 3 || height < 3 {
        return Ok(());
    }

    let s = &plane[..];
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let i = y * width + x;
            let v = 5 * s[i] as i32
                - s[i - width] as i32
                - s[i + width] as i32
                - s[i - 1] as i32
                - s[i + 1] as i32;
            let v = v.clamp(0, 255) as u8;
            let p = i * 4;
            raw[p] = v;
            raw[p + 1] = v;
            raw[p + 2] = v;
        }
    }
    Ok(())
}
