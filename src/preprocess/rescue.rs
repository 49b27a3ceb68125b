//! Rescue mode: sharpness-gated adaptive threshold.
//!
//! Pipeline: grayscale, Laplacian-variance blur gate, 3x3 Gaussian blur,
//! Gaussian adaptive threshold, 3x3 close, back to RGBA. Every scratch plane
//! comes from the pools and is returned when this function exits, whichever
//! way it exits.

use image::RgbaImage;

use crate::config::RescueConfig;
use crate::error::PreprocessError;
use crate::utils::binarization::adaptive_threshold_gaussian;
use crate::utils::filters::{gaussian_blur_3x3, laplacian_variance, morph_close_3x3};
use crate::utils::grayscale::{grayscale_to_rgba, rgba_to_grayscale_with_buffer};
use crate::utils::memory_pool::BufferPool;

/// What the rescue pass did to the region
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum RescueResult {
    Thresholded { variance: f64 },
    TooBlurry { variance: f64 },
}

pub(crate) fn apply(
    image: &mut RgbaImage,
    config: &RescueConfig,
    bytes: &BufferPool<u8>,
    floats: &BufferPool<f32>,
) -> Result<RescueResult, PreprocessError> {
    if !config.enabled {
        return Err(PreprocessError::RescueDisabled);
    }
    let (width, height) = (image.width() as usize, image.height() as usize);
    let n = width * height;

    let mut gray = bytes.acquire(n)?;
    rgba_to_grayscale_with_buffer(image, width, height, &mut gray);

    let variance = laplacian_variance(&gray, width, height);
    if variance < config.blur_threshold {
        return Ok(RescueResult::TooBlurry { variance });
    }

    let mut tmp = floats.acquire(n)?;
    let mut smooth = floats.acquire(n)?;
    let mut work = bytes.acquire(n)?;

    gaussian_blur_3x3(&gray, width, height, &mut tmp, &mut smooth, &mut work);
    adaptive_threshold_gaussian(
        &work,
        width,
        height,
        config.block_size,
        config.offset,
        &mut tmp,
        &mut smooth,
        &mut gray,
    );
    morph_close_3x3(&mut gray, width, height, &mut work);
    grayscale_to_rgba(&gray, image);

    Ok(RescueResult::Thresholded { variance })
}
