//! Helpers behind the `gtintool` binary and the benches.
//!
//! These run the engine's building blocks on still images so region
//! placement, sharpness gating and preprocessing output can be inspected
//! without a camera.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use image::{GenericImageView, RgbaImage};
use log::debug;
use serde::Serialize;

use crate::config::ScanConfig;
use crate::error::ToolError;
use crate::gtin::{self, Gtin};
use crate::models::{Difficulty, Mode};
use crate::preprocess::{PreprocessOutcome, Preprocessor};
use crate::regions::{Region, regions_for};
use crate::utils::filters::laplacian_variance;
use crate::utils::grayscale::rgba_to_grayscale;

fn max_dim_from_env() -> Option<u32> {
    match env::var("GTIN_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// Load an image as RGBA8, downscaled to `GTIN_MAX_DIM` when set.
pub fn load_rgba<P: AsRef<Path>>(path: P) -> Result<RgbaImage, ToolError> {
    let img = image::open(path)?;
    let rgba = match max_dim_from_env() {
        Some(max_dim) if img.dimensions().0.max(img.dimensions().1) > max_dim => img
            .resize(max_dim, max_dim, image::imageops::FilterType::Triangle)
            .to_rgba8(),
        _ => img.to_rgba8(),
    };
    Ok(rgba)
}

/// Write an RGBA image as PNG, creating parent directories.
pub fn save_png<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<(), ToolError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Load a config file if given, then apply `GTIN_*` overrides.
pub fn load_config(path: Option<&Path>) -> Result<ScanConfig, ToolError> {
    let config = match path {
        Some(path) => ScanConfig::from_json_file(path)?,
        None => ScanConfig::default(),
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Summary statistics for grayscale data.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GrayStats {
    pub min: u8,
    pub max: u8,
    pub avg: u8,
}

/// Compute min/max/avg for grayscale values.
pub fn grayscale_stats(gray: &[u8]) -> GrayStats {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    let mut sum: u64 = 0;
    for &v in gray {
        min = min.min(v);
        max = max.max(v);
        sum += v as u64;
    }
    if gray.is_empty() {
        return GrayStats { min: 0, max: 0, avg: 0 };
    }
    GrayStats {
        min,
        max,
        avg: (sum / gray.len() as u64) as u8,
    }
}

/// Validation result for one code string
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub code: String,
    pub well_formed: bool,
    pub checksum_valid: bool,
    /// Zero-padded 14-digit form when the code is valid
    pub gtin14: Option<String>,
    /// Why parsing failed, if it did
    pub error: Option<String>,
}

pub fn validate_code(code: &str) -> ValidationReport {
    let trimmed = code.trim();
    let parsed = Gtin::parse(trimmed);
    ValidationReport {
        code: trimmed.to_string(),
        well_formed: gtin::is_well_formed(trimmed),
        checksum_valid: gtin::checksum_valid(trimmed),
        gtin14: parsed.as_ref().ok().map(Gtin::to_gtin14),
        error: parsed.err().map(|e| e.to_string()),
    }
}

/// Laplacian variance of a region and whether rescue would gate it
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SharpnessReport {
    pub width: u32,
    pub height: u32,
    pub variance: f64,
    pub threshold: f64,
    pub gated: bool,
    pub gray: GrayStats,
}

/// Measure the center region the engine would scan first.
pub fn sharpness(
    frame: &RgbaImage,
    difficulty: Difficulty,
    config: &ScanConfig,
) -> Result<SharpnessReport, ToolError> {
    let center = regions_for(difficulty, frame.width(), frame.height(), &config.regions)[0];
    if center.rect.is_empty() {
        return Err(ToolError::EmptyFrame {
            width: frame.width(),
            height: frame.height(),
        });
    }
    let crop = extract_region(frame, &center);
    let (w, h) = (crop.width() as usize, crop.height() as usize);
    let gray = rgba_to_grayscale(crop.as_raw(), w, h);
    let variance = laplacian_variance(&gray, w, h);
    let threshold = config.rescue.blur_threshold;
    Ok(SharpnessReport {
        width: crop.width(),
        height: crop.height(),
        variance,
        threshold,
        gated: variance < threshold,
        gray: grayscale_stats(&gray),
    })
}

/// Copy a scheduled region out of a frame
pub fn extract_region(frame: &RgbaImage, region: &Region) -> RgbaImage {
    let r = region.rect;
    frame.view(r.x, r.y, r.w, r.h).to_image()
}

/// One region after preprocessing
pub struct ProcessedRegion {
    pub region: Region,
    pub image: RgbaImage,
    pub outcome: PreprocessOutcome,
}

/// Run `mode` over every non-empty region the scheduler yields for a frame.
pub fn preprocess_regions(
    frame: &RgbaImage,
    mode: Mode,
    difficulty: Difficulty,
    config: &ScanConfig,
) -> Result<Vec<ProcessedRegion>, ToolError> {
    let regions = regions_for(difficulty, frame.width(), frame.height(), &config.regions);
    if regions.iter().all(|r| r.rect.is_empty()) {
        return Err(ToolError::EmptyFrame {
            width: frame.width(),
            height: frame.height(),
        });
    }
    let preprocessor = Preprocessor::from_config(config);
    let processed: Vec<ProcessedRegion> = regions
        .into_iter()
        .filter(|r| !r.rect.is_empty())
        .map(|region| {
            let mut image = extract_region(frame, &region);
            let outcome = preprocessor.apply(&mut image, mode);
            ProcessedRegion {
                region,
                image,
                outcome,
            }
        })
        .collect();
    debug!("scratch after {} regions: {:?}", processed.len(), preprocessor.scratch_stats());
    Ok(processed)
}

/// Write processed regions as `<anchor>_<mode>.png` under `dir`.
pub fn write_regions(
    processed: &[ProcessedRegion],
    mode: Mode,
    dir: &Path,
) -> Result<Vec<PathBuf>, ToolError> {
    processed
        .iter()
        .map(|p| {
            let path = dir.join(format!("{}_{}.png", p.region.anchor, mode));
            save_png(&p.image, &path)?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn barcode_frame(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, _| {
            if (x / 3) % 2 == 0 {
                Rgba([250, 250, 250, 255])
            } else {
                Rgba([10, 10, 10, 255])
            }
        })
    }

    #[test]
    fn test_validate_code() {
        let ok = validate_code(" 4006381333931\n");
        assert!(ok.well_formed && ok.checksum_valid);
        assert_eq!(ok.gtin14.as_deref(), Some("04006381333931"));
        assert_eq!(ok.error, None);

        let bad = validate_code("4006381333932");
        assert!(bad.well_formed);
        assert!(!bad.checksum_valid);
        assert!(bad.gtin14.is_none());
        assert!(bad.error.is_some());
    }

    #[test]
    fn test_grayscale_stats() {
        let stats = grayscale_stats(&[10, 20, 30]);
        assert_eq!((stats.min, stats.max, stats.avg), (10, 30, 20));
        assert_eq!(grayscale_stats(&[]).max, 0);
    }

    #[test]
    fn test_sharpness_of_bars_and_flat() {
        let config = ScanConfig::default();
        let sharp = sharpness(&barcode_frame(320, 240), Difficulty::Easy, &config).unwrap();
        assert!(!sharp.gated);
        assert_eq!((sharp.width, sharp.height), (208, 84));

        let flat = RgbaImage::from_pixel(320, 240, Rgba([128, 128, 128, 255]));
        assert!(sharpness(&flat, Difficulty::Easy, &config).unwrap().gated);

        let tiny = RgbaImage::new(1, 1);
        assert!(matches!(
            sharpness(&tiny, Difficulty::Easy, &config),
            Err(ToolError::EmptyFrame { .. })
        ));
    }

    #[test]
    fn test_preprocess_and_write_regions() {
        let config = ScanConfig::default();
        let frame = barcode_frame(160, 120);
        let processed =
            preprocess_regions(&frame, Mode::Rescue, Difficulty::Hard, &config).unwrap();
        assert_eq!(processed.len(), 5);
        assert!(processed.iter().all(|p| p.outcome == PreprocessOutcome::Applied));

        let dir = tempfile::tempdir().unwrap();
        let paths = write_regions(&processed, Mode::Rescue, dir.path()).unwrap();
        assert_eq!(paths.len(), 5);
        assert!(paths[0].ends_with("center_cv.png"));
        let reloaded = load_rgba(&paths[0]).unwrap();
        assert_eq!(reloaded.dimensions(), processed[0].image.dimensions());
    }
}
