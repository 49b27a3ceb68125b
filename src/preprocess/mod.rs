//! Region preprocessing before a decode attempt
//!
//! [`Preprocessor::apply`] transforms a crop in place under a [`Mode`]. It
//! never fails: problems are reported through [`PreprocessOutcome`] and the
//! region is left in its best-effort state.

mod enhance;
mod rescue;

use image::RgbaImage;
use log::{debug, trace};

use crate::config::{EnhanceConfig, RescueConfig, ScanConfig};
use crate::error::PreprocessError;
use crate::models::Mode;
use crate::utils::memory_pool::{AllocationStats, BufferPool};

/// Result of preprocessing one region
#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessOutcome {
    /// The mode ran (identity counts as applied)
    Applied,
    /// Rescue judged the region too blurry and left it untouched
    BlurGated {
        /// Laplacian variance that failed the gate
        variance: f64,
    },
    /// The mode could not run; the region is untouched
    Unavailable(PreprocessError),
}

impl PreprocessOutcome {
    /// Whether a decode attempt on the region is worthwhile
    pub fn should_decode(&self) -> bool {
        !matches!(self, PreprocessOutcome::Unavailable(_))
    }
}

/// Stateful preprocessing pipeline with its own scratch pools
pub struct Preprocessor {
    enhance: EnhanceConfig,
    rescue: RescueConfig,
    bytes: BufferPool<u8>,
    floats: BufferPool<f32>,
}

impl Preprocessor {
    /// Create a pipeline; pools serve regions up to `rescue.max_pixels`
    pub fn new(enhance: EnhanceConfig, rescue: RescueConfig) -> Self {
        let limit = rescue.max_pixels;
        Self {
            enhance,
            rescue,
            bytes: BufferPool::with_limit(limit),
            floats: BufferPool::with_limit(limit),
        }
    }

    /// Create a pipeline from the matching sections of a scan config
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.enhance.clone(), config.rescue.clone())
    }

    /// Transform `region` in place under `mode`
    pub fn apply(&self, region: &mut RgbaImage, mode: Mode) -> PreprocessOutcome {
        if region.width() == 0 || region.height() == 0 {
            return PreprocessOutcome::Applied;
        }
        let result = match mode {
            Mode::None => return PreprocessOutcome::Applied,
            Mode::Enhance => enhance::apply(region, &self.enhance, &self.bytes)
                .map(|()| PreprocessOutcome::Applied),
            Mode::Rescue => {
                rescue::apply(region, &self.rescue, &self.bytes, &self.floats).map(|r| match r {
                    rescue::RescueResult::Thresholded { variance } => {
                        trace!("rescue thresholded at variance {variance:.1}");
                        PreprocessOutcome::Applied
                    }
                    rescue::RescueResult::TooBlurry { variance } => {
                        debug!("rescue skipped: variance {variance:.1} below gate");
                        PreprocessOutcome::BlurGated { variance }
                    }
                })
            }
        };
        result.unwrap_or_else(|err| {
            debug!("mode {mode} unavailable: {err}");
            PreprocessOutcome::Unavailable(err)
        })
    }

    /// Scratch buffers currently on loan (zero between calls)
    pub fn outstanding(&self) -> usize {
        self.bytes.outstanding() + self.floats.outstanding()
    }

    /// Allocation counters of both scratch pools
    pub fn scratch_stats(&self) -> AllocationStats {
        self.bytes.stats().combined(self.floats.stats())
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(EnhanceConfig::default(), RescueConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn striped(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, _| {
            if (x / 4) % 2 == 0 {
                Rgba([230, 220, 210, 255])
            } else {
                Rgba([30, 20, 40, 255])
            }
        })
    }

    #[test]
    fn test_identity() {
        let pre = Preprocessor::default();
        let mut img = striped(20, 10);
        let before = img.clone();
        assert_eq!(pre.apply(&mut img, Mode::None), PreprocessOutcome::Applied);
        assert_eq!(img, before);
    }

    #[test]
    fn test_every_mode_releases_scratch() {
        let pre = Preprocessor::default();
        for mode in Mode::ALL {
            let mut img = striped(64, 24);
            assert!(pre.apply(&mut img, mode).should_decode());
            assert_eq!(pre.outstanding(), 0, "{mode}");
        }
        let mut flat = RgbaImage::from_pixel(64, 24, Rgba([90, 90, 90, 255]));
        assert!(matches!(
            pre.apply(&mut flat, Mode::Rescue),
            PreprocessOutcome::BlurGated { .. }
        ));
        assert_eq!(pre.outstanding(), 0);
    }

    #[test]
    fn test_disabled_rescue_is_unavailable() {
        let pre = Preprocessor::new(
            EnhanceConfig::default(),
            RescueConfig {
                enabled: false,
                ..RescueConfig::default()
            },
        );
        let mut img = striped(32, 16);
        let before = img.clone();
        let out = pre.apply(&mut img, Mode::Rescue);
        assert_eq!(out, PreprocessOutcome::Unavailable(PreprocessError::RescueDisabled));
        assert!(!out.should_decode());
        assert_eq!(img, before);
    }

    #[test]
    fn test_oversized_region_is_unavailable() {
        let pre = Preprocessor::new(
            EnhanceConfig::default(),
            RescueConfig {
                max_pixels: 100,
                ..RescueConfig::default()
            },
        );
        let mut img = striped(32, 16);
        assert!(matches!(
            pre.apply(&mut img, Mode::Enhance),
            PreprocessOutcome::Unavailable(PreprocessError::ScratchExhausted { .. })
        ));
        assert_eq!(pre.outstanding(), 0);
    }

    #[test]
    fn test_zero_sized_region() {
        let pre = Preprocessor::default();
        let mut img = RgbaImage::new(0, 0);
        assert_eq!(pre.apply(&mut img, Mode::Rescue), PreprocessOutcome::Applied);
    }

    #[test]
    fn test_scratch_is_reused_across_regions() {
        let pre = Preprocessor::default();
        for _ in 0..3 {
            let mut img = striped(48, 16);
            pre.apply(&mut img, Mode::Enhance);
        }
        let stats = pre.scratch_stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.reuses, 2);
    }
}
