//! Tunable constants for every stage of the scanner.
//!
//! Defaults follow the consensus-gated acquisition loop. Each stage owns its
//! own section; [`ScanConfig`] aggregates them and can be loaded from JSON
//! and overridden through `GTIN_*` environment variables.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::Difficulty;

fn parse_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_env_f32(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

fn parse_env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

fn parse_env_bool_u8(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(default)
}

/// Crop geometry used by the region scheduler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Crop height as a fraction of frame height
    pub height_fraction: f64,
    /// Crop width fraction per difficulty level (0, 1, 2)
    pub width_fractions: [f64; 3],
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            height_fraction: 0.35,
            width_fractions: [0.65, 0.75, 0.85],
        }
    }
}

impl RegionConfig {
    /// Width fraction for the given difficulty
    pub fn width_fraction(&self, difficulty: Difficulty) -> f64 {
        self.width_fractions[difficulty.level() as usize]
    }
}

/// Hysteresis of the difficulty controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    /// Time without a validated read before escalation starts
    pub patience_ms: u64,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self { patience_ms: 1200 }
    }
}

impl DifficultyConfig {
    pub fn patience(&self) -> Duration {
        Duration::from_millis(self.patience_ms)
    }
}

/// Temporal consensus and cooldown of the acceptance state machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceConfig {
    /// Suppression window for re-reading the last accepted code
    pub cooldown_ms: u64,
    /// Sliding window over which identical reads are counted
    pub consensus_window_ms: u64,
    /// Reads of the same code needed inside the window
    pub min_hits: usize,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 700,
            consensus_window_ms: 450,
            min_hits: 2,
        }
    }
}

impl AcceptanceConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn consensus_window(&self) -> Duration {
        Duration::from_millis(self.consensus_window_ms)
    }
}

/// Overlay box synthesis and display lifetime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxConfig {
    /// Point spreads flatter than this are treated as a scan line
    pub degenerate_height: f32,
    /// Synthesized band height as a fraction of crop height
    pub band_fraction: f32,
    /// Lower bound on the synthesized band height
    pub min_band_height: f32,
    /// Lower bound on padding, both axes
    pub min_pad: f32,
    /// Horizontal padding as a fraction of crop width
    pub pad_x_fraction: f32,
    /// Vertical padding as a fraction of crop height
    pub pad_y_fraction: f32,
    /// How long a box stays visible without refresh
    pub ttl_ms: u64,
}

impl Default for BoxConfig {
    fn default() -> Self {
        Self {
            degenerate_height: 8.0,
            band_fraction: 0.25,
            min_band_height: 40.0,
            min_pad: 8.0,
            pad_x_fraction: 0.02,
            pad_y_fraction: 0.03,
            ttl_ms: 300,
        }
    }
}

impl BoxConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Parameters of the `enhance` mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// Linear contrast gain around mid-gray
    pub contrast: f32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self { contrast: 1.25 }
    }
}

/// Parameters of the adaptive-threshold rescue mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RescueConfig {
    /// Master switch; when off the mode reports itself unavailable
    pub enabled: bool,
    /// Laplacian variance below which the region is considered too blurry
    pub blur_threshold: f64,
    /// Adaptive threshold neighbourhood (odd)
    pub block_size: usize,
    /// Constant subtracted from the weighted mean
    pub offset: f32,
    /// Largest region (in pixels) the scratch pool will serve
    pub max_pixels: usize,
}

impl Default for RescueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blur_threshold: 45.0,
            block_size: 31,
            offset: 7.0,
            max_pixels: 4096 * 2160,
        }
    }
}

/// Full scanner configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Interval of the tick trigger
    pub tick_interval_ms: u64,
    pub regions: RegionConfig,
    pub difficulty: DifficultyConfig,
    pub acceptance: AcceptanceConfig,
    pub boxes: BoxConfig,
    pub enhance: EnhanceConfig,
    pub rescue: RescueConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 60,
            regions: RegionConfig::default(),
            difficulty: DifficultyConfig::default(),
            acceptance: AcceptanceConfig::default(),
            boxes: BoxConfig::default(),
            enhance: EnhanceConfig::default(),
            rescue: RescueConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parse from a JSON string and validate
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GTIN_*` environment overrides on top of the current values
    pub fn with_env_overrides(mut self) -> Self {
        self.tick_interval_ms = parse_env_u64("GTIN_TICK_INTERVAL_MS", self.tick_interval_ms);
        self.difficulty.patience_ms =
            parse_env_u64("GTIN_PATIENCE_MS", self.difficulty.patience_ms);
        self.acceptance.cooldown_ms =
            parse_env_u64("GTIN_COOLDOWN_MS", self.acceptance.cooldown_ms);
        self.acceptance.consensus_window_ms =
            parse_env_u64("GTIN_CONSENSUS_WINDOW_MS", self.acceptance.consensus_window_ms);
        self.acceptance.min_hits = parse_env_usize("GTIN_MIN_HITS", self.acceptance.min_hits);
        self.boxes.ttl_ms = parse_env_u64("GTIN_BOX_TTL_MS", self.boxes.ttl_ms);
        self.enhance.contrast = parse_env_f32("GTIN_CONTRAST", self.enhance.contrast);
        self.rescue.enabled = parse_env_bool_u8("GTIN_RESCUE", self.rescue.enabled);
        self.rescue.blur_threshold =
            parse_env_f64("GTIN_BLUR_THRESHOLD", self.rescue.blur_threshold);
        self.rescue.block_size = parse_env_usize("GTIN_BLOCK_SIZE", self.rescue.block_size);
        self
    }

    /// Check ranges that would otherwise break an invariant downstream
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fraction_ok = |f: f64| f > 0.0 && f <= 1.0;
        if !fraction_ok(self.regions.height_fraction) {
            return Err(invalid("regions.height_fraction", "must be in (0, 1]"));
        }
        if !self.regions.width_fractions.iter().all(|&f| fraction_ok(f)) {
            return Err(invalid("regions.width_fractions", "must be in (0, 1]"));
        }
        if self.acceptance.min_hits == 0 {
            return Err(invalid("acceptance.min_hits", "must be at least 1"));
        }
        if self.rescue.block_size < 3 || self.rescue.block_size % 2 == 0 {
            return Err(invalid("rescue.block_size", "must be odd and >= 3"));
        }
        if !(self.enhance.contrast.is_finite() && self.enhance.contrast > 0.0) {
            return Err(invalid("enhance.contrast", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = ScanConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval(), Duration::from_millis(60));
        assert_eq!(config.acceptance.cooldown(), Duration::from_millis(700));
        assert_eq!(config.regions.width_fraction(Difficulty::Medium), 0.75);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            ScanConfig::from_json_str(r#"{"acceptance": {"cooldown_ms": 650}}"#).unwrap();
        assert_eq!(config.acceptance.cooldown_ms, 650);
        assert_eq!(config.acceptance.consensus_window_ms, 450);
        assert_eq!(config.tick_interval_ms, 60);
        assert_eq!(config.rescue.block_size, 31);
    }

    #[test]
    fn test_rejects_even_block_size() {
        let err = ScanConfig::from_json_str(r#"{"rescue": {"block_size": 30}}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "rescue.block_size",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_zero_hits() {
        let mut config = ScanConfig::new();
        config.acceptance.min_hits = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        let mut config = ScanConfig::new();
        config.difficulty.patience_ms = 900;
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let loaded = ScanConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ScanConfig::from_json_file("/nonexistent/scan.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
