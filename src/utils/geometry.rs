//! Geometry utilities: turning decoder localization points into overlay boxes

use crate::config::BoxConfig;
use crate::models::{DetectionBox, Point};

/// Axis-aligned bounds of a point set as (min_x, min_y, max_x, max_y)
pub fn bounds(points: &[Point]) -> Option<(f32, f32, f32, f32)> {
    let first = points.first()?;
    let init = (first.x, first.y, first.x, first.y);
    Some(points.iter().fold(init, |(min_x, min_y, max_x, max_y), p| {
        (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
    }))
}

/// Convert decoder points into a padded box in crop-local coordinates.
///
/// 1D decoders usually report just the two ends of the scan line. When the
/// points span less than `degenerate_height` vertically, a band of
/// `max(min_band_height, band_fraction * crop_h)` is synthesized around the
/// middle of the points. The result is padded and clamped to the crop.
///
/// Returns `None` for an empty point list.
pub fn points_to_box(
    points: &[Point],
    crop_w: u32,
    crop_h: u32,
    config: &BoxConfig,
) -> Option<DetectionBox> {
    let (min_x, min_y, max_x, max_y) = bounds(points)?;
    let crop_w = crop_w as f32;
    let crop_h = crop_h as f32;

    let (mut top, mut bottom) = (min_y, max_y);
    if max_y - min_y < config.degenerate_height {
        let band = config
            .min_band_height
            .max((crop_h * config.band_fraction).floor());
        let mid = (min_y + max_y) / 2.0;
        top = mid - band / 2.0;
        bottom = mid + band / 2.0;
    }

    let pad_x = config.min_pad.max((crop_w * config.pad_x_fraction).floor());
    let pad_y = config.min_pad.max((crop_h * config.pad_y_fraction).floor());

    let left = (min_x - pad_x).clamp(0.0, crop_w);
    let right = (max_x + pad_x).clamp(0.0, crop_w);
    let top = (top - pad_y).clamp(0.0, crop_h);
    let bottom = (bottom + pad_y).clamp(0.0, crop_h);

    Some(DetectionBox::new(
        left,
        top,
        (right - left).max(0.0),
        (bottom - top).max(0.0),
    ))
}
