//! Region scheduling: where in the frame to look, in priority order.

use std::fmt;

use crate::config::RegionConfig;
use crate::models::{CropRect, Difficulty};

/// Placement of a crop within the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Center,
    Top,
    Bottom,
    Left,
    Right,
}

impl Anchor {
    /// Scan order: the centre is where a user aims, so it goes first
    pub const ORDER: [Anchor; 5] = [
        Anchor::Center,
        Anchor::Top,
        Anchor::Bottom,
        Anchor::Left,
        Anchor::Right,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Anchor::Center => "center",
            Anchor::Top => "top",
            Anchor::Bottom => "bottom",
            Anchor::Left => "left",
            Anchor::Right => "right",
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scheduled crop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub anchor: Anchor,
    pub rect: CropRect,
}

/// Crops to scan for a frame, in priority order.
///
/// All five crops share one size: a horizontal band `height_fraction` of the
/// frame tall and `width_fraction(difficulty)` of it wide, so harder
/// conditions sample more of the frame per attempt. Tiny frames can yield
/// zero-area crops; callers skip those.
pub fn regions_for(
    difficulty: Difficulty,
    frame_w: u32,
    frame_h: u32,
    config: &RegionConfig,
) -> [Region; 5] {
    let cw = scaled(frame_w, config.width_fraction(difficulty));
    let ch = scaled(frame_h, config.height_fraction);
    let cx = (frame_w - cw) / 2;
    let cy = (frame_h - ch) / 2;

    Anchor::ORDER.map(|anchor| {
        let (x, y) = match anchor {
            Anchor::Center => (cx, cy),
            Anchor::Top => (cx, 0),
            Anchor::Bottom => (cx, frame_h - ch),
            Anchor::Left => (0, cy),
            Anchor::Right => (frame_w - cw, cy),
        };
        Region {
            anchor,
            rect: CropRect::new(x, y, cw, ch),
        }
    })
}

fn scaled(length: u32, fraction: f64) -> u32 {
    ((length as f64 * fraction.clamp(0.0, 1.0) + 1e-9).floor() as u32).min(length)
}
