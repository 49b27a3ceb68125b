/// Region of the current frame handed to the decoder.
///
/// Integer pixel rectangle in frame coordinates. Rects are recomputed every
/// tick and never stored across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropRect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub w: u32,
    /// Height in pixels
    pub h: u32,
}

impl CropRect {
    /// Create a new rect
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Pixel count
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    /// True when either side is zero; such rects are never scanned
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// True when the rect lies inside a `width` x `height` frame
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.w as u64 <= width as u64
            && self.y as u64 + self.h as u64 <= height as u64
    }
}

/// Axis-aligned overlay box.
///
/// Produced in crop-local coordinates by the geometry normalizer and
/// translated into frame coordinates by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DetectionBox {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
}

impl DetectionBox {
    /// Create a new box
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Shift the box by (dx, dy)
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Right edge
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    /// Bottom edge
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_rect_bounds() {
        let r = CropRect::new(10, 20, 100, 50);
        assert!(r.fits_within(110, 70));
        assert!(!r.fits_within(109, 70));
        assert_eq!(r.area(), 5000);
        assert!(!r.is_empty());
        assert!(CropRect::new(0, 0, 0, 10).is_empty());
    }

    #[test]
    fn test_box_translate() {
        let b = DetectionBox::new(1.0, 2.0, 30.0, 40.0).translate(100.0, 200.0);
        assert_eq!(b, DetectionBox::new(101.0, 202.0, 30.0, 40.0));
        assert_eq!(b.right(), 131.0);
        assert_eq!(b.bottom(), 242.0);
    }
}
