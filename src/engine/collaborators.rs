//! Capability seams between the engine and the outside world.
//!
//! Camera capture, symbol decoding and presentation all live behind these
//! traits so the acquisition logic can be driven by deterministic fakes.

use image::RgbaImage;

use crate::error::DecodeError;
use crate::models::{Candidate, DetectionBox};

/// A video source that can snapshot its current frame.
pub trait FrameSource {
    /// Current frame dimensions; `(0, 0)` while the stream is not ready
    fn frame_size(&self) -> (u32, u32);

    /// Draw the current frame into `target`, already sized to `frame_size()`
    fn draw(&mut self, target: &mut RgbaImage);
}

/// An external 1D symbol decoder.
pub trait SymbolDecoder {
    /// Decode one prepared region.
    ///
    /// `Ok(None)` is the normal "not found" outcome. Points in the returned
    /// candidate are relative to `region`.
    fn decode(&mut self, region: &RgbaImage) -> Result<Option<Candidate>, DecodeError>;
}

/// Receiver for overlay boxes and accepted codes.
pub trait PresentationSink {
    /// Called every scanned tick with the box in frame coordinates
    fn on_box(&mut self, detection: Option<DetectionBox>);

    /// Called when a code passes acceptance, after `on_box` for the same tick
    fn on_result(&mut self, code: &str);
}

impl FrameSource for RgbaImage {
    fn frame_size(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn draw(&mut self, target: &mut RgbaImage) {
        target.copy_from_slice(self.as_raw());
    }
}

impl<F> SymbolDecoder for F
where
    F: FnMut(&RgbaImage) -> Result<Option<Candidate>, DecodeError>,
{
    fn decode(&mut self, region: &RgbaImage) -> Result<Option<Candidate>, DecodeError> {
        self(region)
    }
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn on_box(&mut self, _detection: Option<DetectionBox>) {}

    fn on_result(&mut self, _code: &str) {}
}
