//! Acquisition loop
//!
//! One [`Engine::tick_at`] snapshots the current frame, walks the scheduled
//! regions and the modes allowed at the current difficulty, and stops at the
//! first region that yields a valid GTIN. The result then goes through the
//! acceptance gate and feeds the difficulty controller.

mod collaborators;
pub mod runner;

pub use collaborators::{FrameSource, NullSink, PresentationSink, SymbolDecoder};
pub use runner::{BusyFlag, BusyGuard, RunnerHandle, RunnerStats, TickRunner};

use std::time::Instant;

use image::RgbaImage;
use log::{debug, trace};

use crate::acceptance::{AcceptanceState, Verdict};
use crate::config::ScanConfig;
use crate::difficulty::DifficultyController;
use crate::error::ConfigError;
use crate::gtin::Gtin;
use crate::models::{CropRect, DetectionBox, Difficulty, Mode};
use crate::preprocess::Preprocessor;
use crate::regions::{Anchor, regions_for};
use crate::utils::geometry::points_to_box;

/// A validated decode found during a tick
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// The validated code
    pub code: Gtin,
    /// Region that produced it
    pub anchor: Anchor,
    /// Mode that produced it
    pub mode: Mode,
    /// Overlay box in frame coordinates, if the decoder localized the symbol
    pub bbox: Option<DetectionBox>,
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickReport {
    /// The source reported a zero-sized frame; nothing was touched
    NotReady,
    /// The frame was scanned
    Scanned {
        /// First validated decode, if any
        candidate: Option<Detection>,
        /// Acceptance decision for `candidate`
        verdict: Option<Verdict>,
        /// Difficulty after this tick's update
        difficulty: Difficulty,
        /// Decode attempts made
        attempts: usize,
    },
}

impl TickReport {
    /// Code emitted to the sink this tick
    pub fn accepted(&self) -> Option<&Gtin> {
        match self {
            TickReport::Scanned {
                candidate: Some(detection),
                verdict: Some(Verdict::Accepted),
                ..
            } => Some(&detection.code),
            _ => None,
        }
    }
}

/// Adaptive barcode acquisition engine.
///
/// Owns the controller state and all per-tick scratch. Only `tick_at`
/// mutates it, so ticks must not overlap; [`TickRunner`] enforces that when
/// ticks are timer driven.
pub struct Engine<S, D, P> {
    source: S,
    decoder: D,
    sink: P,
    config: ScanConfig,
    preprocessor: Preprocessor,
    difficulty: DifficultyController,
    acceptance: AcceptanceState,
    frame: RgbaImage,
    crop: RgbaImage,
    last_box: Option<(DetectionBox, Instant)>,
}

impl<S, D, P> Engine<S, D, P>
where
    S: FrameSource,
    D: SymbolDecoder,
    P: PresentationSink,
{
    /// Create an engine whose patience clock starts at `now`.
    ///
    /// `config` is used as given; [`Engine::try_new`] checks it first.
    pub fn new(source: S, decoder: D, sink: P, config: ScanConfig, now: Instant) -> Self {
        Self {
            source,
            decoder,
            sink,
            preprocessor: Preprocessor::from_config(&config),
            difficulty: DifficultyController::new(now, config.difficulty.clone()),
            acceptance: AcceptanceState::new(config.acceptance.clone()),
            frame: RgbaImage::new(0, 0),
            crop: RgbaImage::new(0, 0),
            last_box: None,
            config,
        }
    }

    /// Like [`Engine::new`], but rejects a config that fails
    /// [`ScanConfig::validate`]
    pub fn try_new(
        source: S,
        decoder: D,
        sink: P,
        config: ScanConfig,
        now: Instant,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(source, decoder, sink, config, now))
    }

    /// Run one tick against the wall clock
    pub fn tick(&mut self) -> TickReport {
        self.tick_at(Instant::now())
    }

    /// Run one tick as if the current time were `now`
    pub fn tick_at(&mut self, now: Instant) -> TickReport {
        let (width, height) = self.source.frame_size();
        if width == 0 || height == 0 {
            trace!("frame source not ready");
            return TickReport::NotReady;
        }
        if self.frame.dimensions() != (width, height) {
            self.frame = RgbaImage::new(width, height);
        }
        self.source.draw(&mut self.frame);

        let level = self.difficulty.level();
        let (candidate, attempts) = self.scan(level, width, height);

        let bbox = candidate.as_ref().and_then(|d| d.bbox);
        self.sink.on_box(bbox);
        if let Some(b) = bbox {
            self.last_box = Some((b, now));
        }

        let verdict = candidate
            .as_ref()
            .map(|d| self.acceptance.observe(d.code.as_str(), now));
        if let (Some(detection), Some(Verdict::Accepted)) = (&candidate, &verdict) {
            self.sink.on_result(detection.code.as_str());
        }

        let difficulty = self.difficulty.update(candidate.is_some(), now);
        TickReport::Scanned {
            candidate,
            verdict,
            difficulty,
            attempts,
        }
    }

    fn scan(&mut self, level: Difficulty, width: u32, height: u32) -> (Option<Detection>, usize) {
        let mut unavailable: Vec<Mode> = Vec::new();
        let mut attempts = 0;

        for region in regions_for(level, width, height, &self.config.regions) {
            if region.rect.is_empty() {
                continue;
            }
            // modes stack: each one works on what the previous left behind
            copy_region(&self.frame, region.rect, &mut self.crop);
            for &mode in level.modes() {
                if unavailable.contains(&mode) {
                    continue;
                }
                let outcome = self.preprocessor.apply(&mut self.crop, mode);
                if !outcome.should_decode() {
                    unavailable.push(mode);
                    continue;
                }

                attempts += 1;
                trace!("attempt {attempts}: {} {mode} ({outcome:?})", region.anchor);
                let found = match self.decoder.decode(&self.crop) {
                    Ok(found) => found,
                    Err(err) => {
                        debug!("decoder failed on {} {mode}: {err}", region.anchor);
                        None
                    }
                };
                let Some(found) = found else {
                    continue;
                };

                let code = match Gtin::parse(&found.code) {
                    Ok(code) => code,
                    Err(err) => {
                        trace!("discarded {:?}: {err}", found.code);
                        continue;
                    }
                };
                let rect = region.rect;
                let bbox = points_to_box(&found.points, rect.w, rect.h, &self.config.boxes)
                    .map(|b| b.translate(rect.x as f32, rect.y as f32));
                return (
                    Some(Detection {
                        code,
                        anchor: region.anchor,
                        mode,
                        bbox,
                    }),
                    attempts,
                );
            }
        }
        (None, attempts)
    }

    /// Last reported box while it is younger than the box TTL
    pub fn visible_box(&self, now: Instant) -> Option<DetectionBox> {
        self.last_box
            .filter(|(_, at)| now.saturating_duration_since(*at) < self.config.boxes.ttl())
            .map(|(b, _)| b)
    }

    /// Current difficulty
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty.level()
    }

    /// Acceptance state, for inspection
    pub fn acceptance(&self) -> &AcceptanceState {
        &self.acceptance
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Scratch buffers on loan from the preprocessor (zero between ticks)
    pub fn outstanding_scratch(&self) -> usize {
        self.preprocessor.outstanding()
    }
}

/// Copy `rect` of `frame` into `crop`, resizing `crop` when needed
fn copy_region(frame: &RgbaImage, rect: CropRect, crop: &mut RgbaImage) {
    if crop.dimensions() != (rect.w, rect.h) {
        *crop = RgbaImage::new(rect.w, rect.h);
    }
    let stride = frame.width() as usize * 4;
    let row_bytes = rect.w as usize * 4;
    let x0 = rect.x as usize * 4;
    let src = frame.as_raw();
    for (row, dst) in crop.chunks_exact_mut(row_bytes).enumerate() {
        let start = (rect.y as usize + row) * stride + x0;
        dst.copy_from_slice(&src[start..start + row_bytes]);
    }
}
