//! End-to-end scenarios for the acquisition engine
//!
//! The engine is driven with deterministic fakes: a frame source whose
//! picture can be swapped between ticks, decoders with scripted behaviour
//! and a sink that records event order. Time is advanced explicitly.

use std::time::{Duration, Instant};

use gtin_scan::error::DecodeError;
use gtin_scan::models::{Candidate, DetectionBox, Point};
use gtin_scan::{
    Anchor, Difficulty, Engine, FrameSource, Mode, PresentationSink, ScanConfig, SymbolDecoder,
    TickReport, Verdict,
};
use image::{Rgba, RgbaImage};

const UPC: &str = "036000291452";

/// Colored bars whose luma contrast only shows up once converted to gray
const LIGHT: Rgba<u8> = Rgba([250, 220, 120, 255]);
const DARK: Rgba<u8> = Rgba([120, 20, 60, 255]);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn flat_frame() -> RgbaImage {
    RgbaImage::from_pixel(320, 240, DARK)
}

fn barcode_frame() -> RgbaImage {
    RgbaImage::from_fn(320, 240, |x, _| if (x / 4) % 2 == 0 { LIGHT } else { DARK })
}

struct SwappableSource {
    frame: RgbaImage,
}

impl FrameSource for SwappableSource {
    fn frame_size(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn draw(&mut self, target: &mut RgbaImage) {
        target.copy_from_slice(self.frame.as_raw());
    }
}

/// Finds the code only on a grayscale surface with visible contrast, i.e.
/// after the enhance mode has run over the colored bars.
#[derive(Default)]
struct GrayOnlyDecoder {
    calls: usize,
}

impl SymbolDecoder for GrayOnlyDecoder {
    fn decode(&mut self, region: &RgbaImage) -> Result<Option<Candidate>, DecodeError> {
        self.calls += 1;
        let gray = region.pixels().all(|p| p[0] == p[1] && p[1] == p[2]);
        let (lo, hi) = region
            .pixels()
            .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
        if !gray || hi.saturating_sub(lo) < 100 {
            return Ok(None);
        }
        let mid = region.height() as f32 / 2.0;
        Ok(Some(Candidate::with_points(
            UPC,
            vec![
                Point::new(6.0, mid),
                Point::new(region.width() as f32 - 6.0, mid + 1.0),
            ],
        )))
    }
}

/// Reads the same code from anything
struct AlwaysDecoder;

impl SymbolDecoder for AlwaysDecoder {
    fn decode(&mut self, _region: &RgbaImage) -> Result<Option<Candidate>, DecodeError> {
        Ok(Some(Candidate::new(UPC)))
    }
}

#[derive(Default)]
struct CountingFailDecoder {
    calls: usize,
}

impl SymbolDecoder for CountingFailDecoder {
    fn decode(&mut self, _region: &RgbaImage) -> Result<Option<Candidate>, DecodeError> {
        self.calls += 1;
        Err(DecodeError::Backend("reader crashed".into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Box(Option<DetectionBox>),
    Result(String),
}

#[derive(Default)]
struct RecordingSink {
    events: Vec<Event>,
}

impl RecordingSink {
    fn results(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Result(code) => Some(code.as_str()),
                Event::Box(_) => None,
            })
            .collect()
    }
}

impl PresentationSink for RecordingSink {
    fn on_box(&mut self, detection: Option<DetectionBox>) {
        self.events.push(Event::Box(detection));
    }

    fn on_result(&mut self, code: &str) {
        self.events.push(Event::Result(code.to_string()));
    }
}

/// Run failing ticks every 60 ms until the engine reaches `target`
fn prime<D: SymbolDecoder>(
    engine: &mut Engine<SwappableSource, D, RecordingSink>,
    t0: Instant,
    target: Difficulty,
) -> u64 {
    let mut t = 0;
    while engine.difficulty() < target {
        t += 60;
        assert!(t < 5_000, "difficulty never reached {target}");
        engine.tick_at(t0 + ms(t));
    }
    t
}

#[test]
fn enhance_on_center_crop_emits_once() {
    let t0 = Instant::now();
    let mut engine = Engine::new(
        SwappableSource { frame: flat_frame() },
        GrayOnlyDecoder::default(),
        RecordingSink::default(),
        ScanConfig::default(),
        t0,
    );

    // 1260 ms escalates to medium, the next failing tick to hard
    let primed_at = prime(&mut engine, t0, Difficulty::Hard);
    assert_eq!(primed_at, 1320);
    assert!(engine.sink().results().is_empty());

    engine.source_mut().frame = barcode_frame();
    let first = engine.tick_at(t0 + ms(1380));
    let TickReport::Scanned {
        candidate: Some(detection),
        verdict,
        difficulty,
        attempts,
    } = &first
    else {
        panic!("expected a detection, got {first:?}");
    };
    assert_eq!(detection.code.as_str(), UPC);
    assert_eq!(detection.anchor, Anchor::Center);
    assert_eq!(detection.mode, Mode::Enhance);
    assert_eq!(*attempts, 2);
    assert_eq!(*verdict, Some(Verdict::Pending { hits: 1 }));
    assert_eq!(*difficulty, Difficulty::Medium);

    let second = engine.tick_at(t0 + ms(1440));
    assert_eq!(second.accepted().map(|g| g.as_str()), Some(UPC));
    assert_eq!(engine.difficulty(), Difficulty::Easy);

    // easy only tries the raw crop, which the decoder cannot read
    for t in (1500..3000).step_by(60) {
        let report = engine.tick_at(t0 + ms(t));
        assert!(report.accepted().is_none(), "unexpected emission at {t} ms");
    }
    assert_eq!(engine.sink().results(), vec![UPC]);
    assert_eq!(engine.acceptance().last_accepted(), Some(UPC));
    assert_eq!(engine.outstanding_scratch(), 0);
}

#[test]
fn box_precedes_result_and_lies_in_center_crop() {
    let t0 = Instant::now();
    let mut engine = Engine::new(
        SwappableSource { frame: flat_frame() },
        GrayOnlyDecoder::default(),
        RecordingSink::default(),
        ScanConfig::default(),
        t0,
    );
    let t = prime(&mut engine, t0, Difficulty::Hard);
    engine.source_mut().frame = barcode_frame();
    engine.tick_at(t0 + ms(t + 60));
    engine.tick_at(t0 + ms(t + 120));

    let events = &engine.sink().events;
    let result_at = events
        .iter()
        .position(|e| matches!(e, Event::Result(_)))
        .expect("no result emitted");
    let Event::Box(Some(bbox)) = events[result_at - 1] else {
        panic!("result not preceded by a box: {events:?}");
    };

    // every center crop of 320x240 lies inside (24, 78)-(296, 162)
    assert!(bbox.x >= 24.0 && bbox.right() <= 296.0);
    assert!(bbox.y >= 78.0 && bbox.bottom() <= 162.0);
    // the two-point scan line is widened into a band
    assert!(bbox.h >= 40.0);

    assert_eq!(engine.visible_box(t0 + ms(t + 120)), Some(bbox));
    assert_eq!(engine.visible_box(t0 + ms(t + 120 + 300)), None);
}

#[test]
fn steady_code_emits_once_per_cooldown() {
    let t0 = Instant::now();
    let mut engine = Engine::new(
        SwappableSource { frame: barcode_frame() },
        AlwaysDecoder,
        RecordingSink::default(),
        ScanConfig::default(),
        t0,
    );
    let mut emitted = Vec::new();
    for t in (0..2000).step_by(60) {
        if engine.tick_at(t0 + ms(t)).accepted().is_some() {
            emitted.push(t);
        }
    }
    assert_eq!(emitted, vec![60, 840, 1620]);
    assert_eq!(engine.sink().results().len(), 3);
    assert_eq!(engine.difficulty(), Difficulty::Easy);
}

#[test]
fn zero_sized_frame_is_not_ready() {
    let t0 = Instant::now();
    let mut engine = Engine::new(
        SwappableSource {
            frame: RgbaImage::new(0, 0),
        },
        AlwaysDecoder,
        RecordingSink::default(),
        ScanConfig::default(),
        t0,
    );
    for t in (0..3000).step_by(60) {
        assert_eq!(engine.tick_at(t0 + ms(t)), TickReport::NotReady);
    }
    assert!(engine.sink().events.is_empty());
    assert_eq!(engine.difficulty(), Difficulty::Easy);

    // a source that becomes ready is scanned on the next tick
    engine.source_mut().frame = barcode_frame();
    assert!(matches!(
        engine.tick_at(t0 + ms(3000)),
        TickReport::Scanned { .. }
    ));
}

#[test]
fn decoder_errors_count_as_not_found() {
    let t0 = Instant::now();
    let mut engine = Engine::new(
        SwappableSource {
            frame: barcode_frame(),
        },
        CountingFailDecoder::default(),
        RecordingSink::default(),
        ScanConfig::default(),
        t0,
    );
    let t = prime(&mut engine, t0, Difficulty::Hard);
    let report = engine.tick_at(t0 + ms(t + 60));
    assert_eq!(
        report,
        TickReport::Scanned {
            candidate: None,
            verdict: None,
            difficulty: Difficulty::Hard,
            attempts: 15,
        }
    );
    assert!(engine.decoder().calls > 15);
    assert!(engine.sink().events.iter().all(|e| *e == Event::Box(None)));
}

#[test]
fn unavailable_rescue_is_skipped_for_the_tick() {
    let t0 = Instant::now();
    let mut config = ScanConfig::default();
    config.rescue.enabled = false;
    let mut engine = Engine::new(
        SwappableSource { frame: flat_frame() },
        GrayOnlyDecoder::default(),
        RecordingSink::default(),
        config,
        t0,
    );
    let t = prime(&mut engine, t0, Difficulty::Hard);
    let before = engine.decoder().calls;
    let report = engine.tick_at(t0 + ms(t + 60));
    let TickReport::Scanned { attempts, .. } = report else {
        panic!("expected a scan");
    };
    // none and enhance on each of the five regions
    assert_eq!(attempts, 10);
    assert_eq!(engine.decoder().calls - before, 10);
}
