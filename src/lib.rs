//! gtin_scan - adaptive acquisition engine for retail barcodes
//!
//! Turns a stream of camera frames into validated, de-duplicated GTIN codes.
//! Symbol decoding itself is delegated to a [`SymbolDecoder`]; this crate
//! decides where in the frame to look, how to condition the pixels, when a
//! read is trustworthy and how much effort to spend.
//!
//! ```no_run
//! use std::time::Instant;
//! use gtin_scan::{Engine, NullSink, ScanConfig};
//! use gtin_scan::models::Candidate;
//! use gtin_scan::error::DecodeError;
//! use image::RgbaImage;
//!
//! let frame = RgbaImage::new(640, 480);
//! let decoder = |_: &RgbaImage| -> Result<Option<Candidate>, DecodeError> { Ok(None) };
//! let mut engine = Engine::new(frame, decoder, NullSink, ScanConfig::default(), Instant::now());
//! let report = engine.tick();
//! println!("{report:?}");
//! ```

/// Temporal consensus and cooldown gate
pub mod acceptance;
/// Tunable constants, JSON and environment loading
pub mod config;
/// Failure-driven difficulty feedback loop
pub mod difficulty;
/// Tick orchestration and the timer driver
pub mod engine;
/// Error types for the outer surfaces
pub mod error;
/// GTIN format and check digit validation
pub mod gtin;
/// Core data structures (Point, CropRect, Candidate, Mode, Difficulty)
pub mod models;
/// Region preprocessing modes
pub mod preprocess;
/// Crop scheduling per difficulty
pub mod regions;
/// Still-image diagnostics used by the CLI
pub mod tools;
/// Pixel-level helpers (grayscale, filters, binarization, geometry)
pub mod utils;

pub use acceptance::{AcceptanceState, Phase, Verdict};
pub use config::ScanConfig;
pub use difficulty::DifficultyController;
pub use engine::{
    Detection, Engine, FrameSource, NullSink, PresentationSink, SymbolDecoder, TickReport,
    TickRunner,
};
pub use gtin::{Gtin, GtinKind};
pub use models::{Candidate, CropRect, DetectionBox, Difficulty, Mode, Point};
pub use preprocess::{PreprocessOutcome, Preprocessor};
pub use regions::{Anchor, Region, regions_for};
