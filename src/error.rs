//! Error types for the outer surfaces of the crate.
//!
//! The acquisition tick itself never fails; these types cover configuration
//! loading, the preprocessing scratch allocator, the decoder seam and the
//! command-line tools.

use std::path::PathBuf;

/// Errors raised while loading or validating a [`crate::config::ScanConfig`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Reasons the rescue pipeline could not run for a region.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("rescue pipeline disabled")]
    RescueDisabled,
    #[error("scratch buffer of {requested} elements exceeds pool limit {limit}")]
    ScratchExhausted { requested: usize, limit: usize },
}

/// Failure reported by an external symbol decoder.
///
/// The engine treats it exactly like "not found".
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("decoder backend failed: {0}")]
    Backend(String),
}

/// Errors from the diagnostic tools and CLI.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("frame {width}x{height} is too small to scan")]
    EmptyFrame { width: u32, height: u32 },
}
