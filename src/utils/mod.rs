//! Pixel-level helpers for region preprocessing
//!
//! - Grayscale conversion (BT.601 fixed point, BT.709 luma)
//! - Small-kernel filters (Laplacian variance, Gaussian blur, morphology)
//! - Binarization (Gaussian adaptive and global threshold)
//! - Geometry (localization points to overlay boxes)
//! - Memory pools (scratch buffer reuse with RAII release)

pub mod binarization;
pub mod filters;
pub mod geometry;
pub mod grayscale;
pub mod memory_pool;
