pub mod candidate;
pub mod mode;
pub mod point;
pub mod rect;

pub use candidate::Candidate;
pub use mode::{Difficulty, Mode};
pub use point::Point;
pub use rect::{CropRect, DetectionBox};
