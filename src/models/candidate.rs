use super::Point;

/// Raw decoder output for one region x mode attempt.
///
/// `points` are localization points in crop-local coordinates; for 1D
/// symbols these are usually the two ends of the scan line. An empty list
/// means the decoder reported no localization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Candidate {
    /// Decoded text, untrimmed
    pub code: String,
    /// Localization points (crop-local)
    pub points: Vec<Point>,
}

impl Candidate {
    /// Candidate without localization points
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            points: Vec::new(),
        }
    }

    /// Candidate with localization points
    pub fn with_points(code: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            code: code.into(),
            points,
        }
    }
}
