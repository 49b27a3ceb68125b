use std::fmt;
use std::str::FromStr;

/// Preprocessing applied to a region before decoding.
///
/// Variants are ordered by cost; the engine always tries them cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mode {
    /// Identity
    None,
    /// Luma contrast stretch followed by a 3x3 sharpen
    Enhance,
    /// Sharpness-gated adaptive threshold with morphological close
    Rescue,
}

impl Mode {
    /// All modes in cost order
    pub const ALL: [Mode; 3] = [Mode::None, Mode::Enhance, Mode::Rescue];

    /// Short name used in logs and the CLI
    pub fn name(&self) -> &'static str {
        match self {
            Mode::None => "none",
            Mode::Enhance => "enhance",
            Mode::Rescue => "cv",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Mode::None),
            "enhance" => Ok(Mode::Enhance),
            "cv" | "rescue" => Ok(Mode::Rescue),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

/// Search difficulty (levels 0..=2).
///
/// Higher levels widen the region scheduler's crops and unlock the more
/// expensive preprocessing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Difficulty {
    /// Level 0
    #[default]
    Easy,
    /// Level 1
    Medium,
    /// Level 2
    Hard,
}

impl Difficulty {
    /// Numeric level
    pub fn level(&self) -> u8 {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }

    /// Map a level onto a difficulty, saturating above 2
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Difficulty::Easy,
            1 => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }

    /// One level up, capped at `Hard`
    pub fn raise(&self) -> Self {
        Self::from_level(self.level().saturating_add(1))
    }

    /// One level down, floored at `Easy`
    pub fn lower(&self) -> Self {
        Self::from_level(self.level().saturating_sub(1))
    }

    /// Modes tried per region at this difficulty, cheapest first
    pub fn modes(&self) -> &'static [Mode] {
        match self {
            Difficulty::Easy => &[Mode::None],
            Difficulty::Medium => &[Mode::None, Mode::Enhance],
            Difficulty::Hard => &Mode::ALL,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_per_difficulty() {
        assert_eq!(Difficulty::Easy.modes(), &[Mode::None]);
        assert_eq!(Difficulty::Medium.modes(), &[Mode::None, Mode::Enhance]);
        assert_eq!(
            Difficulty::Hard.modes(),
            &[Mode::None, Mode::Enhance, Mode::Rescue]
        );
    }

    #[test]
    fn test_raise_lower_saturate() {
        assert_eq!(Difficulty::Hard.raise(), Difficulty::Hard);
        assert_eq!(Difficulty::Easy.lower(), Difficulty::Easy);
        assert_eq!(Difficulty::Easy.raise().raise(), Difficulty::Hard);
        assert_eq!(Difficulty::from_level(7), Difficulty::Hard);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("cv".parse::<Mode>(), Ok(Mode::Rescue));
        assert_eq!(" Enhance ".parse::<Mode>(), Ok(Mode::Enhance));
        assert!("sepia".parse::<Mode>().is_err());
        assert_eq!(Mode::Rescue.to_string(), "cv");
    }
}
