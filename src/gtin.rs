//! GTIN format and check-digit validation.
//!
//! This is the only symbology-aware gate in the scanner: a decoded string is
//! accepted only if it has one of the GTIN lengths, is all digits, and
//! carries a correct GS1 mod-10 check digit.

use std::fmt;

/// Lengths a GTIN may have
pub const GTIN_LENGTHS: [usize; 4] = [8, 12, 13, 14];

/// GTIN family, by digit count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GtinKind {
    /// EAN-8
    Gtin8,
    /// UPC-A
    Gtin12,
    /// EAN-13
    Gtin13,
    /// ITF-14 / case code
    Gtin14,
}

impl GtinKind {
    fn from_len(len: usize) -> Option<Self> {
        match len {
            8 => Some(GtinKind::Gtin8),
            12 => Some(GtinKind::Gtin12),
            13 => Some(GtinKind::Gtin13),
            14 => Some(GtinKind::Gtin14),
            _ => None,
        }
    }

    /// Digit count
    pub fn digit_count(&self) -> usize {
        match self {
            GtinKind::Gtin8 => 8,
            GtinKind::Gtin12 => 12,
            GtinKind::Gtin13 => 13,
            GtinKind::Gtin14 => 14,
        }
    }
}

/// Why a string is not a GTIN
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GtinError {
    #[error("length {0} is not a GTIN length")]
    InvalidLength(usize),
    #[error("contains non-digit characters")]
    NonDigit,
    #[error("check digit {found} does not match expected {expected}")]
    Checksum { expected: u8, found: u8 },
}

/// True if `code` is all ASCII digits with a GTIN length.
///
/// Says nothing about the check digit.
pub fn is_well_formed(code: &str) -> bool {
    GTIN_LENGTHS.contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit())
}

/// GS1 mod-10 check digit for the digits preceding it.
///
/// Weights alternate 3,1,3,... starting from the rightmost body digit.
/// Returns `None` for an empty or non-digit body.
pub fn check_digit(body: &str) -> Option<u8> {
    if body.is_empty() {
        return None;
    }
    let mut sum = 0u32;
    for (i, b) in body.bytes().rev().enumerate() {
        if !b.is_ascii_digit() {
            return None;
        }
        let weight = if i % 2 == 0 { 3 } else { 1 };
        sum += (b - b'0') as u32 * weight;
    }
    Some(((10 - sum % 10) % 10) as u8)
}

/// True if the last digit of `code` is the GS1 check digit of the rest.
pub fn checksum_valid(code: &str) -> bool {
    let Some((body, last)) = split_check(code) else {
        return false;
    };
    check_digit(body) == Some(last)
}

/// Format and checksum together
pub fn is_valid(code: &str) -> bool {
    is_well_formed(code) && checksum_valid(code)
}

fn split_check(code: &str) -> Option<(&str, u8)> {
    let last = *code.as_bytes().last()?;
    if !last.is_ascii_digit() {
        return None;
    }
    Some((&code[..code.len() - 1], last - b'0'))
}

/// A validated GTIN
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gtin {
    digits: String,
    kind: GtinKind,
}

impl Gtin {
    /// Validate a decoded string, ignoring surrounding whitespace
    pub fn parse(raw: &str) -> Result<Self, GtinError> {
        let code = raw.trim();
        let kind = GtinKind::from_len(code.len()).ok_or(GtinError::InvalidLength(code.len()))?;
        if !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GtinError::NonDigit);
        }
        let (body, found) = split_check(code).ok_or(GtinError::NonDigit)?;
        let expected = check_digit(body).ok_or(GtinError::NonDigit)?;
        if expected != found {
            return Err(GtinError::Checksum { expected, found });
        }
        Ok(Self {
            digits: code.to_string(),
            kind,
        })
    }

    pub fn kind(&self) -> GtinKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    /// Left-pad to the 14-digit form used for catalogue lookups.
    ///
    /// Leading zeros do not change the check digit.
    pub fn to_gtin14(&self) -> String {
        format!("{:0>14}", self.digits)
    }
}

impl fmt::Display for Gtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digits)
    }
}

impl std::str::FromStr for Gtin {
    type Err = GtinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
