//! White-point tone adjustment
//!
//! Decoded video rarely uses the full 0–255 range, and e-paper white is
//! noticeably darker than a monitor's. Stretching so that `white` maps to
//! 255 (and everything brighter clips) keeps highlights from dithering into
//! a sparse gray speckle.

use serde::{Deserialize, Serialize};

use crate::region::{Region, RegionError};

/// Linear stretch `out = min(255, in · 256 / white)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct WhitePoint(u8);

impl WhitePoint {
    /// A white point of `white` (1..=255). `0` is rejected.
    pub fn new(white: u8) -> Result<Self, ToneError> {
        if white == 0 {
            return Err(ToneError::ZeroWhitePoint);
        }
        Ok(Self(white))
    }

    /// The configured white level.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Adjust one sample.
    #[inline]
    pub fn map(self, sample: u8) -> u8 {
        let scaled = (u32::from(sample) << 8)
            .checked_div(u32::from(self.0))
            .unwrap_or(u32::MAX);
        u8::try_from(scaled.min(255)).unwrap_or(u8::MAX)
    }

    /// Adjust every sample of `region` in place, leaving stride padding alone.
    pub fn apply(self, buf: &mut [u8], region: Region) -> Result<(), RegionError> {
        region.validate(buf.len())?;
        let lut: [u8; 256] = core::array::from_fn(|i| self.map(u8::try_from(i).unwrap_or(u8::MAX)));
        for row in buf.chunks_mut(region.stride).take(region.height) {
            for px in row.iter_mut().take(region.width) {
                *px = lut.get(usize::from(*px)).copied().unwrap_or(*px);
            }
        }
        Ok(())
    }
}

impl TryFrom<u8> for WhitePoint {
    type Error = ToneError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WhitePoint> for u8 {
    fn from(w: WhitePoint) -> Self {
        w.0
    }
}

/// Invalid tone parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneError {
    /// A white point of zero would divide by zero.
    ZeroWhitePoint,
}

impl core::fmt::Display for ToneError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroWhitePoint => write!(f, "white point must be in 1..=255"),
        }
    }
}

impl std::error::Error for ToneError {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn values_at_or_above_white_clip() {
        let w = WhitePoint::new(150).unwrap();
        assert_eq!(w.map(150), 255);
        assert_eq!(w.map(200), 255);
        assert_eq!(w.map(0), 0);
        // 75 · 256 / 150 = 128
        assert_eq!(w.map(75), 128);
    }

    #[test]
    fn white_point_255_is_nearly_identity() {
        let w = WhitePoint::new(255).unwrap();
        for s in 0..=255u8 {
            let out = w.map(s);
            assert!(out >= s && out - s <= 1, "{s} -> {out}");
        }
    }

    #[test]
    fn zero_is_rejected() {
        assert_eq!(WhitePoint::new(0), Err(ToneError::ZeroWhitePoint));
        assert!(serde_json::from_str::<WhitePoint>("0").is_err());
        assert_eq!(serde_json::from_str::<WhitePoint>("150").unwrap().get(), 150);
    }

    #[test]
    fn apply_skips_padding() {
        let w = WhitePoint::new(128).unwrap();
        let mut buf = [64u8, 9, 64, 9];
        w.apply(&mut buf, Region::new(1, 2, 2)).unwrap();
        assert_eq!(buf, [128, 9, 128, 9]);
    }
}
