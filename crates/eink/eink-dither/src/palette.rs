//! Gray-level palette and the quantize/diffuse primitives
//!
//! A palette of depth `B` bits has `2^B` reachable gray levels spaced `mul`
//! apart, plus pure white:
//!
//! ```text
//! mul  = 256 / (2^B - 1)      (integer division)
//! bias = mul / 2              (rounding offset)
//! clip = 255 - bias           (anything brighter snaps to 255)
//! ```
//!
//! For `B = 4`: `mul = 17`, `bias = 8`, `clip = 247`, levels `0, 17, …, 255`.
//! The three constants are computed once in [`Palette::new`] and never
//! change per pixel.

// Samples are u8 widened to u16/i32 before any arithmetic, and `mul` is
// non-zero for every depth `Palette::new` accepts.
#![allow(clippy::arithmetic_side_effects)]

/// Smallest supported palette depth.
pub const MIN_BITS: u8 = 1;
/// Largest supported palette depth (identity quantization).
pub const MAX_BITS: u8 = 8;

/// Quantization constants for one display bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    bits: u8,
    mul: u16,
    bias: u16,
    clip: u16,
}

/// Result of snapping one sample to the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantized {
    /// Palette level written back to the buffer.
    pub value: u8,
    /// Residual `old − new`; `0` for samples clipped to white.
    pub error: i16,
}

impl Palette {
    /// Derive the palette for a `bits`-per-pixel display.
    pub fn new(bits: u8) -> Result<Self, PaletteError> {
        if !(MIN_BITS..=MAX_BITS).contains(&bits) {
            return Err(PaletteError::UnsupportedDepth(bits));
        }
        // bits in 1..=8: (1 << bits) - 1 is in 1..=255, never zero.
        let levels_minus_one = (1u16 << bits).saturating_sub(1).max(1);
        let mul = 256 / levels_minus_one;
        let bias = mul / 2;
        let clip = 255u16.saturating_sub(bias);
        Ok(Self {
            bits,
            mul,
            bias,
            clip,
        })
    }

    /// Display depth this palette was built for.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Level spacing.
    pub fn mul(&self) -> u16 {
        self.mul
    }

    /// Rounding offset (`mul / 2`).
    pub fn bias(&self) -> u16 {
        self.bias
    }

    /// Samples strictly above this snap to pure white.
    pub fn clip(&self) -> u16 {
        self.clip
    }

    /// Number of distinct gray levels (`2^bits`).
    pub fn levels(&self) -> u16 {
        1u16 << self.bits
    }

    /// Map `sample` to its nearest palette level.
    ///
    /// Samples above [`clip`](Self::clip) become 255 with zero residual; the
    /// rest round to the nearest multiple of [`mul`](Self::mul).
    #[inline]
    pub fn quantize(&self, sample: u8) -> Quantized {
        let s = u16::from(sample);
        if s > self.clip {
            return Quantized {
                value: 255,
                error: 0,
            };
        }
        // s <= clip = 255 - bias, so s + bias <= 255 and the product is at
        // most the nearest multiple of mul not above 255.
        let level = (s.saturating_add(self.bias) / self.mul).saturating_mul(self.mul);
        let value = u8::try_from(level).unwrap_or(u8::MAX);
        Quantized {
            value,
            error: i16::from(sample).saturating_sub(i16::from(value)),
        }
    }

    /// `true` if `value` is reachable by [`quantize`](Self::quantize).
    pub fn contains(&self, value: u8) -> bool {
        value == 255 || u16::from(value) % self.mul == 0
    }
}

impl Default for Palette {
    /// 4-bit, sixteen gray levels.
    fn default() -> Self {
        Self {
            bits: 4,
            mul: 17,
            bias: 8,
            clip: 247,
        }
    }
}

/// Add `error * weight / divisor` to `buf[index]`, clamped to `[0, 255]`.
///
/// The division truncates toward zero. An out-of-range `index` is ignored;
/// callers are expected to skip off-edge taps before getting here, this is
/// only the last line of defence against corrupting neighbouring memory.
#[inline]
pub fn diffuse(buf: &mut [u8], index: usize, error: i16, weight: u8, divisor: u8) {
    if divisor == 0 {
        return;
    }
    if let Some(px) = buf.get_mut(index) {
        let delta = i32::from(error)
            .saturating_mul(i32::from(weight))
            .checked_div(i32::from(divisor))
            .unwrap_or(0);
        *px = clamp_u8(i32::from(*px).saturating_add(delta));
    }
}

/// Saturating conversion of a signed intermediate back into a sample.
#[inline]
pub fn clamp_u8(v: i32) -> u8 {
    u8::try_from(v.clamp(0, 255)).unwrap_or(u8::MAX)
}

/// Palette construction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteError {
    /// Display depth outside `1..=8` bits.
    UnsupportedDepth(u8),
}

impl core::fmt::Display for PaletteError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedDepth(b) => {
                write!(f, "unsupported palette depth {b} bpp (expected {MIN_BITS}..={MAX_BITS})")
            }
        }
    }
}

impl std::error::Error for PaletteError {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn four_bit_constants() {
        let p = Palette::new(4).unwrap();
        assert_eq!((p.mul(), p.bias(), p.clip()), (17, 8, 247));
        assert_eq!(p, Palette::default());
    }

    #[test]
    fn two_bit_constants() {
        let p = Palette::new(2).unwrap();
        assert_eq!((p.mul(), p.bias(), p.clip()), (85, 42, 213));
        assert_eq!(p.levels(), 4);
    }

    #[test]
    fn one_and_eight_bit_extremes() {
        let one = Palette::new(1).unwrap();
        assert_eq!(one.quantize(127).value, 0);
        assert_eq!(one.quantize(128).value, 255);

        let eight = Palette::new(8).unwrap();
        for s in 0..=255u8 {
            assert_eq!(eight.quantize(s), Quantized { value: s, error: 0 });
        }
    }

    #[test]
    fn quantize_130_at_four_bits() {
        let q = Palette::new(4).unwrap().quantize(130);
        assert_eq!(q, Quantized { value: 136, error: -6 });
    }

    #[test]
    fn clipped_samples_carry_no_error() {
        let p = Palette::new(4).unwrap();
        assert_eq!(p.quantize(248), Quantized { value: 255, error: 0 });
        assert_eq!(p.quantize(247).value, 255);
        assert_eq!(p.quantize(247).error, -8);
    }

    #[test]
    fn rejects_out_of_range_depths() {
        assert_eq!(Palette::new(0), Err(PaletteError::UnsupportedDepth(0)));
        assert_eq!(Palette::new(9), Err(PaletteError::UnsupportedDepth(9)));
    }

    #[test]
    fn diffuse_truncates_toward_zero_and_clamps() {
        let mut buf = [100u8, 0, 250];
        diffuse(&mut buf, 0, -6, 7, 16); // -42/16 = -2
        assert_eq!(buf[0], 98);
        diffuse(&mut buf, 1, -40, 16, 16);
        assert_eq!(buf[1], 0, "negative result clamps to 0");
        diffuse(&mut buf, 2, 40, 16, 16);
        assert_eq!(buf[2], 255, "overflow clamps to 255");
    }

    #[test]
    fn diffuse_ignores_out_of_bounds_index() {
        let mut buf = [10u8; 2];
        diffuse(&mut buf, 2, 100, 16, 16);
        assert_eq!(buf, [10, 10]);
    }
}
