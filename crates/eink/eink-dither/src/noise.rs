//! Ordered-noise thresholds
//!
//! The noise strategies carry no error between pixels. Each sample gets a
//! threshold offset in `[-bias, mul - bias)` added before quantization:
//!
//! - interleaved gradient noise, a closed-form function of `(x, y)`
//! - blue noise, read from a tileable 128×128 texture loaded at start-up
//! - white noise, one fresh random byte per pixel per call
//!
//! Every source produces a raw value in `[0, mul)`; [`threshold_region`]
//! re-centres it around zero.

// Offsets are bounded by the validated region; noise values are u8/u16
// scaled into `[0, mul)` with mul <= 256.
#![allow(clippy::arithmetic_side_effects)]

use std::path::{Path, PathBuf};

use crate::palette::{clamp_u8, Palette};
use crate::region::Region;

/// Edge length of the blue-noise tile.
pub const TEXTURE_SIZE: usize = 128;
/// Bytes in a blue-noise tile.
pub const TEXTURE_BYTES: usize = TEXTURE_SIZE * TEXTURE_SIZE;

/// Default file name of the blue-noise tile.
pub const DEFAULT_TEXTURE_FILE: &str = "bluenoise.bin";

/// Precomputed tileable blue-noise threshold map.
///
/// Immutable after construction. Share it between strategies through an
/// `Arc` rather than reloading.
#[derive(Clone, PartialEq, Eq)]
pub struct BlueNoiseTexture {
    data: Box<[u8]>,
}

impl BlueNoiseTexture {
    /// Wrap raw texture bytes, row-major, exactly [`TEXTURE_BYTES`] long.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, AssetError> {
        if bytes.len() != TEXTURE_BYTES {
            return Err(AssetError::WrongSize {
                expected: TEXTURE_BYTES,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            data: bytes.into_boxed_slice(),
        })
    }

    /// Read a texture file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let texture = Self::from_bytes(bytes)?;
        tracing::info!(path = %path.display(), "loaded blue-noise texture");
        Ok(texture)
    }

    /// Threshold byte at `(x mod 128, y mod 128)`.
    #[inline]
    pub fn sample(&self, x: usize, y: usize) -> u8 {
        let idx = (y % TEXTURE_SIZE) * TEXTURE_SIZE + (x % TEXTURE_SIZE);
        self.data.get(idx).copied().unwrap_or(0)
    }

    /// Raw texture bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl core::fmt::Debug for BlueNoiseTexture {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlueNoiseTexture")
            .field("size", &TEXTURE_SIZE)
            .finish_non_exhaustive()
    }
}

/// `frac(52.9829189 · frac(0.06711056·x + 0.00583715·y))`, in `[0, 1)`.
///
/// Jimenez's interleaved gradient noise. Evaluated in `f32` so the pattern
/// matches what a GPU shader produces for the same coordinates.
#[inline]
#[allow(clippy::cast_precision_loss)] // panel coordinates are < 2^24
pub fn interleaved_gradient(x: usize, y: usize) -> f32 {
    const C1: f32 = 52.982_918_9;
    const CX: f32 = 0.067_110_56;
    const CY: f32 = 0.005_837_15;
    let inner = CX * x as f32 + CY * y as f32;
    let outer = C1 * inner.fract();
    outer.fract()
}

/// Scale a `[0, 1)` fraction to a raw noise value in `[0, mul)`.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn scale_unit(frac: f32, mul: u16) -> u16 {
    // frac in [0, 1) so the product is in [0, mul); `as` saturates anyway.
    ((frac * f32::from(mul)) as u16).min(mul.saturating_sub(1))
}

/// Scale a uniformly distributed byte to `[0, mul)`.
#[inline]
pub(crate) fn scale_byte(byte: u8, mul: u16) -> u16 {
    (u16::from(byte) * mul) >> 8
}

/// Add `noise(x, y) − bias` to every sample, clamp, then quantize.
///
/// The region must already be validated against `buf`.
pub(crate) fn threshold_region<F>(buf: &mut [u8], region: Region, palette: &Palette, mut noise: F)
where
    F: FnMut(usize, usize) -> u16,
{
    let bias = i32::from(palette.bias());
    for y in 0..region.height {
        for x in 0..region.width {
            let Some(px) = buf.get_mut(region.offset(x, y)) else {
                continue;
            };
            let offset = i32::from(noise(x, y)) - bias;
            let adjusted = clamp_u8(i32::from(*px) + offset);
            *px = palette.quantize(adjusted).value;
        }
    }
}

/// Noise asset could not be loaded.
#[derive(Debug)]
pub enum AssetError {
    /// The file could not be read.
    Io {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not a 128×128 single-byte texture.
    WrongSize {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },
}

impl core::fmt::Display for AssetError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read noise texture {}: {source}", path.display())
            }
            Self::WrongSize { expected, actual } => {
                write!(f, "noise texture is {actual} bytes, expected {expected}")
            }
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::WrongSize { .. } => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::cast_possible_truncation)]
mod tests {
    use super::*;

    fn ramp_texture() -> BlueNoiseTexture {
        BlueNoiseTexture::from_bytes((0..TEXTURE_BYTES).map(|i| (i % 256) as u8).collect()).unwrap()
    }

    #[test]
    fn texture_must_be_exactly_one_tile() {
        let err = BlueNoiseTexture::from_bytes(vec![0; 100]).unwrap_err();
        assert!(matches!(err, AssetError::WrongSize { expected: 16_384, actual: 100 }));
    }

    #[test]
    fn texture_sampling_wraps_both_axes() {
        let t = ramp_texture();
        assert_eq!(t.sample(1, 0), 1);
        assert_eq!(t.sample(129, 0), 1);
        assert_eq!(t.sample(0, 1), t.sample(0, 129));
        assert_eq!(t.sample(5, 2), ((2 * 128 + 5) % 256) as u8);
    }

    #[test]
    fn loading_missing_file_reports_path() {
        let err = BlueNoiseTexture::load("/nonexistent/bluenoise.bin").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/bluenoise.bin"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn loads_texture_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_TEXTURE_FILE);
        std::fs::write(&path, ramp_texture().as_bytes()).unwrap();
        assert_eq!(BlueNoiseTexture::load(&path).unwrap(), ramp_texture());
    }

    #[test]
    fn interleaved_gradient_is_a_fraction() {
        for y in 0..64 {
            for x in 0..64 {
                let v = interleaved_gradient(x, y);
                assert!((0.0..1.0).contains(&v), "ign({x},{y}) = {v}");
            }
        }
        assert_eq!(interleaved_gradient(0, 0), 0.0);
    }

    #[test]
    fn scaled_noise_stays_below_mul() {
        assert_eq!(scale_byte(255, 17), 16);
        assert_eq!(scale_byte(0, 17), 0);
        assert_eq!(scale_byte(255, 256), 255);
        assert!(scale_unit(0.999_999, 17) < 17);
    }

    #[test]
    fn zero_centered_noise_is_plain_quantization() {
        // noise == bias → offset 0 → output equals direct quantization.
        let p = Palette::new(4).unwrap();
        let mut buf: Vec<u8> = (0..=255).collect();
        threshold_region(&mut buf, Region::packed(16, 16), &p, |_, _| p.bias());
        for (i, v) in buf.iter().enumerate() {
            assert_eq!(*v, p.quantize(i as u8).value);
        }
    }
}
