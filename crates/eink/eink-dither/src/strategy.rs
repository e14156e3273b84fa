//! Dither strategies
//!
//! One type per algorithm, all behind [`DitherStrategy`]. The application
//! picks one at start-up through [`DitherKind`] and holds it as a [`Dither`],
//! a closed enum that dispatches without a vtable.

use std::str::FromStr;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::kernel::{self, Kernel, Traversal};
use crate::noise::{self, BlueNoiseTexture};
use crate::palette::Palette;
use crate::region::{Region, RegionError};

/// Quantize an 8-bit region to a palette in place.
pub trait DitherStrategy {
    /// Stable identifier, as accepted by [`DitherKind::from_str`].
    fn name(&self) -> &'static str;

    /// Dither a region that has already been validated against `buf`.
    ///
    /// Implementations must not write outside `region` (stride padding
    /// included).
    fn dither_region(&mut self, buf: &mut [u8], region: Region, palette: &Palette);

    /// Validate `region` against `buf`, then dither it.
    fn apply(&mut self, buf: &mut [u8], region: Region, palette: &Palette) -> Result<(), RegionError> {
        region.validate(buf.len())?;
        self.dither_region(buf, region, palette);
        Ok(())
    }
}

macro_rules! diffusion_strategy {
    ($(#[$meta:meta])* $ty:ident, $kernel:expr, $traversal:expr, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $ty;

        impl $ty {
            /// Kernel this strategy diffuses with.
            pub const KERNEL: Kernel = $kernel;
            /// Row order this strategy walks in.
            pub const TRAVERSAL: Traversal = $traversal;
        }

        impl DitherStrategy for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn dither_region(&mut self, buf: &mut [u8], region: Region, palette: &Palette) {
                kernel::diffuse_region(buf, region, palette, &Self::KERNEL, Self::TRAVERSAL);
            }
        }
    };
}

diffusion_strategy!(
    /// Classic Floyd–Steinberg, every row left to right.
    FloydSteinberg,
    kernel::FLOYD_STEINBERG,
    Traversal::RowMajor,
    "floyd-steinberg"
);
diffusion_strategy!(
    /// Floyd–Steinberg alternating direction every row, for a less
    /// directional texture.
    SerpentineFloydSteinberg,
    kernel::FLOYD_STEINBERG,
    Traversal::Serpentine,
    "serpentine-floyd-steinberg"
);
diffusion_strategy!(
    /// Atkinson: high contrast, loses a quarter of each residual.
    Atkinson,
    kernel::ATKINSON,
    Traversal::RowMajor,
    "atkinson"
);
diffusion_strategy!(
    /// Two-row Sierra.
    SierraTwoRow,
    kernel::SIERRA_TWO_ROW,
    Traversal::RowMajor,
    "sierra-two-row"
);
diffusion_strategy!(
    /// Full three-row Sierra.
    Sierra,
    kernel::SIERRA,
    Traversal::RowMajor,
    "sierra"
);
diffusion_strategy!(
    /// Stucki.
    Stucki,
    kernel::STUCKI,
    Traversal::RowMajor,
    "stucki"
);
diffusion_strategy!(
    /// Hong–Kim serpentine.
    HongKimSerpentine,
    kernel::HONG_KIM,
    Traversal::Serpentine,
    "hong-kim"
);

/// Interleaved gradient noise threshold. Deterministic per coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterleavedGradientNoise;

impl DitherStrategy for InterleavedGradientNoise {
    fn name(&self) -> &'static str {
        "interleaved-gradient"
    }

    fn dither_region(&mut self, buf: &mut [u8], region: Region, palette: &Palette) {
        let mul = palette.mul();
        noise::threshold_region(buf, region, palette, |x, y| {
            noise::scale_unit(noise::interleaved_gradient(x, y), mul)
        });
    }
}

/// Blue-noise threshold from a shared 128×128 tile.
#[derive(Debug, Clone)]
pub struct BlueNoise {
    texture: Arc<BlueNoiseTexture>,
}

impl BlueNoise {
    /// Dither with `texture`.
    pub fn new(texture: Arc<BlueNoiseTexture>) -> Self {
        Self { texture }
    }

    /// The texture in use.
    pub fn texture(&self) -> &Arc<BlueNoiseTexture> {
        &self.texture
    }
}

impl DitherStrategy for BlueNoise {
    fn name(&self) -> &'static str {
        "blue-noise"
    }

    fn dither_region(&mut self, buf: &mut [u8], region: Region, palette: &Palette) {
        let mul = palette.mul();
        let texture = &self.texture;
        noise::threshold_region(buf, region, palette, |x, y| {
            noise::scale_byte(texture.sample(x, y), mul)
        });
    }
}

/// White-noise threshold: a fresh random byte per pixel on every call.
#[derive(Debug, Clone)]
pub struct WhiteNoise<R = StdRng> {
    rng: R,
    mask: Vec<u8>,
}

impl WhiteNoise<StdRng> {
    /// Seeded from the operating system's entropy source.
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible sequence, for tests and benchmarks.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> WhiteNoise<R> {
    /// Draw noise from `rng`.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            mask: Vec::new(),
        }
    }
}

impl<R: RngCore> DitherStrategy for WhiteNoise<R> {
    fn name(&self) -> &'static str {
        "white-noise"
    }

    fn dither_region(&mut self, buf: &mut [u8], region: Region, palette: &Palette) {
        // The mask buffer is reused between calls but always refilled.
        self.mask.resize(region.samples(), 0);
        self.rng.fill_bytes(&mut self.mask);
        let mul = palette.mul();
        let mask = &self.mask;
        let width = region.width;
        noise::threshold_region(buf, region, palette, |x, y| {
            let byte = y
                .checked_mul(width)
                .and_then(|row| row.checked_add(x))
                .and_then(|i| mask.get(i))
                .copied()
                .unwrap_or(0);
            noise::scale_byte(byte, mul)
        });
    }
}

/// Serialisable strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DitherKind {
    /// [`FloydSteinberg`]
    #[default]
    FloydSteinberg,
    /// [`SerpentineFloydSteinberg`]
    SerpentineFloydSteinberg,
    /// [`Atkinson`]
    Atkinson,
    /// [`SierraTwoRow`]
    SierraTwoRow,
    /// [`Sierra`]
    Sierra,
    /// [`Stucki`]
    Stucki,
    /// [`HongKimSerpentine`]
    HongKim,
    /// [`InterleavedGradientNoise`]
    InterleavedGradient,
    /// [`BlueNoise`]
    BlueNoise,
    /// [`WhiteNoise`]
    WhiteNoise,
}

impl DitherKind {
    /// Every selectable strategy.
    pub const ALL: [Self; 10] = [
        Self::FloydSteinberg,
        Self::SerpentineFloydSteinberg,
        Self::Atkinson,
        Self::SierraTwoRow,
        Self::Sierra,
        Self::Stucki,
        Self::HongKim,
        Self::InterleavedGradient,
        Self::BlueNoise,
        Self::WhiteNoise,
    ];

    /// Identifier used in config files and on the command line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FloydSteinberg => "floyd-steinberg",
            Self::SerpentineFloydSteinberg => "serpentine-floyd-steinberg",
            Self::Atkinson => "atkinson",
            Self::SierraTwoRow => "sierra-two-row",
            Self::Sierra => "sierra",
            Self::Stucki => "stucki",
            Self::HongKim => "hong-kim",
            Self::InterleavedGradient => "interleaved-gradient",
            Self::BlueNoise => "blue-noise",
            Self::WhiteNoise => "white-noise",
        }
    }

    /// `true` for strategies that need a [`BlueNoiseTexture`].
    pub const fn needs_texture(self) -> bool {
        matches!(self, Self::BlueNoise)
    }
}

impl core::fmt::Display for DitherKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DitherKind {
    type Err = DitherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DitherError::UnknownStrategy(s.to_owned()))
    }
}

/// Closed set of strategies, chosen once from configuration.
#[derive(Debug, Clone)]
pub enum Dither {
    /// See [`FloydSteinberg`].
    FloydSteinberg(FloydSteinberg),
    /// See [`SerpentineFloydSteinberg`].
    SerpentineFloydSteinberg(SerpentineFloydSteinberg),
    /// See [`Atkinson`].
    Atkinson(Atkinson),
    /// See [`SierraTwoRow`].
    SierraTwoRow(SierraTwoRow),
    /// See [`Sierra`].
    Sierra(Sierra),
    /// See [`Stucki`].
    Stucki(Stucki),
    /// See [`HongKimSerpentine`].
    HongKim(HongKimSerpentine),
    /// See [`InterleavedGradientNoise`].
    InterleavedGradient(InterleavedGradientNoise),
    /// See [`BlueNoise`].
    BlueNoise(BlueNoise),
    /// See [`WhiteNoise`].
    WhiteNoise(WhiteNoise),
}

impl Dither {
    /// Build the strategy for `kind`.
    ///
    /// `texture` is required for [`DitherKind::BlueNoise`] and ignored
    /// otherwise. White noise is seeded from OS entropy.
    pub fn from_kind(kind: DitherKind, texture: Option<Arc<BlueNoiseTexture>>) -> Result<Self, DitherError> {
        Ok(match kind {
            DitherKind::FloydSteinberg => Self::FloydSteinberg(FloydSteinberg),
            DitherKind::SerpentineFloydSteinberg => {
                Self::SerpentineFloydSteinberg(SerpentineFloydSteinberg)
            }
            DitherKind::Atkinson => Self::Atkinson(Atkinson),
            DitherKind::SierraTwoRow => Self::SierraTwoRow(SierraTwoRow),
            DitherKind::Sierra => Self::Sierra(Sierra),
            DitherKind::Stucki => Self::Stucki(Stucki),
            DitherKind::HongKim => Self::HongKim(HongKimSerpentine),
            DitherKind::InterleavedGradient => Self::InterleavedGradient(InterleavedGradientNoise),
            DitherKind::BlueNoise => {
                let texture = texture.ok_or(DitherError::MissingTexture)?;
                Self::BlueNoise(BlueNoise::new(texture))
            }
            DitherKind::WhiteNoise => Self::WhiteNoise(WhiteNoise::from_entropy()),
        })
    }

    /// Selector this strategy was built from.
    pub fn kind(&self) -> DitherKind {
        match self {
            Self::FloydSteinberg(_) => DitherKind::FloydSteinberg,
            Self::SerpentineFloydSteinberg(_) => DitherKind::SerpentineFloydSteinberg,
            Self::Atkinson(_) => DitherKind::Atkinson,
            Self::SierraTwoRow(_) => DitherKind::SierraTwoRow,
            Self::Sierra(_) => DitherKind::Sierra,
            Self::Stucki(_) => DitherKind::Stucki,
            Self::HongKim(_) => DitherKind::HongKim,
            Self::InterleavedGradient(_) => DitherKind::InterleavedGradient,
            Self::BlueNoise(_) => DitherKind::BlueNoise,
            Self::WhiteNoise(_) => DitherKind::WhiteNoise,
        }
    }

    fn as_strategy(&mut self) -> &mut dyn DitherStrategy {
        match self {
            Self::FloydSteinberg(s) => s,
            Self::SerpentineFloydSteinberg(s) => s,
            Self::Atkinson(s) => s,
            Self::SierraTwoRow(s) => s,
            Self::Sierra(s) => s,
            Self::Stucki(s) => s,
            Self::HongKim(s) => s,
            Self::InterleavedGradient(s) => s,
            Self::BlueNoise(s) => s,
            Self::WhiteNoise(s) => s,
        }
    }
}

impl Default for Dither {
    fn default() -> Self {
        Self::FloydSteinberg(FloydSteinberg)
    }
}

impl DitherStrategy for Dither {
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    fn dither_region(&mut self, buf: &mut [u8], region: Region, palette: &Palette) {
        tracing::debug!(
            strategy = self.name(),
            width = region.width,
            height = region.height,
            bits = palette.bits(),
            "dithering frame"
        );
        self.as_strategy().dither_region(buf, region, palette);
    }
}

/// Strategy selection failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DitherError {
    /// Name not recognised.
    UnknownStrategy(String),
    /// Blue noise selected without a loaded texture.
    MissingTexture,
}

impl core::fmt::Display for DitherError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownStrategy(name) => write!(f, "unknown dither strategy '{name}'"),
            Self::MissingTexture => write!(f, "blue-noise dithering requires a noise texture"),
        }
    }
}

impl std::error::Error for DitherError {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::noise::TEXTURE_BYTES;

    fn texture() -> Arc<BlueNoiseTexture> {
        let bytes = (0..TEXTURE_BYTES).map(|i| u8::try_from(i % 251).unwrap()).collect();
        Arc::new(BlueNoiseTexture::from_bytes(bytes).unwrap())
    }

    fn gradient(width: usize, height: usize) -> Vec<u8> {
        (0..width * height)
            .map(|i| u8::try_from((i % width) * 255 / (width - 1)).unwrap())
            .collect()
    }

    #[test]
    fn kind_names_round_trip_through_from_str() {
        for kind in DitherKind::ALL {
            assert_eq!(kind.as_str().parse::<DitherKind>().unwrap(), kind);
            let dither = Dither::from_kind(kind, Some(texture())).unwrap();
            assert_eq!(dither.kind(), kind);
            assert_eq!(dither.name(), kind.as_str());
        }
        assert_eq!(
            "bayer".parse::<DitherKind>(),
            Err(DitherError::UnknownStrategy("bayer".into()))
        );
    }

    #[test]
    fn kind_serde_matches_cli_names() {
        assert_eq!(serde_json::to_string(&DitherKind::HongKim).unwrap(), "\"hong-kim\"");
        assert_eq!(
            serde_json::from_str::<DitherKind>("\"serpentine-floyd-steinberg\"").unwrap(),
            DitherKind::SerpentineFloydSteinberg
        );
    }

    #[test]
    fn blue_noise_requires_texture() {
        assert_eq!(
            Dither::from_kind(DitherKind::BlueNoise, None).unwrap_err(),
            DitherError::MissingTexture
        );
    }

    #[test]
    fn every_strategy_outputs_palette_levels_only() {
        let palette = Palette::new(2).unwrap();
        for kind in DitherKind::ALL {
            let mut d = Dither::from_kind(kind, Some(texture())).unwrap();
            let mut buf = gradient(64, 16);
            d.apply(&mut buf, Region::packed(64, 16), &palette).unwrap();
            assert!(buf.iter().all(|&v| palette.contains(v)), "{kind} produced off-palette value");
        }
    }

    #[test]
    fn every_strategy_respects_stride_padding() {
        let palette = Palette::new(4).unwrap();
        let region = Region::new(30, 8, 32);
        for kind in DitherKind::ALL {
            let mut buf = vec![0xA5u8; region.stride * region.height];
            for y in 0..region.height {
                for x in 0..region.width {
                    buf[y * region.stride + x] = u8::try_from(x * 8).unwrap();
                }
            }
            let mut d = Dither::from_kind(kind, Some(texture())).unwrap();
            d.apply(&mut buf, region, &palette).unwrap();
            for y in 0..region.height {
                assert_eq!(&buf[y * 32 + 30..y * 32 + 32], &[0xA5, 0xA5], "{kind} wrote into padding");
            }
        }
    }

    #[test]
    fn interleaved_gradient_is_deterministic() {
        let palette = Palette::new(4).unwrap();
        let mut a = gradient(40, 10);
        let mut b = a.clone();
        InterleavedGradientNoise.apply(&mut a, Region::packed(40, 10), &palette).unwrap();
        InterleavedGradientNoise.apply(&mut b, Region::packed(40, 10), &palette).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn white_noise_mask_is_regenerated_per_call() {
        let palette = Palette::new(1).unwrap();
        let mut noise = WhiteNoise::seeded(7);
        let mut first = vec![128u8; 256];
        let mut second = first.clone();
        noise.apply(&mut first, Region::packed(16, 16), &palette).unwrap();
        noise.apply(&mut second, Region::packed(16, 16), &palette).unwrap();
        assert_ne!(first, second, "a reused mask would give identical output");
    }

    #[test]
    fn flat_black_and_white_are_fixed_points() {
        let palette = Palette::new(4).unwrap();
        // Noise offsets stay within [-bias, bias] at four bits, so black and
        // white survive the noise strategies too.
        for kind in DitherKind::ALL {
            let mut d = Dither::from_kind(kind, Some(texture())).unwrap();
            let mut black = vec![0u8; 64];
            d.apply(&mut black, Region::packed(8, 8), &palette).unwrap();
            assert!(black.iter().all(|&v| v == 0), "{kind} disturbed black");
            let mut white = vec![255u8; 64];
            d.apply(&mut white, Region::packed(8, 8), &palette).unwrap();
            assert!(white.iter().all(|&v| v == 255), "{kind} disturbed white");
        }
    }

    #[test]
    fn apply_rejects_invalid_region() {
        let mut buf = [0u8; 10];
        assert!(FloydSteinberg
            .apply(&mut buf, Region::packed(4, 4), &Palette::default())
            .is_err());
    }
}
