//! Grayscale dithering for e-paper panels
//!
//! Takes one 8-bit luminance frame at a time and turns it into the few gray
//! levels a panel can show, then packs those levels into the byte layout the
//! controller expects.
//!
//! # Pipeline
//!
//! ```text
//! 8-bit frame ──► WhitePoint (optional) ──► Dither strategy ──► pack_in_place ──► controller
//!                                              │
//!                                   Palette (B bits: mul / bias / clip)
//! ```
//!
//! Every stage works in place on a caller-owned buffer described by a
//! [`Region`] (width, height, stride). Stride padding is never read as pixel
//! data and never written.
//!
//! # Strategies
//!
//! | Kind | Family |
//! |------|--------|
//! | `floyd-steinberg`, `serpentine-floyd-steinberg` | error diffusion |
//! | `atkinson`, `sierra-two-row`, `sierra`, `stucki`, `hong-kim` | error diffusion |
//! | `interleaved-gradient`, `blue-noise`, `white-noise` | ordered noise |
//!
//! # Example
//!
//! ```
//! use eink_dither::{pack_in_place, Dither, DitherKind, DitherStrategy, Palette, Region, SampleOrder, TransportDepth};
//!
//! let palette = Palette::new(4).unwrap();
//! let mut dither = Dither::from_kind(DitherKind::FloydSteinberg, None).unwrap();
//!
//! let region = Region::packed(8, 2);
//! let mut frame: Vec<u8> = (0..16).map(|i| i * 16).collect();
//! dither.apply(&mut frame, region, &palette).unwrap();
//!
//! let len = pack_in_place(&mut frame, region, TransportDepth::Four, SampleOrder::MsbFirst).unwrap();
//! assert_eq!(len, 8);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod kernel;
pub mod noise;
pub mod packing;
pub mod palette;
pub mod region;
pub mod strategy;
pub mod tone;

pub use kernel::{Kernel, Tap, Traversal};
pub use noise::{AssetError, BlueNoiseTexture, DEFAULT_TEXTURE_FILE, TEXTURE_BYTES, TEXTURE_SIZE};
pub use packing::{
    check_alignment, pack, pack_in_place, pack_into, packed_len, packed_row_bytes, packed_width,
    unpack_levels, PackingError, SampleOrder, TransportDepth,
};
pub use palette::{clamp_u8, diffuse, Palette, PaletteError, Quantized};
pub use region::{Region, RegionError};
pub use strategy::{
    Atkinson, BlueNoise, Dither, DitherError, DitherKind, DitherStrategy, FloydSteinberg,
    HongKimSerpentine, InterleavedGradientNoise, SerpentineFloydSteinberg, Sierra, SierraTwoRow,
    Stucki, WhiteNoise,
};
pub use tone::{ToneError, WhitePoint};
