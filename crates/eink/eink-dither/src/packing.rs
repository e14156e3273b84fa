//! 8-bit samples → controller transport bit depth
//!
//! The controller accepts 2, 4 or 8 bits per pixel on the wire. Each output
//! byte carries `8 / T` samples, each truncated to its top `T` bits:
//!
//! ```text
//!  8bpp  [11111111] [22222222] [33333333] [44444444] ...
//!  2bpp  [11223344] [55667788]          (SampleOrder::MsbFirst)
//!        [44332211] [88776655]          (SampleOrder::LsbFirst)
//! ```
//!
//! Which order a panel expects depends on the load-image endian flag and is
//! not pinned down by the controller documentation; it is configuration,
//! checked against real hardware.
//!
//! Rows are packed independently. A row whose width is not a multiple of
//! `8 / T` drops its partial trailing group, so the packed image is
//! [`packed_width`] pixels wide. Output rows are contiguous: stride padding
//! does not survive packing.

// Every index below is bounded by `Region::validate` plus
// `packed_row_bytes <= width <= stride`; depth-derived shifts are < 8.
#![allow(clippy::arithmetic_side_effects)]

use serde::{Deserialize, Serialize};

use crate::region::{Region, RegionError};

/// Wire bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TransportDepth {
    /// Four pixels per byte.
    Two,
    /// Two pixels per byte.
    Four,
    /// One pixel per byte (no packing).
    Eight,
}

impl TransportDepth {
    /// Bits per pixel.
    pub const fn bits(self) -> u8 {
        match self {
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
        }
    }

    /// Pixels carried by one output byte.
    pub const fn pixels_per_byte(self) -> usize {
        match self {
            Self::Two => 4,
            Self::Four => 2,
            Self::Eight => 1,
        }
    }

    /// Right shift that keeps the top `bits` of a sample.
    const fn shift(self) -> u8 {
        8 - self.bits()
    }

    /// Spacing between adjacent gray levels once expanded back to 8 bits.
    pub const fn level_step(self) -> u8 {
        match self {
            Self::Two => 85,
            Self::Four => 17,
            Self::Eight => 1,
        }
    }
}

impl TryFrom<u8> for TransportDepth {
    type Error = PackingError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            other => Err(PackingError::UnsupportedDepth(other)),
        }
    }
}

impl From<TransportDepth> for u8 {
    fn from(d: TransportDepth) -> Self {
        d.bits()
    }
}

impl Default for TransportDepth {
    fn default() -> Self {
        Self::Four
    }
}

/// Sample order inside one packed byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleOrder {
    /// Leftmost pixel in the most significant bits.
    #[default]
    MsbFirst,
    /// Leftmost pixel in the least significant bits.
    LsbFirst,
}

/// Pixels per row that survive packing (`width` rounded down to whole groups).
pub fn packed_width(width: usize, depth: TransportDepth) -> usize {
    width / depth.pixels_per_byte() * depth.pixels_per_byte()
}

/// Packed bytes per row.
pub fn packed_row_bytes(width: usize, depth: TransportDepth) -> usize {
    width / depth.pixels_per_byte()
}

/// Total packed bytes for `region`.
pub fn packed_len(region: Region, depth: TransportDepth) -> usize {
    packed_row_bytes(region.width, depth).saturating_mul(region.height)
}

/// Fail unless panel column `x` starts a whole packed group.
pub fn check_alignment(x: usize, depth: TransportDepth) -> Result<(), PackingError> {
    let group = depth.pixels_per_byte();
    if x % group != 0 {
        return Err(PackingError::Misaligned { x, group });
    }
    Ok(())
}

#[inline]
fn pack_group(samples: impl Iterator<Item = u8>, depth: TransportDepth, order: SampleOrder) -> u8 {
    let bits = depth.bits();
    let ppb = depth.pixels_per_byte();
    let mut out = 0u8;
    for (i, s) in samples.enumerate() {
        let slot = match order {
            SampleOrder::MsbFirst => ppb - 1 - i,
            SampleOrder::LsbFirst => i,
        };
        // slot < ppb, so slot * bits <= 8 - bits.
        out |= (s >> depth.shift()) << (slot as u32 * u32::from(bits));
    }
    out
}

/// Pack `region` of `buf` in place and return the packed length.
///
/// The packed stream occupies `buf[..len]`; bytes after it are left in an
/// unspecified state. Safe in place because the write cursor never passes
/// the read cursor: output row `y` starts at `y · row_bytes`, input row `y`
/// at `y · stride`, and `row_bytes <= width <= stride`.
pub fn pack_in_place(
    buf: &mut [u8],
    region: Region,
    depth: TransportDepth,
    order: SampleOrder,
) -> Result<usize, PackingError> {
    region.validate(buf.len())?;
    let ppb = depth.pixels_per_byte();
    let row_bytes = packed_row_bytes(region.width, depth);

    for y in 0..region.height {
        let src_row = y * region.stride;
        let dst_row = y * row_bytes;
        if depth == TransportDepth::Eight {
            if src_row != dst_row {
                buf.copy_within(src_row..src_row + region.width, dst_row);
            }
            continue;
        }
        for g in 0..row_bytes {
            let src = src_row + g * ppb;
            let byte = {
                let group = buf.get(src..src + ppb).ok_or(PackingError::Region(
                    RegionError::BufferTooSmall {
                        needed: src + ppb,
                        actual: buf.len(),
                    },
                ))?;
                pack_group(group.iter().copied(), depth, order)
            };
            if let Some(dst) = buf.get_mut(dst_row + g) {
                *dst = byte;
            }
        }
    }
    Ok(packed_len(region, depth))
}

/// Pack `region` of `src` into a fresh buffer.
pub fn pack(
    src: &[u8],
    region: Region,
    depth: TransportDepth,
    order: SampleOrder,
) -> Result<Vec<u8>, PackingError> {
    let mut out = Vec::with_capacity(packed_len(region, depth));
    pack_into(src, region, depth, order, &mut out)?;
    Ok(out)
}

/// Pack `region` of `src`, appending to `out`. Returns the bytes appended.
pub fn pack_into(
    src: &[u8],
    region: Region,
    depth: TransportDepth,
    order: SampleOrder,
    out: &mut Vec<u8>,
) -> Result<usize, PackingError> {
    region.validate(src.len())?;
    let start = out.len();
    out.reserve(packed_len(region, depth));
    let ppb = depth.pixels_per_byte();
    let width = packed_width(region.width, depth);
    for row in src.chunks(region.stride).take(region.height) {
        let row = row.get(..width).unwrap_or(row);
        out.extend(
            row.chunks_exact(ppb)
                .map(|group| pack_group(group.iter().copied(), depth, order)),
        );
    }
    Ok(out.len() - start)
}

/// Expand a packed stream back to one 8-bit level per pixel.
///
/// `width` is the packed width (a multiple of `8 / T`). Each `T`-bit code
/// `n` becomes `n · level_step`, so a 4-bit code 5 reads back as 85.
pub fn unpack_levels(
    packed: &[u8],
    width: usize,
    height: usize,
    depth: TransportDepth,
    order: SampleOrder,
) -> Result<Vec<u8>, PackingError> {
    check_alignment(width, depth)?;
    let expected = packed_row_bytes(width, depth) * height;
    if packed.len() != expected {
        return Err(PackingError::LengthMismatch {
            expected,
            actual: packed.len(),
        });
    }
    let bits = u32::from(depth.bits());
    let ppb = depth.pixels_per_byte();
    let mask = ((1u16 << bits) - 1) as u8;
    let mut out = Vec::with_capacity(width * height);
    for byte in packed {
        for i in 0..ppb {
            let slot = match order {
                SampleOrder::MsbFirst => ppb - 1 - i,
                SampleOrder::LsbFirst => i,
            };
            let code = (byte >> (slot as u32 * bits)) & mask;
            out.push(code.saturating_mul(depth.level_step()));
        }
    }
    Ok(out)
}

/// Packing precondition violated; detected before any bus traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackingError {
    /// Only 2, 4 and 8 bits per pixel are valid on the wire.
    UnsupportedDepth(u8),
    /// Placement column does not start a packed group.
    Misaligned {
        /// Offending column.
        x: usize,
        /// Required alignment in pixels.
        group: usize,
    },
    /// Packed buffer length does not match the area it claims to cover.
    LengthMismatch {
        /// Bytes the area needs.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// Source region does not fit its buffer.
    Region(RegionError),
}

impl From<RegionError> for PackingError {
    fn from(e: RegionError) -> Self {
        Self::Region(e)
    }
}

impl core::fmt::Display for PackingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedDepth(b) => {
                write!(f, "unsupported transport depth {b} bpp (expected 2, 4 or 8)")
            }
            Self::Misaligned { x, group } => {
                write!(f, "x offset {x} is not a multiple of the {group}-pixel packing group")
            }
            Self::LengthMismatch { expected, actual } => {
                write!(f, "packed buffer is {actual} bytes, area needs {expected}")
            }
            Self::Region(e) => write!(f, "invalid source region: {e}"),
        }
    }
}

impl std::error::Error for PackingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Region(e) => Some(e),
            _ => None,
        }
    }
}
