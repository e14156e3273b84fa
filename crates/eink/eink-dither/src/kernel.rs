//! Error-diffusion kernels
//!
//! A kernel is a list of taps `(dx, dy, weight)` relative to the pixel being
//! quantized, plus a common divisor. Taps only ever point forward in scan
//! order (same row to the right, or a later row), so the already-quantized
//! current pixel is never written again.
//!
//! ```text
//!                 Floyd–Steinberg (/16)          Stucki (/42)
//!                       *   7                        *   8   4
//!                   3   5   1                2   4   8   4   2
//!                                            1   2   4   2   1
//! ```
//!
//! On serpentine passes odd rows are walked right-to-left and every tap's
//! `dx` is mirrored.

// Pixel coordinates are bounded by the validated region; tap offsets are
// at most ±2, checked against the region edges before use.
#![allow(clippy::arithmetic_side_effects)]

use crate::palette::{diffuse, Palette};
use crate::region::Region;

/// One diffusion target relative to the current pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tap {
    /// Column offset (positive = scan direction).
    pub dx: i8,
    /// Row offset (0 = current row).
    pub dy: u8,
    /// Numerator of the share of the error sent to this tap.
    pub weight: u8,
}

impl Tap {
    const fn new(dx: i8, dy: u8, weight: u8) -> Self {
        Self { dx, dy, weight }
    }
}

/// Row traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Every row left-to-right.
    RowMajor,
    /// Alternate direction every row (boustrophedon).
    Serpentine,
}

/// Diffusion kernel: taps and their common divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kernel {
    /// Short identifier used in logs.
    pub name: &'static str,
    /// Denominator shared by all taps.
    pub divisor: u8,
    /// Forward taps.
    pub taps: &'static [Tap],
}

impl Kernel {
    /// Sum of all tap weights.
    pub fn total_weight(&self) -> u32 {
        self.taps.iter().map(|t| u32::from(t.weight)).sum()
    }

    /// `true` when the full quantization error is redistributed.
    ///
    /// Atkinson is the one kernel that is not: it keeps 2/8 of the residual.
    pub fn is_conservative(&self) -> bool {
        self.total_weight() == u32::from(self.divisor)
    }
}

/// Floyd–Steinberg.
pub const FLOYD_STEINBERG: Kernel = Kernel {
    name: "floyd-steinberg",
    divisor: 16,
    taps: &[
        Tap::new(1, 0, 7),
        Tap::new(-1, 1, 3),
        Tap::new(0, 1, 5),
        Tap::new(1, 1, 1),
    ],
};

/// Atkinson: six taps of 1/8, a quarter of the error is dropped.
pub const ATKINSON: Kernel = Kernel {
    name: "atkinson",
    divisor: 8,
    taps: &[
        Tap::new(1, 0, 1),
        Tap::new(2, 0, 1),
        Tap::new(-1, 1, 1),
        Tap::new(0, 1, 1),
        Tap::new(1, 1, 1),
        Tap::new(0, 2, 1),
    ],
};

/// Two-row Sierra.
pub const SIERRA_TWO_ROW: Kernel = Kernel {
    name: "sierra-two-row",
    divisor: 16,
    taps: &[
        Tap::new(1, 0, 4),
        Tap::new(2, 0, 3),
        Tap::new(-2, 1, 1),
        Tap::new(-1, 1, 2),
        Tap::new(0, 1, 3),
        Tap::new(1, 1, 2),
        Tap::new(2, 1, 1),
    ],
};

/// Full three-row Sierra.
pub const SIERRA: Kernel = Kernel {
    name: "sierra",
    divisor: 32,
    taps: &[
        Tap::new(1, 0, 5),
        Tap::new(2, 0, 3),
        Tap::new(-2, 1, 2),
        Tap::new(-1, 1, 4),
        Tap::new(0, 1, 5),
        Tap::new(1, 1, 4),
        Tap::new(2, 1, 2),
        Tap::new(-1, 2, 2),
        Tap::new(0, 2, 3),
        Tap::new(1, 2, 2),
    ],
};

/// Stucki.
pub const STUCKI: Kernel = Kernel {
    name: "stucki",
    divisor: 42,
    taps: &[
        Tap::new(1, 0, 8),
        Tap::new(2, 0, 4),
        Tap::new(-2, 1, 2),
        Tap::new(-1, 1, 4),
        Tap::new(0, 1, 8),
        Tap::new(1, 1, 4),
        Tap::new(2, 1, 2),
        Tap::new(-2, 2, 1),
        Tap::new(-1, 2, 2),
        Tap::new(0, 2, 4),
        Tap::new(1, 2, 2),
        Tap::new(2, 2, 1),
    ],
};

/// Hong–Kim: narrow three-row kernel, meant for serpentine traversal.
pub const HONG_KIM: Kernel = Kernel {
    name: "hong-kim",
    divisor: 16,
    taps: &[
        Tap::new(1, 0, 4),
        Tap::new(0, 1, 4),
        Tap::new(1, 1, 3),
        Tap::new(0, 2, 3),
        Tap::new(1, 2, 2),
    ],
};

/// Every built-in kernel, for table-driven checks.
pub const ALL: [Kernel; 6] = [
    FLOYD_STEINBERG,
    ATKINSON,
    SIERRA_TWO_ROW,
    SIERRA,
    STUCKI,
    HONG_KIM,
];

/// Quantize `region` in place, pushing each residual through `kernel`.
///
/// Taps falling left of column 0, right of `width - 1` or below the last
/// row are skipped; the stride padding is never touched. The region must
/// already be validated against `buf`.
pub(crate) fn diffuse_region(
    buf: &mut [u8],
    region: Region,
    palette: &Palette,
    kernel: &Kernel,
    traversal: Traversal,
) {
    let width = region.width;
    let height = region.height;
    // Region validation bounds width by the buffer length, so it fits isize.
    let width_i = isize::try_from(width).unwrap_or(isize::MAX);

    for y in 0..height {
        let reversed = traversal == Traversal::Serpentine && y % 2 == 1;
        for step in 0..width {
            let x = if reversed { width - 1 - step } else { step };
            let idx = region.offset(x, y);
            let Some(px) = buf.get_mut(idx) else {
                continue;
            };
            let q = palette.quantize(*px);
            *px = q.value;
            if q.error == 0 {
                continue;
            }

            for tap in kernel.taps {
                let dx = if reversed { -isize::from(tap.dx) } else { isize::from(tap.dx) };
                // x < width <= isize::MAX.
                #[allow(clippy::cast_possible_wrap)]
                let tx = x as isize + dx;
                let ty = y + usize::from(tap.dy);
                if tx < 0 || tx >= width_i || ty >= height {
                    continue;
                }
                // 0 <= tx < width checked above.
                #[allow(clippy::cast_sign_loss)]
                let target = region.offset(tx as usize, ty);
                diffuse(buf, target, q.error, tap.weight, kernel.divisor);
            }
        }
    }
}
