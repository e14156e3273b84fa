//! Rectangular 8-bit sample region inside a strided buffer

// Region offsets are bounded by `validate`, which proves
// `(height - 1) * stride + width <= buf.len()` before any loop runs.
#![allow(clippy::arithmetic_side_effects)]

/// Logical geometry of an 8-bit-per-sample image inside a larger buffer.
///
/// Row `y` starts at byte `y * stride`; only the first `width` bytes of each
/// row are image data, the remaining `stride - width` are padding that no
/// stage may read as pixels or write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Samples per row.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    /// Bytes between the starts of consecutive rows.
    pub stride: usize,
}

impl Region {
    /// A region with no row padding.
    pub const fn packed(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            stride: width,
        }
    }

    /// A region with explicit stride.
    pub const fn new(width: usize, height: usize, stride: usize) -> Self {
        Self {
            width,
            height,
            stride,
        }
    }

    /// Minimum buffer length holding every sample of this region.
    ///
    /// The last row needs only `width` bytes, not a full stride.
    pub fn required_len(&self) -> usize {
        if self.height == 0 {
            return 0;
        }
        (self.height - 1).saturating_mul(self.stride).saturating_add(self.width)
    }

    /// Total logical samples (`width * height`).
    pub fn samples(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Check the region against a buffer of `len` bytes.
    pub fn validate(&self, len: usize) -> Result<(), RegionError> {
        if self.width == 0 || self.height == 0 {
            return Err(RegionError::Empty);
        }
        if self.stride < self.width {
            return Err(RegionError::StrideTooSmall {
                stride: self.stride,
                width: self.width,
            });
        }
        let needed = self.required_len();
        if needed > len {
            return Err(RegionError::BufferTooSmall { needed, actual: len });
        }
        Ok(())
    }

    /// Byte offset of sample `(x, y)`. Caller guarantees `x < width`, `y < height`.
    #[inline]
    pub(crate) fn offset(&self, x: usize, y: usize) -> usize {
        y * self.stride + x
    }
}

/// Region geometry does not fit the buffer it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionError {
    /// Zero width or height.
    Empty,
    /// `stride < width`.
    StrideTooSmall {
        /// Declared stride.
        stride: usize,
        /// Declared width.
        width: usize,
    },
    /// The buffer ends before the last sample.
    BufferTooSmall {
        /// Bytes required by the region.
        needed: usize,
        /// Bytes actually supplied.
        actual: usize,
    },
}

impl core::fmt::Display for RegionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "region has zero width or height"),
            Self::StrideTooSmall { stride, width } => {
                write!(f, "stride {stride} is smaller than width {width}")
            }
            Self::BufferTooSmall { needed, actual } => {
                write!(f, "buffer holds {actual} bytes, region needs {needed}")
            }
        }
    }
}

impl std::error::Error for RegionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_row_needs_only_width_bytes() {
        let r = Region::new(100, 60, 128);
        assert_eq!(r.required_len(), 59 * 128 + 100);
        assert_eq!(r.validate(59 * 128 + 100), Ok(()));
        assert_eq!(
            r.validate(59 * 128 + 99),
            Err(RegionError::BufferTooSmall {
                needed: 59 * 128 + 100,
                actual: 59 * 128 + 99
            })
        );
    }

    #[test]
    fn rejects_stride_below_width() {
        assert_eq!(
            Region::new(10, 2, 8).validate(100),
            Err(RegionError::StrideTooSmall { stride: 8, width: 10 })
        );
    }

    #[test]
    fn rejects_empty_regions() {
        assert_eq!(Region::packed(0, 10).validate(100), Err(RegionError::Empty));
        assert_eq!(Region::packed(10, 0).validate(100), Err(RegionError::Empty));
    }

    #[test]
    fn offset_skips_padding() {
        let r = Region::new(3, 2, 8);
        assert_eq!(r.offset(0, 1), 8);
        assert_eq!(r.offset(2, 1), 10);
    }
}
