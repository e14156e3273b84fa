//! Grayscale frames and where they come from

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eink_dither::{Region, RegionError};
use image::imageops::FilterType;

/// One 8-bit luminance frame with explicit row stride.
///
/// Row `y` starts at `data[y * stride]`; bytes past `width` in each row are
/// padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sample bytes, at least `(height - 1) * stride + width` long.
    pub data: Vec<u8>,
    /// Bytes between row starts.
    pub stride: usize,
    /// Visible samples per row.
    pub width: usize,
    /// Rows.
    pub height: usize,
    /// Presentation timestamp, if the source has one.
    pub pts: Option<Duration>,
}

impl Frame {
    /// A white frame with `stride` rounded up to a multiple of `align`.
    pub fn blank(width: usize, height: usize, align: usize) -> Self {
        let stride = aligned_stride(width, align);
        Self {
            data: vec![0xFF; stride.saturating_mul(height)],
            stride,
            width,
            height,
            pts: None,
        }
    }

    /// Wrap tightly packed samples (`stride == width`).
    pub fn from_packed(width: usize, height: usize, data: Vec<u8>) -> Result<Self, RegionError> {
        let frame = Self {
            data,
            stride: width,
            width,
            height,
            pts: None,
        };
        frame.region().validate(frame.data.len())?;
        Ok(frame)
    }

    /// Geometry as a dither/pack region.
    pub fn region(&self) -> Region {
        Region::new(self.width, self.height, self.stride)
    }

    /// Visible samples of row `y`.
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        let start = y.checked_mul(self.stride)?;
        self.data.get(start..start.checked_add(self.width)?)
    }
}

/// `width` rounded up to a multiple of `align` (`0` and `1` mean no padding).
pub fn aligned_stride(width: usize, align: usize) -> usize {
    if align <= 1 {
        return width;
    }
    width.div_ceil(align).saturating_mul(align)
}

/// Supplier of frames, in presentation order.
pub trait FrameSource {
    /// Error produced while fetching a frame.
    type Error;

    /// The next frame, `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error>;
}

/// Still images from disk, each converted to 8-bit grayscale.
#[derive(Debug, Clone)]
pub struct ImageFrameSource {
    paths: VecDeque<PathBuf>,
    stride_align: usize,
    fit: Option<(u32, u32)>,
}

impl ImageFrameSource {
    /// Frames from `paths`, in order.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            stride_align: 1,
            fit: None,
        }
    }

    /// Pad each row to a multiple of `align` bytes.
    pub fn with_stride_alignment(mut self, align: usize) -> Self {
        self.stride_align = align;
        self
    }

    /// Downscale images larger than `width`×`height`, keeping aspect ratio.
    pub fn fit_within(mut self, width: u32, height: u32) -> Self {
        self.fit = Some((width, height));
        self
    }

    /// Images not yet returned.
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }

    fn load(&self, path: &Path) -> Result<Frame, FrameError> {
        let decoded = image::open(path).map_err(|source| FrameError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = match self.fit {
            Some((w, h)) if decoded.width() > w || decoded.height() > h => {
                tracing::debug!(
                    path = %path.display(),
                    from_w = decoded.width(),
                    from_h = decoded.height(),
                    "downscaling to fit panel"
                );
                decoded.resize(w, h, FilterType::Triangle)
            }
            _ => decoded,
        };
        let gray = decoded.to_luma8();
        let width = usize::try_from(gray.width()).map_err(|_| FrameError::TooLarge)?;
        let height = usize::try_from(gray.height()).map_err(|_| FrameError::TooLarge)?;
        if width == 0 || height == 0 {
            return Err(FrameError::Empty(path.to_path_buf()));
        }

        let mut frame = Frame::blank(width, height, self.stride_align);
        for (dst, src) in frame
            .data
            .chunks_mut(frame.stride)
            .zip(gray.as_raw().chunks_exact(width))
        {
            if let Some(dst) = dst.get_mut(..width) {
                dst.copy_from_slice(src);
            }
        }
        Ok(frame)
    }
}

impl FrameSource for ImageFrameSource {
    type Error = FrameError;

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        let frame = self.load(&path)?;
        tracing::info!(path = %path.display(), width = frame.width, height = frame.height, "loaded image");
        Ok(Some(frame))
    }
}

/// A frame could not be produced.
#[derive(Debug)]
pub enum FrameError {
    /// Decoding failed.
    Image {
        /// Offending file.
        path: PathBuf,
        /// Decoder error.
        source: image::ImageError,
    },
    /// The image has no pixels.
    Empty(PathBuf),
    /// Dimensions do not fit in memory.
    TooLarge,
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Image { path, source } => write!(f, "cannot load {}: {source}", path.display()),
            Self::Empty(path) => write!(f, "{} has no pixels", path.display()),
            Self::TooLarge => write!(f, "image dimensions exceed addressable memory"),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image { source, .. } => Some(source),
            Self::Empty(_) | Self::TooLarge => None,
        }
    }
}
