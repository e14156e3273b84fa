//! Dry-run display
//!
//! Runs the same white point, dither and pack steps as the hardware path,
//! then expands the packed stream back to 8-bit levels, composes it onto a
//! white panel-sized canvas and writes `frame-NNNNN.pgm` into a directory.
//! Useful for tuning dither settings without a panel attached.

use std::path::{Path, PathBuf};

use eink_dither::{unpack_levels, PackingError};
use image::{GrayImage, ImageFormat, Luma};

use crate::display::it8951::{Error as SessionError, GeometryError};
use crate::frame::Frame;
use crate::hal::FrameDisplay;
use crate::refresh::{placement, FramePipeline, Placement};

/// Panel stand-in that writes PGM files.
#[allow(clippy::module_name_repetitions)] // Named for its module; used as vsmp::DryRunDisplay
pub struct DryRunDisplay {
    dir: PathBuf,
    panel: (u16, u16),
    pipeline: FramePipeline,
    canvas: GrayImage,
    written: usize,
}

impl DryRunDisplay {
    /// Write frames for a `panel_width`×`panel_height` panel into `dir`,
    /// creating it if needed.
    pub fn new(
        dir: impl Into<PathBuf>,
        panel_width: u16,
        panel_height: u16,
        pipeline: FramePipeline,
    ) -> Result<Self, DryRunError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| DryRunError::Io {
            path: dir.clone(),
            source,
        })?;
        tracing::info!(dir = %dir.display(), panel_width, panel_height, "dry-run display");
        Ok(Self {
            dir,
            panel: (panel_width, panel_height),
            pipeline,
            canvas: white_canvas(panel_width, panel_height),
            written: 0,
        })
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> usize {
        self.written
    }

    /// The panel as it would currently look.
    pub fn canvas(&self) -> &GrayImage {
        &self.canvas
    }

    /// Process `frame` and write it, returning the file path.
    pub fn render(&mut self, frame: &mut Frame) -> Result<PathBuf, DryRunError> {
        let (panel_width, panel_height) = self.panel;
        self.pipeline.check(frame).map_err(SessionError::Geometry)?;
        let at = placement(
            panel_width,
            panel_height,
            frame.width,
            frame.height,
            self.pipeline.depth,
        )
        .map_err(SessionError::Geometry)?;

        let packed = self.pipeline.process(frame)?;
        let data = frame
            .data
            .get(..packed.len)
            .ok_or(PackingError::LengthMismatch {
                expected: packed.len,
                actual: frame.data.len(),
            })
            .map_err(SessionError::Packing)?;
        let levels = unpack_levels(
            data,
            packed.width,
            frame.height,
            self.pipeline.depth,
            self.pipeline.order,
        )
        .map_err(SessionError::Packing)?;

        self.blit(at, packed.width, &levels);

        let path = self.dir.join(format!("frame-{:05}.pgm", self.written));
        self.canvas
            .save_with_format(&path, ImageFormat::Pnm)
            .map_err(|source| DryRunError::Image {
                path: path.clone(),
                source,
            })?;
        self.written = self.written.saturating_add(1);
        tracing::debug!(path = %path.display(), x = at.x, y = at.y, "dry-run frame written");
        Ok(path)
    }

    fn blit(&mut self, at: Placement, width: usize, levels: &[u8]) {
        if width == 0 {
            return;
        }
        for (row, src) in levels.chunks_exact(width).enumerate() {
            let Ok(row) = u32::try_from(row) else {
                break;
            };
            let y = u32::from(at.y).saturating_add(row);
            for (col, &level) in src.iter().enumerate() {
                let Ok(col) = u32::try_from(col) else {
                    break;
                };
                let x = u32::from(at.x).saturating_add(col);
                if let Some(px) = self.canvas.get_pixel_mut_checked(x, y) {
                    *px = Luma([level]);
                }
            }
        }
    }
}

impl FrameDisplay for DryRunDisplay {
    type Error = DryRunError;

    fn panel_size(&self) -> (u16, u16) {
        self.panel
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        let (w, h) = self.panel;
        self.canvas = white_canvas(w, h);
        Ok(())
    }

    fn present(&mut self, frame: &mut Frame) -> Result<(), Self::Error> {
        self.render(frame).map(|_| ())
    }

    fn shutdown(&mut self) -> Result<(), Self::Error> {
        tracing::info!(frames = self.written, "dry-run finished");
        Ok(())
    }
}

fn white_canvas(width: u16, height: u16) -> GrayImage {
    GrayImage::from_pixel(u32::from(width), u32::from(height), Luma([0xFF]))
}

/// Dry-run output failed.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum DryRunError {
    /// The frame was rejected before processing.
    Frame(SessionError),
    /// Output directory could not be created.
    Io {
        /// Directory.
        path: PathBuf,
        /// Cause.
        source: std::io::Error,
    },
    /// The PGM could not be written.
    Image {
        /// File.
        path: PathBuf,
        /// Cause.
        source: image::ImageError,
    },
}

impl From<SessionError> for DryRunError {
    fn from(e: SessionError) -> Self {
        Self::Frame(e)
    }
}

impl From<GeometryError> for DryRunError {
    fn from(e: GeometryError) -> Self {
        Self::Frame(SessionError::Geometry(e))
    }
}

impl core::fmt::Display for DryRunError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "frame rejected: {e}"),
            Self::Io { path, source } => write!(f, "cannot create {}: {source}", path.display()),
            Self::Image { path, source } => write!(f, "cannot write {}: {source}", path.display()),
        }
    }
}

impl std::error::Error for DryRunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Frame(e) => Some(e),
            Self::Io { source, .. } => Some(source),
            Self::Image { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use eink_dither::{Dither, DitherKind, Palette, SampleOrder, TransportDepth};

    fn display(dir: &Path, depth: TransportDepth) -> DryRunDisplay {
        let pipeline = FramePipeline {
            dither: Dither::from_kind(DitherKind::Atkinson, None).unwrap(),
            palette: Palette::new(2).unwrap(),
            white_point: None,
            depth,
            order: SampleOrder::MsbFirst,
        };
        DryRunDisplay::new(dir.join("out"), 16, 8, pipeline).unwrap()
    }

    #[test]
    fn writes_numbered_pgm_with_frame_centred_on_white() {
        let tmp = tempfile::tempdir().unwrap();
        let mut d = display(tmp.path(), TransportDepth::Four);
        let mut frame = Frame::from_packed(4, 2, vec![0; 8]).unwrap();
        let path = d.render(&mut frame).unwrap();
        assert_eq!(path.file_name().unwrap(), "frame-00000.pgm");

        let img = image::open(&path).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (16, 8));
        // x = ((16 - 4) >> 2) << 1 = 6, y = (8 - 2) / 2 = 3
        assert_eq!(img.get_pixel(6, 3).0, [0]);
        assert_eq!(img.get_pixel(9, 4).0, [0]);
        assert_eq!(img.get_pixel(5, 3).0, [255]);
        assert_eq!(img.get_pixel(10, 3).0, [255]);
        assert_eq!(img.get_pixel(6, 5).0, [255]);

        let mut second = Frame::blank(4, 2, 1);
        let path = d.present(&mut second).map(|()| d.dir().join("frame-00001.pgm")).unwrap();
        assert!(path.exists());
        assert_eq!(d.frames_written(), 2);
    }

    #[test]
    fn output_levels_match_the_display_palette() {
        let tmp = tempfile::tempdir().unwrap();
        let mut d = display(tmp.path(), TransportDepth::Eight);
        let ramp: Vec<u8> = (0..16u8).map(|v| v * 17).collect();
        let mut frame = Frame::from_packed(16, 1, ramp).unwrap();
        d.render(&mut frame).unwrap();
        let palette = Palette::new(2).unwrap();
        assert!(d.canvas().pixels().all(|p| palette.contains(p.0[0])));
    }

    #[test]
    fn oversized_frame_is_rejected_and_nothing_written() {
        let tmp = tempfile::tempdir().unwrap();
        let mut d = display(tmp.path(), TransportDepth::Four);
        let mut frame = Frame::blank(17, 2, 1);
        assert!(matches!(
            d.render(&mut frame),
            Err(DryRunError::Frame(SessionError::Geometry(GeometryError::TooLarge { .. })))
        ));
        assert_eq!(std::fs::read_dir(d.dir()).unwrap().count(), 0);
    }

    #[test]
    fn clear_resets_canvas_to_white() {
        let tmp = tempfile::tempdir().unwrap();
        let mut d = display(tmp.path(), TransportDepth::Two);
        let mut frame = Frame::from_packed(8, 2, vec![0; 16]).unwrap();
        d.render(&mut frame).unwrap();
        assert!(d.canvas().pixels().any(|p| p.0[0] == 0));
        d.clear().unwrap();
        assert!(d.canvas().pixels().all(|p| p.0[0] == 255));
    }
}
