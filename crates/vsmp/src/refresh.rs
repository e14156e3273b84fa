//! Frame refresh orchestrator
//!
//! One frame goes through a fixed sequence; the controller's documented
//! contract breaks if any two steps are swapped:
//!
//! ```text
//! wake ─► white point ─► dither ─► pack ─► load image area ─► display area ─► standby
//! ```
//!
//! The host-side half of that sequence (white point, dither, pack) is
//! [`FramePipeline`], shared with the dry-run display.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use eink_dither::{
    pack_in_place, packed_width, Dither, DitherStrategy, Palette, SampleOrder, TransportDepth,
    WhitePoint,
};
use platform::BusTransport;
use serde::{Deserialize, Serialize};

use crate::display::it8951::{
    AreaImageInfo, DisplayMode, Endian, Error, GeometryError, LoadImageInfo, PixelFormat,
    Rotation, Session,
};
use crate::frame::Frame;
use crate::hal::FrameDisplay;

/// Panel coordinates of a frame's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Column, a multiple of the packing group.
    pub x: u16,
    /// Row.
    pub y: u16,
}

/// Centre a `width`×`height` frame on the panel.
///
/// `x = floor((W − w) / 2g) · g` with `g = max(2, pixels per byte)`, which
/// keeps `x` on a packed-group boundary; for 4- and 8-bit transport this is
/// `((W − w) >> 2) << 1`. `y = (H − h) / 2`.
pub fn placement(
    panel_width: u16,
    panel_height: u16,
    width: usize,
    height: usize,
    depth: TransportDepth,
) -> Result<Placement, GeometryError> {
    let too_large = GeometryError::TooLarge {
        width,
        height,
        panel_width,
        panel_height,
    };
    let spare_x = usize::from(panel_width).checked_sub(width).ok_or(too_large)?;
    let spare_y = usize::from(panel_height).checked_sub(height).ok_or(too_large)?;

    let group = depth.pixels_per_byte().max(2);
    let x = spare_x
        .checked_div(group.saturating_mul(2))
        .unwrap_or(0)
        .saturating_mul(group);
    let y = spare_y / 2;
    Ok(Placement {
        // Both are at most the spare space, which is below the u16 panel size.
        x: u16::try_from(x).map_err(|_| too_large)?,
        y: u16::try_from(y).map_err(|_| too_large)?,
    })
}

/// Host-side conversion of an 8-bit frame to the controller's packed format.
#[derive(Debug, Clone)]
pub struct FramePipeline {
    /// Selected dither strategy.
    pub dither: Dither,
    /// Display palette.
    pub palette: Palette,
    /// Optional highlight stretch applied before dithering.
    pub white_point: Option<WhitePoint>,
    /// Wire bit depth.
    pub depth: TransportDepth,
    /// Sample order within a packed byte.
    pub order: SampleOrder,
}

/// Result of [`FramePipeline::process`]: `frame.data[..len]` holds the
/// packed stream, `width` columns wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedFrame {
    /// Packed byte count.
    pub len: usize,
    /// Columns that survived packing.
    pub width: usize,
}

impl FramePipeline {
    /// Check that `frame` fits and can be packed at this depth.
    pub fn check(&self, frame: &Frame) -> Result<(), GeometryError> {
        frame
            .region()
            .validate(frame.data.len())
            .map_err(GeometryError::Region)?;
        let group = self.depth.pixels_per_byte();
        if packed_width(frame.width, self.depth) == 0 {
            return Err(GeometryError::TooNarrow {
                width: frame.width,
                group,
            });
        }
        Ok(())
    }

    /// White point, dither and pack `frame` in place.
    ///
    /// The frame's samples are consumed: afterwards `data` starts with the
    /// packed stream and the rest is unspecified.
    pub fn process(&mut self, frame: &mut Frame) -> Result<PackedFrame, Error> {
        self.check(frame)?;
        let region = frame.region();
        if let Some(white) = self.white_point {
            white
                .apply(&mut frame.data, region)
                .map_err(GeometryError::Region)?;
        }
        self.dither
            .apply(&mut frame.data, region, &self.palette)
            .map_err(GeometryError::Region)?;
        let len = pack_in_place(&mut frame.data, region, self.depth, self.order)?;
        Ok(PackedFrame {
            len,
            width: packed_width(frame.width, self.depth),
        })
    }
}

/// Controller-side settings for each refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Endian flag in the load-image attribute word.
    pub endian: Endian,
    /// Load rotation.
    pub rotation: Rotation,
    /// Waveform for frame refreshes.
    pub mode: DisplayMode,
}

/// Drives one IT8951 session through the per-frame sequence.
pub struct FrameRefresher<B, RST, DELAY> {
    session: Session<B, RST, DELAY>,
    pipeline: FramePipeline,
    config: RefreshConfig,
    panel: (u16, u16),
}

impl<B, RST, DELAY> FrameRefresher<B, RST, DELAY>
where
    B: BusTransport,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Take over an initialised session.
    pub fn new(
        session: Session<B, RST, DELAY>,
        pipeline: FramePipeline,
        config: RefreshConfig,
    ) -> Result<Self, Error> {
        let panel = session.panel_size().ok_or(Error::NotInitialized)?;
        Ok(Self {
            session,
            pipeline,
            config,
            panel,
        })
    }

    /// Show one frame and return the controller to its suspend state.
    pub fn refresh(&mut self, frame: &mut Frame) -> Result<Placement, Error> {
        let (panel_width, panel_height) = self.panel;
        self.pipeline.check(frame)?;
        let at = placement(
            panel_width,
            panel_height,
            frame.width,
            frame.height,
            self.pipeline.depth,
        )?;

        self.session.wake()?;
        let packed = self.pipeline.process(frame)?;

        let too_large = GeometryError::TooLarge {
            width: frame.width,
            height: frame.height,
            panel_width,
            panel_height,
        };
        let area = AreaImageInfo {
            x: at.x,
            y: at.y,
            width: u16::try_from(packed.width).map_err(|_| too_large)?,
            height: u16::try_from(frame.height).map_err(|_| too_large)?,
            stride: frame.stride,
        };
        let load = LoadImageInfo {
            endian: self.config.endian,
            pixel_format: PixelFormat::from(self.pipeline.depth),
            rotation: self.config.rotation,
            image_buffer_address: self.session.image_buffer_address(),
        };
        let data = frame.data.get(..packed.len).ok_or(Error::Packing(
            eink_dither::PackingError::LengthMismatch {
                expected: packed.len,
                actual: frame.data.len(),
            },
        ))?;
        self.session.load_image_area(&load, &area, data)?;
        self.session
            .display_area(area.x, area.y, area.width, area.height, self.config.mode)?;
        self.session.standby()?;

        tracing::debug!(
            x = at.x,
            y = at.y,
            width = area.width,
            height = area.height,
            bytes = packed.len,
            pts = ?frame.pts,
            "frame refreshed"
        );
        Ok(at)
    }

    /// Wake, flash the panel white, suspend.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.session.wake()?;
        self.session.clear_panel()?;
        self.session.standby()
    }

    /// The host-side pipeline.
    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }

    /// The underlying session.
    pub fn session(&self) -> &Session<B, RST, DELAY> {
        &self.session
    }

    /// Give the session back.
    pub fn into_session(self) -> Session<B, RST, DELAY> {
        self.session
    }
}

impl<B, RST, DELAY> FrameDisplay for FrameRefresher<B, RST, DELAY>
where
    B: BusTransport,
    RST: OutputPin,
    DELAY: DelayNs,
{
    type Error = Error;

    fn panel_size(&self) -> (u16, u16) {
        self.panel
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        FrameRefresher::clear(self)
    }

    fn present(&mut self, frame: &mut Frame) -> Result<(), Self::Error> {
        self.refresh(frame).map(|_| ())
    }

    fn shutdown(&mut self) -> Result<(), Self::Error> {
        self.session.standby()
    }
}
