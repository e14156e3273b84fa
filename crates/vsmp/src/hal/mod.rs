//! Hardware Abstraction Layer for frame output
//!
//! This module provides a unified interface for the physical IT8951 panel
//! and the dry-run file sink. The player loop is written against
//! [`FrameDisplay`] and never learns which one it drives.

use crate::frame::Frame;

/// Frame display trait - unified interface for hardware and dry-run output
pub trait FrameDisplay {
    /// Error type for display operations
    type Error: core::fmt::Debug;

    /// Panel `(width, height)` in pixels
    fn panel_size(&self) -> (u16, u16);

    /// Flash the whole panel to white
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Dither, pack and show one frame centred on the panel
    ///
    /// The frame's sample buffer is consumed as scratch space.
    fn present(&mut self, frame: &mut Frame) -> Result<(), Self::Error>;

    /// Put the output into its low-power state
    fn shutdown(&mut self) -> Result<(), Self::Error>;
}
