//! Wire-level data types: device info, image-load attributes, display modes

use eink_dither::{PackingError, TransportDepth};
use serde::{Deserialize, Serialize};

/// Words returned by the device-info query.
pub const DEVICE_INFO_WORDS: usize = 20;

/// Panel description reported by the controller at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Panel width in pixels.
    pub panel_width: u16,
    /// Panel height in pixels.
    pub panel_height: u16,
    /// Base address of the controller's image buffer.
    pub image_buffer_address: u32,
    /// Firmware version string.
    pub firmware_version: String,
    /// Waveform LUT version string.
    pub lut_version: String,
}

impl DeviceInfo {
    /// Decode the raw device-info burst.
    ///
    /// Layout: width, height, address low, address high, 8 words firmware
    /// version, 8 words LUT version.
    pub fn from_words(words: &[u16; DEVICE_INFO_WORDS]) -> Self {
        let [width, height, addr_lo, addr_hi, rest @ ..] = words;
        let (firmware, lut) = rest.split_at(8);
        Self {
            panel_width: *width,
            panel_height: *height,
            image_buffer_address: join_halves(*addr_hi, *addr_lo),
            firmware_version: decode_version(firmware),
            lut_version: decode_version(lut),
        }
    }

    /// `false` for the all-zero or all-ones geometry a missing or unpowered
    /// controller reads back as.
    pub fn is_valid(&self) -> bool {
        let bad = |v: u16| v == 0 || v == u16::MAX;
        !bad(self.panel_width) && !bad(self.panel_height)
    }
}

fn join_halves(high: u16, low: u16) -> u32 {
    let [h1, h0] = high.to_be_bytes();
    let [l1, l0] = low.to_be_bytes();
    u32::from_be_bytes([h1, h0, l1, l0])
}

/// Words are sent high byte first; strings stop at the first NUL.
fn decode_version(words: &[u16]) -> String {
    let bytes: Vec<u8> = words
        .iter()
        .flat_map(|w| w.to_be_bytes())
        .take_while(|&b| b != 0)
        .collect();
    String::from_utf8_lossy(&bytes).trim().to_owned()
}

/// Byte order of the host image data.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    /// Little endian.
    Little = 0,
    /// Big endian.
    #[default]
    Big = 1,
}

/// Pixel format of a host image load.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 2 bits per pixel.
    Bpp2 = 0,
    /// 3 bits per pixel (sent nibble-packed).
    Bpp3 = 1,
    /// 4 bits per pixel.
    Bpp4 = 2,
    /// 8 bits per pixel.
    Bpp8 = 3,
}

impl PixelFormat {
    /// Wire code.
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Transport depth the packed data for this format uses.
    pub fn transport_depth(self) -> Result<TransportDepth, PackingError> {
        match self {
            Self::Bpp2 => Ok(TransportDepth::Two),
            Self::Bpp4 => Ok(TransportDepth::Four),
            Self::Bpp8 => Ok(TransportDepth::Eight),
            Self::Bpp3 => Err(PackingError::UnsupportedDepth(3)),
        }
    }
}

impl From<TransportDepth> for PixelFormat {
    fn from(depth: TransportDepth) -> Self {
        match depth {
            TransportDepth::Two => Self::Bpp2,
            TransportDepth::Four => Self::Bpp4,
            TransportDepth::Eight => Self::Bpp8,
        }
    }
}

/// Rotation applied by the controller while loading.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    /// No rotation.
    #[default]
    #[serde(rename = "0")]
    Rotate0 = 0,
    /// 90° clockwise.
    #[serde(rename = "90")]
    Rotate90 = 1,
    /// 180°.
    #[serde(rename = "180")]
    Rotate180 = 2,
    /// 270° clockwise.
    #[serde(rename = "270")]
    Rotate270 = 3,
}

/// Waveform used for a display-area refresh.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Full flashing clear to white.
    Init = 0,
    /// Direct update, black/white only, fast.
    Du = 1,
    /// 16-level grayscale, flashing.
    #[default]
    Gc16 = 2,
    /// 16-level grayscale, non-flashing.
    Gl16 = 3,
    /// GL16 with ghost reduction.
    Glr16 = 4,
    /// GL16 with dithered ghost reduction.
    Gld16 = 5,
    /// Two-level animation mode.
    A2 = 6,
    /// Four-level direct update.
    Du4 = 7,
}

impl DisplayMode {
    /// Wire code.
    pub const fn code(self) -> u16 {
        self as u16
    }
}

/// Attributes of one host image load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadImageInfo {
    /// Host byte order.
    pub endian: Endian,
    /// Packed pixel format.
    pub pixel_format: PixelFormat,
    /// Load rotation.
    pub rotation: Rotation,
    /// Target image-buffer base address.
    pub image_buffer_address: u32,
}

impl LoadImageInfo {
    /// `(endian << 8) | (pixel_format << 4) | rotation`.
    // Every field is at most 3, so the shifted values stay below 0x0400.
    #[allow(clippy::arithmetic_side_effects)]
    pub const fn attribute_word(&self) -> u16 {
        ((self.endian as u16) << 8) | (self.pixel_format.code() << 4) | self.rotation as u16
    }
}

/// Panel rectangle targeted by an image load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaImageInfo {
    /// Left edge in panel pixels.
    pub x: u16,
    /// Top edge in panel pixels.
    pub y: u16,
    /// Width in panel pixels.
    pub width: u16,
    /// Height in panel pixels.
    pub height: u16,
    /// Bytes per scanline in the host source buffer.
    pub stride: usize,
}
