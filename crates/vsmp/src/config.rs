//! Player configuration
//!
//! Loaded from a JSON file; every field has a default, so `{}` is a valid
//! configuration. The defaults describe a Waveshare IT8951 HAT on a
//! Raspberry Pi: 4-bit palette over 4-bit transport, Floyd–Steinberg,
//! VCOM −1.50 V, GC16 refreshes, sleep between frames.
//!
//! ```json
//! {
//!   "display_bits": 4,
//!   "dither": "blue-noise",
//!   "blue_noise_path": "/usr/share/vsmp/bluenoise.bin",
//!   "white_point": 150,
//!   "session": { "vcom_mv": 1460 },
//!   "refresh": { "mode": "gl16" }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use eink_dither::{
    AssetError, BlueNoiseTexture, Dither, DitherError, DitherKind, Palette, PaletteError,
    SampleOrder, TransportDepth, WhitePoint,
};
use platform::{ReadyPolicy, SpiConfig};
use serde::{Deserialize, Serialize};

use crate::display::it8951::SessionConfig;
use crate::refresh::{FramePipeline, RefreshConfig};

/// Default row alignment for decoded frames, in bytes.
pub const DEFAULT_STRIDE_ALIGNMENT: usize = 32;

/// BCM GPIO line numbers of the control pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    /// Controller reset, active low.
    pub rst: u32,
    /// Host-ready input.
    pub hrdy: u32,
    /// Chip select, driven manually.
    pub cs: u32,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            rst: 17,
            hrdy: 24,
            cs: 8,
        }
    }
}

/// Everything the player needs to drive one panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Palette depth in bits, 1..=8.
    pub display_bits: u8,
    /// Wire depth; must carry at least `display_bits`.
    pub transport_depth: TransportDepth,
    /// Pixel order inside a packed byte.
    pub sample_order: SampleOrder,
    /// Dither strategy.
    pub dither: DitherKind,
    /// Blue-noise texture, required when `dither` is `blue-noise`.
    pub blue_noise_path: Option<PathBuf>,
    /// Highlight stretch applied before dithering.
    pub white_point: Option<WhitePoint>,
    /// Load attributes and waveform for each frame.
    pub refresh: RefreshConfig,
    /// Bring-up and power settings.
    pub session: SessionConfig,
    /// Host-ready wait bound.
    pub host_ready: ReadyPolicy,
    /// SPI link parameters.
    pub spi: SpiConfig,
    /// spidev node.
    pub spi_device: PathBuf,
    /// GPIO character device.
    pub gpio_chip: PathBuf,
    /// Control pin lines.
    pub pins: PinConfig,
    /// Row alignment for decoded frames.
    pub stride_alignment: usize,
    /// Panel size assumed by `--dry-run`, which has no controller to ask.
    pub dry_run_panel: (u16, u16),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_bits: 4,
            transport_depth: TransportDepth::Four,
            sample_order: SampleOrder::MsbFirst,
            dither: DitherKind::FloydSteinberg,
            blue_noise_path: None,
            white_point: None,
            refresh: RefreshConfig::default(),
            session: SessionConfig::default(),
            host_ready: ReadyPolicy::UNBOUNDED,
            spi: SpiConfig::IT8951,
            spi_device: PathBuf::from("/dev/spidev0.0"),
            gpio_chip: PathBuf::from("/dev/gpiochip0"),
            pins: PinConfig::default(),
            stride_alignment: DEFAULT_STRIDE_ALIGNMENT,
            dry_run_panel: (1872, 1404),
        }
    }
}

impl Config {
    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Reject combinations that cannot drive a panel.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Palette::new(self.display_bits)?;
        if self.transport_depth.bits() < self.display_bits {
            return Err(ConfigError::TransportTooShallow {
                display_bits: self.display_bits,
                transport_bits: self.transport_depth.bits(),
            });
        }
        if self.dither.needs_texture() && self.blue_noise_path.is_none() {
            return Err(ConfigError::MissingBlueNoisePath);
        }
        Ok(())
    }

    /// Build the host-side pipeline, loading the blue-noise texture if the
    /// selected strategy needs one.
    pub fn pipeline(&self) -> Result<FramePipeline, ConfigError> {
        self.validate()?;
        let texture = match (&self.blue_noise_path, self.dither.needs_texture()) {
            (Some(path), true) => Some(Arc::new(BlueNoiseTexture::load(path)?)),
            _ => None,
        };
        Ok(FramePipeline {
            dither: Dither::from_kind(self.dither, texture)?,
            palette: Palette::new(self.display_bits)?,
            white_point: self.white_point,
            depth: self.transport_depth,
            order: self.sample_order,
        })
    }
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum ConfigError {
    /// File could not be read.
    Io {
        /// Config path.
        path: PathBuf,
        /// Cause.
        source: std::io::Error,
    },
    /// File is not valid JSON for [`Config`].
    Parse {
        /// Config path.
        path: PathBuf,
        /// Cause.
        source: serde_json::Error,
    },
    /// Palette depth outside 1..=8.
    Palette(PaletteError),
    /// Transport cannot carry every palette level.
    TransportTooShallow {
        /// Palette depth.
        display_bits: u8,
        /// Wire depth.
        transport_bits: u8,
    },
    /// Blue noise selected without a texture path.
    MissingBlueNoisePath,
    /// Texture could not be loaded.
    Asset(AssetError),
    /// Strategy could not be built.
    Dither(DitherError),
}

impl From<PaletteError> for ConfigError {
    fn from(e: PaletteError) -> Self {
        Self::Palette(e)
    }
}

impl From<AssetError> for ConfigError {
    fn from(e: AssetError) -> Self {
        Self::Asset(e)
    }
}

impl From<DitherError> for ConfigError {
    fn from(e: DitherError) -> Self {
        Self::Dither(e)
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Parse { path, source } => write!(f, "invalid config {}: {source}", path.display()),
            Self::Palette(e) => write!(f, "{e}"),
            Self::TransportTooShallow {
                display_bits,
                transport_bits,
            } => write!(
                f,
                "{transport_bits}-bit transport cannot carry a {display_bits}-bit palette"
            ),
            Self::MissingBlueNoisePath => {
                write!(f, "blue-noise dithering needs blue_noise_path")
            }
            Self::Asset(e) => write!(f, "{e}"),
            Self::Dither(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Palette(e) => Some(e),
            Self::Asset(e) => Some(e),
            Self::Dither(e) => Some(e),
            Self::TransportTooShallow { .. } | Self::MissingBlueNoisePath => None,
        }
    }
}
