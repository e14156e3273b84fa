//! Peripheral configuration
//!
//! Bus-agnostic description of the SPI link used by the host transport.
//! The concrete bus (spidev, an MCU peripheral, a mock) is configured from
//! this by whichever crate owns it.

/// SPI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpiConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    /// SPI mode (CPOL, CPHA)
    pub mode: SpiMode,
    /// Bit order
    pub bit_order: BitOrder,
    /// Largest single transfer the bus driver accepts, in bytes.
    ///
    /// Linux spidev rejects transfers above its `bufsiz` module parameter
    /// (4096 by default), so long bursts are split at this size.
    pub max_transfer: usize,
}

impl SpiConfig {
    /// IT8951 host interface: mode 0, MSB first. The controller tolerates up
    /// to 24 MHz; 12 MHz is reliable on jumper-wired HATs.
    pub const IT8951: Self = Self {
        frequency: 12_000_000,
        mode: SpiMode::Mode0,
        bit_order: BitOrder::MsbFirst,
        max_transfer: 4096,
    };
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self::IT8951
    }
}

/// SPI modes (CPOL, CPHA)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpiMode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

/// Bit order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BitOrder {
    /// Most significant bit first
    MsbFirst,
    /// Least significant bit first
    LsbFirst,
}
