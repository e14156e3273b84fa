//! Raspberry Pi wiring
//!
//! Opens the spidev bus with hardware chip select disabled and claims the
//! reset, host-ready and chip-select lines from the GPIO character device.

use anyhow::{Context, Result};
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, SpidevBus};
use platform::{BitOrder, SpiMode};

use crate::config::Config;
use crate::display::it8951::{Session, SpiTransport};

/// Transport over the Pi's spidev bus and cdev pins.
pub type PiTransport = SpiTransport<SpidevBus, CdevPin, CdevPin, Delay>;

/// Session on a Raspberry Pi.
pub type PiSession = Session<PiTransport, CdevPin, Delay>;

fn mode_flags(config: &Config) -> SpiModeFlags {
    let mode = match config.spi.mode {
        SpiMode::Mode0 => SpiModeFlags::SPI_MODE_0,
        SpiMode::Mode1 => SpiModeFlags::SPI_MODE_1,
        SpiMode::Mode2 => SpiModeFlags::SPI_MODE_2,
        SpiMode::Mode3 => SpiModeFlags::SPI_MODE_3,
    };
    let order = match config.spi.bit_order {
        BitOrder::MsbFirst => SpiModeFlags::empty(),
        BitOrder::LsbFirst => SpiModeFlags::SPI_LSB_FIRST,
    };
    // CS is toggled by the transport around each preamble and payload.
    mode | order | SpiModeFlags::SPI_NO_CS
}

fn output(chip: &mut Chip, line: u32, initial: u8, consumer: &str) -> Result<CdevPin> {
    let handle = chip
        .get_line(line)
        .with_context(|| format!("getting GPIO line {line}"))?
        .request(LineRequestFlags::OUTPUT, initial, consumer)
        .with_context(|| format!("requesting GPIO line {line} as {consumer}"))?;
    CdevPin::new(handle).with_context(|| format!("creating {consumer} pin"))
}

/// Open the bus and pins described by `config` and build an uninitialised
/// session.
pub fn open_session(config: &Config) -> Result<PiSession> {
    let mut spi = SpidevBus::open(&config.spi_device)
        .with_context(|| format!("opening {}", config.spi_device.display()))?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(config.spi.frequency)
        .mode(mode_flags(config))
        .build();
    spi.configure(&options).context("configuring SPI")?;

    let mut chip = Chip::new(&config.gpio_chip)
        .with_context(|| format!("opening {}", config.gpio_chip.display()))?;
    let cs = output(&mut chip, config.pins.cs, 1, "vsmp-cs")?;
    let rst = output(&mut chip, config.pins.rst, 1, "vsmp-rst")?;
    let hrdy_handle = chip
        .get_line(config.pins.hrdy)
        .context("getting HRDY line")?
        .request(LineRequestFlags::INPUT, 0, "vsmp-hrdy")
        .context("requesting HRDY line")?;
    let hrdy = CdevPin::new(hrdy_handle).context("creating HRDY pin")?;

    tracing::info!(
        spi = %config.spi_device.display(),
        hz = config.spi.frequency,
        cs = config.pins.cs,
        rst = config.pins.rst,
        hrdy = config.pins.hrdy,
        "opened IT8951 bus"
    );

    let transport = SpiTransport::new(spi, cs, hrdy, Delay, config.host_ready)
        .with_max_chunk(config.spi.max_transfer);
    Ok(Session::new(transport, rst, Delay, config.session))
}
