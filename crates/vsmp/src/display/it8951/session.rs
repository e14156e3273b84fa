//! IT8951 device session
//!
//! Owns everything controller-wide: the command encoder, the reset line,
//! the panel geometry and image-buffer address learnt at start-up, and the
//! power state.
//!
//! ```text
//!                  initialize()
//! Uninitialized ──────────────► Running ◄──── wake() ────┐
//!                                  │                     │
//!                                  └─ suspend(mode) ──► Standby / Sleep
//! ```
//!
//! The session also remembers whether the display engine is known to be
//! idle. Polling `LUTAFSR` to zero marks it idle; `SYS_RUN` and every
//! display-area command mark it busy. `wait_engine_ready` skips the poll
//! while the engine is known idle.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use eink_dither::{PackingError, RegionError};
use platform::{poll_until, BusError, BusTransport, PollError, ReadyPolicy};
use serde::{Deserialize, Serialize};

use super::command::Register;
use super::info::{AreaImageInfo, DeviceInfo, DisplayMode, LoadImageInfo};
use super::protocol::{Controller, WriteError};

/// Default VCOM magnitude in millivolts (-1.50 V).
pub const DEFAULT_VCOM_MV: u16 = 1500;

/// Default reset pulse width.
pub const DEFAULT_RESET_PULSE_MS: u32 = 100;

/// Power state of the controller as last commanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// `initialize` has not completed.
    Uninitialized,
    /// Clocks running, ready for loads and refreshes.
    Running,
    /// After `STANDBY`.
    Standby,
    /// After `SLEEP`.
    Sleep,
}

/// How deeply to suspend between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuspendMode {
    /// `STANDBY`: faster wake-up.
    Standby,
    /// `SLEEP`: lowest power.
    #[default]
    Sleep,
}

/// Session parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Target VCOM magnitude in millivolts, from the panel's label.
    pub vcom_mv: u16,
    /// Reset pulse width in milliseconds.
    pub reset_pulse_ms: u32,
    /// Bound on display-engine waits. Unbounded by default.
    pub engine_ready: ReadyPolicy,
    /// Suspend depth used by [`Session::standby`].
    pub suspend: SuspendMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            vcom_mv: DEFAULT_VCOM_MV,
            reset_pulse_ms: DEFAULT_RESET_PULSE_MS,
            engine_ready: ReadyPolicy::UNBOUNDED,
            suspend: SuspendMode::Sleep,
        }
    }
}

/// Outcome of VCOM calibration during [`Session::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcomCalibration {
    /// The controller already held the target value.
    Unchanged,
    /// A different value was read back and overwritten.
    Corrected {
        /// Value found on the controller.
        previous: u16,
        /// Value written.
        target: u16,
    },
}

/// Which ready condition never resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// The HRDY line.
    HostReady,
    /// The LUT engine busy register.
    DisplayEngine,
}

/// Session bring-up failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// The reset line could not be driven.
    Reset,
    /// The transport failed during bring-up.
    Bus(BusError),
    /// The controller reported an impossible panel geometry.
    InvalidDeviceInfo {
        /// Reported width.
        width: u16,
        /// Reported height.
        height: u16,
    },
}

/// Frame geometry cannot be shown on this panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// The frame is larger than the panel.
    TooLarge {
        /// Frame width.
        width: usize,
        /// Frame height.
        height: usize,
        /// Panel width.
        panel_width: u16,
        /// Panel height.
        panel_height: u16,
    },
    /// Narrower than one packed group, nothing would be sent.
    TooNarrow {
        /// Frame width.
        width: usize,
        /// Pixels per packed byte.
        group: usize,
    },
    /// The frame buffer does not hold the region it claims.
    Region(RegionError),
}

/// Session-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Bring-up failed.
    Init(InitError),
    /// A ready-wait exceeded its bound.
    BusTimeout(Wait),
    /// Any other transport fault.
    Bus(BusError),
    /// Packing precondition violated; nothing was sent.
    Packing(PackingError),
    /// Invalid frame geometry; nothing was sent.
    Geometry(GeometryError),
    /// Operation requires [`Session::initialize`] first.
    NotInitialized,
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        match e {
            BusError::Timeout => Self::BusTimeout(Wait::HostReady),
            other => Self::Bus(other),
        }
    }
}

impl From<WriteError> for Error {
    fn from(e: WriteError) -> Self {
        match e {
            WriteError::Packing(p) => Self::Packing(p),
            WriteError::Bus(b) => b.into(),
        }
    }
}

impl From<PackingError> for Error {
    fn from(e: PackingError) -> Self {
        Self::Packing(e)
    }
}

impl From<GeometryError> for Error {
    fn from(e: GeometryError) -> Self {
        Self::Geometry(e)
    }
}

impl core::fmt::Display for InitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Reset => write!(f, "could not drive the reset line"),
            Self::Bus(e) => write!(f, "bus failure during bring-up: {e}"),
            Self::InvalidDeviceInfo { width, height } => {
                write!(f, "controller reported invalid panel geometry {width}x{height}")
            }
        }
    }
}

impl core::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooLarge {
                width,
                height,
                panel_width,
                panel_height,
            } => write!(
                f,
                "frame {width}x{height} does not fit panel {panel_width}x{panel_height}"
            ),
            Self::TooNarrow { width, group } => {
                write!(f, "frame width {width} is below one packed group of {group} pixels")
            }
            Self::Region(e) => write!(f, "invalid frame buffer: {e}"),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Init(e) => write!(f, "initialisation failed: {e}"),
            Self::BusTimeout(Wait::HostReady) => write!(f, "timed out waiting for host-ready"),
            Self::BusTimeout(Wait::DisplayEngine) => {
                write!(f, "timed out waiting for the display engine")
            }
            Self::Bus(e) => write!(f, "bus error: {e}"),
            Self::Packing(e) => write!(f, "packing error: {e}"),
            Self::Geometry(e) => write!(f, "geometry error: {e}"),
            Self::NotInitialized => write!(f, "session not initialised"),
        }
    }
}

impl std::error::Error for InitError {}
impl std::error::Error for GeometryError {}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Init(e) => Some(e),
            Self::Bus(e) => Some(e),
            Self::Packing(e) => Some(e),
            Self::Geometry(e) => Some(e),
            Self::BusTimeout(_) | Self::NotInitialized => None,
        }
    }
}

/// Controller session.
///
/// Generic over:
/// - `B`: the [`BusTransport`] carrying commands.
/// - `RST`: reset [`OutputPin`], active LOW.
/// - `DELAY`: [`DelayNs`] for the reset pulse and engine polls.
pub struct Session<B, RST, DELAY> {
    controller: Controller<B>,
    rst: RST,
    delay: DELAY,
    config: SessionConfig,
    info: Option<DeviceInfo>,
    image_buffer_address: u32,
    state: PowerState,
    engine_idle: bool,
}

impl<B, RST, DELAY> Session<B, RST, DELAY>
where
    B: BusTransport,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Create an uninitialised session.
    pub fn new(bus: B, rst: RST, delay: DELAY, config: SessionConfig) -> Self {
        Self {
            controller: Controller::new(bus),
            rst,
            delay,
            config,
            info: None,
            image_buffer_address: 0,
            state: PowerState::Uninitialized,
            engine_idle: false,
        }
    }

    /// Reset the controller, read its device info, enable packed mode and
    /// calibrate VCOM.
    pub fn initialize(&mut self) -> Result<VcomCalibration, Error> {
        self.rst.set_low().map_err(|_| Error::Init(InitError::Reset))?;
        self.delay.delay_ms(self.config.reset_pulse_ms);
        self.rst.set_high().map_err(|_| Error::Init(InitError::Reset))?;

        let info = self.controller.query_device_info().map_err(init_error)?;
        if !info.is_valid() {
            return Err(Error::Init(InitError::InvalidDeviceInfo {
                width: info.panel_width,
                height: info.panel_height,
            }));
        }
        tracing::info!(
            width = info.panel_width,
            height = info.panel_height,
            address = info.image_buffer_address,
            firmware = %info.firmware_version,
            lut = %info.lut_version,
            "IT8951 device info"
        );

        self.image_buffer_address = info.image_buffer_address;
        self.controller
            .set_image_buffer_base_address(info.image_buffer_address)
            .map_err(init_error)?;
        self.controller
            .write_register(Register::I80Cpcr.addr(), 1)
            .map_err(init_error)?;

        let calibration = self.calibrate_vcom().map_err(init_error)?;

        self.info = Some(info);
        self.state = PowerState::Running;
        self.engine_idle = false;
        Ok(calibration)
    }

    fn calibrate_vcom(&mut self) -> Result<VcomCalibration, BusError> {
        let target = self.config.vcom_mv;
        let current = self.controller.vcom()?;
        if current == target {
            tracing::info!(vcom_mv = current, "VCOM already calibrated");
            return Ok(VcomCalibration::Unchanged);
        }
        tracing::warn!(previous = current, target, "VCOM mismatch, rewriting");
        self.controller.set_vcom(target)?;
        Ok(VcomCalibration::Corrected {
            previous: current,
            target,
        })
    }

    fn require_init(&self) -> Result<&DeviceInfo, Error> {
        self.info.as_ref().ok_or(Error::NotInitialized)
    }

    /// Run the system clock and wait for the engine to settle.
    pub fn wake(&mut self) -> Result<(), Error> {
        self.require_init()?;
        self.controller.sys_run()?;
        self.engine_idle = false;
        self.state = PowerState::Running;
        self.wait_engine_ready()
    }

    /// Wait for the engine, then suspend with the configured mode.
    pub fn standby(&mut self) -> Result<(), Error> {
        self.suspend(self.config.suspend)
    }

    /// Wait for the engine, then issue `STANDBY` or `SLEEP`.
    pub fn suspend(&mut self, mode: SuspendMode) -> Result<(), Error> {
        self.require_init()?;
        self.wait_engine_ready()?;
        match mode {
            SuspendMode::Standby => {
                self.controller.standby()?;
                self.state = PowerState::Standby;
            }
            SuspendMode::Sleep => {
                self.controller.sleep()?;
                self.state = PowerState::Sleep;
            }
        }
        tracing::debug!(state = ?self.state, "controller suspended");
        Ok(())
    }

    /// Block until `LUTAFSR` reads zero, bounded by the session's policy.
    pub fn wait_engine_ready(&mut self) -> Result<(), Error> {
        self.require_init()?;
        if self.engine_idle {
            return Ok(());
        }
        let Self {
            controller,
            delay,
            config,
            ..
        } = self;
        let polls = poll_until(&config.engine_ready, delay, || {
            controller
                .read_register(Register::Lutafsr.addr())
                .map(|busy| busy == 0)
        })
        .map_err(|e| match e {
            PollError::Probe(bus) => Error::from(bus),
            PollError::Timeout(t) => {
                tracing::warn!(polls = t.polls, "display engine never went idle");
                Error::BusTimeout(Wait::DisplayEngine)
            }
        })?;
        tracing::trace!(polls, "display engine idle");
        self.engine_idle = true;
        Ok(())
    }

    /// Point subsequent image loads at `addr`.
    pub fn set_image_buffer_base_address(&mut self, addr: u32) -> Result<(), Error> {
        self.require_init()?;
        self.controller.set_image_buffer_base_address(addr)?;
        self.image_buffer_address = addr;
        Ok(())
    }

    /// Flash the whole panel to white with the `INIT` waveform.
    pub fn clear_panel(&mut self) -> Result<(), Error> {
        let (width, height) = {
            let info = self.require_init()?;
            (info.panel_width, info.panel_height)
        };
        self.wait_engine_ready()?;
        self.display_area(0, 0, width, height, DisplayMode::Init)
    }

    /// Load packed pixels into `area`. See [`Controller::host_area_packed_write`].
    pub fn load_image_area(
        &mut self,
        load: &LoadImageInfo,
        area: &AreaImageInfo,
        packed: &[u8],
    ) -> Result<(), Error> {
        self.require_init()?;
        self.controller.host_area_packed_write(load, area, packed)?;
        self.image_buffer_address = load.image_buffer_address;
        Ok(())
    }

    /// Refresh a panel rectangle.
    pub fn display_area(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        mode: DisplayMode,
    ) -> Result<(), Error> {
        self.require_init()?;
        self.engine_idle = false;
        self.controller.display_area(x, y, width, height, mode)?;
        Ok(())
    }

    /// Refresh a panel rectangle from an explicit image buffer.
    pub fn display_area_buffered(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        mode: DisplayMode,
        buffer_address: u32,
    ) -> Result<(), Error> {
        self.require_init()?;
        self.engine_idle = false;
        self.controller
            .display_area_buffered(x, y, width, height, mode, buffer_address)?;
        Ok(())
    }

    /// Device info, once initialised.
    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    /// Panel `(width, height)`, once initialised.
    pub fn panel_size(&self) -> Option<(u16, u16)> {
        self.info.as_ref().map(|i| (i.panel_width, i.panel_height))
    }

    /// Current image-buffer base address.
    pub fn image_buffer_address(&self) -> u32 {
        self.image_buffer_address
    }

    /// Last commanded power state.
    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Session parameters.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The command encoder, for direct register or memory access.
    pub fn controller(&mut self) -> &mut Controller<B> {
        &mut self.controller
    }

    /// The underlying transport.
    pub fn bus(&self) -> &B {
        self.controller.bus()
    }

    /// Tear down, returning transport, reset pin and delay.
    pub fn release(self) -> (B, RST, DELAY) {
        (self.controller.into_inner(), self.rst, self.delay)
    }
}

/// Bring-up failures are `InitError`s, except timeouts which stay
/// distinguishable.
fn init_error(e: BusError) -> Error {
    match e {
        BusError::Timeout => Error::BusTimeout(Wait::HostReady),
        other => Error::Init(InitError::Bus(other)),
    }
}
