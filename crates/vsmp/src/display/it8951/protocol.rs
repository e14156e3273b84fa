//! IT8951 host command protocol
//!
//! [`Controller`] encodes each host command into the word stream carried by
//! a [`BusTransport`]: the command word, then every argument as a separate
//! data word, in order. It keeps no controller state of its own; geometry,
//! buffer address and power state belong to the session.
//!
//! There is no retry here. A failed primitive leaves the controller
//! mid-packet and is returned to the caller unchanged.

use eink_dither::{check_alignment, packed_row_bytes, PackingError};
use platform::{BusError, BusTransport};

use super::command::{Command, Register, LISAR_HIGH};
use super::info::{AreaImageInfo, DeviceInfo, DisplayMode, LoadImageInfo, DEVICE_INFO_WORDS};

/// VCOM selector word: read the current value.
const VCOM_GET: u16 = 0;
/// VCOM selector word: write a new value.
const VCOM_SET: u16 = 1;

/// `[low, high]` 16-bit halves of a 32-bit value.
fn halves(value: u32) -> [u16; 2] {
    let [b3, b2, b1, b0] = value.to_be_bytes();
    [u16::from_be_bytes([b1, b0]), u16::from_be_bytes([b3, b2])]
}

/// Command encoder on top of a bus transport.
#[derive(Debug)]
pub struct Controller<B> {
    bus: B,
}

impl<B: BusTransport> Controller<B> {
    /// Wrap a transport.
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// The underlying transport.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// The underlying transport, mutably.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give the transport back.
    pub fn into_inner(self) -> B {
        self.bus
    }

    // -----------------------------------------------------------------------
    // Framing helpers
    // -----------------------------------------------------------------------

    fn send(&mut self, command: Command) -> Result<(), BusError> {
        self.bus.write_command(command.code())
    }

    fn send_with_args(&mut self, command: Command, args: &[u16]) -> Result<(), BusError> {
        self.send(command)?;
        args.iter().try_for_each(|&word| self.bus.write_data(word))
    }

    // -----------------------------------------------------------------------
    // Power
    // -----------------------------------------------------------------------

    /// `SYS_RUN`.
    pub fn sys_run(&mut self) -> Result<(), BusError> {
        self.send(Command::SysRun)
    }

    /// `STANDBY`.
    pub fn standby(&mut self) -> Result<(), BusError> {
        self.send(Command::Standby)
    }

    /// `SLEEP`.
    pub fn sleep(&mut self) -> Result<(), BusError> {
        self.send(Command::Sleep)
    }

    // -----------------------------------------------------------------------
    // Registers
    // -----------------------------------------------------------------------

    /// `REG_RD addr`, then one word read.
    pub fn read_register(&mut self, addr: u16) -> Result<u16, BusError> {
        self.send_with_args(Command::RegRead, &[addr])?;
        self.bus.read_data()
    }

    /// `REG_WR addr value`.
    pub fn write_register(&mut self, addr: u16, value: u16) -> Result<(), BusError> {
        self.send_with_args(Command::RegWrite, &[addr, value])
    }

    /// Point image loads at `addr`: LISAR high half first, then low half.
    pub fn set_image_buffer_base_address(&mut self, addr: u32) -> Result<(), BusError> {
        let [low, high] = halves(addr);
        self.write_register(LISAR_HIGH, high)?;
        self.write_register(Register::Lisar.addr(), low)
    }

    // -----------------------------------------------------------------------
    // Memory bursts
    // -----------------------------------------------------------------------

    /// `MEM_BST_RD_T addr size`; `words` is the transfer size in 16-bit words.
    pub fn mem_burst_read_trigger(&mut self, addr: u32, words: u32) -> Result<(), BusError> {
        let [addr_lo, addr_hi] = halves(addr);
        let [size_lo, size_hi] = halves(words);
        self.send_with_args(Command::MemBurstReadTrigger, &[addr_lo, addr_hi, size_lo, size_hi])
    }

    /// `MEM_BST_RD_S`: start streaming the triggered read.
    pub fn mem_burst_read_start(&mut self) -> Result<(), BusError> {
        self.send(Command::MemBurstReadStart)
    }

    /// `MEM_BST_WR addr size`; `words` is the transfer size in 16-bit words.
    pub fn mem_burst_write(&mut self, addr: u32, words: u32) -> Result<(), BusError> {
        let [addr_lo, addr_hi] = halves(addr);
        let [size_lo, size_hi] = halves(words);
        self.send_with_args(Command::MemBurstWrite, &[addr_lo, addr_hi, size_lo, size_hi])
    }

    /// `MEM_BST_END`.
    pub fn mem_burst_end(&mut self) -> Result<(), BusError> {
        self.send(Command::MemBurstEnd)
    }

    /// Write `data` to controller memory at `addr` as one burst.
    pub fn mem_burst_write_words(&mut self, addr: u32, data: &[u16]) -> Result<(), BusError> {
        let len = u32::try_from(data.len()).map_err(|_| BusError::Spi)?;
        self.mem_burst_write(addr, len)?;
        self.bus.write_data_words(data)?;
        self.mem_burst_end()
    }

    /// Fill `out` from controller memory at `addr` as one burst.
    pub fn mem_burst_read_words(&mut self, addr: u32, out: &mut [u16]) -> Result<(), BusError> {
        let len = u32::try_from(out.len()).map_err(|_| BusError::Spi)?;
        self.mem_burst_read_trigger(addr, len)?;
        self.mem_burst_read_start()?;
        self.bus.read_data_burst(out)?;
        self.mem_burst_end()
    }

    // -----------------------------------------------------------------------
    // Image loads
    // -----------------------------------------------------------------------

    /// `LD_IMG attr`: load a full-panel image.
    pub fn load_image_start(&mut self, info: &LoadImageInfo) -> Result<(), BusError> {
        self.send_with_args(Command::LoadImage, &[info.attribute_word()])
    }

    /// `LD_IMG_AREA attr x y w h`.
    pub fn load_image_area_start(
        &mut self,
        info: &LoadImageInfo,
        area: &AreaImageInfo,
    ) -> Result<(), BusError> {
        self.send_with_args(
            Command::LoadImageArea,
            &[info.attribute_word(), area.x, area.y, area.width, area.height],
        )
    }

    /// `LD_IMG_END`.
    pub fn load_image_end(&mut self) -> Result<(), BusError> {
        self.send(Command::LoadImageEnd)
    }

    /// Load already-packed pixels into `area` of the image buffer.
    ///
    /// Sets the buffer base address, opens an area load, bursts `packed` and
    /// closes the load. Alignment and length are checked before anything is
    /// sent, so a rejected call leaves the bus untouched.
    pub fn host_area_packed_write(
        &mut self,
        load: &LoadImageInfo,
        area: &AreaImageInfo,
        packed: &[u8],
    ) -> Result<(), WriteError> {
        let depth = load.pixel_format.transport_depth()?;
        check_alignment(usize::from(area.x), depth)?;
        let expected =
            packed_row_bytes(usize::from(area.width), depth).saturating_mul(usize::from(area.height));
        if packed.len() != expected {
            return Err(PackingError::LengthMismatch {
                expected,
                actual: packed.len(),
            }
            .into());
        }

        self.set_image_buffer_base_address(load.image_buffer_address)?;
        self.load_image_area_start(load, area)?;
        self.bus.write_data_burst(packed)?;
        self.load_image_end()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Display
    // -----------------------------------------------------------------------

    /// `DPY_AREA x y w h mode`.
    pub fn display_area(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        mode: DisplayMode,
    ) -> Result<(), BusError> {
        self.send_with_args(Command::DisplayArea, &[x, y, width, height, mode.code()])
    }

    /// `DPY_BUF_AREA x y w h mode addr_lo addr_hi`: refresh from an explicit
    /// buffer instead of the current base address.
    pub fn display_area_buffered(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        mode: DisplayMode,
        buffer_address: u32,
    ) -> Result<(), BusError> {
        let [addr_lo, addr_hi] = halves(buffer_address);
        self.send_with_args(
            Command::DisplayBufferArea,
            &[x, y, width, height, mode.code(), addr_lo, addr_hi],
        )
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// `GET_DEV_INFO`, then a 20-word burst read.
    pub fn query_device_info(&mut self) -> Result<DeviceInfo, BusError> {
        self.send(Command::GetDeviceInfo)?;
        let mut words = [0u16; DEVICE_INFO_WORDS];
        self.bus.read_data_burst(&mut words)?;
        Ok(DeviceInfo::from_words(&words))
    }

    /// Current VCOM in millivolts (magnitude).
    pub fn vcom(&mut self) -> Result<u16, BusError> {
        self.send_with_args(Command::Vcom, &[VCOM_GET])?;
        self.bus.read_data()
    }

    /// Program VCOM, in millivolts (magnitude).
    pub fn set_vcom(&mut self, millivolts: u16) -> Result<(), BusError> {
        self.send_with_args(Command::Vcom, &[VCOM_SET, millivolts])
    }
}

/// A packed-area write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    /// Rejected before any bus traffic.
    Packing(PackingError),
    /// The transport failed mid-transfer.
    Bus(BusError),
}

impl From<PackingError> for WriteError {
    fn from(e: PackingError) -> Self {
        Self::Packing(e)
    }
}

impl From<BusError> for WriteError {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

impl core::fmt::Display for WriteError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Packing(e) => write!(f, "packed area rejected: {e}"),
            Self::Bus(e) => write!(f, "packed area transfer failed: {e}"),
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Packing(e) => Some(e),
            Self::Bus(e) => Some(e),
        }
    }
}
