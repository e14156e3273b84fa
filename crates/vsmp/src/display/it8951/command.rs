//! IT8951 host command codes and register addresses

/// Host command codes (I80 / SPI command words).
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Leave standby/sleep and start the system clock.
    SysRun = 0x0001,
    /// Light suspend, clocks gated.
    Standby = 0x0002,
    /// Deep suspend.
    Sleep = 0x0003,
    /// Register read: 1 arg (address), then one word read.
    RegRead = 0x0010,
    /// Register write: 2 args (address, value).
    RegWrite = 0x0011,
    /// Memory burst read trigger: 4 args (addr lo/hi, size lo/hi).
    MemBurstReadTrigger = 0x0012,
    /// Memory burst read start: 0 args, data follows.
    MemBurstReadStart = 0x0013,
    /// Memory burst write: 4 args, data follows.
    MemBurstWrite = 0x0014,
    /// End of a memory burst.
    MemBurstEnd = 0x0015,
    /// Load full image: 1 arg (attribute word).
    LoadImage = 0x0020,
    /// Load image area: 5 args (attribute word, x, y, w, h).
    LoadImageArea = 0x0021,
    /// End of an image load.
    LoadImageEnd = 0x0022,
    /// Display area: 5 args (x, y, w, h, mode).
    DisplayArea = 0x0034,
    /// Display area from an explicit buffer: 7 args.
    DisplayBufferArea = 0x0037,
    /// VCOM get/set.
    Vcom = 0x0039,
    /// Device information query: 0 args, 20-word burst read follows.
    GetDeviceInfo = 0x0302,
}

impl Command {
    /// Wire value.
    pub const fn code(self) -> u16 {
        self as u16
    }
}

/// Controller register addresses.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// I80 packed-mode control. Writing `1` enables packed pixel bursts.
    I80Cpcr = 0x0004,
    /// Load-image start address, low half. High half is at `+2`.
    Lisar = 0x0208,
    /// LUT engine busy flags. Zero means every LUT is idle.
    Lutafsr = 0x1224,
}

impl Register {
    /// Wire address.
    pub const fn addr(self) -> u16 {
        self as u16
    }
}

/// Address of the high half of [`Register::Lisar`].
// 0x0208 + 2 cannot overflow.
#[allow(clippy::arithmetic_side_effects)]
pub const LISAR_HIGH: u16 = Register::Lisar.addr() + 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_codes_match_controller_datasheet() {
        assert_eq!(Command::SysRun.code(), 0x0001);
        assert_eq!(Command::Sleep.code(), 0x0003);
        assert_eq!(Command::LoadImageArea.code(), 0x0021);
        assert_eq!(Command::DisplayArea.code(), 0x0034);
        assert_eq!(Command::Vcom.code(), 0x0039);
        assert_eq!(Command::GetDeviceInfo.code(), 0x0302);
    }

    #[test]
    fn lisar_high_half_follows_low_half() {
        assert_eq!(Register::Lisar.addr(), 0x0208);
        assert_eq!(LISAR_HIGH, 0x020A);
    }
}
