//! Host bus abstraction for command/data controllers
//!
//! Controllers in the IT8951 family are driven over a narrow 16-bit
//! command/data bus. Every transfer is a *preamble* word identifying the
//! transfer type, followed by the payload, with the host-ready (HRDY) line
//! gating both halves:
//!
//! ```text
//!  wait HRDY ─ preamble (0x6000 | 0x0000 | 0x1000) ─ wait HRDY ─ payload
//! ```
//!
//! [`BusTransport`] is the only seam between the protocol layer and the
//! physical SPI/GPIO primitives. Protocol code never touches pins directly,
//! which is what lets the command encoding be tested against a recording mock.

/// Fixed 16-bit preamble words sent ahead of every payload.
pub mod preamble {
    /// Command write.
    pub const COMMAND: u16 = 0x6000;
    /// Data write (single word or burst).
    pub const WRITE_DATA: u16 = 0x0000;
    /// Data read (single word or burst).
    pub const READ_DATA: u16 = 0x1000;
}

/// Number of dummy bytes clocked out between a read preamble and its payload.
pub const READ_DUMMY_BYTES: usize = 2;

/// Primitive operations of a preamble-framed command/data bus.
///
/// Every method blocks until its transfer completed. Implementations wait
/// for the ready signal both before the preamble and before the payload,
/// and must never leave a transfer half-framed: once a preamble is on the
/// wire the payload follows in the same chip-select window.
///
/// Words travel big-endian (high byte first).
pub trait BusTransport {
    /// Block until the controller signals it can accept a transfer.
    fn wait_ready(&mut self) -> Result<(), BusError>;

    /// Write one command word (preamble [`preamble::COMMAND`]).
    fn write_command(&mut self, command: u16) -> Result<(), BusError>;

    /// Write one data word (preamble [`preamble::WRITE_DATA`]).
    fn write_data(&mut self, word: u16) -> Result<(), BusError>;

    /// Write a pre-encoded byte stream as one data burst.
    ///
    /// `bytes` is sent verbatim, so multi-byte words must already be in wire
    /// order. An odd trailing byte is sent as-is.
    fn write_data_burst(&mut self, bytes: &[u8]) -> Result<(), BusError>;

    /// Read one data word (preamble [`preamble::READ_DATA`]).
    fn read_data(&mut self) -> Result<u16, BusError>;

    /// Read `words.len()` data words in a single burst.
    fn read_data_burst(&mut self, words: &mut [u16]) -> Result<(), BusError>;

    /// Write a slice of words as one data burst, big-endian.
    ///
    /// Default implementation encodes into a fixed stack chunk and issues one
    /// [`write_data_burst`](Self::write_data_burst) per chunk; transports that
    /// can stream words directly should override it.
    fn write_data_words(&mut self, words: &[u16]) -> Result<(), BusError> {
        const CHUNK_WORDS: usize = 64;
        let mut scratch = [0u8; CHUNK_WORDS * 2];
        for chunk in words.chunks(CHUNK_WORDS) {
            for (slot, word) in scratch.chunks_exact_mut(2).zip(chunk) {
                slot.copy_from_slice(&word.to_be_bytes());
            }
            // chunk.len() <= CHUNK_WORDS, so chunk.len() * 2 <= scratch.len().
            let used = scratch.get(..chunk.len().saturating_mul(2)).unwrap_or(&[]);
            self.write_data_burst(used)?;
        }
        Ok(())
    }
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    fn wait_ready(&mut self) -> Result<(), BusError> {
        (**self).wait_ready()
    }

    fn write_command(&mut self, command: u16) -> Result<(), BusError> {
        (**self).write_command(command)
    }

    fn write_data(&mut self, word: u16) -> Result<(), BusError> {
        (**self).write_data(word)
    }

    fn write_data_burst(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        (**self).write_data_burst(bytes)
    }

    fn read_data(&mut self) -> Result<u16, BusError> {
        (**self).read_data()
    }

    fn read_data_burst(&mut self, words: &mut [u16]) -> Result<(), BusError> {
        (**self).read_data_burst(words)
    }

    fn write_data_words(&mut self, words: &[u16]) -> Result<(), BusError> {
        (**self).write_data_words(words)
    }
}

/// Bus-level failures.
///
/// There is no retry at this layer: a failed transfer leaves the controller
/// in an unknown framing state and is surfaced to the caller as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The host-ready line never asserted within the configured bound.
    Timeout,
    /// The SPI peripheral reported an error.
    Spi,
    /// A GPIO line (chip-select or ready) could not be driven or sampled.
    Gpio,
}

impl core::fmt::Display for BusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout => write!(f, "Host-ready wait timed out"),
            Self::Spi => write!(f, "SPI transfer error"),
            Self::Gpio => write!(f, "GPIO error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BusError {}
