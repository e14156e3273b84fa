//! SPI bus transport for the IT8951
//!
//! Every transfer is a preamble word followed by its payload, both sent
//! big-endian inside one chip-select window:
//!
//! ```text
//! wait HRDY ─ CS↓ ─ preamble ─ wait HRDY ─ payload ─ CS↑
//!                                 (reads: 2 dummy bytes ─ wait HRDY ─ payload)
//! ```
//!
//! Chip-select is driven by hand rather than through `SpiDevice`: the
//! controller needs HRDY sampled between preamble and payload while CS stays
//! asserted, which a per-operation device transaction cannot express.
//!
//! # Wiring (Raspberry Pi, Waveshare IT8951 HAT)
//!
//! | Signal | Pi pin | Direction |
//! |--------|--------|-----------|
//! | SCLK   | GPIO11 (SPI0 SCLK) | Host → Controller |
//! | MOSI   | GPIO10 (SPI0 MOSI) | Host → Controller |
//! | MISO   | GPIO9  (SPI0 MISO) | Controller → Host |
//! | CS     | GPIO8  (as GPIO)   | Host → Controller |
//! | RST    | GPIO17             | Host → Controller |
//! | HRDY   | GPIO24             | Controller → Host |

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;
use platform::{poll_until, preamble, BusError, BusTransport, PollError, ReadyPolicy, READ_DUMMY_BYTES};

/// Largest single SPI write; spidev rejects transfers above its `bufsiz`
/// (4096 by default).
pub const DEFAULT_MAX_CHUNK: usize = 4096;

/// Words read per SPI transfer during burst reads.
const READ_CHUNK_WORDS: usize = 512;

/// [`BusTransport`] over an SPI bus with manual chip-select.
///
/// Generic over:
/// - `SPI`: an [`embedded_hal::spi::SpiBus`] (no CS management).
/// - `CS`: chip-select [`OutputPin`], active LOW.
/// - `HRDY`: host-ready [`InputPin`], HIGH when the controller can accept
///   the next word.
/// - `DELAY`: [`DelayNs`] used between ready polls.
///
/// In host tests supply `embedded_hal_mock::eh1` mocks for all four.
pub struct SpiTransport<SPI, CS, HRDY, DELAY> {
    spi: SPI,
    cs: CS,
    hrdy: HRDY,
    delay: DELAY,
    ready: ReadyPolicy,
    max_chunk: usize,
}

impl<SPI, CS, HRDY, DELAY> SpiTransport<SPI, CS, HRDY, DELAY>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    HRDY: InputPin,
    DELAY: DelayNs,
{
    /// Create a transport. `ready` bounds every host-ready wait.
    pub fn new(spi: SPI, cs: CS, hrdy: HRDY, delay: DELAY, ready: ReadyPolicy) -> Self {
        Self {
            spi,
            cs,
            hrdy,
            delay,
            ready,
            max_chunk: DEFAULT_MAX_CHUNK,
        }
    }

    /// Split burst writes into transfers of at most `bytes` (minimum 2).
    pub fn with_max_chunk(mut self, bytes: usize) -> Self {
        self.max_chunk = bytes.max(2);
        self
    }

    /// Release the bus, pins and delay.
    pub fn release(self) -> (SPI, CS, HRDY, DELAY) {
        (self.spi, self.cs, self.hrdy, self.delay)
    }

    // -----------------------------------------------------------------------
    // Low-level helpers
    // -----------------------------------------------------------------------

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        self.spi.write(bytes).map_err(|_| BusError::Spi)
    }

    fn read_bytes(&mut self, bytes: &mut [u8]) -> Result<(), BusError> {
        self.spi.read(bytes).map_err(|_| BusError::Spi)
    }

    /// Run `body` with CS asserted. CS is released even when `body` fails;
    /// the body's error wins over a release error.
    fn selected<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, BusError>,
    ) -> Result<T, BusError> {
        self.cs.set_low().map_err(|_| BusError::Gpio)?;
        let result = body(self).and_then(|value| {
            self.spi.flush().map_err(|_| BusError::Spi)?;
            Ok(value)
        });
        let released = self.cs.set_high().map_err(|_| BusError::Gpio);
        let value = result?;
        released?;
        Ok(value)
    }

    /// Ready-wait, then preamble, then another ready-wait, all under CS.
    fn framed<T>(
        &mut self,
        preamble: u16,
        payload: impl FnOnce(&mut Self) -> Result<T, BusError>,
    ) -> Result<T, BusError> {
        self.wait_ready()?;
        self.selected(|t| {
            t.write_bytes(&preamble.to_be_bytes())?;
            t.wait_ready()?;
            payload(t)
        })
    }

    /// Clock out the read dummy bytes and wait for the data to be ready.
    fn read_prologue(&mut self) -> Result<(), BusError> {
        let mut dummy = [0u8; READ_DUMMY_BYTES];
        self.read_bytes(&mut dummy)?;
        self.wait_ready()
    }
}

impl<SPI, CS, HRDY, DELAY> BusTransport for SpiTransport<SPI, CS, HRDY, DELAY>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    HRDY: InputPin,
    DELAY: DelayNs,
{
    fn wait_ready(&mut self) -> Result<(), BusError> {
        let Self {
            hrdy, delay, ready, ..
        } = self;
        match poll_until(ready, delay, || hrdy.is_high().map_err(|_| BusError::Gpio)) {
            Ok(_) => Ok(()),
            Err(PollError::Probe(e)) => Err(e),
            Err(PollError::Timeout(t)) => {
                tracing::warn!(polls = t.polls, "host-ready line stuck low");
                Err(BusError::Timeout)
            }
        }
    }

    fn write_command(&mut self, command: u16) -> Result<(), BusError> {
        self.framed(preamble::COMMAND, |t| t.write_bytes(&command.to_be_bytes()))
    }

    fn write_data(&mut self, word: u16) -> Result<(), BusError> {
        self.framed(preamble::WRITE_DATA, |t| t.write_bytes(&word.to_be_bytes()))
    }

    fn write_data_burst(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        let chunk = self.max_chunk;
        self.framed(preamble::WRITE_DATA, |t| {
            bytes.chunks(chunk).try_for_each(|part| t.write_bytes(part))
        })
    }

    fn read_data(&mut self) -> Result<u16, BusError> {
        self.framed(preamble::READ_DATA, |t| {
            t.read_prologue()?;
            let mut raw = [0u8; 2];
            t.read_bytes(&mut raw)?;
            Ok(u16::from_be_bytes(raw))
        })
    }

    fn read_data_burst(&mut self, words: &mut [u16]) -> Result<(), BusError> {
        let per_transfer = (self.max_chunk / 2).clamp(1, READ_CHUNK_WORDS);
        self.framed(preamble::READ_DATA, |t| {
            t.read_prologue()?;
            let mut raw = [0u8; READ_CHUNK_WORDS * 2];
            for part in words.chunks_mut(per_transfer) {
                let bytes = raw
                    .get_mut(..part.len().saturating_mul(2))
                    .ok_or(BusError::Spi)?;
                t.read_bytes(bytes)?;
                for (word, pair) in part.iter_mut().zip(bytes.chunks_exact(2)) {
                    *word = u16::from_be_bytes([
                        pair.first().copied().unwrap_or(0),
                        pair.get(1).copied().unwrap_or(0),
                    ]);
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    type TestTransport = SpiTransport<SpiMock<u8>, PinMock, PinMock, NoopDelay>;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// HRDY reading HIGH `n` times.
    fn ready_reads(n: usize) -> Vec<PinTransaction> {
        vec![PinTransaction::get(PinState::High); n]
    }

    /// CS toggled low/high once per framed transfer.
    fn cs_frames(n: usize) -> PinMock {
        let mut txns = vec![];
        for _ in 0..n {
            txns.push(PinTransaction::set(PinState::Low));
            txns.push(PinTransaction::set(PinState::High));
        }
        PinMock::new(&txns)
    }

    fn transport(
        spi: &[SpiTransaction<u8>],
        cs: PinMock,
        hrdy: &[PinTransaction],
        ready: ReadyPolicy,
    ) -> TestTransport {
        SpiTransport::new(SpiMock::new(spi), cs, PinMock::new(hrdy), NoopDelay, ready)
    }

    fn finish(t: TestTransport) {
        let (mut spi, mut cs, mut hrdy, _) = t.release();
        spi.done();
        cs.done();
        hrdy.done();
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[test]
    fn command_is_preamble_then_word_big_endian() {
        let mut t = transport(
            &[
                SpiTransaction::write_vec(vec![0x60, 0x00]),
                SpiTransaction::write_vec(vec![0x03, 0x02]),
                SpiTransaction::flush(),
            ],
            cs_frames(1),
            &ready_reads(2),
            ReadyPolicy::UNBOUNDED,
        );
        t.write_command(0x0302).unwrap();
        finish(t);
    }

    #[test]
    fn data_write_uses_zero_preamble() {
        let mut t = transport(
            &[
                SpiTransaction::write_vec(vec![0x00, 0x00]),
                SpiTransaction::write_vec(vec![0x12, 0x34]),
                SpiTransaction::flush(),
            ],
            cs_frames(1),
            &ready_reads(2),
            ReadyPolicy::UNBOUNDED,
        );
        t.write_data(0x1234).unwrap();
        finish(t);
    }

    #[test]
    fn read_skips_dummy_bytes_and_waits_again() {
        let mut t = transport(
            &[
                SpiTransaction::write_vec(vec![0x10, 0x00]),
                SpiTransaction::read_vec(vec![0xFF, 0xFF]),
                SpiTransaction::read_vec(vec![0x05, 0xDC]),
                SpiTransaction::flush(),
            ],
            cs_frames(1),
            &ready_reads(3),
            ReadyPolicy::UNBOUNDED,
        );
        assert_eq!(t.read_data().unwrap(), 1500);
        finish(t);
    }

    #[test]
    fn burst_write_is_chunked_under_one_chip_select() {
        let mut t = transport(
            &[
                SpiTransaction::write_vec(vec![0x00, 0x00]),
                SpiTransaction::write_vec(vec![1, 2, 3, 4]),
                SpiTransaction::write_vec(vec![5, 6, 7, 8]),
                SpiTransaction::write_vec(vec![9]),
                SpiTransaction::flush(),
            ],
            cs_frames(1),
            &ready_reads(2),
            ReadyPolicy::UNBOUNDED,
        )
        .with_max_chunk(4);
        t.write_data_burst(&[1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
        finish(t);
    }

    #[test]
    fn burst_read_decodes_big_endian_words() {
        let mut t = transport(
            &[
                SpiTransaction::write_vec(vec![0x10, 0x00]),
                SpiTransaction::read_vec(vec![0x00, 0x00]),
                SpiTransaction::read_vec(vec![0x07, 0x50, 0x05, 0x7C]),
                SpiTransaction::read_vec(vec![0x36, 0xE0]),
                SpiTransaction::flush(),
            ],
            cs_frames(1),
            &ready_reads(3),
            ReadyPolicy::UNBOUNDED,
        )
        .with_max_chunk(4);
        let mut words = [0u16; 3];
        t.read_data_burst(&mut words).unwrap();
        assert_eq!(words, [1872, 1404, 0x36E0]);
        finish(t);
    }

    #[test]
    fn waits_until_host_ready_rises() {
        let mut hrdy = vec![PinTransaction::get(PinState::Low); 3];
        hrdy.extend(ready_reads(2));
        let mut t = transport(
            &[
                SpiTransaction::write_vec(vec![0x60, 0x00]),
                SpiTransaction::write_vec(vec![0x00, 0x01]),
                SpiTransaction::flush(),
            ],
            cs_frames(1),
            &hrdy,
            ReadyPolicy::bounded(10, 100),
        );
        t.write_command(0x0001).unwrap();
        finish(t);
    }

    #[test]
    fn stuck_ready_line_times_out_before_selecting() {
        let mut t = transport(
            &[],
            PinMock::new(&[]),
            &vec![PinTransaction::get(PinState::Low); 4],
            ReadyPolicy::bounded(0, 4),
        );
        assert_eq!(t.write_command(0x0001), Err(BusError::Timeout));
        finish(t);
    }

    #[test]
    fn chip_select_is_released_when_payload_wait_times_out() {
        let mut hrdy = ready_reads(1);
        hrdy.extend(vec![PinTransaction::get(PinState::Low); 2]);
        let mut t = transport(
            &[SpiTransaction::write_vec(vec![0x00, 0x00])],
            cs_frames(1),
            &hrdy,
            ReadyPolicy::bounded(0, 2),
        );
        assert_eq!(t.write_data(0xAAAA), Err(BusError::Timeout));
        finish(t);
    }
}
