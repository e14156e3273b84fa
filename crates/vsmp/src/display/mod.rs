//! Display back ends
//!
//! - [`it8951`]: the IT8951 controller driver, from bus framing up to the
//!   device session.
//! - [`dryrun`]: renders presented frames to PGM files instead of a panel.

pub mod dryrun;
pub mod it8951;

pub use dryrun::{DryRunDisplay, DryRunError};
pub use it8951::{Error as DisplayError, Session, SessionConfig, SpiTransport};
