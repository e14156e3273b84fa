//! IT8951 e-paper controller
//!
//! Layered bottom-up:
//!
//! ```text
//! Session        power state, geometry, VCOM, engine-ready gate
//!    ↓
//! Controller     one method per host command, argument framing
//!    ↓
//! BusTransport   preamble + payload words (SpiTransport on hardware)
//! ```

pub mod command;
pub mod info;
pub mod protocol;
pub mod session;
pub mod transport;

pub use command::{Command, Register};
pub use info::{
    AreaImageInfo, DeviceInfo, DisplayMode, Endian, LoadImageInfo, PixelFormat, Rotation,
    DEVICE_INFO_WORDS,
};
pub use protocol::{Controller, WriteError};
pub use session::{
    Error, GeometryError, InitError, PowerState, Session, SessionConfig, SuspendMode,
    VcomCalibration, Wait, DEFAULT_VCOM_MV,
};
pub use transport::{SpiTransport, DEFAULT_MAX_CHUNK};
