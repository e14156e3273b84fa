//! Very Slow Movie Player
//!
//! Shows grayscale frames on an IT8951-driven e-paper panel, one refresh at
//! a time, from a Raspberry Pi's SPI bus.
//!
//! # Architecture
//!
//! ```text
//! Application Layer (main.rs: CLI, frame source)
//!         ↓
//! HAL Abstraction (hal::FrameDisplay)
//!         ↓
//! Refresh orchestrator (refresh) / dry-run sink (display::dryrun)
//!         ↓
//! IT8951 session + protocol (display::it8951)
//!         ↓
//! Platform HAL (platform::BusTransport, embedded-hal SPI/GPIO)
//! ```
//!
//! Dithering and packing live in the `eink-dither` crate.
//!
//! # Features
//!
//! - `hardware` - spidev bus and gpio-cdev pins via `linux-embedded-hal`
//!
//! # Examples
//!
//! ## Dry run on any machine
//!
//! ```bash
//! cargo run -- --dry-run out/ show still.png
//! ```
//!
//! ## Raspberry Pi
//!
//! ```bash
//! cargo run --release --features hardware -- --config vsmp.json show still.png
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
// Logging discipline
#![warn(clippy::print_stdout)] // prefer tracing over println! in lib code
#![warn(clippy::dbg_macro)]
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::similar_names)]

pub mod config;
pub mod display;
pub mod frame;
pub mod hal;
pub mod refresh;

#[cfg(feature = "hardware")]
pub mod hardware;

// Re-export key types
pub use config::{Config, ConfigError};
pub use display::{DisplayError, DryRunDisplay, DryRunError, Session, SessionConfig, SpiTransport};
pub use frame::{Frame, FrameError, FrameSource, ImageFrameSource};
pub use hal::FrameDisplay;
pub use refresh::{placement, FramePipeline, FrameRefresher, Placement, RefreshConfig};
