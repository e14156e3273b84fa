//! Hardware Abstraction Layer (HAL) for the `vsmp` e-paper player
//!
//! This crate provides the trait-based seam between the IT8951 command
//! protocol and the physical bus, enabling development and testing without
//! a panel attached.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (vsmp crate: CLI, refresh orchestrator)
//!         ↓
//! Controller Layer (vsmp::display::it8951: protocol + session)
//!         ↓
//! Platform HAL (this crate - BusTransport, ReadyPolicy)
//!         ↓
//! Hardware Layer (embedded-hal SpiBus + GPIO, e.g. linux-embedded-hal)
//! ```
//!
//! # Features
//!
//! - `std`: `std::error::Error` impls and the [`mocks`] module
//! - `serde`: (de)serialisable configuration types
//! - `defmt`: `defmt::Format` derives for MCU targets
//!
//! # Example
//!
//! ```no_run
//! use platform::{BusTransport, BusError};
//!
//! fn read_register<B: BusTransport>(bus: &mut B, addr: u16) -> Result<u16, BusError> {
//!     bus.write_command(0x0010)?;
//!     bus.write_data(addr)?;
//!     bus.read_data()
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors: callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod bus;
pub mod mocks;
pub mod peripheral;
pub mod ready;

pub use bus::{preamble, BusError, BusTransport, READ_DUMMY_BYTES};
pub use peripheral::{BitOrder, SpiConfig, SpiMode};
pub use ready::{poll_until, PollError, PollTimeout, ReadyPolicy};
