//! Board-agnostic bit-banged I2C master
//!
//! This crate contains the whole bus engine, independent of any chip:
//!
//! - Timing primitives (half period, stretch and START/STOP polling)
//! - Bit-level protocol engine (START, STOP, byte transmit/receive)
//! - Transaction engine (send, receive, register reads and writes)
//! - Probing, scanning and bus recovery
//! - Error taxonomy and numeric outcome codes
//! - Bus configuration, TOML parsing and postcard persistence
//! - `embedded-hal` and `softwire-hal` trait implementations
//!
//! Pins are reached through [`softwire_hal::BusLines`], delays through
//! [`embedded_hal::delay::DelayNs`]. Every operation blocks until it
//! completes or a retry budget runs out.
//!
//! ```ignore
//! let mut bus = SoftI2c::new(lines, delay, BusConfig::default());
//! bus.init();
//! let mut buf = [0u8; 2];
//! bus.read_registers(0x48, 0x00, &mut buf)?;
//! ```

#![no_std]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod bus;
pub mod config;
pub mod error;
mod hal_impl;
pub mod protocol;
pub mod recovery;
pub mod scan;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod timing;
pub mod transaction;

pub use bus::SoftI2c;
pub use config::{BusConfig, PinId};
pub use error::{outcome_code, Error};
pub use protocol::Ack;
pub use timing::Timing;
pub use transaction::{address_byte, Direction, MAX_ADDRESS};
