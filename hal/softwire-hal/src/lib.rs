//! Softwire Hardware Abstraction Layer
//!
//! This crate defines the traits that separate the bit-banged bus engine
//! from the pins it toggles. Chip-specific crates (RP2040, generic
//! embedded-hal pins) implement the line driver; the engine in
//! `softwire-core` implements the bus master traits on top of it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Drivers / firmware (softwire-drivers)  │
//! └─────────────────────────────────────────┘
//!                     │  I2cBus, RegisterBus
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  Bus engine (softwire-core)             │
//! └─────────────────────────────────────────┘
//!                     │  BusLines
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ softwire-hal- │       │  simulated    │
//! │    rp2040     │       │  bus (tests)  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`line::BusLines`] - Open-drain control of the clock and data lines
//! - [`i2c::I2cBus`] - Plain I2C master transfers
//! - [`i2c::RegisterBus`] - Register-addressed transfers

#![no_std]
#![deny(unsafe_code)]

pub mod i2c;
pub mod line;

// Re-export key traits at crate root for convenience
pub use i2c::{I2cBus, I2cConfig, RegisterBus};
pub use line::{BusLines, Line};
