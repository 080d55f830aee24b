//! RP2040-specific HAL for the Softwire bus
//!
//! This crate provides the RP2040 implementation of the shared
//! `softwire-hal` line driver trait:
//!
//! - Open-drain emulation on `Flex` GPIOs (direction switching, output latch low)
//! - Dynamic pin allocation for config-driven setup

#![no_std]

pub mod lines;
pub mod pins;

pub use lines::FlexLines;
pub use pins::{PinBank, PinError};
