//! Driver implementations for the Softwire bus
//!
//! This crate provides concrete implementations on both sides of the bus
//! engine:
//!
//! - Line drivers (embedded-hal open-drain pins)
//! - Register-addressed peripheral access on any [`softwire_hal::RegisterBus`]

#![no_std]
#![deny(unsafe_code)]

pub mod pins;
pub mod register;

pub use pins::PinLines;
pub use register::RegisterDevice;
