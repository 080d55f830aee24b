//! Configuration types
//!
//! Bus configuration, its TOML representation, and postcard persistence.

pub mod bus;
pub mod toml;

pub use bus::*;
pub use toml::{parse_config, DeviceConfig, ParseError, SoftwireConfig};
