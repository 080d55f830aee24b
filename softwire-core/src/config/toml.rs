//! Simple TOML parser for bus configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! a Softwire configuration file, without allocation. It does NOT support
//! the full TOML grammar.
//!
//! Supported features:
//! - `[bus]`, `[timing]` and `[device]` section headers
//! - Key = value pairs (quoted pin strings, decimal or `0x` hex integers)
//! - `_` digit separators
//! - Comments (# ...)
//!
//! Example:
//!
//! ```toml
//! [bus]
//! scl = "gpio4"
//! sda = "gpio5"
//! start_stop_retries = 30
//! stretch_polls = 100
//!
//! [timing]
//! frequency_hz = 100_000
//!
//! [device]
//! address = 0x48
//! register = 0x00
//! length = 2
//! ```
//!
//! Unknown keys are ignored so newer files still load; unknown sections
//! are rejected.

use super::bus::{BusConfig, ConfigError, PinId};
use crate::timing::Timing;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Malformed line or value out of range
    InvalidValue,
    /// Invalid pin string
    InvalidPin,
    /// `[device]` section without an `address`
    MissingAddress,
    /// Parsed bus configuration failed validation
    Config(ConfigError),
}

impl From<ConfigError> for ParseError {
    fn from(e: ConfigError) -> Self {
        ParseError::Config(e)
    }
}

/// Peripheral polled by the firmware demo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// 7-bit device address
    pub address: u8,
    /// First register to read
    pub register: u8,
    /// Number of registers to read
    pub length: u8,
}

/// Everything a configuration file can describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SoftwireConfig {
    /// Bus pins, budgets and timing
    pub bus: BusConfig,
    /// Optional peripheral to poll
    pub device: Option<DeviceConfig>,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Bus,
    Timing,
    Device,
}

/// `[device]` keys collected before the address is known to be present
#[derive(Debug, Clone, Copy)]
struct DeviceFields {
    address: Option<u8>,
    register: u8,
    length: u8,
}

/// Parse TOML configuration into a [`SoftwireConfig`]
pub fn parse_config(input: &str) -> Result<SoftwireConfig, ParseError> {
    let mut config = SoftwireConfig::default();
    let mut section = Section::Root;
    let mut device: Option<DeviceFields> = None;

    for line in input.lines() {
        // Strip trailing comments; none of the supported values contain '#'
        let line = match line.split_once('#') {
            Some((content, _)) => content,
            None => line,
        };
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            if section == Section::Device && device.is_none() {
                device = Some(DeviceFields {
                    address: None,
                    register: 0,
                    length: 1,
                });
            }
            continue;
        }

        let (key, value) = line.split_once('=').ok_or(ParseError::InvalidValue)?;
        let key = key.trim();
        let value = value.trim();

        match section {
            Section::Bus => apply_bus_key(&mut config.bus, key, value)?,
            Section::Timing => apply_timing_key(&mut config.bus.timing, key, value)?,
            Section::Device => {
                if let Some(fields) = device.as_mut() {
                    apply_device_key(fields, key, value)?;
                }
            }
            Section::Root => {}
        }
    }

    if let Some(fields) = device {
        let address = fields.address.ok_or(ParseError::MissingAddress)?;
        config.device = Some(DeviceConfig {
            address,
            register: fields.register,
            length: fields.length,
        });
    }

    config.bus.validate()?;
    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "bus" => Ok(Section::Bus),
        "timing" => Ok(Section::Timing),
        "device" => Ok(Section::Device),
        _ => Err(ParseError::InvalidSection),
    }
}

fn apply_bus_key(bus: &mut BusConfig, key: &str, value: &str) -> Result<(), ParseError> {
    match key {
        "scl" => bus.scl = parse_pin(value)?,
        "sda" => bus.sda = parse_pin(value)?,
        "start_stop_retries" => bus.start_stop_retries = parse_int(value)?,
        "stretch_polls" => bus.stretch_polls = parse_int(value)?,
        _ => {}
    }
    Ok(())
}

fn apply_timing_key(timing: &mut Timing, key: &str, value: &str) -> Result<(), ParseError> {
    match key {
        "frequency_hz" => {
            let hz: u32 = parse_int(value)?;
            if hz == 0 {
                return Err(ParseError::InvalidValue);
            }
            timing.half_period_us = Timing::from_frequency(hz).half_period_us;
        }
        "half_period_us" => timing.half_period_us = parse_int(value)?,
        "stretch_poll_us" => timing.stretch_poll_us = parse_int(value)?,
        "start_stop_poll_us" => timing.start_stop_poll_us = parse_int(value)?,
        _ => {}
    }
    Ok(())
}

fn apply_device_key(fields: &mut DeviceFields, key: &str, value: &str) -> Result<(), ParseError> {
    match key {
        "address" => {
            let address: u8 = parse_int(value)?;
            if address > 0x7F {
                return Err(ParseError::InvalidValue);
            }
            fields.address = Some(address);
        }
        "register" => fields.register = parse_int(value)?,
        "length" => fields.length = parse_int(value)?,
        _ => {}
    }
    Ok(())
}

/// Parse a pin value such as `"gpio4"` or `"P0.5"`
fn parse_pin(value: &str) -> Result<PinId, ParseError> {
    PinId::parse(value).ok_or(ParseError::InvalidPin)
}

/// Parse a decimal or `0x` hex integer and narrow it to `T`
fn parse_int<T: TryFrom<u32>>(value: &str) -> Result<T, ParseError> {
    let raw = parse_u32(value).ok_or(ParseError::InvalidValue)?;
    T::try_from(raw).map_err(|_| ParseError::InvalidValue)
}

fn parse_u32(value: &str) -> Option<u32> {
    let (digits, radix) = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (value, 10),
    };

    let mut result: u32 = 0;
    let mut any = false;
    for c in digits.chars() {
        if c == '_' {
            continue;
        }
        let digit = c.to_digit(radix)?;
        result = result.checked_mul(radix)?.checked_add(digit)?;
        any = true;
    }
    any.then_some(result)
}
