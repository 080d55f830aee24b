//! Bus configuration types
//!
//! Which pins carry the clock and data lines, how long the engine waits for
//! the clock to rise, and the bit timing. One `BusConfig` belongs to one
//! engine instance, so several independent buses can coexist.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::timing::Timing;

/// Default START/STOP retry budget (polls of `start_stop_poll_us`, ~1 ms each)
pub const DEFAULT_START_STOP_RETRIES: u8 = 30;

/// Default clock-stretch budget (polls of `stretch_poll_us`, ~10 us each)
pub const DEFAULT_STRETCH_POLLS: u16 = 100;

/// Maximum serialized size of a [`BusConfig`]
#[cfg(feature = "serde")]
pub const MAX_SERIALIZED_SIZE: usize = 32;

/// Physical pin identifier (port + pin within the port)
///
/// Chips with a single GPIO bank (RP2040) use port 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinId {
    /// GPIO port / bank
    pub port: u8,
    /// Pin within the port
    pub pin: u8,
}

impl PinId {
    /// Create a pin identifier
    pub const fn new(port: u8, pin: u8) -> Self {
        Self { port, pin }
    }

    /// Pin on a single-bank chip
    pub const fn gpio(pin: u8) -> Self {
        Self { port: 0, pin }
    }

    /// Parse a pin string
    ///
    /// Supports formats:
    /// - "gpio5" -> port 0, pin 5
    /// - "P1.3" -> port 1, pin 3
    ///
    /// Surrounding quotes and whitespace are ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().trim_matches('"');

        if let Some(num) = s.strip_prefix("gpio") {
            return num.parse().ok().map(Self::gpio);
        }

        let rest = s.strip_prefix('P').or_else(|| s.strip_prefix('p'))?;
        let (port, pin) = rest.split_once('.')?;
        Some(Self::new(port.parse().ok()?, pin.parse().ok()?))
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}.{}", self.port, self.pin)
    }
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Clock and data assigned to the same pin
    SharedPin,
    /// START/STOP retry budget of zero would fail every transaction on a slow rise
    ZeroRetries,
    /// Half period of zero gives peripherals no setup time
    ZeroHalfPeriod,
    /// Serialization failed (buffer too small)
    Serialize,
    /// Deserialization failed
    Deserialize,
}

/// Configuration of one bit-banged bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    /// Clock line pin
    pub scl: PinId,
    /// Data line pin
    pub sda: PinId,
    /// Polls allowed for SCL to rise during START and STOP before reporting arbitration loss
    pub start_stop_retries: u8,
    /// Polls allowed while a peripheral stretches the clock before carrying on regardless
    pub stretch_polls: u16,
    /// Bit timing
    pub timing: Timing,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl BusConfig {
    /// Default configuration: SCL on P0.5, SDA on P0.6
    pub const fn new() -> Self {
        Self {
            scl: PinId::new(0, 5),
            sda: PinId::new(0, 6),
            start_stop_retries: DEFAULT_START_STOP_RETRIES,
            stretch_polls: DEFAULT_STRETCH_POLLS,
            timing: Timing::DEFAULT,
        }
    }

    /// Same configuration on different pins
    pub const fn with_pins(self, scl: PinId, sda: PinId) -> Self {
        Self { scl, sda, ..self }
    }

    /// Same configuration with different retry budgets
    pub const fn with_budgets(self, start_stop_retries: u8, stretch_polls: u16) -> Self {
        Self {
            start_stop_retries,
            stretch_polls,
            ..self
        }
    }

    /// Same configuration with different timing
    pub const fn with_timing(self, timing: Timing) -> Self {
        Self { timing, ..self }
    }

    /// Check the configuration for values that cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scl == self.sda {
            return Err(ConfigError::SharedPin);
        }
        if self.start_stop_retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        if self.timing.half_period_us == 0 {
            return Err(ConfigError::ZeroHalfPeriod);
        }
        Ok(())
    }

    /// Serialize with postcard for flash storage
    ///
    /// Returns the used part of `buf`.
    #[cfg(feature = "serde")]
    pub fn to_slice<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Serialize)
    }

    /// Deserialize from postcard bytes and validate
    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;
        config.validate()?;
        Ok(config)
    }
}
