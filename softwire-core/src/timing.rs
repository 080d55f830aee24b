//! Bus timing primitives
//!
//! All waits are blocking and delegate to an [`embedded_hal::delay::DelayNs`]
//! implementation. The defaults give roughly 100 kHz on a slow core, where
//! the pin toggling itself takes a noticeable share of each half period.

use embedded_hal::delay::DelayNs;
use softwire_hal::I2cConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default half clock period in microseconds
pub const DEFAULT_HALF_PERIOD_US: u32 = 2;

/// Default delay between clock-stretch polls in microseconds
pub const DEFAULT_STRETCH_POLL_US: u32 = 10;

/// Default delay between START/STOP clock polls in microseconds
pub const DEFAULT_START_STOP_POLL_US: u32 = 1_000;

/// Delays used by the protocol engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timing {
    /// Half of one bit cell: data setup before the clock rises, and clock high time
    pub half_period_us: u32,
    /// Wait between polls while a peripheral stretches the clock
    pub stretch_poll_us: u32,
    /// Wait between polls for the clock to rise during START and STOP
    pub start_stop_poll_us: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Timing {
    /// Default timing
    pub const DEFAULT: Self = Self {
        half_period_us: DEFAULT_HALF_PERIOD_US,
        stretch_poll_us: DEFAULT_STRETCH_POLL_US,
        start_stop_poll_us: DEFAULT_START_STOP_POLL_US,
    };

    /// Timing for a target clock frequency
    ///
    /// The half period is rounded up to whole microseconds, so the real
    /// rate never exceeds the target. Poll intervals keep their defaults.
    pub const fn from_frequency(hz: u32) -> Self {
        let hz = if hz == 0 { 1 } else { hz };
        Self {
            half_period_us: 500_000_u32.div_ceil(hz),
            stretch_poll_us: DEFAULT_STRETCH_POLL_US,
            start_stop_poll_us: DEFAULT_START_STOP_POLL_US,
        }
    }

    /// Approximate clock frequency produced by the half period
    ///
    /// Ignores the time spent toggling pins, so real buses run slower.
    pub const fn frequency_hz(&self) -> u32 {
        if self.half_period_us == 0 {
            return 0;
        }
        500_000 / self.half_period_us
    }

    /// Wait half a bit cell
    pub fn half_period<D: DelayNs>(&self, delay: &mut D) {
        delay.delay_us(self.half_period_us);
    }

    /// Wait one clock-stretch poll interval
    pub fn stretch_poll<D: DelayNs>(&self, delay: &mut D) {
        delay.delay_us(self.stretch_poll_us);
    }

    /// Wait one START/STOP poll interval
    pub fn start_stop_poll<D: DelayNs>(&self, delay: &mut D) {
        delay.delay_us(self.start_stop_poll_us);
    }
}

impl From<I2cConfig> for Timing {
    fn from(config: I2cConfig) -> Self {
        Self::from_frequency(config.frequency)
    }
}
