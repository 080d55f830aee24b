//! Bus engine instance
//!
//! [`SoftI2c`] owns one pair of lines, one delay provider and one
//! [`BusConfig`]. Protocol, transaction, scan and recovery operations are
//! implemented on it in their own modules.

use embedded_hal::delay::DelayNs;
use softwire_hal::BusLines;

use crate::config::BusConfig;

/// Bit-banged two-wire bus master
///
/// All operations block the calling context until they complete or a
/// retry budget runs out. The engine holds no lock; callers sharing one bus
/// must serialize access themselves.
pub struct SoftI2c<L, D> {
    pub(crate) lines: L,
    pub(crate) delay: D,
    pub(crate) config: BusConfig,
}

impl<L: BusLines, D: DelayNs> SoftI2c<L, D> {
    /// Create an engine over `lines`
    ///
    /// The lines are not touched until [`SoftI2c::init`] or the first
    /// operation.
    pub fn new(lines: L, delay: D, config: BusConfig) -> Self {
        Self {
            lines,
            delay,
            config,
        }
    }

    /// Put both lines into the released (idle) state
    pub fn init(&mut self) {
        self.lines.init();
        debug!(
            "bus init: scl={=u8}.{=u8} sda={=u8}.{=u8}",
            self.config.scl.port,
            self.config.scl.pin,
            self.config.sda.port,
            self.config.sda.pin
        );
    }

    /// Active configuration
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Line driver
    pub fn lines(&self) -> &L {
        &self.lines
    }

    /// Mutable line driver
    pub fn lines_mut(&mut self) -> &mut L {
        &mut self.lines
    }

    /// Release the line driver and delay provider
    pub fn free(self) -> (L, D) {
        (self.lines, self.delay)
    }

    /// Wait half a bit cell
    pub(crate) fn half_period(&mut self) {
        self.config.timing.half_period(&mut self.delay);
    }
}
