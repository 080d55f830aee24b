//! Bus recovery
//!
//! A peripheral reset or interrupted mid-byte can keep driving the data
//! line low, which blocks every START. Clocking it through the rest of its
//! byte (at most nine pulses) makes it let go; a STOP then returns the bus
//! to idle.

use embedded_hal::delay::DelayNs;
use softwire_hal::{BusLines, Line};

use crate::bus::SoftI2c;
use crate::error::Error;

/// Clock pulses needed to finish any partial byte plus its acknowledge
pub const RECOVERY_PULSES: u8 = 9;

impl<L: BusLines, D: DelayNs> SoftI2c<L, D> {
    /// Free a bus whose data line is held low by a peripheral
    ///
    /// Returns [`Error::Arbitration`] if the data line is still low after
    /// nine clock pulses, or if the closing STOP cannot raise the clock.
    pub fn recover(&mut self) -> Result<(), Error> {
        self.lines.release(Line::Clock);
        self.lines.release(Line::Data);
        self.half_period();

        let mut pulses = 0;
        while self.lines.is_low(Line::Data) && pulses < RECOVERY_PULSES {
            self.lines.drive_low(Line::Clock);
            self.half_period();
            self.lines.release(Line::Clock);
            self.half_period();
            pulses += 1;
        }

        if self.lines.is_low(Line::Data) {
            warn!("recover: SDA still low after {=u8} pulses", pulses);
            return Err(Error::Arbitration);
        }
        if pulses > 0 {
            info!("recover: SDA released after {=u8} pulses", pulses);
        }

        // STOP needs the clock low before data can be pulled down
        self.lines.drive_low(Line::Clock);
        self.half_period();
        self.stop()
    }
}
