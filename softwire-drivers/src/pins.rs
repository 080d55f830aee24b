//! Line driver over embedded-hal pins
//!
//! Works with any pin pair that can be written and read back, such as
//! open-drain outputs from most HALs. Writing high must release the pin
//! (high impedance), never drive it: configure the pins as open-drain with
//! a pull-up before handing them over.

use core::convert::Infallible;

use embedded_hal::digital::{InputPin, OutputPin};
use softwire_hal::{BusLines, Line};

/// Clock and data pins driving a bit-banged bus
pub struct PinLines<SCL, SDA> {
    scl: SCL,
    sda: SDA,
}

impl<SCL, SDA> PinLines<SCL, SDA>
where
    SCL: OutputPin<Error = Infallible> + InputPin,
    SDA: OutputPin<Error = Infallible> + InputPin,
{
    /// Create a line driver from two open-drain pins
    pub fn new(scl: SCL, sda: SDA) -> Self {
        Self { scl, sda }
    }

    /// Give the pins back
    pub fn release_pins(self) -> (SCL, SDA) {
        (self.scl, self.sda)
    }
}

impl<SCL, SDA> BusLines for PinLines<SCL, SDA>
where
    SCL: OutputPin<Error = Infallible> + InputPin,
    SDA: OutputPin<Error = Infallible> + InputPin,
{
    fn drive_low(&mut self, line: Line) {
        let result = match line {
            Line::Clock => self.scl.set_low(),
            Line::Data => self.sda.set_low(),
        };
        result.unwrap_or_else(|e| match e {})
    }

    fn release(&mut self, line: Line) {
        let result = match line {
            Line::Clock => self.scl.set_high(),
            Line::Data => self.sda.set_high(),
        };
        result.unwrap_or_else(|e| match e {})
    }

    fn is_high(&mut self, line: Line) -> bool {
        let result = match line {
            Line::Clock => self.scl.is_high(),
            Line::Data => self.sda.is_high(),
        };
        result.unwrap_or_else(|e| match e {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use embedded_hal::digital::ErrorType;
    use softwire_core::{BusConfig, Error, SoftI2c};
    use softwire_core::sim::SimDelay;

    /// Open-drain pin on a wire that something else may also pull low
    struct MockPin<'a> {
        driving_low: bool,
        held_low: &'a Cell<bool>,
    }

    impl<'a> MockPin<'a> {
        fn new(held_low: &'a Cell<bool>) -> Self {
            Self {
                driving_low: true,
                held_low,
            }
        }
    }

    impl ErrorType for MockPin<'_> {
        type Error = Infallible;
    }

    impl OutputPin for MockPin<'_> {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.driving_low = true;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.driving_low = false;
            Ok(())
        }
    }

    impl InputPin for MockPin<'_> {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(!self.driving_low && !self.held_low.get())
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    #[test]
    fn test_init_releases_pins() {
        let scl_wire = Cell::new(false);
        let sda_wire = Cell::new(false);
        let mut lines = PinLines::new(MockPin::new(&scl_wire), MockPin::new(&sda_wire));

        assert!(lines.is_low(Line::Clock));
        lines.init();
        assert!(lines.is_high(Line::Clock));
        assert!(lines.is_high(Line::Data));
    }

    #[test]
    fn test_release_reads_other_driver() {
        let scl_wire = Cell::new(false);
        let sda_wire = Cell::new(false);
        let mut lines = PinLines::new(MockPin::new(&scl_wire), MockPin::new(&sda_wire));
        lines.init();

        // A peripheral acknowledging pulls data low under a released pin
        sda_wire.set(true);
        assert!(lines.is_low(Line::Data));
        assert!(lines.is_high(Line::Clock));

        sda_wire.set(false);
        lines.drive_low(Line::Data);
        assert!(lines.is_low(Line::Data));

        let (_, sda) = lines.release_pins();
        assert!(sda.driving_low);
    }

    #[test]
    fn test_empty_bus_reports_no_device() {
        let scl_wire = Cell::new(false);
        let sda_wire = Cell::new(false);
        let lines = PinLines::new(MockPin::new(&scl_wire), MockPin::new(&sda_wire));
        let mut bus = SoftI2c::new(lines, SimDelay::new(), BusConfig::new());
        bus.init();

        assert_eq!(bus.probe(0x40), Err(Error::NoDevice));

        let (mut lines, _) = bus.free();
        assert!(lines.is_high(Line::Clock));
        assert!(lines.is_high(Line::Data));
    }

    #[test]
    fn test_stuck_clock_is_arbitration() {
        let scl_wire = Cell::new(true);
        let sda_wire = Cell::new(false);
        let lines = PinLines::new(MockPin::new(&scl_wire), MockPin::new(&sda_wire));
        let mut bus = SoftI2c::new(lines, SimDelay::new(), BusConfig::new());
        bus.init();

        assert_eq!(bus.send(0x40, &[0x00]), Err(Error::Arbitration));
    }
}
