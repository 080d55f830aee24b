//! Open-drain line abstractions
//!
//! A two-wire bus line is never driven high. It is either pulled low by an
//! output driver, or released to a high-impedance input so the external
//! pull-up resistor raises it. Any agent on the bus may hold a released
//! line low, which is how peripherals acknowledge bytes and stretch the
//! clock.

/// One of the two bus signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    /// Serial clock (SCL)
    Clock,
    /// Serial data (SDA)
    Data,
}

/// Open-drain line driver
///
/// Implementations translate these requests into pin direction and level
/// changes for a specific chip. Pin muxing and pull-up setup belong to the
/// implementation's constructor, not to the bus engine.
pub trait BusLines {
    /// Put both lines into the idle state (released, pulled up)
    fn init(&mut self) {
        self.release(Line::Clock);
        self.release(Line::Data);
    }

    /// Actively pull the line low
    fn drive_low(&mut self, line: Line);

    /// Stop driving the line and let the pull-up raise it
    fn release(&mut self, line: Line);

    /// Sample the line's current logic level
    ///
    /// Takes `&mut self` because reading a pin may require mutable access
    /// to the underlying peripheral.
    fn is_high(&mut self, line: Line) -> bool;

    /// Check if the line currently reads low
    fn is_low(&mut self, line: Line) -> bool {
        !self.is_high(line)
    }

    /// Release the line for a logic 1, drive it low for a logic 0
    fn set(&mut self, line: Line, high: bool) {
        if high {
            self.release(line);
        } else {
            self.drive_low(line);
        }
    }
}

impl<T: BusLines + ?Sized> BusLines for &mut T {
    fn init(&mut self) {
        T::init(self)
    }

    fn drive_low(&mut self, line: Line) {
        T::drive_low(self, line)
    }

    fn release(&mut self, line: Line) {
        T::release(self, line)
    }

    fn is_high(&mut self, line: Line) -> bool {
        T::is_high(self, line)
    }
}
