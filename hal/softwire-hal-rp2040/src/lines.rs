//! Open-drain bus lines on RP2040 GPIOs
//!
//! Each line is a `Flex` pin with its output latch parked low and the
//! internal pull-up enabled. Driving low switches the pin to output;
//! releasing switches it back to input so the pull-up (and any external
//! resistor) raises the line. The pin is never driven high.
//!
//! The internal pull-up is weak (50-80 kOhm); buses faster than a few tens
//! of kHz need external resistors.

use embassy_rp::gpio::{AnyPin, Flex, Pull};
use embassy_rp::Peri;
use softwire_core::BusConfig;
use softwire_hal::{BusLines, Line};

use crate::pins::{PinBank, PinError};

/// Clock and data lines on two RP2040 GPIOs
pub struct FlexLines<'d> {
    scl: Flex<'d>,
    sda: Flex<'d>,
}

impl<'d> FlexLines<'d> {
    /// Set up both pins released, pulled up, output latch low
    pub fn new(scl: Peri<'d, AnyPin>, sda: Peri<'d, AnyPin>) -> Self {
        let mut lines = Self {
            scl: Flex::new(scl),
            sda: Flex::new(sda),
        };
        for pin in [&mut lines.scl, &mut lines.sda] {
            pin.set_pull(Pull::Up);
            pin.set_low();
            pin.set_as_input();
        }
        lines
    }

    fn pin(&mut self, line: Line) -> &mut Flex<'d> {
        match line {
            Line::Clock => &mut self.scl,
            Line::Data => &mut self.sda,
        }
    }
}

impl FlexLines<'static> {
    /// Take the configured pins from `bank`
    pub fn from_config(bank: &mut PinBank, config: &BusConfig) -> Result<Self, PinError> {
        let scl = bank.take_id(config.scl)?;
        let sda = bank.take_id(config.sda)?;
        Ok(Self::new(scl, sda))
    }
}

impl BusLines for FlexLines<'_> {
    fn drive_low(&mut self, line: Line) {
        self.pin(line).set_as_output();
    }

    fn release(&mut self, line: Line) {
        self.pin(line).set_as_input();
    }

    fn is_high(&mut self, line: Line) -> bool {
        self.pin(line).is_high()
    }
}
