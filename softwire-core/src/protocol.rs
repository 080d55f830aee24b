//! Bit-level protocol engine
//!
//! START and STOP conditions, byte transmit with acknowledge sampling and
//! byte receive with acknowledge generation. Every clock pulse tolerates
//! clock stretching up to the configured poll budget; a peripheral that
//! stretches longer is treated as if it had released the clock.
//!
//! Bit cell shape (master drives data while the clock is low):
//!
//! ```text
//!        set data   half   release SCL   half   stretch poll   sample   SCL low
//! SDA  ==X=========================================================X===========
//! SCL  ___________________/‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾\__________
//! ```

use embedded_hal::delay::DelayNs;
use softwire_hal::{BusLines, Line};

use crate::bus::SoftI2c;
use crate::error::Error;

/// Acknowledge bit exchanged after every byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    /// Data line low: byte accepted / send more
    Ack,
    /// Data line high: byte rejected / no more wanted
    Nak,
}

impl Ack {
    /// Interpret a sampled data level
    pub const fn from_level(high: bool) -> Self {
        if high {
            Ack::Nak
        } else {
            Ack::Ack
        }
    }

    /// Data level that signals this acknowledge
    pub const fn level(self) -> bool {
        matches!(self, Ack::Nak)
    }

    /// Check for an acknowledge
    pub const fn is_ack(self) -> bool {
        matches!(self, Ack::Ack)
    }
}

impl<L: BusLines, D: DelayNs> SoftI2c<L, D> {
    /// Generate a START (or repeated START) condition
    ///
    /// Returns [`Error::Arbitration`] if the clock does not rise within the
    /// START/STOP retry budget; both lines are then left released and
    /// nothing else is driven. On success both lines are driven low.
    pub fn start(&mut self) -> Result<(), Error> {
        self.lines.release(Line::Data);
        self.half_period();
        self.lines.release(Line::Clock);
        self.half_period();

        if !self.await_high(Line::Clock) {
            warn!("start: SCL held low, giving up");
            return Err(Error::Arbitration);
        }

        self.lines.drive_low(Line::Data);
        self.half_period();
        self.lines.drive_low(Line::Clock);
        Ok(())
    }

    /// Generate a STOP condition
    ///
    /// Always leaves both lines released. Reports [`Error::Arbitration`]
    /// when the clock never rises, or when the data line stays low after
    /// release because a peripheral is still driving it; no STOP reached
    /// the bus in either case. Ends with a half period of bus-free time.
    pub fn stop(&mut self) -> Result<(), Error> {
        self.lines.drive_low(Line::Data);
        self.half_period();
        self.lines.release(Line::Clock);
        self.half_period();

        let clock_high = self.await_high(Line::Clock);
        if !clock_high {
            warn!("stop: SCL held low, releasing bus anyway");
        }

        self.half_period();
        self.lines.release(Line::Data);

        let data_high = self.await_high(Line::Data);
        if !data_high {
            warn!("stop: SDA held low by a peripheral");
        }
        self.half_period();

        if clock_high && data_high {
            Ok(())
        } else {
            Err(Error::Arbitration)
        }
    }

    /// Transmit one byte, MSB first, and return the peripheral's acknowledge
    ///
    /// A NAK is not an error at this level.
    pub fn send_byte(&mut self, byte: u8) -> Ack {
        for bit in (0..8).rev() {
            self.lines.set(Line::Data, byte & (1 << bit) != 0);
            self.raise_clock();
            self.lines.drive_low(Line::Clock);
        }

        self.lines.release(Line::Data);
        self.raise_clock();
        let ack = Ack::from_level(self.lines.is_high(Line::Data));
        self.lines.drive_low(Line::Clock);

        trace!("tx {=u8:#04x} ack={}", byte, ack.is_ack());
        ack
    }

    /// Receive one byte, MSB first, then emit `ack` to the peripheral
    ///
    /// Send [`Ack::Nak`] after the last byte wanted.
    pub fn receive_byte(&mut self, ack: Ack) -> u8 {
        let mut value: u8 = 0;
        for _ in 0..8 {
            self.lines.release(Line::Data);
            self.raise_clock();
            value = (value << 1) | u8::from(self.lines.is_high(Line::Data));
            self.lines.drive_low(Line::Clock);
        }

        self.lines.set(Line::Data, ack.level());
        self.raise_clock();
        self.lines.drive_low(Line::Clock);

        trace!("rx {=u8:#04x} ack={}", value, ack.is_ack());
        value
    }

    /// Release the clock for one bit cell and wait until it reads high
    ///
    /// Expects the data line already set up.
    fn raise_clock(&mut self) {
        self.half_period();
        self.lines.release(Line::Clock);
        self.half_period();
        self.wait_for_stretch();
    }

    /// Poll while a peripheral holds the clock low, up to the stretch budget
    ///
    /// Proceeds regardless once the budget is spent. If any stretching was
    /// seen, adds one half period so the peripheral's data can settle.
    fn wait_for_stretch(&mut self) {
        let max = self.config.stretch_polls;
        let mut polls: u16 = 0;
        while polls < max && self.lines.is_low(Line::Clock) {
            self.config.timing.stretch_poll(&mut self.delay);
            polls += 1;
        }

        if polls > 0 {
            if polls == max {
                debug!("clock stretched past {=u16} polls", max);
            }
            self.half_period();
        }
    }

    /// Poll for `line` to read high within the START/STOP retry budget
    fn await_high(&mut self, line: Line) -> bool {
        let mut retries = self.config.start_stop_retries;
        while self.lines.is_low(line) {
            if retries == 0 {
                return false;
            }
            retries -= 1;
            self.config.timing.start_stop_poll(&mut self.delay);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusConfig;
    use crate::sim::{Event, SimBus, SimDelay};

    const ADDR: u8 = 0x42;

    #[test]
    fn test_ack_levels() {
        assert_eq!(Ack::from_level(false), Ack::Ack);
        assert_eq!(Ack::from_level(true), Ack::Nak);
        assert!(!Ack::Ack.level());
        assert!(Ack::Nak.level());
        assert!(Ack::Ack.is_ack());
    }

    #[test]
    fn test_start_stop_conditions() {
        let mut sim = SimBus::new(ADDR);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());
        bus.init();

        bus.start().unwrap();
        assert!(bus.lines_mut().is_low(Line::Clock));
        assert!(bus.lines_mut().is_low(Line::Data));

        bus.stop().unwrap();
        assert!(sim.idle());
        assert_eq!(sim.events(), &[Event::Start, Event::Stop]);
    }

    #[test]
    fn test_stop_ends_with_bus_free_time() {
        let mut sim = SimBus::new(ADDR);
        let mut delay = SimDelay::new();
        let config = BusConfig::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, config);
        bus.init();

        bus.start().unwrap();
        bus.stop().unwrap();
        drop(bus);

        // START takes three half periods, STOP four including the trailing one
        assert_eq!(
            delay.total_us(),
            7 * u64::from(config.timing.half_period_us)
        );
    }

    #[test]
    fn test_start_gives_up_on_stuck_clock() {
        let mut sim = SimBus::new(ADDR);
        sim.hold_clock_low(true);
        let mut delay = SimDelay::new();
        let config = BusConfig::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, config);

        assert_eq!(bus.start(), Err(Error::Arbitration));
        drop(bus);

        // Released lines only, no edges driven
        assert_eq!(sim.drive_low_count(), 0);
        assert!(sim.events().is_empty());
        // 30 polls of 1 ms plus the two setup half periods
        assert_eq!(
            delay.total_us(),
            30 * 1_000 + 2 * u64::from(config.timing.half_period_us)
        );
    }

    #[test]
    fn test_stop_releases_on_stuck_clock() {
        let mut sim = SimBus::new(ADDR);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());

        bus.start().unwrap();
        bus.lines_mut().hold_clock_low(true);
        assert_eq!(bus.stop(), Err(Error::Arbitration));
        drop(bus);

        assert!(!sim.master_driving());
    }

    #[test]
    fn test_stop_reports_data_held_by_peripheral() {
        let mut sim = SimBus::new(ADDR);
        sim.set_registers(0, &[0x00]);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());

        bus.start().unwrap();
        assert_eq!(bus.send_byte((ADDR << 1) | 1), Ack::Ack);
        // The peripheral now drives bit 7 of 0x00
        assert_eq!(bus.stop(), Err(Error::Arbitration));
        drop(bus);

        assert!(!sim.master_driving());
        assert_eq!(sim.stops(), 0);
        assert!(!sim.idle());
    }

    #[test]
    fn test_send_byte_msb_first() {
        let mut sim = SimBus::new(ADDR);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());

        bus.start().unwrap();
        assert_eq!(bus.send_byte(ADDR << 1), Ack::Ack);
        assert_eq!(bus.send_byte(0xA5), Ack::Ack);
        bus.stop().unwrap();
        drop(bus);

        assert_eq!(
            sim.events(),
            &[
                Event::Start,
                Event::Address {
                    address: ADDR,
                    read: false,
                    acked: true
                },
                Event::Register {
                    value: 0xA5,
                    acked: true
                },
                Event::Stop,
            ]
        );
    }

    #[test]
    fn test_send_byte_reports_nak() {
        let mut sim = SimBus::new(ADDR);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());

        bus.start().unwrap();
        assert_eq!(bus.send_byte(0x10 << 1), Ack::Nak);
        bus.stop().unwrap();
    }

    #[test]
    fn test_receive_byte_assembles_bits() {
        let mut sim = SimBus::new(ADDR);
        sim.set_registers(0, &[0x81, 0x7E]);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());

        bus.start().unwrap();
        assert_eq!(bus.send_byte((ADDR << 1) | 1), Ack::Ack);
        assert_eq!(bus.receive_byte(Ack::Ack), 0x81);
        assert_eq!(bus.receive_byte(Ack::Nak), 0x7E);
        bus.stop().unwrap();
        drop(bus);

        assert_eq!(
            sim.reads().as_slice(),
            &[(0x81, true), (0x7E, false)]
        );
    }

    #[test]
    fn test_stretch_within_budget() {
        let mut sim = SimBus::new(ADDR);
        sim.stretch(5);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());

        bus.start().unwrap();
        assert_eq!(bus.send_byte(ADDR << 1), Ack::Ack);
        assert_eq!(bus.send_byte(0x33), Ack::Ack);
        bus.stop().unwrap();
        drop(bus);

        // Address and register acknowledge clocks were stretched
        assert!(sim.data_written().is_empty());
        assert_eq!(sim.stretched_polls(), 10);
    }

    #[test]
    fn test_stretch_exactly_at_budget_completes() {
        let mut sim = SimBus::new(ADDR);
        let config = BusConfig::new();
        sim.stretch(config.stretch_polls);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, config);

        bus.start().unwrap();
        assert_eq!(bus.send_byte(ADDR << 1), Ack::Ack);
        assert_eq!(bus.send_byte(0x05), Ack::Ack);
        assert_eq!(bus.send_byte(0xC3), Ack::Ack);
        bus.stop().unwrap();
        drop(bus);

        assert_eq!(sim.data_written().as_slice(), &[0xC3]);
        assert_eq!(sim.registers()[0x05], 0xC3);
    }
}
