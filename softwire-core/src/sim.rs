//! Simulated bus and peripheral
//!
//! [`SimBus`] implements [`BusLines`] over two wired-AND lines shared by the
//! master and one simulated register peripheral. The peripheral decodes
//! START/STOP conditions and bytes from the line transitions exactly as a
//! real device would, keeps 256 byte registers behind an auto-incrementing
//! pointer (the first byte written after the address sets the pointer) and
//! records an [`Event`] trace.
//!
//! Faults can be injected: an absent device, a rejected register index, a
//! NAK on the Nth data byte, clock stretching, a clock stuck low and a
//! data line held low for a number of clock pulses.
//!
//! [`SimDelay`] implements [`DelayNs`] and totals the requested time.
//!
//! Registers reset to `0xFF`, like erased EEPROM. A peripheral addressed
//! for reading drives the first bit of its next byte right after the
//! acknowledge, so a zero-length read only ends cleanly when that bit is 1.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use softwire_hal::{BusLines, Line};

/// Capacity of the event trace
pub const TRACE_CAPACITY: usize = 512;

/// Something the simulated peripheral observed on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// START or repeated START
    Start,
    /// STOP
    Stop,
    /// Address byte, any device
    Address {
        /// 7-bit address
        address: u8,
        /// Read bit set
        read: bool,
        /// This peripheral acknowledged it
        acked: bool,
    },
    /// First byte of a write: the register pointer
    Register {
        /// Byte on the wire
        value: u8,
        /// Acknowledged
        acked: bool,
    },
    /// Data byte written by the master
    Write {
        /// Byte on the wire
        value: u8,
        /// Acknowledged
        acked: bool,
    },
    /// Data byte read by the master
    Read {
        /// Byte on the wire
        value: u8,
        /// The master acknowledged it (asked for more)
        ack: bool,
    },
}

/// What the next acknowledge clock leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    Write,
    Read,
    Idle,
}

/// Peripheral decoder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Not selected, ignoring clocks
    Idle,
    /// Shifting in the address byte
    Address { value: u8, bits: u8 },
    /// Shifting in a byte written by the master
    Write { value: u8, bits: u8 },
    /// Shifting out a byte to the master
    Read { value: u8, bits: u8 },
    /// Ninth clock of a received byte, peripheral drives the acknowledge
    SlaveAck { ack: bool, next: Next },
    /// Ninth clock of a transmitted byte, master drives the acknowledge
    MasterAck { value: u8, ack: bool },
}

/// Simulated two-wire bus with one register peripheral
pub struct SimBus {
    // Master side
    master_scl_low: bool,
    master_sda_low: bool,

    // Peripheral side
    address: u8,
    present: bool,
    reject_register: bool,
    nak_data_at: Option<usize>,
    stretch_polls: u16,
    clock_stuck: bool,
    data_hold_pulses: u16,

    phase: Phase,
    slave_sda_low: bool,
    stretch_remaining: u16,
    pointer_pending: bool,
    data_index: usize,
    pointer: u8,
    registers: [u8; 256],

    // Observed bus levels, for edge detection
    scl: bool,
    sda: bool,

    events: Vec<Event, TRACE_CAPACITY>,
    line_ops: u32,
    drive_lows: u32,
    stretched: u32,
}

impl SimBus {
    /// Bus with a peripheral at `address`, both lines released
    pub fn new(address: u8) -> Self {
        Self {
            master_scl_low: false,
            master_sda_low: false,
            address,
            present: true,
            reject_register: false,
            nak_data_at: None,
            stretch_polls: 0,
            clock_stuck: false,
            data_hold_pulses: 0,
            phase: Phase::Idle,
            slave_sda_low: false,
            stretch_remaining: 0,
            pointer_pending: false,
            data_index: 0,
            pointer: 0,
            registers: [0xFF; 256],
            scl: true,
            sda: true,
            events: Vec::new(),
            line_ops: 0,
            drive_lows: 0,
            stretched: 0,
        }
    }

    /// Connect or disconnect the peripheral (disconnected never acknowledges)
    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    /// NAK every register index byte
    pub fn reject_register(&mut self, reject: bool) {
        self.reject_register = reject;
    }

    /// NAK the data byte with this index (0-based, counted per transaction,
    /// not counting the register pointer byte)
    pub fn nak_data_at(&mut self, index: Option<usize>) {
        self.nak_data_at = index;
    }

    /// Hold the clock low for `polls` samples on every acknowledge clock of
    /// a byte the peripheral accepted, and on the first bit of every byte it
    /// transmits
    pub fn stretch(&mut self, polls: u16) {
        self.stretch_polls = polls;
    }

    /// Short the clock line to ground
    pub fn hold_clock_low(&mut self, stuck: bool) {
        self.clock_stuck = stuck;
        self.resync();
    }

    /// Hold the data line low until `pulses` clock falling edges have passed
    ///
    /// Models a peripheral left mid-byte by a reset master.
    pub fn hold_data_low(&mut self, pulses: u16) {
        self.data_hold_pulses = pulses;
        self.resync();
    }

    /// Preload registers starting at `start` and point the peripheral there
    pub fn set_registers(&mut self, start: u8, values: &[u8]) {
        let mut reg = start;
        for &v in values {
            self.registers[usize::from(reg)] = v;
            reg = reg.wrapping_add(1);
        }
        self.pointer = start;
    }

    /// Register file
    pub fn registers(&self) -> &[u8; 256] {
        &self.registers
    }

    /// Recorded events
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of START conditions seen (repeated STARTs included)
    pub fn starts(&self) -> usize {
        self.events.iter().filter(|e| **e == Event::Start).count()
    }

    /// Number of STOP conditions seen
    pub fn stops(&self) -> usize {
        self.events.iter().filter(|e| **e == Event::Stop).count()
    }

    /// Every byte written by the master after an address, register bytes
    /// included
    pub fn written(&self) -> Vec<u8, TRACE_CAPACITY> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                Event::Register { value, .. } | Event::Write { value, .. } => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Data bytes written by the master (register pointer bytes excluded)
    pub fn data_written(&self) -> Vec<u8, TRACE_CAPACITY> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                Event::Write { value, .. } => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Bytes read by the master with the acknowledge it sent for each
    pub fn reads(&self) -> Vec<(u8, bool), TRACE_CAPACITY> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                Event::Read { value, ack } => Some((value, ack)),
                _ => None,
            })
            .collect()
    }

    /// Total `BusLines` calls made by the master
    pub fn line_ops(&self) -> u32 {
        self.line_ops
    }

    /// `drive_low` calls made by the master
    pub fn drive_low_count(&self) -> u32 {
        self.drive_lows
    }

    /// Clock samples answered low because of stretching
    pub fn stretched_polls(&self) -> u32 {
        self.stretched
    }

    /// The master is actively driving a line
    pub fn master_driving(&self) -> bool {
        self.master_scl_low || self.master_sda_low
    }

    /// Both lines high and the peripheral not selected
    pub fn idle(&self) -> bool {
        self.scl && self.sda && self.phase == Phase::Idle
    }

    fn clock_level(&self) -> bool {
        !(self.master_scl_low || self.clock_stuck || self.stretch_remaining > 0)
    }

    fn data_level(&self) -> bool {
        !(self.master_sda_low || self.slave_sda_low || self.data_hold_pulses > 0)
    }

    /// Adopt current levels without decoding them
    fn resync(&mut self) {
        self.scl = self.clock_level();
        self.sda = self.data_level();
    }

    /// Decode whatever edge the last line change produced
    fn settle(&mut self) {
        let scl = self.clock_level();
        let sda = self.data_level();

        if scl && self.scl && sda != self.sda {
            self.sda = sda;
            if sda {
                self.on_stop();
            } else {
                self.on_start();
            }
        } else if scl && !self.scl {
            self.scl = true;
            self.sda = sda;
            self.on_clock_rise(sda);
        } else if !scl && self.scl {
            self.scl = false;
            self.on_clock_fall();
        }

        // Peripheral output changes happen with the clock low
        self.resync();
    }

    fn record(&mut self, event: Event) {
        let _ = self.events.push(event);
    }

    fn on_start(&mut self) {
        self.record(Event::Start);
        self.phase = Phase::Address { value: 0, bits: 0 };
        self.slave_sda_low = false;
        self.pointer_pending = false;
        self.data_index = 0;
    }

    fn on_stop(&mut self) {
        self.record(Event::Stop);
        self.phase = Phase::Idle;
        self.slave_sda_low = false;
    }

    fn on_clock_rise(&mut self, sda: bool) {
        self.phase = match self.phase {
            Phase::Address { value, bits } => Phase::Address {
                value: (value << 1) | u8::from(sda),
                bits: bits + 1,
            },
            Phase::Write { value, bits } => Phase::Write {
                value: (value << 1) | u8::from(sda),
                bits: bits + 1,
            },
            Phase::Read { value, bits } => Phase::Read {
                value,
                bits: bits + 1,
            },
            Phase::MasterAck { value, .. } => {
                let ack = !sda;
                self.record(Event::Read { value, ack });
                Phase::MasterAck { value, ack }
            }
            other => other,
        };
    }

    fn on_clock_fall(&mut self) {
        if self.data_hold_pulses > 0 {
            self.data_hold_pulses -= 1;
        }

        match self.phase {
            Phase::Address { value, bits: 8 } => {
                let address = value >> 1;
                let read = value & 1 != 0;
                let acked = self.present && address == self.address;
                self.record(Event::Address {
                    address,
                    read,
                    acked,
                });
                let next = match (acked, read) {
                    (false, _) => Next::Idle,
                    (true, true) => Next::Read,
                    (true, false) => {
                        self.pointer_pending = true;
                        Next::Write
                    }
                };
                self.acknowledge(acked, next);
            }
            Phase::Write { value, bits: 8 } => {
                let acked = if self.pointer_pending {
                    let acked = !self.reject_register;
                    self.record(Event::Register { value, acked });
                    if acked {
                        self.pointer = value;
                        self.pointer_pending = false;
                    }
                    acked
                } else {
                    let acked = self.nak_data_at != Some(self.data_index);
                    self.record(Event::Write { value, acked });
                    self.data_index += 1;
                    if acked {
                        self.registers[usize::from(self.pointer)] = value;
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                    acked
                };
                let next = if acked { Next::Write } else { Next::Idle };
                self.acknowledge(acked, next);
            }
            Phase::SlaveAck { next, .. } => {
                self.slave_sda_low = false;
                self.phase = match next {
                    Next::Write => Phase::Write { value: 0, bits: 0 },
                    Next::Read => self.load_byte(),
                    Next::Idle => Phase::Idle,
                };
            }
            Phase::Read { value, bits: 8 } => {
                self.slave_sda_low = false;
                self.phase = Phase::MasterAck { value, ack: false };
            }
            Phase::Read { value, bits } => {
                self.slave_sda_low = value & (0x80 >> bits) == 0;
            }
            Phase::MasterAck { ack, .. } => {
                self.phase = if ack { self.load_byte() } else { Phase::Idle };
            }
            _ => {}
        }
    }

    /// Drive the acknowledge for the byte just received
    fn acknowledge(&mut self, ack: bool, next: Next) {
        self.slave_sda_low = ack;
        self.phase = Phase::SlaveAck { ack, next };
    }

    /// Fetch the next register and present its first bit
    fn load_byte(&mut self) -> Phase {
        let value = self.registers[usize::from(self.pointer)];
        self.pointer = self.pointer.wrapping_add(1);
        self.slave_sda_low = value & 0x80 == 0;
        Phase::Read { value, bits: 0 }
    }

    /// Arm clock stretching for a clock release in the current phase
    fn arm_stretch(&mut self) {
        let stretches = matches!(
            self.phase,
            Phase::SlaveAck { ack: true, .. } | Phase::Read { bits: 0, .. }
        );
        if stretches {
            self.stretch_remaining = self.stretch_polls;
        }
    }
}

impl BusLines for SimBus {
    fn drive_low(&mut self, line: Line) {
        self.line_ops += 1;
        self.drive_lows += 1;
        match line {
            Line::Clock => {
                self.master_scl_low = true;
                self.stretch_remaining = 0;
            }
            Line::Data => self.master_sda_low = true,
        }
        self.settle();
    }

    fn release(&mut self, line: Line) {
        self.line_ops += 1;
        match line {
            Line::Clock => {
                if self.master_scl_low {
                    self.arm_stretch();
                }
                self.master_scl_low = false;
            }
            Line::Data => self.master_sda_low = false,
        }
        self.settle();
    }

    fn is_high(&mut self, line: Line) -> bool {
        self.line_ops += 1;
        match line {
            Line::Clock => {
                if self.stretch_remaining > 0 && !self.master_scl_low {
                    self.stretched += 1;
                    self.stretch_remaining -= 1;
                    // The sample saw low; the clock rises once the count runs out
                    self.settle();
                    return false;
                }
                self.clock_level()
            }
            Line::Data => self.data_level(),
        }
    }
}

/// Delay provider that only adds up the requested time
#[derive(Debug, Default)]
pub struct SimDelay {
    total_ns: u64,
}

impl SimDelay {
    /// Fresh delay with nothing accumulated
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requested delay in nanoseconds
    pub fn total_ns(&self) -> u64 {
        self.total_ns
    }

    /// Total requested delay in whole microseconds
    pub fn total_us(&self) -> u64 {
        self.total_ns / 1_000
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Clock one bit from the master side
    fn clock_bit(sim: &mut SimBus, high: bool) -> bool {
        sim.set(Line::Data, high);
        sim.release(Line::Clock);
        let sampled = sim.is_high(Line::Data);
        sim.drive_low(Line::Clock);
        sampled
    }

    fn clock_byte(sim: &mut SimBus, byte: u8) -> bool {
        for bit in (0..8).rev() {
            clock_bit(sim, byte & (1 << bit) != 0);
        }
        // Acknowledge clock with data released
        !clock_bit(sim, true)
    }

    fn start(sim: &mut SimBus) {
        sim.release(Line::Data);
        sim.release(Line::Clock);
        sim.drive_low(Line::Data);
        sim.drive_low(Line::Clock);
    }

    fn stop(sim: &mut SimBus) {
        sim.drive_low(Line::Data);
        sim.release(Line::Clock);
        sim.release(Line::Data);
    }

    #[test]
    fn test_decodes_start_address_stop() {
        let mut sim = SimBus::new(0x21);
        start(&mut sim);
        assert!(clock_byte(&mut sim, 0x21 << 1));
        stop(&mut sim);

        assert_eq!(
            sim.events(),
            &[
                Event::Start,
                Event::Address {
                    address: 0x21,
                    read: false,
                    acked: true
                },
                Event::Stop
            ]
        );
        assert!(sim.idle());
    }

    #[test]
    fn test_other_address_is_ignored() {
        let mut sim = SimBus::new(0x21);
        start(&mut sim);
        assert!(!clock_byte(&mut sim, 0x22 << 1));
        // Further clocks are ignored until STOP
        assert!(!clock_byte(&mut sim, 0x00));
        stop(&mut sim);

        assert!(sim.written().is_empty());
        assert_eq!(sim.stops(), 1);
    }

    #[test]
    fn test_pointer_and_auto_increment() {
        let mut sim = SimBus::new(0x21);
        start(&mut sim);
        clock_byte(&mut sim, 0x21 << 1);
        clock_byte(&mut sim, 0xFF);
        clock_byte(&mut sim, 0x01);
        clock_byte(&mut sim, 0x02);
        stop(&mut sim);

        // Pointer wraps from 0xFF to 0x00
        assert_eq!(sim.registers()[0xFF], 0x01);
        assert_eq!(sim.registers()[0x00], 0x02);
        assert_eq!(sim.written().as_slice(), &[0xFF, 0x01, 0x02]);
        assert_eq!(sim.data_written().as_slice(), &[0x01, 0x02]);
    }

    #[test]
    fn test_hold_data_low_counts_pulses() {
        let mut sim = SimBus::new(0x21);
        sim.hold_data_low(2);
        assert!(!sim.is_high(Line::Data));

        sim.drive_low(Line::Clock);
        sim.release(Line::Clock);
        assert!(!sim.is_high(Line::Data));

        sim.drive_low(Line::Clock);
        assert!(sim.is_high(Line::Data));
        assert!(sim.events().is_empty());
    }

    #[test]
    fn test_stretch_counts_samples() {
        let mut sim = SimBus::new(0x21);
        sim.stretch(3);
        start(&mut sim);
        for bit in (0..8).rev() {
            clock_bit(&mut sim, (0x21 << 1) & (1 << bit) != 0);
        }

        sim.release(Line::Data);
        sim.release(Line::Clock);
        assert!(!sim.is_high(Line::Clock));
        assert!(!sim.is_high(Line::Clock));
        assert!(!sim.is_high(Line::Clock));
        assert!(sim.is_high(Line::Clock));
        assert!(!sim.is_high(Line::Data), "acknowledge held during stretch");
        assert_eq!(sim.stretched_polls(), 3);
    }

    #[test]
    fn test_delay_totals() {
        let mut delay = SimDelay::new();
        delay.delay_us(5);
        delay.delay_ns(250);
        assert_eq!(delay.total_ns(), 5_250);
        assert_eq!(delay.total_us(), 5);
    }
}
