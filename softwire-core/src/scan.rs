//! Bus probing
//!
//! Find out which peripherals answer, using address-only write
//! transactions (START, address, STOP).

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use softwire_hal::BusLines;

use crate::bus::SoftI2c;
use crate::error::Error;

/// First non-reserved 7-bit address
pub const FIRST_ADDRESS: u8 = 0x08;

/// Last non-reserved 7-bit address
pub const LAST_ADDRESS: u8 = 0x77;

/// Number of addresses a scan visits
pub const SCAN_SLOTS: usize = (LAST_ADDRESS - FIRST_ADDRESS + 1) as usize;

impl<L: BusLines, D: DelayNs> SoftI2c<L, D> {
    /// Check whether a device acknowledges `address`
    ///
    /// Returns `Ok` on acknowledge and [`Error::NoDevice`] otherwise.
    pub fn probe(&mut self, address: u8) -> Result<(), Error> {
        self.send(address, &[])
    }

    /// Probe every non-reserved address and collect the ones that answer
    ///
    /// Aborts with [`Error::Arbitration`] if the bus is held; other failures
    /// simply mean nobody is at that address.
    pub fn scan(&mut self) -> Result<Vec<u8, SCAN_SLOTS>, Error> {
        let mut found = Vec::new();
        for address in FIRST_ADDRESS..=LAST_ADDRESS {
            match self.probe(address) {
                Ok(()) => {
                    debug!("scan: device at {=u8:#04x}", address);
                    // Cannot overflow: one slot per visited address
                    let _ = found.push(address);
                }
                Err(Error::Arbitration) => {
                    warn!("scan aborted at {=u8:#04x}: bus held", address);
                    return Err(Error::Arbitration);
                }
                Err(_) => {}
            }
        }
        info!("scan: {=usize} device(s)", found.len());
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusConfig;
    use crate::sim::{SimBus, SimDelay};

    #[test]
    fn test_probe() {
        let mut sim = SimBus::new(0x48);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());
        bus.init();

        assert_eq!(bus.probe(0x48), Ok(()));
        assert_eq!(bus.probe(0x49), Err(Error::NoDevice));
        assert_eq!(bus.probe(0x80), Err(Error::InvalidArgument));
        drop(bus);

        assert!(sim.written().is_empty());
        assert_eq!(sim.stops(), 2);
    }

    #[test]
    fn test_scan_finds_device() {
        let mut sim = SimBus::new(0x48);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());
        bus.init();

        let found = bus.scan().unwrap();
        assert_eq!(found.as_slice(), &[0x48]);
        drop(bus);

        assert_eq!(sim.starts(), SCAN_SLOTS);
        assert_eq!(sim.stops(), SCAN_SLOTS);
    }

    #[test]
    fn test_scan_skips_reserved_addresses() {
        let mut sim = SimBus::new(0x03);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());

        assert!(bus.scan().unwrap().is_empty());
    }

    #[test]
    fn test_scan_aborts_on_stuck_clock() {
        let mut sim = SimBus::new(0x48);
        sim.hold_clock_low(true);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());

        assert_eq!(bus.scan(), Err(Error::Arbitration));
        drop(bus);

        // Gave up after the first START
        assert_eq!(delay.total_us() / 1_000, 30);
    }
}
