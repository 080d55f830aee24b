//! Trait implementations for the bus engine
//!
//! - `embedded_hal::i2c::I2c`, so ecosystem drivers run on the bit-banged bus
//! - `softwire_hal::I2cBus` and `softwire_hal::RegisterBus`

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{
    self, ErrorKind, ErrorType, NoAcknowledgeSource, Operation, SevenBitAddress,
};
use softwire_hal::{BusLines, I2cBus, RegisterBus};

use crate::bus::SoftI2c;
use crate::error::Error;
use crate::transaction::{address_byte, Direction};

impl i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Arbitration => ErrorKind::ArbitrationLoss,
            Error::NoDevice => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            Error::Incomplete | Error::RegisterRejected => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
            }
            Error::InvalidArgument => ErrorKind::Other,
        }
    }
}

impl<L: BusLines, D: DelayNs> ErrorType for SoftI2c<L, D> {
    type Error = Error;
}

impl<L: BusLines, D: DelayNs> i2c::I2c<SevenBitAddress> for SoftI2c<L, D> {
    /// Run `operations` as one transaction
    ///
    /// Adjacent operations of the same direction are merged; a direction
    /// change sends a repeated START and the address again. The last byte
    /// of a read phase is NAKed, empty reads aside.
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        address_byte(address, Direction::Write)?;
        if operations.is_empty() {
            return Ok(());
        }

        self.start()?;
        let result = self.run_operations(address, operations);
        self.finish(result)
    }
}

impl<L: BusLines, D: DelayNs> SoftI2c<L, D> {
    fn run_operations(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        let mut previous: Option<Direction> = None;

        for i in 0..operations.len() {
            let direction = match operations[i] {
                Operation::Read(_) => Direction::Read,
                Operation::Write(_) => Direction::Write,
            };

            if previous != Some(direction) {
                if previous.is_some() {
                    self.start()?;
                }
                self.address(address_byte(address, direction)?)?;
            }

            // Empty reads clock nothing, so they cannot take the final NAK
            let read_follows = operations[i + 1..]
                .iter()
                .take_while(|op| matches!(op, Operation::Read(_)))
                .any(|op| matches!(op, Operation::Read(buf) if !buf.is_empty()));
            match &mut operations[i] {
                Operation::Write(bytes) => self.write_bytes(bytes)?,
                Operation::Read(buf) => self.read_bytes(buf, !read_follows),
            }
            previous = Some(direction);
        }
        Ok(())
    }
}

impl<L: BusLines, D: DelayNs> I2cBus for SoftI2c<L, D> {
    type Error = Error;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Error> {
        self.send(address, data)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Error> {
        self.receive(address, buf)
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Error> {
        SoftI2c::write_read(self, address, write_data, read_buf)
    }
}

impl<L: BusLines, D: DelayNs> RegisterBus for SoftI2c<L, D> {
    fn read_registers(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), Error> {
        SoftI2c::read_registers(self, address, register, buf)
    }

    fn write_registers(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), Error> {
        SoftI2c::write_registers(self, address, register, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusConfig;
    use crate::sim::{SimBus, SimDelay};
    use embedded_hal::i2c::{Error as _, I2c};

    const ADDR: u8 = 0x50;

    /// Drive the bus only through the embedded-hal trait
    fn eh_write_read<I: I2c>(i2c: &mut I, bytes: &[u8], buf: &mut [u8]) -> Result<(), I::Error> {
        i2c.write_read(ADDR, bytes, buf)
    }

    fn hal_read_registers<B: RegisterBus>(
        bus: &mut B,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), B::Error> {
        bus.read_registers(ADDR, register, buf)
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::Arbitration.kind(), ErrorKind::ArbitrationLoss);
        assert_eq!(
            Error::NoDevice.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        assert_eq!(
            Error::Incomplete.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
        );
        assert_eq!(
            Error::RegisterRejected.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
        );
        assert_eq!(Error::InvalidArgument.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_eh_write_read_uses_repeated_start() {
        let mut sim = SimBus::new(ADDR);
        sim.set_registers(0x10, &[0xAB, 0xCD]);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());
        bus.init();

        let mut buf = [0u8; 2];
        assert_eq!(eh_write_read(&mut bus, &[0x10], &mut buf), Ok(()));
        drop(bus);

        assert_eq!(buf, [0xAB, 0xCD]);
        assert_eq!(sim.starts(), 2);
        assert_eq!(sim.stops(), 1);
        assert_eq!(sim.reads().as_slice(), &[(0xAB, true), (0xCD, false)]);
    }

    #[test]
    fn test_eh_merges_adjacent_operations() {
        let mut sim = SimBus::new(ADDR);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());
        bus.init();

        let mut first = [0u8; 1];
        let mut second = [0u8; 2];
        let result = I2c::transaction(
            &mut bus,
            ADDR,
            &mut [
                Operation::Write(&[0x20]),
                Operation::Write(&[0x01, 0x02, 0x03]),
                Operation::Write(&[0x20]),
                Operation::Read(&mut first),
                Operation::Read(&mut second),
            ],
        );
        assert_eq!(result, Ok(()));
        drop(bus);

        // Writes merged into one phase, reads into another
        assert_eq!(sim.starts(), 2);
        assert_eq!(sim.stops(), 1);
        assert_eq!(sim.data_written().as_slice(), &[0x01, 0x02, 0x03, 0x20]);
        // Pointer ended at 0x24, still at its reset value
        assert_eq!(first, [0xFF]);
        assert_eq!(
            sim.reads().as_slice(),
            &[(0xFF, true), (0xFF, true), (0xFF, false)]
        );
    }

    #[test]
    fn test_eh_trailing_empty_read_keeps_final_nak() {
        let mut sim = SimBus::new(ADDR);
        sim.set_registers(0x00, &[0x12, 0x00]);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());
        bus.init();

        let mut first = [0u8; 1];
        let mut second = [0u8; 1];
        let result = I2c::transaction(
            &mut bus,
            ADDR,
            &mut [
                Operation::Read(&mut []),
                Operation::Read(&mut first),
                Operation::Read(&mut []),
                Operation::Read(&mut second),
                Operation::Read(&mut []),
            ],
        );
        assert_eq!(result, Ok(()));
        drop(bus);

        assert_eq!(first, [0x12]);
        assert_eq!(second, [0x00]);
        assert_eq!(sim.reads().as_slice(), &[(0x12, true), (0x00, false)]);
        assert_eq!(sim.stops(), 1);
        assert!(sim.idle());
    }

    #[test]
    fn test_eh_empty_transaction() {
        let mut sim = SimBus::new(ADDR);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());

        assert_eq!(I2c::transaction(&mut bus, ADDR, &mut []), Ok(()));
        assert_eq!(
            I2c::transaction(&mut bus, 0x80, &mut []),
            Err(Error::InvalidArgument)
        );
        drop(bus);

        assert_eq!(sim.line_ops(), 0);
    }

    #[test]
    fn test_eh_no_device() {
        let mut sim = SimBus::new(ADDR);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());
        bus.init();

        let err = I2c::write(&mut bus, 0x51, &[1, 2]).unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        drop(bus);

        assert_eq!(sim.stops(), 1);
        assert!(sim.idle());
    }

    #[test]
    fn test_register_bus_impl() {
        let mut sim = SimBus::new(ADDR);
        sim.set_registers(0x02, &[0x5A]);
        let mut delay = SimDelay::new();
        let mut bus = SoftI2c::new(&mut sim, &mut delay, BusConfig::new());
        bus.init();

        let mut buf = [0u8; 1];
        assert_eq!(hal_read_registers(&mut bus, 0x02, &mut buf), Ok(()));
        assert_eq!(buf, [0x5A]);

        assert_eq!(I2cBus::write(&mut bus, ADDR, &[0x03, 0x77]), Ok(()));
        let mut back = [0u8; 1];
        assert_eq!(I2cBus::write_read(&mut bus, ADDR, &[0x03], &mut back), Ok(()));
        assert_eq!(back, [0x77]);
    }
}
