//! Transaction engine
//!
//! Whole-buffer transfers bracketed by START and STOP. Every transaction
//! that got past its START runs its STOP, whatever failed in between, so a
//! failed transfer never leaves the bus driven. The first error wins; a
//! STOP failure is only reported when nothing failed earlier. Nothing is
//! retried here.
//!
//! Zero-length buffers are legal and only address the device. A read
//! addressed this way leaves the peripheral driving the first bit of its
//! next byte; if that bit is 0 the STOP cannot complete and the transfer
//! reports [`Error::Arbitration`]. [`SoftI2c::recover`] clears the bus.

use embedded_hal::delay::DelayNs;
use softwire_hal::BusLines;

use crate::bus::SoftI2c;
use crate::error::Error;
use crate::protocol::Ack;

/// Highest 7-bit address
pub const MAX_ADDRESS: u8 = 0x7F;

/// Transfer direction carried in the address byte's low bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Master to peripheral (bit clear)
    Write,
    /// Peripheral to master (bit set)
    Read,
}

/// Build the address byte for a 7-bit address
///
/// Rejects addresses above [`MAX_ADDRESS`] instead of silently truncating.
pub const fn address_byte(address: u8, direction: Direction) -> Result<u8, Error> {
    if address > MAX_ADDRESS {
        return Err(Error::InvalidArgument);
    }
    Ok(match direction {
        Direction::Write => address << 1,
        Direction::Read => (address << 1) | 1,
    })
}

impl<L: BusLines, D: DelayNs> SoftI2c<L, D> {
    /// Read `buf.len()` bytes from the device at `address`
    ///
    /// Every byte but the last is acknowledged; the last is NAKed.
    pub fn receive(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Error> {
        let byte = address_byte(address, Direction::Read)?;
        self.start()?;

        let result = self.address(byte).map(|()| self.read_bytes(buf, true));
        self.finish(result)
    }

    /// Write `data` to the device at `address`
    ///
    /// Stops at the first byte that is not acknowledged and reports
    /// [`Error::Incomplete`].
    pub fn send(&mut self, address: u8, data: &[u8]) -> Result<(), Error> {
        let byte = address_byte(address, Direction::Write)?;
        self.start()?;

        let result = self
            .address(byte)
            .and_then(|()| self.write_bytes(data));
        self.finish(result)
    }

    /// Read consecutive registers starting at `register`
    ///
    /// Writes the register index, then hands over to a complete
    /// [`SoftI2c::receive`], whose START acts as the repeated START. The
    /// write phase is only closed with a STOP when it fails.
    pub fn read_registers(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), Error> {
        let byte = address_byte(address, Direction::Write)?;
        self.start()?;

        let selected = self
            .address(byte)
            .and_then(|()| self.register(register));
        if let Err(e) = selected {
            return self.finish(Err(e));
        }

        self.receive(address, buf)
    }

    /// Write consecutive registers starting at `register`, in one transaction
    pub fn write_registers(
        &mut self,
        address: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), Error> {
        let byte = address_byte(address, Direction::Write)?;
        self.start()?;

        let result = self
            .address(byte)
            .and_then(|()| self.register(register))
            .and_then(|()| self.write_bytes(data));
        self.finish(result)
    }

    /// Write `bytes`, then read into `buf` after a repeated START
    ///
    /// Generalizes [`SoftI2c::read_registers`] to a multi-byte write phase.
    /// A NAK during the write phase ends the transaction with a STOP.
    pub fn write_read(&mut self, address: u8, bytes: &[u8], buf: &mut [u8]) -> Result<(), Error> {
        let byte = address_byte(address, Direction::Write)?;
        self.start()?;

        let written = self
            .address(byte)
            .and_then(|()| self.write_bytes(bytes));
        if let Err(e) = written {
            return self.finish(Err(e));
        }

        self.receive(address, buf)
    }

    /// Send an address byte; NAK means nobody answered
    pub(crate) fn address(&mut self, byte: u8) -> Result<(), Error> {
        if self.send_byte(byte).is_ack() {
            Ok(())
        } else {
            debug!("address {=u8:#04x} not acknowledged", byte >> 1);
            Err(Error::NoDevice)
        }
    }

    /// Send a register index byte
    fn register(&mut self, register: u8) -> Result<(), Error> {
        if self.send_byte(register).is_ack() {
            Ok(())
        } else {
            debug!("register {=u8:#04x} rejected", register);
            Err(Error::RegisterRejected)
        }
    }

    /// Send data bytes until one is not acknowledged
    pub(crate) fn write_bytes(&mut self, data: &[u8]) -> Result<(), Error> {
        for (i, &byte) in data.iter().enumerate() {
            if !self.send_byte(byte).is_ack() {
                debug!("data byte {=usize} of {=usize} not acknowledged", i, data.len());
                return Err(Error::Incomplete);
            }
        }
        Ok(())
    }

    /// Receive into `buf`, acknowledging every byte but the last when
    /// `nak_last` is set
    pub(crate) fn read_bytes(&mut self, buf: &mut [u8], nak_last: bool) {
        let last = buf.len().saturating_sub(1);
        for (i, slot) in buf.iter_mut().enumerate() {
            let ack = if nak_last && i == last {
                Ack::Nak
            } else {
                Ack::Ack
            };
            *slot = self.receive_byte(ack);
        }
    }

    /// Close a transaction with a STOP, keeping the first error
    pub(crate) fn finish(&mut self, result: Result<(), Error>) -> Result<(), Error> {
        let stopped = self.stop();
        result.and(stopped)
    }
}
