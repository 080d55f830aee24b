//! Register-addressed peripheral access
//!
//! Most I2C parts (sensors, port expanders, RTCs) expose byte registers
//! behind an auto-incrementing pointer. [`RegisterDevice`] binds a bus to
//! one such device address and offers typed accessors on top of
//! [`RegisterBus`].

use softwire_hal::RegisterBus;

/// A peripheral with byte registers at a fixed address
pub struct RegisterDevice<B> {
    bus: B,
    address: u8,
}

impl<B: RegisterBus> RegisterDevice<B> {
    /// Bind `bus` to the device at 7-bit `address`
    pub fn new(bus: B, address: u8) -> Self {
        Self { bus, address }
    }

    /// Device address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Give the bus back
    pub fn release(self) -> B {
        self.bus
    }

    /// Read one register
    pub fn read_u8(&mut self, register: u8) -> Result<u8, B::Error> {
        let mut buf = [0u8; 1];
        self.bus.read_registers(self.address, register, &mut buf)?;
        Ok(buf[0])
    }

    /// Write one register
    pub fn write_u8(&mut self, register: u8, value: u8) -> Result<(), B::Error> {
        self.bus.write_registers(self.address, register, &[value])
    }

    /// Read a big-endian 16-bit value from two consecutive registers
    pub fn read_be_u16(&mut self, register: u8) -> Result<u16, B::Error> {
        let mut buf = [0u8; 2];
        self.bus.read_registers(self.address, register, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Write a big-endian 16-bit value to two consecutive registers
    pub fn write_be_u16(&mut self, register: u8, value: u16) -> Result<(), B::Error> {
        self.bus
            .write_registers(self.address, register, &value.to_be_bytes())
    }

    /// Read-modify-write the bits selected by `mask`
    ///
    /// Returns the value written.
    pub fn modify(&mut self, register: u8, mask: u8, value: u8) -> Result<u8, B::Error> {
        let current = self.read_u8(register)?;
        let updated = (current & !mask) | (value & mask);
        self.write_u8(register, updated)?;
        Ok(updated)
    }

    /// Read consecutive registers into `buf`
    pub fn read_block(&mut self, register: u8, buf: &mut [u8]) -> Result<(), B::Error> {
        self.bus.read_registers(self.address, register, buf)
    }

    /// Write consecutive registers from `data`
    pub fn write_block(&mut self, register: u8, data: &[u8]) -> Result<(), B::Error> {
        self.bus.write_registers(self.address, register, data)
    }
}
