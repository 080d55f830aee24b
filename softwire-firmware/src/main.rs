//! Softwire - bit-banged I2C demo firmware
//!
//! Brings up the bit-banged bus on two RP2040 GPIOs named in
//! softwire.toml, scans it, then polls a block of registers from the
//! configured peripheral once per second.
//!
//! The bus engine busy-waits, so each transaction blocks the executor for
//! its whole duration. That is fine here: the poll task is the only task.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_time::{Delay, Duration, Ticker};
use {defmt_rtt as _, panic_probe as _};

use softwire_core::config::DeviceConfig;
use softwire_core::{outcome_code, Error, SoftI2c};
use softwire_drivers::RegisterDevice;
use softwire_hal_rp2040::{FlexLines, PinBank};

use crate::config::{load_config, MAX_READ_LEN};

mod config;

/// Poll interval in milliseconds
const POLL_INTERVAL_MS: u64 = 1000;

type Bus = SoftI2c<FlexLines<'static>, Delay>;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Softwire firmware starting...");

    let p = embassy_rp::init(Default::default());
    let mut bank = PinBank::new(p);

    let config = load_config();

    let lines = match FlexLines::from_config(&mut bank, &config.bus) {
        Ok(lines) => lines,
        Err(e) => {
            error!("Cannot claim bus pins: {}", e);
            return;
        }
    };

    let mut bus = SoftI2c::new(lines, Delay, config.bus);
    bus.init();

    if let Err(e) = bus.recover() {
        warn!("Bus recovery failed: {}", e);
    }

    match bus.scan() {
        Ok(found) => {
            for &address in found.iter() {
                info!("Found device at {=u8:#04x}", address);
            }
            if found.is_empty() {
                warn!("No devices answered");
            }
        }
        Err(e) => warn!("Scan failed: {}", e),
    }

    match config.device {
        Some(device) => spawner.spawn(poll_task(bus, device)).unwrap(),
        None => info!("No [device] configured, idle"),
    }
}

/// Poll task - reads the configured register block periodically
#[embassy_executor::task]
async fn poll_task(mut bus: Bus, device: DeviceConfig) {
    info!(
        "Polling {=u8:#04x} register {=u8:#04x} x{=u8}",
        device.address, device.register, device.length
    );

    let len = usize::from(device.length).clamp(1, MAX_READ_LEN);
    let mut buf = [0u8; MAX_READ_LEN];
    let mut ticker = Ticker::every(Duration::from_millis(POLL_INTERVAL_MS));

    loop {
        ticker.next().await;

        let result = RegisterDevice::new(&mut bus, device.address)
            .read_block(device.register, &mut buf[..len]);

        match result {
            Ok(()) => info!("regs: {:02x}", &buf[..len]),
            Err(e) => {
                warn!("read failed: {} (code {=i8})", e, outcome_code(&Err(e)));
                if e == Error::Arbitration {
                    if let Err(e) = bus.recover() {
                        warn!("Bus recovery failed: {}", e);
                    }
                }
            }
        }
    }
}
