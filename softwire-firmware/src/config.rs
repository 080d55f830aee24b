//! Configuration loading
//!
//! The bus configuration is compiled in from softwire.toml (validated on
//! the host by build.rs) and parsed at boot with the no_std parser from
//! softwire-core.

use defmt::*;
use softwire_core::config::{parse_config, SoftwireConfig};

/// Embedded configuration (compiled into firmware)
/// Edit softwire.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../softwire.toml");

/// Largest register block the poll task reads
pub const MAX_READ_LEN: usize = 32;

/// Parse the embedded configuration, falling back to defaults
pub fn load_config() -> SoftwireConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!(
                "Config: scl={} sda={} ~{=u32} Hz, retries={=u8}, stretch polls={=u16}",
                config.bus.scl.pin,
                config.bus.sda.pin,
                config.bus.timing.frequency_hz(),
                config.bus.start_stop_retries,
                config.bus.stretch_polls
            );
            config
        }
        Err(e) => {
            warn!("Embedded config rejected ({}), using defaults", e);
            SoftwireConfig::default()
        }
    }
}
