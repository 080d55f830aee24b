//! Build script for softwire-firmware
//!
//! Puts memory.x on the linker path and rejects a bad softwire.toml before
//! it gets embedded in the image.

use std::env;
use std::fs;
use std::path::PathBuf;

/// Pins the RP2040 exposes as GPIO
const GPIO_COUNT: i64 = 30;

const CONFIG_FILE: &str = "softwire.toml";

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::write(out_dir.join("memory.x"), include_bytes!("memory.x")).expect("write memory.x");
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed={CONFIG_FILE}");

    let errors = match fs::read_to_string(CONFIG_FILE) {
        Ok(content) => match content.parse::<toml::Value>() {
            Ok(config) => validate(&config),
            Err(e) => vec![format!("TOML syntax: {}", e.message())],
        },
        Err(e) => vec![format!("cannot read {CONFIG_FILE}: {e}")],
    };

    if !errors.is_empty() {
        let list: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
        panic!("\n{CONFIG_FILE} is invalid:\n{}\n", list.join("\n"));
    }
}

fn validate(config: &toml::Value) -> Vec<String> {
    let mut errors = Vec::new();
    validate_sections(config, &mut errors);
    validate_bus(config, &mut errors);
    validate_timing(config, &mut errors);
    validate_device(config, &mut errors);
    errors
}

/// Only sections the firmware parser understands
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(table) = config.as_table() else {
        return;
    };
    for (name, value) in table {
        if !["bus", "timing", "device"].contains(&name.as_str()) {
            errors.push(format!("unknown section [{}]", name));
        } else if !value.is_table() {
            errors.push(format!("[{}] must be a table", name));
        }
    }
}

/// Parse "gpioN" or "P0.N" into a GPIO number
fn parse_gpio(value: &str) -> Option<i64> {
    if let Some(num) = value.strip_prefix("gpio") {
        return num.parse().ok();
    }
    let rest = value.strip_prefix('P').or_else(|| value.strip_prefix('p'))?;
    let (port, pin) = rest.split_once('.')?;
    if port != "0" {
        return None;
    }
    pin.parse().ok()
}

fn validate_bus(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(bus) = config.get("bus") else {
        return;
    };

    let mut pins = Vec::new();
    for key in ["scl", "sda"] {
        match bus.get(key) {
            Some(toml::Value::String(s)) => match parse_gpio(s) {
                Some(n) if (0..GPIO_COUNT).contains(&n) => pins.push(n),
                _ => errors.push(format!("[bus] {} = \"{}\" is not an RP2040 GPIO", key, s)),
            },
            Some(_) => errors.push(format!("[bus] {} must be a string like \"gpio4\"", key)),
            None => {}
        }
    }
    if pins.len() == 2 && pins[0] == pins[1] {
        errors.push("[bus] scl and sda must be different pins".to_string());
    }

    check_range(bus, "bus", "start_stop_retries", 1, 255, errors);
    check_range(bus, "bus", "stretch_polls", 0, 65_535, errors);
}

fn validate_timing(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(timing) = config.get("timing") else {
        return;
    };

    check_range(timing, "timing", "frequency_hz", 1, 1_000_000, errors);
    check_range(timing, "timing", "half_period_us", 1, 500_000, errors);
    check_range(timing, "timing", "stretch_poll_us", 0, 100_000, errors);
    check_range(timing, "timing", "start_stop_poll_us", 0, 100_000, errors);
}

fn validate_device(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(device) = config.get("device") else {
        return;
    };

    if device.get("address").is_none() {
        errors.push("[device] missing 'address'".to_string());
    }
    check_range(device, "device", "address", 0, 0x7F, errors);
    check_range(device, "device", "register", 0, 0xFF, errors);
    check_range(device, "device", "length", 1, 32, errors);
}

/// Check an optional integer key against an inclusive range
fn check_range(
    table: &toml::Value,
    section: &str,
    key: &str,
    min: i64,
    max: i64,
    errors: &mut Vec<String>,
) {
    match table.get(key) {
        Some(toml::Value::Integer(v)) if (min..=max).contains(v) => {}
        Some(toml::Value::Integer(_)) => {
            errors.push(format!("[{}] {} must be {}-{}", section, key, min, max));
        }
        Some(_) => errors.push(format!("[{}] {} must be an integer", section, key)),
        None => {}
    }
}
