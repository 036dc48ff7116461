//! Poller configuration.
//!
//! There is no configuration file. The poller reads a handful of `ATLAS_*`
//! environment variables, each with a default that matches a Raspberry Pi
//! with one EZO circuit on I2C bus 1 and another on the primary UART.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::atlas::{self, Transport};
use crate::error::{Error, Result};

pub const DEFAULT_I2C_BUS: u8 = 1;
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyS0";
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_SERIAL_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_COMMAND: &str = "R";

/// I2C side of the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cConfig {
    pub bus: u8,
    pub address: u8,
}

/// Serial side of the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Per-byte read timeout
    pub timeout: Duration,
}

/// Everything the poller needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub i2c: Option<I2cConfig>,
    pub serial: Option<SerialConfig>,
    pub interval: Duration,
    pub command: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            i2c: Some(I2cConfig {
                bus: DEFAULT_I2C_BUS,
                address: atlas::DEFAULT_ADDRESS,
            }),
            serial: Some(SerialConfig {
                port: DEFAULT_SERIAL_PORT.to_string(),
                baud_rate: DEFAULT_BAUD_RATE,
                timeout: DEFAULT_SERIAL_TIMEOUT,
            }),
            interval: DEFAULT_POLL_INTERVAL,
            command: DEFAULT_POLL_COMMAND.to_string(),
        }
    }
}

impl PollerConfig {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; unset variables take their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let transports = match lookup("ATLAS_TRANSPORTS") {
            Some(list) => parse_transports(&list)?,
            None => vec![Transport::I2c, Transport::Serial],
        };

        let i2c = if transports.contains(&Transport::I2c) {
            let address = match lookup("ATLAS_I2C_ADDRESS") {
                Some(raw) => parse_address(&raw)?,
                None => atlas::DEFAULT_ADDRESS,
            };
            Some(I2cConfig {
                bus: parse_or("ATLAS_I2C_BUS", &lookup, DEFAULT_I2C_BUS)?,
                address,
            })
        } else {
            None
        };

        let serial = if transports.contains(&Transport::Serial) {
            Some(SerialConfig {
                port: lookup("ATLAS_SERIAL_PORT").unwrap_or_else(|| DEFAULT_SERIAL_PORT.to_string()),
                baud_rate: parse_or("ATLAS_BAUD_RATE", &lookup, DEFAULT_BAUD_RATE)?,
                timeout: parse_or(
                    "ATLAS_SERIAL_TIMEOUT_MS",
                    &lookup,
                    DEFAULT_SERIAL_TIMEOUT.as_millis() as u64,
                )
                .map(Duration::from_millis)?,
            })
        } else {
            None
        };

        let interval_secs = parse_or("ATLAS_POLL_INTERVAL_SECS", &lookup, DEFAULT_POLL_INTERVAL.as_secs())?;
        if interval_secs == 0 {
            return Err(Error::Config("ATLAS_POLL_INTERVAL_SECS must be at least 1".into()));
        }

        let command = lookup("ATLAS_POLL_COMMAND").unwrap_or_else(|| DEFAULT_POLL_COMMAND.to_string());
        atlas::validate_command(&command)
            .map_err(|e| Error::Config(format!("ATLAS_POLL_COMMAND: {e}")))?;

        Ok(Self {
            i2c,
            serial,
            interval: Duration::from_secs(interval_secs),
            command,
        })
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}"))),
        None => Ok(default),
    }
}

/// Parse a comma-separated transport list such as `i2c,serial`.
pub fn parse_transports(list: &str) -> Result<Vec<Transport>> {
    let mut transports = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let transport = match name.to_ascii_lowercase().as_str() {
            "i2c" => Transport::I2c,
            "serial" | "uart" => Transport::Serial,
            other => return Err(Error::Config(format!("unknown transport {other:?}"))),
        };
        if !transports.contains(&transport) {
            transports.push(transport);
        }
    }
    if transports.is_empty() {
        return Err(Error::Config("ATLAS_TRANSPORTS names no transport".into()));
    }
    Ok(transports)
}

/// Parse a 7-bit I2C address, decimal or `0x`-prefixed hex.
pub fn parse_address(raw: &str) -> Result<u8> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => raw.parse::<u8>(),
    };
    let address = parsed.map_err(|e| Error::Config(format!("I2C address {raw:?}: {e}")))?;
    atlas::validate_address(address).map_err(|e| Error::Config(e.to_string()))?;
    Ok(address)
}
